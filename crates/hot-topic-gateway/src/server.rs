//! Axum HTTP server.

use std::sync::Arc;

use axum::Router;
use axum::http::{Method, header};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::routes::{health_get, health_post, run_workflow};
use crate::state::GatewayState;

/// Build the full router.
///
/// `/health` and `/workflow` are also mounted under `/api`. `OPTIONS` on any
/// route is answered by the CORS layer. When `ui_enabled` is true the
/// embedded browser UI is served at `/`.
pub fn build_router(state: Arc<GatewayState>, ui_enabled: bool) -> Router {
    let api = Router::new()
        .route("/health", get(health_get).post(health_post))
        .route("/workflow", post(run_workflow));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // API routes are registered first so they take priority over the UI catch-all
    let mut app = Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state);

    if ui_enabled {
        app = app.merge(hot_topic_web::ui_router());
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}

/// Serve `router` on an already bound listener until ctrl-c.
pub async fn serve(listener: TcpListener, router: Router) -> anyhow::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Bind `{gateway.bind}:{port}` and serve the gateway.
pub async fn start_gateway(
    state: Arc<GatewayState>,
    port: u16,
    ui_enabled: bool,
) -> anyhow::Result<()> {
    let bind_addr = state.config.gateway_bind();
    let router = build_router(state, ui_enabled);

    let addr = format!("{bind_addr}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("Gateway listening on {addr}");
    if ui_enabled {
        info!("Browser UI available at http://{addr}/");
    }

    serve(listener, router).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    }
}
