//! Browser UI: embedded static page served by the gateway.
//!
//! Uses `rust-embed` to bake the `ui/` directory into the binary.
//! In debug mode (`debug-embed` feature), files are read from disk
//! so the page can be edited and reloaded without a rebuild.

use axum::{
    Router,
    extract::Path,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use rust_embed::Embed;
use tracing::debug;

#[derive(Embed)]
#[folder = "ui/"]
struct UiAssets;

/// Router serving the UI at `/` and its assets by path.
///
/// Merge this **after** the API routes so those take priority over the
/// catch-all.
pub fn ui_router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/{*path}", get(static_handler))
}

async fn index_handler() -> Response {
    serve_file("index.html")
}

async fn static_handler(Path(path): Path<String>) -> Response {
    match try_serve_file(&path) {
        Some(resp) => resp,
        None => {
            debug!(%path, "Unknown UI asset, serving index");
            serve_file("index.html")
        }
    }
}

fn try_serve_file(path: &str) -> Option<Response> {
    let asset = UiAssets::get(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Some(
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime.as_ref())],
            asset.data.into_owned(),
        )
            .into_response(),
    )
}

fn serve_file(path: &str) -> Response {
    try_serve_file(path)
        .unwrap_or_else(|| (StatusCode::NOT_FOUND, Html("<h1>404</h1>")).into_response())
}
