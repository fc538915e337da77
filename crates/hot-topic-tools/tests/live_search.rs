//! Live search against a local xAI stub.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use serde_json::{Value, json};

use hot_topic_core::config::Config;
use hot_topic_core::types::parse_date;
use hot_topic_tools::{LiveSearchTool, SEARCH_ERROR_MARKER, Tool, ToolContext, XaiSearchClient};

type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn ok_handler(
    State(captured): State<Captured>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<Value>,
) -> impl IntoResponse {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    captured.lock().unwrap().push((auth, body));
    axum::Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": "Rust 1.90 がリリースされました" } }],
        "citations": ["https://x.com/rustlang/status/1"]
    }))
}

async fn failing_handler() -> impl IntoResponse {
    (StatusCode::TOO_MANY_REQUESTS, "slow down")
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_search_sends_window_and_returns_citations() {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(ok_handler))
        .with_state(captured.clone());
    let base = spawn(app).await;

    let client = XaiSearchClient::new(&base, "grok-4-fast", Some("xai-key".into()));
    let request = client.request("Rust", Some(parse_date("2024-10-03").unwrap()));
    let result = client.search(&request).await;

    assert_eq!(result.content, "Rust 1.90 がリリースされました");
    assert_eq!(result.citations.len(), 1);
    assert!(!result.is_failure());

    let calls = captured.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (auth, body) = &calls[0];
    assert_eq!(auth.as_deref(), Some("Bearer xai-key"));
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("2024-09-26"));
    assert!(prompt.contains("2024-10-04"));
}

#[tokio::test]
async fn test_non_success_status_becomes_marker_content() {
    let app = Router::new().route("/v1/chat/completions", post(failing_handler));
    let base = spawn(app).await;

    let client = XaiSearchClient::new(&base, "grok-4-fast", Some("xai-key".into()));
    let result = client.search(&client.request("Rust", None)).await;

    assert!(result.content.starts_with(SEARCH_ERROR_MARKER));
    assert!(result.content.contains("429"));
    assert!(result.content.contains("slow down"));
}

#[tokio::test]
async fn test_tool_overrides_thresholds() {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(ok_handler))
        .with_state(captured.clone());
    let base = spawn(app).await;

    let client = Arc::new(XaiSearchClient::new(&base, "grok-4-fast", Some("k".into())));
    let tool = LiveSearchTool::new(client);
    let ctx = ToolContext::new("run-1", Arc::new(Config::default()));
    let out = tool
        .execute(
            json!({ "query": "TypeScript", "min_favorites": 10, "min_views": 100, "max_results": 5 }),
            &ctx,
        )
        .await
        .unwrap();

    assert!(!out.is_error);
    assert!(out.content.contains("https://x.com/rustlang/status/1"));

    let calls = captured.lock().unwrap();
    let params = &calls[0].1["search_parameters"];
    assert_eq!(params["max_search_results"], 5);
    assert_eq!(params["sources"][0]["post_favorite_count"], 10);
    assert_eq!(params["sources"][0]["post_view_count"], 100);
}
