//! WorkflowClient against a local stub that streams NDJSON in awkward chunks.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use bytes::Bytes;
use serde_json::{Value, json};

use hot_topic_client::{RunOutcome, WorkflowClient};

const WAV_B64: &str = "UklGRiQAAABXQVZFZm10IBAAAAABAAEAwF0AAIC7AAACABAAZGF0YQAAAAA=";

fn success_stream() -> String {
    let lines = [
        json!({"type": "workflow-start", "payload": {"workflowId": "developer-hot-topic-workflow"}}),
        json!({"type": "start", "payload": {"runId": "r1"}}),
        json!({"type": "step-start", "payload": {"id": "generate-hot-topic"}}),
        json!({"type": "step-result", "payload": {"id": "generate-hot-topic", "status": "success",
            "output": {"topicsText": "今日の開発トピックです"}}}),
        json!({"type": "step-finish", "payload": {"id": "generate-hot-topic"}}),
        json!({"type": "step-start", "payload": {"id": "tts"}}),
        json!({"type": "step-result", "payload": {"id": "tts", "status": "success",
            "output": {"topicsText": "今日の開発トピックです", "audioData": WAV_B64}}}),
        json!({"type": "step-finish", "payload": {"id": "tts"}}),
    ];
    let mut body: String = lines.iter().map(|l| format!("{l}\n")).collect();
    body.push_str("this is not json\n");
    // Last event without a trailing newline.
    body.push_str(&json!({"type": "finish", "payload": {"runId": "r1", "status": "success"}}).to_string());
    body
}

async fn chunked(captured: Arc<Mutex<Option<Value>>>, body: axum::Json<Value>) -> impl IntoResponse {
    *captured.lock().unwrap() = Some(body.0);
    let bytes = success_stream().into_bytes();
    let chunks: Vec<Result<Bytes, std::io::Error>> = bytes
        .chunks(7)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    ([("content-type", "text/event-stream")], Body::from_stream(futures::stream::iter(chunks)))
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
async fn test_chunked_stream_builds_view() {
    let captured = Arc::new(Mutex::new(None));
    let handler_state = captured.clone();
    let app = Router::new().route(
        "/workflow",
        post(move |body| chunked(handler_state.clone(), body)),
    );
    let base = spawn(app).await;

    let client = WorkflowClient::new(format!("{base}/"));
    let date = chrono::NaiveDate::from_ymd_opt(2024, 10, 3);
    let mut kinds = Vec::new();
    let view = client
        .run(date, |event, _view| kinds.push(event.kind()))
        .await
        .unwrap();

    assert_eq!(kinds.first(), Some(&"workflow-start"));
    assert_eq!(kinds.last(), Some(&"finish"));
    assert_eq!(kinds.len(), 9);
    assert_eq!(view.outcome, Some(RunOutcome::Finished));
    assert_eq!(view.result_text, "今日の開発トピックです");
    assert_eq!(view.audio.unwrap().mime_type(), "audio/wav");

    let body = captured.lock().unwrap().clone().unwrap();
    assert_eq!(body["target_date"], "2024-10-03");
}

#[tokio::test]
async fn test_http_error_status() {
    let app = Router::new().route(
        "/workflow",
        post(|| async { (StatusCode::NOT_FOUND, axum::Json(json!({"error": "Workflow not found"}))) }),
    );
    let base = spawn(app).await;

    let err = WorkflowClient::new(base).run(None, |_, _| {}).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("404"), "got: {message}");
    assert!(message.contains("Workflow not found"));
}
