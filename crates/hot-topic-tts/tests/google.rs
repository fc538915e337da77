//! Google TTS client against a local stub.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use serde_json::{Value, json};

use hot_topic_core::config::{Config, TtsConfig};
use hot_topic_tts::{GoogleTtsClient, SpeechSynthesizer};

/// "RIFF....WAVE" followed by padding.
const WAV_B64: &str = "UklGRiQAAABXQVZFZm10IBAAAAABAAEAwF0AAIC7AAACABAAZGF0YQAAAAA=";

#[derive(Clone, Default)]
struct Captured {
    key: Arc<Mutex<Option<String>>>,
    body: Arc<Mutex<Option<Value>>>,
}

async fn synthesize(
    State(captured): State<Captured>,
    Query(query): Query<HashMap<String, String>>,
    axum::Json(body): axum::Json<Value>,
) -> impl IntoResponse {
    *captured.key.lock().unwrap() = query.get("key").cloned();
    *captured.body.lock().unwrap() = Some(body);
    axum::Json(json!({ "audioContent": WAV_B64 }))
}

async fn empty_audio() -> impl IntoResponse {
    axum::Json(json!({ "audioContent": "" }))
}

async fn server_error() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "quota")
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str) -> GoogleTtsClient {
    let config = Config {
        tts: Some(TtsConfig {
            base_url: Some(base.to_string()),
            api_key: Some("g-key".into()),
            speaking_rate: Some(1.1),
            ..TtsConfig::default()
        }),
        ..Config::default()
    };
    GoogleTtsClient::from_config(&config)
}

#[tokio::test]
async fn test_synthesize_returns_wav_payload() {
    let captured = Captured::default();
    let app = Router::new()
        .route("/v1/text:synthesize", post(synthesize))
        .with_state(captured.clone());
    let base = spawn(app).await;

    let audio = client(&base).synthesize("今日のトピックです").await.unwrap();
    assert_eq!(audio.mime_type(), "audio/wav");
    assert!(!audio.is_empty());

    assert_eq!(captured.key.lock().unwrap().as_deref(), Some("g-key"));
    let body = captured.body.lock().unwrap().clone().unwrap();
    assert_eq!(body["input"]["text"], "今日のトピックです");
    assert_eq!(body["voice"]["name"], "ja-JP-Neural2-D");
    assert_eq!(body["audioConfig"]["speakingRate"], 1.1);
}

#[tokio::test]
async fn test_empty_audio_is_fault() {
    let app = Router::new().route("/v1/text:synthesize", post(empty_audio));
    let base = spawn(app).await;
    assert!(client(&base).synthesize("text").await.is_err());
}

#[tokio::test]
async fn test_error_status_is_fault() {
    let app = Router::new().route("/v1/text:synthesize", post(server_error));
    let base = spawn(app).await;
    let err = client(&base).synthesize("text").await.unwrap_err().to_string();
    assert!(err.contains("500"), "got: {err}");
}
