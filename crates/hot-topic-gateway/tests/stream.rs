//! End-to-end: a real listener, the Rust stream consumer, and raw reqwest.

use std::sync::Arc;

use hot_topic_client::{RunOutcome, WorkflowClient};
use hot_topic_core::config::Config;

mod common;
use common::{DateEcho, FailingSynth, registry_with, spawn_gateway, state_with, working_state};

#[tokio::test]
async fn test_client_receives_text_and_audio() {
    let base = spawn_gateway(working_state()).await;

    let mut statuses = Vec::new();
    let view = WorkflowClient::new(&base)
        .run(chrono::NaiveDate::from_ymd_opt(2024, 10, 3), |_, view| {
            statuses.push(view.status.clone());
        })
        .await
        .unwrap();

    assert_eq!(view.outcome, Some(RunOutcome::Finished));
    assert!(view.result_text.contains("2024-10-03"));
    assert_eq!(view.audio.as_ref().unwrap().mime_type(), "audio/wav");
    assert_eq!(statuses.first().map(String::as_str), Some("ワークフロー開始..."));
    assert!(statuses.iter().any(|s| s == "実行中: tts"));
    assert_eq!(statuses.last().map(String::as_str), Some("ワークフロー完了！"));
}

#[tokio::test]
async fn test_client_sees_step_failure() {
    let state = state_with(
        registry_with(Arc::new(DateEcho), Arc::new(FailingSynth)),
        Config::default(),
    );
    let base = spawn_gateway(state).await;

    let view = WorkflowClient::new(&base).run(None, |_, _| {}).await.unwrap();
    match view.outcome {
        Some(RunOutcome::Failed(error)) => assert!(error.contains("503")),
        other => panic!("expected failure, got {other:?}"),
    }
    // The text step finished before synthesis failed.
    assert!(view.result_text.starts_with("話題"));
    assert!(view.audio.is_none());
}

#[tokio::test]
async fn test_cors_header_on_stream() {
    let base = spawn_gateway(working_state()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/workflow"))
        .header("origin", "http://example.test")
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    let body = response.text().await.unwrap();
    assert!(body.ends_with('\n'));
    assert_eq!(body.lines().count(), 9);
}
