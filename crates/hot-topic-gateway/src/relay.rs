//! NDJSON relay between a pipeline run and one HTTP response.
//!
//! The response body is fed from an unbounded channel. `workflow-start` is
//! queued before the runner is spawned, runner events are forwarded in order,
//! and at most one terminal event reaches the client. Dropping the body (the
//! client went away) cancels the run.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use hot_topic_core::events::PipelineEvent;
use hot_topic_core::types::TopicQuery;
use hot_topic_workflow::{PipelineRunner, WorkflowError};

/// Start `runner` for `query` and stream its events as the response body.
pub fn stream_run(runner: Arc<PipelineRunner>, query: TopicQuery) -> Response {
    let (tx, rx) = mpsc::unbounded_channel::<PipelineEvent>();
    let cancel = CancellationToken::new();

    let _ = tx.send(PipelineEvent::WorkflowStart {
        workflow_id: runner.id().to_string(),
    });
    tokio::spawn(forward_run(runner, query, tx, cancel.clone()));

    let guard = cancel.drop_guard();
    let body = UnboundedReceiverStream::new(rx).map(move |event| {
        let _cancel_on_drop = &guard;
        debug!(kind = event.kind(), "Relaying event");
        event.to_ndjson().map(Bytes::from)
    });

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

/// Run the pipeline and forward its events to `out`, enforcing a single
/// terminal event.
async fn forward_run(
    runner: Arc<PipelineRunner>,
    query: TopicQuery,
    out: mpsc::UnboundedSender<PipelineEvent>,
    cancel: CancellationToken,
) {
    let (run_tx, mut run_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move { runner.run(query, run_tx, cancel).await });

    let mut terminated = false;
    while let Some(event) = run_rx.recv().await {
        if terminated {
            warn!(kind = event.kind(), "Dropping event after terminal event");
            continue;
        }
        terminated = event.is_terminal();
        if out.send(event).is_err() {
            debug!("Client disconnected, stopping relay");
            break;
        }
    }
    drop(run_rx);

    let failure = match handle.await {
        Ok(Ok(output)) => {
            info!(run_id = %output.run_id, "Workflow stream completed");
            None
        }
        Ok(Err(WorkflowError::Cancelled { step })) => {
            info!(%step, "Workflow cancelled by client disconnect");
            return;
        }
        Ok(Err(e)) => Some(e.to_string()),
        Err(join_err) => {
            error!(error = %join_err, "Workflow task aborted");
            Some(panic_message(join_err))
        }
    };

    if !terminated {
        let error = failure.unwrap_or_else(|| "workflow ended without a terminal event".into());
        warn!(%error, "Emitting workflow-error");
        let _ = out.send(PipelineEvent::WorkflowError { error });
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Unknown error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use hot_topic_core::audio::AudioPayload;
    use hot_topic_workflow::{SpeechSynthesizer, TopicGenerator};

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct Hanging {
        dropped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl TopicGenerator for Hanging {
        async fn generate(&self, _query: &TopicQuery, _run_id: &str) -> anyhow::Result<String> {
            let _probe = SetOnDrop(self.dropped.clone());
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("too late".into())
        }
    }

    struct Unused;

    #[async_trait]
    impl SpeechSynthesizer for Unused {
        fn id(&self) -> &str {
            "unused"
        }

        async fn synthesize(&self, _text: &str) -> anyhow::Result<AudioPayload> {
            anyhow::bail!("not reached")
        }
    }

    #[tokio::test]
    async fn test_dropping_body_cancels_run() {
        let dropped = Arc::new(AtomicBool::new(false));
        let runner = Arc::new(PipelineRunner::new(
            "test-workflow",
            Arc::new(Hanging {
                dropped: dropped.clone(),
            }),
            Arc::new(Unused),
        ));

        let mut body = stream_run(runner, TopicQuery::default())
            .into_body()
            .into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        let line = std::str::from_utf8(&first).unwrap();
        assert!(line.starts_with(r#"{"type":"workflow-start""#));
        assert!(line.ends_with('\n'));

        // Disconnect once the text step is in flight.
        loop {
            let chunk = body.next().await.unwrap().unwrap();
            if std::str::from_utf8(&chunk).unwrap().contains("step-start") {
                break;
            }
        }
        assert!(!dropped.load(Ordering::SeqCst));
        drop(body);

        for _ in 0..100 {
            if dropped.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("in-flight step was not cancelled");
    }

    #[tokio::test]
    async fn test_cancelled_run_emits_no_terminal() {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = Arc::new(PipelineRunner::new(
            "test-workflow",
            Arc::new(Hanging {
                dropped: Arc::new(AtomicBool::new(false)),
            }),
            Arc::new(Unused),
        ));
        let cancel = CancellationToken::new();
        cancel.cancel();
        forward_run(runner, TopicQuery::default(), tx, cancel).await;

        let lines: Vec<PipelineEvent> = UnboundedReceiverStream::new(rx).collect().await;
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|e| !e.is_terminal()));
    }
}
