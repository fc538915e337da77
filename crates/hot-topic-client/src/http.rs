//! Streaming HTTP client for `POST /workflow`.

use chrono::NaiveDate;
use futures::StreamExt;
use serde_json::json;
use tracing::{debug, info};

use hot_topic_core::events::PipelineEvent;
use hot_topic_core::types::DATE_FORMAT;

use crate::decoder::NdjsonDecoder;
use crate::view::RunView;

pub struct WorkflowClient {
    base_url: String,
    client: reqwest::Client,
}

impl WorkflowClient {
    /// `base_url` is the gateway root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn workflow_url(&self) -> String {
        format!("{}/workflow", self.base_url)
    }

    /// Start a run and consume its stream to the end.
    ///
    /// `on_event` sees every parsed event after it was applied to the view.
    /// A non-success HTTP status is an error; failures reported inside the
    /// stream end up in [`RunView::outcome`].
    pub async fn run<F>(&self, target_date: Option<NaiveDate>, mut on_event: F) -> anyhow::Result<RunView>
    where
        F: FnMut(&PipelineEvent, &RunView),
    {
        let body = match target_date {
            Some(date) => json!({ "target_date": date.format(DATE_FORMAT).to_string() }),
            None => json!({}),
        };
        let url = self.workflow_url();
        info!(%url, ?target_date, "Starting workflow");

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP error! status: {status}: {text}");
        }

        let mut view = RunView::new();
        let mut decoder = NdjsonDecoder::new();
        let mut bytes = response.bytes_stream();
        while let Some(chunk) = bytes.next().await {
            for line in decoder.push(&chunk?) {
                if let Some(event) = view.apply_line(&line) {
                    on_event(&event, &view);
                }
            }
        }
        if let Some(line) = decoder.finish() {
            if let Some(event) = view.apply_line(&line) {
                on_event(&event, &view);
            }
        }

        debug!(outcome = ?view.outcome, "Workflow stream ended");
        Ok(view)
    }
}
