//! Pipeline event protocol.
//!
//! Every event is serialized as one JSON object per line:
//! `{"type": "<kind>", "payload": {...}}`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::audio::AudioPayload;

/// Identifier of the only workflow the gateway serves.
pub const DEVELOPER_HOT_TOPIC_WORKFLOW: &str = "developer-hot-topic-workflow";

/// The two pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepId {
    #[serde(rename = "generate-hot-topic")]
    GenerateHotTopic,
    #[serde(rename = "tts")]
    Tts,
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::GenerateHotTopic => "generate-hot-topic",
            StepId::Tts => "tts",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Success,
    Failed,
}

/// Output of a step as carried by `step-result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutput {
    pub topics_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<AudioPayload>,
}

/// A workflow progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum PipelineEvent {
    /// Written by the relay before the runner starts.
    #[serde(rename_all = "camelCase")]
    WorkflowStart { workflow_id: String },

    #[serde(rename_all = "camelCase")]
    Start { run_id: String },

    StepStart { id: StepId },

    StepResult {
        id: StepId,
        status: StepStatus,
        output: StepOutput,
    },

    StepFinish { id: StepId },

    #[serde(rename_all = "camelCase")]
    Finish { run_id: String, status: StepStatus },

    /// A step failed; the run is over.
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<StepId>,
    },

    /// The relay itself failed (runner crashed, nothing else to report).
    WorkflowError { error: String },
}

impl PipelineEvent {
    /// Wire discriminant.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::WorkflowStart { .. } => "workflow-start",
            PipelineEvent::Start { .. } => "start",
            PipelineEvent::StepStart { .. } => "step-start",
            PipelineEvent::StepResult { .. } => "step-result",
            PipelineEvent::StepFinish { .. } => "step-finish",
            PipelineEvent::Finish { .. } => "finish",
            PipelineEvent::Error { .. } => "error",
            PipelineEvent::WorkflowError { .. } => "workflow-error",
        }
    }

    /// `finish`, `error` and `workflow-error` end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::Finish { .. }
                | PipelineEvent::Error { .. }
                | PipelineEvent::WorkflowError { .. }
        )
    }

    /// Serialize as one NDJSON line (trailing `\n` included).
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
