use thiserror::Error;

use hot_topic_core::error::HotTopicError;
use hot_topic_core::events::StepId;

/// Why a pipeline run did not complete.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("step '{step}' failed: {message}")]
    StepFailed { step: StepId, message: String },

    #[error("run cancelled during step '{step}'")]
    Cancelled { step: StepId },
}

impl WorkflowError {
    pub fn step(&self) -> StepId {
        match self {
            WorkflowError::StepFailed { step, .. } | WorkflowError::Cancelled { step } => *step,
        }
    }
}

/// Why the registry could not hand out a runner.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Failed to initialize workflow: {0}")]
    Init(#[from] HotTopicError),
}
