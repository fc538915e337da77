//! The developer hot-topic workflow.
//!
//! A [`PipelineRunner`] executes exactly two steps in order,
//! `generate-hot-topic` then `tts`, and reports progress as
//! [`PipelineEvent`](hot_topic_core::events::PipelineEvent)s. The
//! [`WorkflowRegistry`] resolves workflow ids to runners for the gateway.

use async_trait::async_trait;

use hot_topic_core::types::TopicQuery;

pub mod error;
pub mod registry;
pub mod runner;
pub mod steps;

pub use error::{LookupError, WorkflowError};
pub use hot_topic_tts::SpeechSynthesizer;
pub use registry::{WorkflowRegistry, build_hot_topic_workflow, default_registry};
pub use runner::{PipelineRunner, RunState, WorkflowOutput};

/// First step: produce the narration text for a query.
#[async_trait]
pub trait TopicGenerator: Send + Sync {
    async fn generate(&self, query: &TopicQuery, run_id: &str) -> anyhow::Result<String>;
}
