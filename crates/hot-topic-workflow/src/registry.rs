//! Workflow lookup by id.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use hot_topic_agent::TopicAgent;
use hot_topic_core::config::Config;
use hot_topic_core::error::Result;
use hot_topic_core::events::DEVELOPER_HOT_TOPIC_WORKFLOW;
use hot_topic_tts::GoogleTtsClient;

use crate::error::LookupError;
use crate::runner::PipelineRunner;

type Factory = Box<dyn Fn() -> Result<Arc<PipelineRunner>> + Send + Sync>;

/// Maps workflow ids to factories. Runners are built on lookup, so
/// initialization problems surface per request rather than at startup.
#[derive(Default)]
pub struct WorkflowRegistry {
    factories: HashMap<String, Factory>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<PipelineRunner>> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
    }

    /// Register an already built runner under its own id.
    pub fn register_runner(&mut self, runner: Arc<PipelineRunner>) {
        let id = runner.id().to_string();
        self.register(id, move || Ok(runner.clone()));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn get(&self, id: &str) -> std::result::Result<Arc<PipelineRunner>, LookupError> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| LookupError::NotFound(id.to_string()))?;
        debug!(workflow = id, "Building workflow");
        Ok(factory()?)
    }
}

/// The production workflow: Topic Agent over xAI, then Google TTS.
pub fn build_hot_topic_workflow(config: Arc<Config>) -> Result<PipelineRunner> {
    let agent = TopicAgent::from_config(config.clone())?;
    let synthesizer = GoogleTtsClient::from_config(&config);
    Ok(PipelineRunner::new(
        DEVELOPER_HOT_TOPIC_WORKFLOW,
        Arc::new(agent),
        Arc::new(synthesizer),
    ))
}

/// Registry with the developer hot-topic workflow.
pub fn default_registry(config: Arc<Config>) -> WorkflowRegistry {
    let mut registry = WorkflowRegistry::new();
    registry.register(DEVELOPER_HOT_TOPIC_WORKFLOW, move || {
        build_hot_topic_workflow(config.clone()).map(Arc::new)
    });
    registry
}
