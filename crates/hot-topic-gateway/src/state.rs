//! Gateway shared state.

use std::sync::Arc;

use hot_topic_core::config::{Config, EnvironmentFlags};
use hot_topic_workflow::{WorkflowRegistry, default_registry};

/// Shared state handed to every request handler.
pub struct GatewayState {
    pub config: Arc<Config>,
    pub workflows: WorkflowRegistry,
    pub env: EnvironmentFlags,
}

impl GatewayState {
    pub fn new(config: Arc<Config>, workflows: WorkflowRegistry) -> Self {
        Self {
            config,
            workflows,
            env: EnvironmentFlags::from_env(),
        }
    }

    /// State with the production workflow registered.
    pub fn from_config(config: Arc<Config>) -> Self {
        let workflows = default_registry(config.clone());
        Self::new(config, workflows)
    }

    pub fn with_env(mut self, env: EnvironmentFlags) -> Self {
        self.env = env;
        self
    }
}
