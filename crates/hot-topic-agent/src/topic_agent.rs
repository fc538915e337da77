//! The developer hot-topic agent: persona + live search over xAI.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use hot_topic_core::config::Config;
use hot_topic_core::error::{HotTopicError, Result};
use hot_topic_core::session::Conversation;
use hot_topic_core::types::{TopicQuery, today};
use hot_topic_providers::openai::OpenAiProvider;
use hot_topic_providers::{Credentials, LlmProvider};
use hot_topic_tools::ToolRegistry;

use crate::prompt::build_system_prompt;
use crate::runtime::{AgentSettings, run_agent};
use crate::AgentEvent;

pub struct TopicAgent {
    config: Arc<Config>,
    provider: Arc<dyn LlmProvider>,
    credentials: Credentials,
    tools: Arc<ToolRegistry>,
}

impl TopicAgent {
    /// Build the production agent. Fails when no LLM key is configured.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let api_key = config.agent_api_key().ok_or_else(|| {
            HotTopicError::Config(
                "no LLM credentials: set agent.api_key or XAI_API_KEY".to_string(),
            )
        })?;
        let provider = Arc::new(OpenAiProvider::xai(Some(&config.agent_base_url())));
        let tools = Arc::new(ToolRegistry::with_live_search(&config));
        Ok(Self::new(config, provider, Credentials::api_key(api_key), tools))
    }

    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn LlmProvider>,
        credentials: Credentials,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            config,
            provider,
            credentials,
            tools,
        }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Produce the narration text for `query`. Each call starts a fresh conversation.
    pub async fn generate(&self, query: &TopicQuery, run_id: &str) -> anyhow::Result<String> {
        let system_prompt = build_system_prompt(self.config.persona(), &self.tools, today());
        let settings = AgentSettings::from_config(&self.config, system_prompt);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let drain = tokio::spawn(log_agent_events(run_id.to_string(), event_rx));

        let mut conversation = Conversation::new();
        let result = run_agent(
            &mut conversation,
            &query.prompt(),
            &settings,
            run_id,
            &self.config,
            &self.tools,
            self.provider.as_ref(),
            &self.credentials,
            event_tx,
        )
        .await;
        let _ = drain.await;
        let result = result?;

        info!(
            run_id,
            duration_ms = result.meta.duration_ms,
            tool_calls = result.meta.tool_calls,
            input_tokens = result.meta.input_tokens,
            output_tokens = result.meta.output_tokens,
            "Topic agent finished"
        );

        if let Some(error) = result.meta.error {
            anyhow::bail!("topic agent failed ({:?}): {}", error.kind, error.message);
        }
        result
            .text
            .ok_or_else(|| anyhow::anyhow!("topic agent returned no text"))
    }
}

async fn log_agent_events(run_id: String, mut rx: mpsc::UnboundedReceiver<AgentEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            AgentEvent::ToolCall { tool, params } => {
                debug!(run_id = %run_id, %tool, %params, "Agent tool call");
            }
            AgentEvent::ToolResult { tool, is_error, content } => {
                debug!(run_id = %run_id, %tool, is_error, len = content.len(), "Agent tool result");
            }
            AgentEvent::Error { kind, message } => {
                debug!(run_id = %run_id, %kind, %message, "Agent error");
            }
            AgentEvent::PartialReply { .. } | AgentEvent::BlockReply { .. } | AgentEvent::Usage { .. } => {}
        }
    }
}
