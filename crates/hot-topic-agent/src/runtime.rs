//! Agent runtime loop: orchestrates LLM streaming + tool calling.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use hot_topic_core::config::Config;
use hot_topic_core::session::{Conversation, TranscriptEntry, Usage};
use hot_topic_core::types::ContentBlock;
use hot_topic_providers::{CompletionRequest, Credentials, LlmProvider, ToolDefinition};
use hot_topic_tools::{ToolContext, ToolOutput, ToolRegistry};

use crate::{AgentErrorKind, AgentEvent, AgentRunError, AgentRunMeta, AgentRunResult};

/// Per-run model parameters.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub max_iterations: u32,
    pub system_prompt: String,
}

impl AgentSettings {
    pub fn from_config(config: &Config, system_prompt: String) -> Self {
        Self {
            model: config.agent_model(),
            max_tokens: config.max_tokens(),
            temperature: config.temperature(),
            max_iterations: config.max_tool_iterations(),
            system_prompt,
        }
    }
}

struct RunCounters {
    start: Instant,
    input_tokens: u64,
    output_tokens: u64,
    tool_calls: u32,
    iterations: u32,
}

impl RunCounters {
    fn finish(
        &self,
        text: Option<String>,
        stop_reason: Option<String>,
        error: Option<AgentRunError>,
    ) -> AgentRunResult {
        AgentRunResult {
            text,
            meta: AgentRunMeta {
                duration_ms: self.start.elapsed().as_millis() as u64,
                input_tokens: self.input_tokens,
                output_tokens: self.output_tokens,
                tool_calls: self.tool_calls,
                iterations: self.iterations,
                stop_reason,
                error,
            },
        }
    }
}

fn provider_failure(
    counters: &RunCounters,
    event_tx: &mpsc::UnboundedSender<AgentEvent>,
    message: String,
) -> AgentRunResult {
    let _ = event_tx.send(AgentEvent::Error {
        kind: "provider_error".into(),
        message: message.clone(),
    });
    counters.finish(
        None,
        None,
        Some(AgentRunError {
            kind: AgentErrorKind::ProviderError,
            message,
        }),
    )
}

/// Run the agent loop: stream LLM, execute tools, emit events.
#[allow(clippy::too_many_arguments)]
pub async fn run_agent(
    conversation: &mut Conversation,
    prompt: &str,
    settings: &AgentSettings,
    run_id: &str,
    config: &Arc<Config>,
    tools: &ToolRegistry,
    provider: &dyn LlmProvider,
    credentials: &Credentials,
    event_tx: mpsc::UnboundedSender<AgentEvent>,
) -> anyhow::Result<AgentRunResult> {
    let mut counters = RunCounters {
        start: Instant::now(),
        input_tokens: 0,
        output_tokens: 0,
        tool_calls: 0,
        iterations: 0,
    };

    conversation.push_user_text(prompt);

    let tool_defs = if tools.is_empty() {
        None
    } else {
        let definitions: Vec<ToolDefinition> = tools
            .tools()
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters_schema: t.parameters_schema(),
            })
            .collect();
        Some(provider.format_tools(&definitions))
    };

    let tool_context = ToolContext::new(run_id, config.clone());

    for iteration in 0..settings.max_iterations {
        counters.iterations = iteration + 1;
        debug!(run_id, iteration, "Agent loop iteration");

        let request = CompletionRequest {
            model: settings.model.clone(),
            messages: provider.format_messages(&conversation.transcript),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            tools: tool_defs.clone(),
            system: Some(settings.system_prompt.clone()),
        };

        let stream = match provider.stream(&request, credentials).await {
            Ok(s) => s,
            Err(e) => {
                error!(run_id, %e, "Provider stream error");
                return Ok(provider_failure(&counters, &event_tx, e.to_string()));
            }
        };

        let mut stream = std::pin::pin!(stream);
        let mut response_text = String::new();
        let mut tool_uses: Vec<(String, String, serde_json::Value)> = Vec::new(); // (id, name, input)
        let mut stop_reason = None;

        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(e) => {
                    error!(run_id, %e, "Stream chunk error");
                    return Ok(provider_failure(&counters, &event_tx, e.to_string()));
                }
            };

            if let Some(delta) = chunk.delta {
                response_text.push_str(&delta);
                let _ = event_tx.send(AgentEvent::PartialReply { delta });
            }

            if let Some(tool_use) = chunk.tool_use {
                let input: serde_json::Value =
                    serde_json::from_str(&tool_use.input_json).unwrap_or(json!({}));
                tool_uses.push((tool_use.id, tool_use.name, input));
            }

            if let Some(usage) = chunk.usage {
                if let Some(inp) = usage.input_tokens {
                    counters.input_tokens += inp;
                }
                if let Some(out) = usage.output_tokens {
                    counters.output_tokens += out;
                }
            }

            if chunk.stop_reason.is_some() {
                stop_reason = chunk.stop_reason;
            }
        }

        let mut assistant_content: Vec<ContentBlock> = Vec::new();
        if !response_text.is_empty() {
            assistant_content.push(ContentBlock::Text {
                text: response_text.clone(),
            });
        }
        for (id, name, input) in &tool_uses {
            assistant_content.push(ContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            });
        }

        conversation.append(TranscriptEntry::Assistant {
            content: assistant_content,
            usage: Some(Usage {
                input_tokens: counters.input_tokens,
                output_tokens: counters.output_tokens,
            }),
            timestamp: Utc::now(),
        });

        let _ = event_tx.send(AgentEvent::Usage {
            input_tokens: counters.input_tokens,
            output_tokens: counters.output_tokens,
        });

        let is_tool_use = stop_reason
            .as_deref()
            .is_some_and(|r| provider.is_tool_use_stop(r));

        if !is_tool_use || tool_uses.is_empty() {
            let _ = event_tx.send(AgentEvent::BlockReply {
                text: response_text.clone(),
                is_final: true,
            });
            let text = Some(response_text).filter(|t| !t.trim().is_empty());
            return Ok(counters.finish(text, stop_reason, None));
        }

        for (id, name, input) in tool_uses {
            counters.tool_calls += 1;
            info!(run_id, tool = %name, "Executing tool");
            let _ = event_tx.send(AgentEvent::ToolCall {
                tool: name.clone(),
                params: input.clone(),
            });

            let tool_output = match tools.get(&name) {
                Some(tool) => match tool.execute(input, &tool_context).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(run_id, %e, tool = %name, "Tool execution error");
                        ToolOutput {
                            content: format!("Tool error: {e}"),
                            is_error: true,
                        }
                    }
                },
                None => ToolOutput {
                    content: format!("Unknown tool: {name}"),
                    is_error: true,
                },
            };

            let _ = event_tx.send(AgentEvent::ToolResult {
                tool: name.clone(),
                content: tool_output.content.clone(),
                is_error: tool_output.is_error,
            });

            conversation.append(TranscriptEntry::ToolResult {
                tool_use_id: id,
                tool: name,
                content: tool_output.content,
                is_error: tool_output.is_error,
                timestamp: Utc::now(),
            });
        }
    }

    warn!(run_id, max_iterations = settings.max_iterations, "Agent hit the tool iteration limit");
    let message = format!(
        "no final answer after {} tool iterations",
        settings.max_iterations
    );
    let _ = event_tx.send(AgentEvent::Error {
        kind: "iteration_limit".into(),
        message: message.clone(),
    });
    Ok(counters.finish(
        None,
        None,
        Some(AgentRunError {
            kind: AgentErrorKind::IterationLimit,
            message,
        }),
    ))
}
