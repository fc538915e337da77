//! Agent runtime: orchestrates LLM interactions with tool-calling loops.
//!
//! [`run_agent`] streams the model response, executes tool calls, and reports
//! progress as [`AgentEvent`]s. [`TopicAgent`] wraps it with the developer
//! hot-topic persona and the live search tool.

use serde::{Deserialize, Serialize};

pub mod prompt;
pub mod runtime;
pub mod topic_agent;

pub use runtime::{AgentSettings, run_agent};
pub use topic_agent::TopicAgent;

/// Progress of one agent run, drained by [`TopicAgent`] into the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Final assistant text.
    BlockReply { text: String, is_final: bool },

    /// A tool call is being made.
    ToolCall {
        tool: String,
        params: serde_json::Value,
    },

    /// A tool call has completed.
    ToolResult {
        tool: String,
        content: String,
        is_error: bool,
    },

    /// Streaming text delta.
    PartialReply { delta: String },

    /// Token usage for the current run.
    Usage {
        input_tokens: u64,
        output_tokens: u64,
    },

    /// An error occurred during the run.
    Error { kind: String, message: String },
}

/// Result of a completed agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunResult {
    pub text: Option<String>,
    pub meta: AgentRunMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRunMeta {
    pub duration_ms: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub tool_calls: u32,
    pub iterations: u32,
    pub stop_reason: Option<String>,
    pub error: Option<AgentRunError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunError {
    pub kind: AgentErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentErrorKind {
    ProviderError,
    IterationLimit,
}
