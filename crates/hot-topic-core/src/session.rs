//! In-memory conversation for a single agent run.
//!
//! Nothing here is persisted: a [`Conversation`] is created per pipeline run
//! and dropped with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ContentBlock;

/// A single entry in the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TranscriptEntry {
    #[serde(rename = "user")]
    User {
        content: Vec<ContentBlock>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "assistant")]
    Assistant {
        content: Vec<ContentBlock>,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        tool: String,
        content: String,
        is_error: bool,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Per-run conversation memory.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    pub transcript: Vec<TranscriptEntry>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: TranscriptEntry) {
        self.transcript.push(entry);
    }

    pub fn push_user_text(&mut self, text: &str) {
        self.append(TranscriptEntry::User {
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
            timestamp: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    /// Number of tool results recorded so far.
    pub fn tool_result_count(&self) -> usize {
        self.transcript
            .iter()
            .filter(|e| matches!(e, TranscriptEntry::ToolResult { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_user_text() {
        let mut conv = Conversation::new();
        assert!(conv.is_empty());
        conv.push_user_text("今日の開発関連トピックを調べて教えて");
        assert_eq!(conv.len(), 1);
        match &conv.transcript[0] {
            TranscriptEntry::User { content, .. } => match &content[0] {
                ContentBlock::Text { text } => assert!(text.contains("開発関連")),
                other => panic!("unexpected block: {other:?}"),
            },
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_transcript_entry_tagged_serialization() {
        let entry = TranscriptEntry::ToolResult {
            tool_use_id: "call_1".into(),
            tool: "live_search".into(),
            content: "ok".into(),
            is_error: false,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool"], "live_search");
    }
}
