//! The tagged-union message type persisted in a [`crate::session::ConversationSession`].
//!
//! Four variants, order-significant, with one cross-cutting invariant: a
//! `ToolCall` and its matching `ToolReturn` (same `tool_call_id`) always
//! travel together through truncation and summarization. Neither the
//! registry nor the runtime ever retains one without the other.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in a conversation's message list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    User {
        content: String,
        timestamp: i64,
    },
    AssistantText {
        content: String,
        timestamp: i64,
    },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        arguments: Value,
        timestamp: i64,
    },
    ToolReturn {
        tool_call_id: String,
        tool_name: String,
        result: Value,
        status: ToolReturnStatus,
        timestamp: i64,
    },
}

/// Outcome recorded on a [`Message::ToolReturn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolReturnStatus {
    Ok,
    NoResult,
    Error,
    Degraded,
    Partial,
}

impl Message {
    /// Timestamp shared by every variant.
    pub fn timestamp(&self) -> i64 {
        match self {
            Message::User { timestamp, .. }
            | Message::AssistantText { timestamp, .. }
            | Message::ToolCall { timestamp, .. }
            | Message::ToolReturn { timestamp, .. } => *timestamp,
        }
    }

    /// The `tool_call_id` this message carries, if any.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Message::ToolCall { tool_call_id, .. } | Message::ToolReturn { tool_call_id, .. } => {
                Some(tool_call_id)
            }
            _ => None,
        }
    }

    /// Whether this message is a `tool_call` or `tool_return` half of a pair.
    pub fn is_tool_half(&self) -> bool {
        matches!(self, Message::ToolCall { .. } | Message::ToolReturn { .. })
    }
}
