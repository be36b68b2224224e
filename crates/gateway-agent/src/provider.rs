//! Provider-agnostic request/response vocabulary (C4, §4.3's left column).
//!
//! [`ModelProvider`] is the seam between the tool loop in [`crate::runtime`]
//! and a concrete vendor SDK. A provider speaks [`LlmMessage`] in,
//! [`ProviderEvent`] out — one round of a single HTTP call. It never sees a
//! tool's result; the runtime executes tools and feeds the result back as a
//! new [`LlmMessage`] for the next round.
//!
//! Generalized from a single hardcoded vendor dialect to a vendor-neutral
//! shape: a message/content-block/delta/stop stream becomes [`ProviderEvent`]
//! with the tool-call-arg-delta variant dropped (§4.3 — it is buffered
//! inside the provider and never forwarded).

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The role a [`LlmMessage`] plays in the wire conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A completed tool call carried on an assistant [`LlmMessage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRef {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One message in the provider-facing conversation. Distinct from
/// [`gateway_store::Message`]: that type is the persisted session record;
/// this one is the wire shape a round-trip to the model actually sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), tool_calls: Vec::new(), tool_call_id: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), tool_calls: Vec::new(), tool_call_id: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), tool_calls: Vec::new(), tool_call_id: None }
    }

    pub fn assistant_tool_call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: vec![ToolCallRef { id: id.into(), name: name.into(), arguments }],
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A tool's name/description/schema, as sent to the provider. Distinct from
/// [`gateway_kernel::ToolDefinition`] (the registry entry) so this crate's
/// wire shape doesn't leak the registry's toolset tagging to the vendor API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Per-round knobs. `max_tokens` bounds one provider response, not the
/// whole turn.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

/// One round's events, normalized from the vendor's native SSE dialect.
/// Never includes a tool's result — only [`crate::runtime`] produces that,
/// after executing the handler.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
    ToolCallStart { tool_call_id: String, tool_name: String },
    /// `input` is the complete, parsed arguments object — accumulation of
    /// the vendor's own arg-delta stream happens inside the provider and is
    /// never surfaced past this event (§4.3).
    ToolCallEnd { tool_call_id: String, tool_name: String, input: Value },
    /// The vendor reported a terminal error for this round.
    ProviderError { message: String },
    /// This round's response finished; `stop_reason` is the vendor's raw
    /// reason string (e.g. `"end_turn"`, `"tool_use"`), kept for logging —
    /// the runtime decides whether to continue the loop from whether any
    /// `ToolCallEnd` was seen this round, not from this string.
    RoundEnd { stop_reason: Option<String> },
}

pub type EventStream = Pin<Box<dyn Stream<Item = ProviderEvent> + Send>>;

/// A single LLM vendor integration. One HTTP round trip per `run_stream`
/// call; [`crate::runtime::NativeAgentRuntime`] drives repeated calls to
/// build the full ReAct loop.
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    async fn run_stream(
        &self,
        messages: &[LlmMessage],
        tools: &[ToolSchema],
        settings: &ModelSettings,
    ) -> crate::error::Result<EventStream>;
}
