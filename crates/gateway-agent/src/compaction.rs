//! Progressive summarization (§4.2.1) — the optional second stage that runs
//! after [`gateway_store::truncate_messages`] drops a prefix of a
//! conversation's history. Only ever invoked on the dropped prefix, never on
//! the kept tail, and always through the fast-model tier — summarization is
//! the one place a second model tier is allowed to exist (§12 Open Question
//! #1); it must never be used to route ordinary turns by content.
//!
//! Uses a fixed summarizer prompt and a format-then-ask-the-model shape,
//! narrowed to operate on just the dropped prefix rather than the whole
//! history.

use std::sync::Arc;

use tracing::debug;

use crate::error::{AgentError, Result};
use crate::provider::{EventStream, LlmMessage, ModelProvider, ModelSettings};
use gateway_store::Message;
use tokio_stream::StreamExt;

/// Length cap on a progressive summary, in estimated tokens (§4.2.1 default).
const DEFAULT_MAX_SUMMARY_TOKENS: u32 = 1024;

/// Summarizes a truncation pass's dropped message prefix using a dedicated
/// (typically cheaper/faster) model tier.
pub struct ProgressiveSummarizer {
    provider: Arc<dyn ModelProvider>,
    fast_model: String,
    max_summary_tokens: u32,
}

impl ProgressiveSummarizer {
    pub fn new(provider: Arc<dyn ModelProvider>, fast_model: impl Into<String>) -> Self {
        Self { provider, fast_model: fast_model.into(), max_summary_tokens: DEFAULT_MAX_SUMMARY_TOKENS }
    }

    #[must_use]
    pub fn with_max_summary_tokens(mut self, max_summary_tokens: u32) -> Self {
        self.max_summary_tokens = max_summary_tokens;
        self
    }

    /// Summarize a dropped message prefix. The caller is responsible for
    /// prepending the result as the two synthetic context/acknowledgement
    /// messages described in §4.2.1 — this just produces the summary text.
    pub async fn summarize(&self, dropped: &[Message]) -> Result<String> {
        let conversation_text = format_messages_for_summary(dropped);

        let prompt = format!(
            "Summarize the following conversation excerpt concisely, preserving key facts, \
             decisions, tool results, and any context needed to continue the conversation. \
             Be factual and brief.\n\n{conversation_text}"
        );

        let settings = ModelSettings { model: self.fast_model.clone(), temperature: Some(0.0), max_tokens: self.max_summary_tokens };
        let messages = vec![LlmMessage::user(prompt)];

        debug!(model = %self.fast_model, dropped = dropped.len(), "requesting progressive summary");

        let stream = self.provider.run_stream(&messages, &[], &settings).await?;
        collect_text(stream).await
    }
}

/// Drain a provider stream that is known to carry only text (no tools were
/// offered) into its accumulated text, surfacing the provider's own error
/// event as an [`AgentError`].
async fn collect_text(mut stream: EventStream) -> Result<String> {
    use crate::provider::ProviderEvent;

    let mut text = String::new();
    while let Some(event) = stream.next().await {
        match event {
            ProviderEvent::TextDelta { delta, .. } => text.push_str(&delta),
            ProviderEvent::ProviderError { message } => {
                return Err(AgentError::ProviderStreamError { reason: message });
            }
            ProviderEvent::RoundEnd { .. } => break,
            _ => {}
        }
    }
    Ok(text)
}

/// Format a slice of persisted messages into a human-readable text block
/// suitable for summarization.
fn format_messages_for_summary(messages: &[Message]) -> String {
    let mut buf = String::with_capacity(messages.len() * 80);
    for message in messages {
        match message {
            Message::User { content, .. } => {
                buf.push_str("User: ");
                buf.push_str(content);
                buf.push('\n');
            }
            Message::AssistantText { content, .. } => {
                buf.push_str("Assistant: ");
                buf.push_str(content);
                buf.push('\n');
            }
            Message::ToolCall { tool_name, arguments, .. } => {
                buf.push_str(&format!("  [tool_call: {tool_name}({arguments})]\n"));
            }
            Message::ToolReturn { tool_name, result, .. } => {
                buf.push_str(&format!("  [tool_return: {tool_name} -> {result}]\n"));
            }
        }
    }
    buf
}
