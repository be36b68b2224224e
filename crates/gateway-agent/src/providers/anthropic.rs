//! Anthropic Messages API [`ModelProvider`](crate::provider::ModelProvider).
//!
//! Builds the request body with `system` as a top-level field, encodes
//! tool results as user-role content blocks per Anthropic's wire quirk, and
//! parses the response as a line-buffered SSE stream. Adapted from a
//! callback-driven single-response accumulator into a
//! `Stream<Item = ProviderEvent>` so the runtime can relay events as they
//! arrive instead of waiting for the whole round to finish.

use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::provider::{EventStream, LlmMessage, ModelProvider, ModelSettings, ProviderEvent, Role, ToolSchema};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Connection settings for a single Anthropic-compatible endpoint.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ANTHROPIC_BASE_URL.to_owned(),
        }
    }
}

#[derive(Clone)]
pub struct AnthropicProvider {
    config: AnthropicConfig,
    http: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(AgentError::ProviderRequestFailed {
                reason: "missing Anthropic API key".into(),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AgentError::ProviderRequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, http })
    }

    fn build_request_body(&self, messages: &[LlmMessage], tools: &[ToolSchema], settings: &ModelSettings) -> Value {
        let (system, wire_messages) = split_system_message(messages);

        let mut body = json!({
            "model": settings.model,
            "max_tokens": settings.max_tokens,
            "messages": wire_messages,
            "stream": true,
        });

        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if let Some(temp) = settings.temperature {
            body["temperature"] = json!(temp);
        }
        if !tools.is_empty() {
            body["tools"] = json!(tools
                .iter()
                .map(|t| json!({"name": t.name, "description": t.description, "input_schema": t.input_schema}))
                .collect::<Vec<_>>());
        }

        body
    }

    async fn send_request(&self, body: &Value) -> Result<reqwest::Response> {
        let url = format!("{}/v1/messages", self.config.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key).map_err(|e| AgentError::ProviderRequestFailed {
                reason: format!("invalid API key header: {e}"),
            })?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!(url = %url, model = %body["model"], "sending model provider request");

        let resp = self.http.post(&url).headers(headers).json(body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::ProviderRequestFailed {
                reason: format!("API returned {status}: {text}"),
            });
        }
        Ok(resp)
    }
}

#[async_trait::async_trait]
impl ModelProvider for AnthropicProvider {
    async fn run_stream(
        &self,
        messages: &[LlmMessage],
        tools: &[ToolSchema],
        settings: &ModelSettings,
    ) -> Result<EventStream> {
        let body = self.build_request_body(messages, tools, settings);
        let resp = self.send_request(&body).await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            consume_stream(resp, tx).await;
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Split the system message out (Anthropic expects it as a top-level
/// field, not in `messages`) and convert the rest to the Anthropic wire
/// format, including the tool_use/tool_result quirk (§4.3, §11.3).
fn split_system_message(messages: &[LlmMessage]) -> (Option<String>, Vec<Value>) {
    let mut system: Option<String> = None;
    let mut wire_messages: Vec<Value> = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::System => match &mut system {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(&msg.content);
                }
                None => system = Some(msg.content.clone()),
            },
            Role::User => {
                wire_messages.push(json!({"role": "user", "content": msg.content}));
            }
            Role::Assistant => {
                if msg.tool_calls.is_empty() {
                    wire_messages.push(json!({"role": "assistant", "content": msg.content}));
                } else {
                    let mut content: Vec<Value> = Vec::new();
                    if !msg.content.is_empty() {
                        content.push(json!({"type": "text", "text": msg.content}));
                    }
                    for tc in &msg.tool_calls {
                        content.push(json!({"type": "tool_use", "id": tc.id, "name": tc.name, "input": tc.arguments}));
                    }
                    wire_messages.push(json!({"role": "assistant", "content": content}));
                }
            }
            Role::Tool => {
                // Anthropic represents tool results as user messages
                // carrying a `tool_result` content block.
                wire_messages.push(json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": msg.tool_call_id,
                        "content": msg.content,
                    }],
                }));
            }
        }
    }

    (system, wire_messages)
}

/// In-flight state for one `content_block` index while its deltas stream in.
enum BlockState {
    Text,
    Tool { call_id: String, name: String, json: String },
}

async fn consume_stream(resp: reqwest::Response, tx: mpsc::Sender<ProviderEvent>) {
    let mut blocks: HashMap<u32, BlockState> = HashMap::new();
    let mut byte_stream = resp.bytes_stream();
    let mut line_buffer = String::new();
    let mut current_event_type: Option<String> = None;
    let mut stop_reason: Option<String> = None;

    loop {
        let chunk = match byte_stream.next().await {
            Some(Ok(chunk)) => chunk,
            Some(Err(err)) => {
                let _ = tx
                    .send(ProviderEvent::ProviderError { message: format!("stream read error: {err}") })
                    .await;
                return;
            }
            None => break,
        };

        let text = match std::str::from_utf8(&chunk) {
            Ok(text) => text,
            Err(err) => {
                let _ = tx
                    .send(ProviderEvent::ProviderError { message: format!("invalid UTF-8 in stream: {err}") })
                    .await;
                return;
            }
        };
        line_buffer.push_str(text);

        while let Some(newline_pos) = line_buffer.find('\n') {
            let line = line_buffer[..newline_pos].trim_end().to_string();
            line_buffer = line_buffer[newline_pos + 1..].to_string();

            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if let Some(event_type) = line.strip_prefix("event: ") {
                current_event_type = Some(event_type.to_owned());
                continue;
            }
            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            let event_type = current_event_type.take().unwrap_or_else(|| "unknown".into());

            if data.trim() == "[DONE]" {
                let _ = tx.send(ProviderEvent::RoundEnd { stop_reason: stop_reason.clone() }).await;
                return;
            }

            let v: Value = match serde_json::from_str(data) {
                Ok(v) => v,
                Err(err) => {
                    let _ = tx
                        .send(ProviderEvent::ProviderError { message: format!("invalid JSON in SSE data: {err}") })
                        .await;
                    return;
                }
            };

            match event_type.as_str() {
                "content_block_start" => {
                    let index = v["index"].as_u64().unwrap_or(0) as u32;
                    let block = &v["content_block"];
                    match block["type"].as_str() {
                        Some("tool_use") => {
                            let call_id = format!("call_{}", Uuid::now_v7());
                            let name = block["name"].as_str().unwrap_or_default().to_owned();
                            blocks.insert(index, BlockState::Tool { call_id: call_id.clone(), name: name.clone(), json: String::new() });
                            if tx.send(ProviderEvent::ToolCallStart { tool_call_id: call_id, tool_name: name }).await.is_err() {
                                return;
                            }
                        }
                        _ => {
                            blocks.insert(index, BlockState::Text);
                            let id = format!("t-{index}");
                            if tx.send(ProviderEvent::TextStart { id }).await.is_err() {
                                return;
                            }
                        }
                    }
                }
                "content_block_delta" => {
                    let index = v["index"].as_u64().unwrap_or(0) as u32;
                    let delta = &v["delta"];
                    match delta["type"].as_str() {
                        Some("text_delta") => {
                            let text = delta["text"].as_str().unwrap_or_default().to_owned();
                            if tx.send(ProviderEvent::TextDelta { id: format!("t-{index}"), delta: text }).await.is_err() {
                                return;
                            }
                        }
                        Some("input_json_delta") => {
                            if let Some(BlockState::Tool { json, .. }) = blocks.get_mut(&index) {
                                json.push_str(delta["partial_json"].as_str().unwrap_or_default());
                            }
                        }
                        _ => {}
                    }
                }
                "content_block_stop" => {
                    let index = v["index"].as_u64().unwrap_or(0) as u32;
                    match blocks.remove(&index) {
                        Some(BlockState::Text) => {
                            if tx.send(ProviderEvent::TextEnd { id: format!("t-{index}") }).await.is_err() {
                                return;
                            }
                        }
                        Some(BlockState::Tool { call_id, name, json }) => {
                            let input: Value = if json.is_empty() {
                                Value::Object(Default::default())
                            } else {
                                serde_json::from_str(&json).unwrap_or(Value::Null)
                            };
                            if tx
                                .send(ProviderEvent::ToolCallEnd { tool_call_id: call_id, tool_name: name, input })
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                        None => {}
                    }
                }
                "message_delta" => {
                    stop_reason = v["delta"]["stop_reason"].as_str().map(String::from);
                }
                "message_stop" => {
                    let _ = tx.send(ProviderEvent::RoundEnd { stop_reason: stop_reason.clone() }).await;
                    return;
                }
                "error" => {
                    let message = v["error"]["message"].as_str().unwrap_or("provider error").to_owned();
                    let _ = tx.send(ProviderEvent::ProviderError { message }).await;
                    return;
                }
                _ => {}
            }
        }
    }

    // Stream closed without an explicit message_stop/[DONE] — treat as a
    // round end so the runtime isn't left waiting forever.
    let _ = tx.send(ProviderEvent::RoundEnd { stop_reason }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Role;

    #[test]
    fn empty_api_key_is_rejected() {
        let result = AnthropicProvider::new(AnthropicConfig::new(""));
        assert!(result.is_err());
    }

    #[test]
    fn split_system_message_concatenates_multiple_system_messages() {
        let messages = vec![LlmMessage::system("a"), LlmMessage::system("b"), LlmMessage::user("hi")];
        let (system, wire) = split_system_message(&messages);
        assert_eq!(system.as_deref(), Some("a\nb"));
        assert_eq!(wire.len(), 1);
    }

    #[test]
    fn assistant_tool_call_becomes_tool_use_block() {
        let messages = vec![LlmMessage::assistant_tool_call("call_1", "get_teacher_classes", json!({}))];
        let (_, wire) = split_system_message(&messages);
        assert_eq!(wire[0]["role"], "assistant");
        assert_eq!(wire[0]["content"][0]["type"], "tool_use");
        assert_eq!(wire[0]["content"][0]["id"], "call_1");
    }

    #[test]
    fn tool_result_becomes_a_user_message_with_tool_result_block() {
        let messages = vec![LlmMessage::tool_result("call_1", "{\"classes\":[]}")];
        let (_, wire) = split_system_message(&messages);
        assert_eq!(wire[0]["role"], "user");
        assert_eq!(wire[0]["content"][0]["type"], "tool_result");
        assert_eq!(wire[0]["content"][0]["tool_use_id"], "call_1");
    }

    #[test]
    fn build_request_body_carries_tools_and_system() {
        let provider = AnthropicProvider::new(AnthropicConfig::new("test-key")).unwrap();
        let messages = vec![LlmMessage::system("be helpful"), LlmMessage::user("hi")];
        let tools = vec![ToolSchema { name: "t".into(), description: "d".into(), input_schema: json!({}) }];
        let settings = ModelSettings { model: "claude-sonnet-4-20250514".into(), temperature: Some(0.7), max_tokens: 1024 };
        let body = provider.build_request_body(&messages, &tools, &settings);

        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["system"], "be helpful");
        assert_eq!(body["stream"], true);
        assert_eq!(body["tools"][0]["name"], "t");
    }

    #[test]
    fn tool_call_ids_are_minted_in_call_prefixed_uuid_form() {
        let id = format!("call_{}", Uuid::now_v7());
        assert!(id.starts_with("call_"));
        assert!(Uuid::parse_str(&id[5..]).is_ok());
    }
}
