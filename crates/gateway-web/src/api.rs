//! Non-streaming endpoints: one-shot conversation turns and health checks
//! (§4.6, §11.3).

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use futures::StreamExt;
use gateway_agent::{AgentEvent, GatewayEvent};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::pipeline::prepare_turn;
use crate::state::AppState;
use crate::types::ConversationRequestBody;

/// `GET /api/health` — liveness probe only, no dependency checks (§11.3).
/// Always served, even when the kill-switch disables the conversation
/// endpoints, so an operator can distinguish "process is down" from
/// "process is up but paused."
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallSummary {
    #[serde(rename = "toolCallId")]
    pub tool_call_id: String,
    #[serde(rename = "toolName")]
    pub tool_name: String,
    pub input: Value,
    pub output: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    pub text: String,
    #[serde(rename = "finishReason")]
    pub finish_reason: String,
    #[serde(rename = "toolCalls")]
    pub tool_calls: Vec<ToolCallSummary>,
}

/// `POST /api/conversation` — runs a turn to completion and returns the
/// accumulated result as a single JSON document, for callers that cannot
/// consume SSE (§4.6's non-streaming variant).
pub async fn conversation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ConversationRequestBody>,
) -> Result<impl IntoResponse, GatewayError> {
    let prepared = prepare_turn(&state, &headers, body).await?;
    let _guard = prepared.guard;
    let conversation_id = prepared.conversation_id;

    let mut text = String::new();
    let mut tool_calls: Vec<ToolCallSummary> = Vec::new();
    let mut finish_reason = "stop".to_owned();

    let mut events = prepared.handle.events;
    while let Some(event) = events.next().await {
        match event {
            AgentEvent::TextDelta { delta, .. } => text.push_str(&delta),
            AgentEvent::ToolInputAvailable { tool_call_id, tool_name, input } => {
                tool_calls.push(ToolCallSummary { tool_call_id, tool_name, input, output: None });
            }
            AgentEvent::ToolOutputAvailable { tool_call_id, output } => {
                if let Some(call) = tool_calls.iter_mut().find(|c| c.tool_call_id == tool_call_id) {
                    call.output = Some(output);
                }
            }
            AgentEvent::Finish { reason } => {
                if let GatewayEvent::Finish { finish_reason: reason } = GatewayEvent::from(AgentEvent::Finish { reason }) {
                    finish_reason = reason;
                }
            }
            _ => {}
        }
    }

    let outcome = prepared.handle.outcome.await.map_err(|_| GatewayError::Internal)?;
    state.sessions.save(&outcome.session).await?;

    Ok(Json(ConversationResponse { conversation_id, text, finish_reason, tool_calls }))
}
