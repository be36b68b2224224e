//! Model-provider events → wire-protocol SSE records (C5, §4.3).
//!
//! [`crate::runtime::NativeAgentRuntime`] drives possibly many
//! [`crate::provider::ModelProvider::run_stream`] rounds per turn (one per
//! ReAct iteration) and flattens them, plus the tool-execution results in
//! between, into a single ordered [`AgentEvent`] stream covering the whole
//! turn. This module's only job is turning that stream into the frozen wire
//! vocabulary: event-type mapping, heartbeats, and the one-`finish`-per-turn
//! terminality guarantee — it never touches tool execution or truncation.

use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// One event in the whole-turn stream the runtime produces. A superset of
/// [`crate::provider::ProviderEvent`]: `ToolOutputAvailable` has no provider
/// counterpart since it carries a handler's result, not a model's output.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Start { conversation_id: String },
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
    ToolInputStart { tool_call_id: String, tool_name: String },
    ToolInputAvailable { tool_call_id: String, tool_name: String, input: Value },
    ToolOutputAvailable { tool_call_id: String, output: Value },
    Error { message: String },
    Finish { reason: FinishReason },
}

/// Why a turn's stream ended. Mirrors §7's error taxonomy terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Budget,
    Timeout,
    Error,
}

impl FinishReason {
    fn as_wire_str(self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Budget => "budget",
            FinishReason::Timeout => "timeout",
            FinishReason::Error => "error",
        }
    }
}

/// The frozen wire vocabulary. Renaming, restructuring, or changing key
/// casing here requires a coordinated client rollout.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GatewayEvent {
    Start {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
    ToolInputStart {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
    },
    ToolInputAvailable {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        input: Value,
    },
    ToolOutputAvailable {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        output: Value,
    },
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },
    Finish {
        #[serde(rename = "finishReason")]
        finish_reason: String,
    },
}

impl From<AgentEvent> for GatewayEvent {
    fn from(event: AgentEvent) -> Self {
        match event {
            AgentEvent::Start { conversation_id } => GatewayEvent::Start { conversation_id },
            AgentEvent::TextStart { id } => GatewayEvent::TextStart { id },
            AgentEvent::TextDelta { id, delta } => GatewayEvent::TextDelta { id, delta },
            AgentEvent::TextEnd { id } => GatewayEvent::TextEnd { id },
            AgentEvent::ToolInputStart { tool_call_id, tool_name } => {
                GatewayEvent::ToolInputStart { tool_call_id, tool_name }
            }
            AgentEvent::ToolInputAvailable { tool_call_id, tool_name, input } => {
                GatewayEvent::ToolInputAvailable { tool_call_id, tool_name, input }
            }
            AgentEvent::ToolOutputAvailable { tool_call_id, output } => {
                GatewayEvent::ToolOutputAvailable { tool_call_id, output }
            }
            AgentEvent::Error { message } => GatewayEvent::Error { error_text: message },
            AgentEvent::Finish { reason } => GatewayEvent::Finish { finish_reason: reason.as_wire_str().to_owned() },
        }
    }
}

/// One line (or blank-line-terminated record) of the outbound SSE body.
#[derive(Debug, Clone)]
pub enum WireFrame {
    Event(GatewayEvent),
    /// `: keep-alive` comment line, carries no payload.
    Heartbeat,
    /// The literal terminal `data: [DONE]` frame.
    Done,
}

impl WireFrame {
    /// Render as the bytes to write to the SSE body, including the blank
    /// line that terminates an SSE record.
    pub fn to_sse_string(&self) -> String {
        match self {
            WireFrame::Event(event) => {
                let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_owned());
                format!("data: {json}\n\n")
            }
            WireFrame::Heartbeat => ": keep-alive\n\n".to_owned(),
            WireFrame::Done => "data: [DONE]\n\n".to_owned(),
        }
    }
}

pub type AgentEventStream = Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;
pub type WireStream = Pin<Box<dyn Stream<Item = WireFrame> + Send>>;

/// Adapt a whole-turn [`AgentEvent`] stream into the wire format, inserting
/// heartbeats and guaranteeing exactly one `finish` (§4.3's terminality
/// invariant — even if the upstream stream errors or closes without one).
pub fn adapt(events: AgentEventStream, heartbeat_interval: Duration) -> WireStream {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(run_adapter(events, heartbeat_interval, tx));
    Box::pin(ReceiverStream::new(rx))
}

async fn run_adapter(mut events: AgentEventStream, heartbeat_interval: Duration, tx: mpsc::Sender<WireFrame>) {
    let mut finished = false;

    loop {
        let sleep = tokio::time::sleep(heartbeat_interval);
        tokio::pin!(sleep);

        tokio::select! {
            _ = &mut sleep => {
                if tx.send(WireFrame::Heartbeat).await.is_err() {
                    return;
                }
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(event) => {
                        let is_finish = matches!(event, AgentEvent::Finish { .. });
                        if tx.send(WireFrame::Event(event.into())).await.is_err() {
                            return;
                        }
                        if is_finish {
                            finished = true;
                            let _ = tx.send(WireFrame::Done).await;
                            return;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    if !finished {
        let _ = tx
            .send(WireFrame::Event(GatewayEvent::Error {
                error_text: "stream ended without a terminal finish event".into(),
            }))
            .await;
        let _ = tx
            .send(WireFrame::Event(GatewayEvent::Finish { finish_reason: FinishReason::Error.as_wire_str().into() }))
            .await;
        let _ = tx.send(WireFrame::Done).await;
    }
}
