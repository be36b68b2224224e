//! Native agent runtime (C7) — the conversation gateway's tool loop.
//!
//! Drives one turn end to end: select toolsets, resolve tool definitions,
//! build the prompt, then loop calling the model provider and executing
//! whatever tool calls it asks for until it produces a final answer or a
//! budget trips. Structured as a per-round provider call followed by tool
//! execution followed by conversation growth, generalized from a fixed
//! adapter list and message-count loop control to the registry/executor
//! split and the budget/timeout/failure taxonomy this gateway requires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::StreamExt;
use gateway_kernel::{select_toolsets, SelectorContext, ToolContext, ToolExecutor, ToolRegistry};
use gateway_store::{
    truncate_messages, CharHeuristicCounter, ConversationSession, Message, ToolReturnStatus,
    TruncationConfig,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use crate::compaction::ProgressiveSummarizer;
use crate::provider::{LlmMessage, ModelProvider, ModelSettings, ProviderEvent, Role, ToolCallRef, ToolSchema};
use crate::stream_adapter::{AgentEvent, AgentEventStream, FinishReason};

/// Budget knobs enforced inside the runtime (§5).
#[derive(Debug, Clone, Copy)]
pub struct Budgets {
    pub max_tool_calls: u32,
    pub max_turn_duration: Duration,
    pub per_tool_timeout: Duration,
    pub max_input_tokens: usize,
    pub max_output_tokens: usize,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            max_tool_calls: 10,
            max_turn_duration: Duration::from_secs(120),
            per_tool_timeout: Duration::from_secs(30),
            max_input_tokens: 32_000,
            max_output_tokens: 8_000,
        }
    }
}

/// Per-turn input besides the message text and loaded session.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub teacher_id: String,
    pub conversation_id: String,
    pub language_hint: Option<String>,
    pub class_id: Option<String>,
    pub debug: bool,
}

impl AgentContext {
    pub fn new(teacher_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            teacher_id: teacher_id.into(),
            conversation_id: conversation_id.into(),
            language_hint: None,
            class_id: None,
            debug: false,
        }
    }

    fn to_tool_context(&self) -> ToolContext {
        ToolContext {
            teacher_id: self.teacher_id.clone(),
            conversation_id: self.conversation_id.clone(),
            language_hint: self.language_hint.clone(),
            class_id: self.class_id.clone(),
            debug: self.debug,
        }
    }
}

/// One structured log record per completed turn (§4.5 step 7).
#[derive(Debug, Clone, serde::Serialize)]
pub struct TurnMetrics {
    pub conversation_id: String,
    pub teacher_id: String,
    pub toolsets_selected: Vec<String>,
    pub tool_calls: u32,
    pub duration_ms: u64,
    pub terminated_reason: String,
}

/// What a finished turn produced: the runtime never panics or propagates an
/// error across the turn boundary (§7's propagation policy), so this is an
/// infallible result, not a `Result`.
pub struct TurnOutcome {
    pub session: ConversationSession,
    pub metrics: TurnMetrics,
}

/// The live half of a turn: the event stream a caller relays to C5, plus a
/// handle that resolves once the session mutation is ready to persist.
pub struct TurnHandle {
    pub events: AgentEventStream,
    pub outcome: oneshot::Receiver<TurnOutcome>,
}

/// Executes one conversation turn at a time (C7). Cheaply cloneable —
/// everything it owns is `Arc`-backed.
#[derive(Clone)]
pub struct NativeAgentRuntime {
    registry: Arc<ToolRegistry>,
    executor: Arc<dyn ToolExecutor>,
    provider: Arc<dyn ModelProvider>,
    model: String,
    temperature: Option<f32>,
    budgets: Budgets,
    truncation_config: TruncationConfig,
    summarizer: Option<Arc<ProgressiveSummarizer>>,
}

impl NativeAgentRuntime {
    pub fn new(
        registry: Arc<ToolRegistry>,
        executor: Arc<dyn ToolExecutor>,
        provider: Arc<dyn ModelProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            executor,
            provider,
            model: model.into(),
            temperature: Some(0.7),
            budgets: Budgets::default(),
            truncation_config: TruncationConfig::default(),
            summarizer: None,
        }
    }

    #[must_use]
    pub fn with_budgets(mut self, budgets: Budgets) -> Self {
        self.budgets = budgets;
        self
    }

    #[must_use]
    pub fn with_truncation_config(mut self, config: TruncationConfig) -> Self {
        self.truncation_config = config;
        self
    }

    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Arc<ProgressiveSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Start a turn. Returns immediately with a live event stream; the
    /// session mutation to persist arrives on `TurnHandle::outcome` once the
    /// turn completes (stop, budget, timeout, or error — always exactly
    /// one of these, never a propagated error).
    pub fn run_turn(&self, session: ConversationSession, message_text: String, ctx: AgentContext) -> TurnHandle {
        let (event_tx, event_rx) = mpsc::channel(128);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let runtime = self.clone();

        tokio::spawn(async move {
            let outcome = runtime.drive_turn(session, message_text, ctx, event_tx).await;
            let _ = outcome_tx.send(outcome);
        });

        TurnHandle { events: Box::pin(ReceiverStream::new(event_rx)), outcome: outcome_rx }
    }

    async fn drive_turn(
        &self,
        mut session: ConversationSession,
        message_text: String,
        ctx: AgentContext,
        tx: mpsc::Sender<AgentEvent>,
    ) -> TurnOutcome {
        let started = Instant::now();
        let now = || chrono::Utc::now().timestamp();
        let _ = tx.send(AgentEvent::Start { conversation_id: ctx.conversation_id.clone() }).await;

        let has_artifacts = session.messages.iter().any(
            |m| matches!(m, Message::ToolReturn { result, .. } if result.get("artifact_type").is_some()),
        );
        let selector_ctx = SelectorContext { has_artifacts, class_id: ctx.class_id.clone() };
        let toolsets = select_toolsets(&message_text, &selector_ctx);
        let tool_defs = self.registry.get_tools(&toolsets);
        let tool_schemas: Vec<ToolSchema> = tool_defs
            .iter()
            .map(|d| ToolSchema { name: d.name.clone(), description: d.description.clone(), input_schema: d.input_schema.clone() })
            .collect();

        tracing::info!(
            conversation_id = %ctx.conversation_id,
            teacher_id = %ctx.teacher_id,
            toolsets = ?toolsets,
            tool_count = tool_schemas.len(),
            "turn started"
        );

        let mut new_messages: Vec<Message> = vec![Message::User { content: message_text.clone(), timestamp: now() }];

        let counter = CharHeuristicCounter;
        let input_tokens = gateway_store::estimate_tokens(&session.messages, &counter);
        if input_tokens > self.budgets.max_input_tokens {
            tracing::warn!(input_tokens, budget = self.budgets.max_input_tokens, "prompt over input token budget");
        }

        let mut messages = self.build_provider_messages(&session, &tool_defs, &message_text);
        let settings = ModelSettings { model: self.model.clone(), temperature: self.temperature, max_tokens: self.budgets.max_output_tokens as u32 };

        let mut tool_call_counter: u32 = 0;
        let mut finish_reason = FinishReason::Stop;

        'rounds: loop {
            if started.elapsed() >= self.budgets.max_turn_duration {
                finish_reason = FinishReason::Timeout;
                break 'rounds;
            }

            let remaining = self.budgets.max_turn_duration.saturating_sub(started.elapsed());
            let round = match tokio::time::timeout(remaining, self.provider.run_stream(&messages, &tool_schemas, &settings)).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(err)) => {
                    tracing::error!(error = %err, "model provider call failed");
                    let _ = tx.send(AgentEvent::Error { message: err.to_string() }).await;
                    finish_reason = FinishReason::Error;
                    break 'rounds;
                }
                Err(_) => {
                    finish_reason = FinishReason::Timeout;
                    break 'rounds;
                }
            };

            let RoundResult { text, tool_calls, errored } = self.consume_round(round, &tx).await;
            if errored {
                finish_reason = FinishReason::Error;
                break 'rounds;
            }

            if !text.is_empty() {
                new_messages.push(Message::AssistantText { content: text.clone(), timestamp: now() });
            }

            if tool_calls.is_empty() {
                finish_reason = FinishReason::Stop;
                break 'rounds;
            }

            let mut runnable = Vec::with_capacity(tool_calls.len());
            for call in &tool_calls {
                if tool_call_counter >= self.budgets.max_tool_calls {
                    finish_reason = FinishReason::Budget;
                    break;
                }
                tool_call_counter += 1;
                runnable.push(call.clone());
            }

            let results = self.execute_tool_calls(&runnable, &ctx).await;

            let mut assistant_tool_calls = Vec::with_capacity(runnable.len());
            for (call, (status, output)) in runnable.iter().zip(results.into_iter()) {
                assistant_tool_calls.push(ToolCallRef { id: call.id.clone(), name: call.name.clone(), arguments: call.arguments.clone() });

                let _ = tx.send(AgentEvent::ToolOutputAvailable { tool_call_id: call.id.clone(), output: output.clone() }).await;

                new_messages.push(Message::ToolCall {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    timestamp: now(),
                });
                new_messages.push(Message::ToolReturn {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    result: output.clone(),
                    status,
                    timestamp: now(),
                });

                messages.push(LlmMessage::tool_result(call.id.clone(), output.to_string()));
            }

            if !assistant_tool_calls.is_empty() {
                messages.push(LlmMessage { role: Role::Assistant, content: text, tool_calls: assistant_tool_calls, tool_call_id: None });
            }

            if runnable.len() < tool_calls.len() {
                // The budget tripped partway through this round's tool calls.
                break 'rounds;
            }
        }

        let _ = tx
            .send(AgentEvent::Finish { reason: finish_reason })
            .await;

        session.messages.extend(new_messages);
        self.commit_history(&mut session).await;

        let metrics = TurnMetrics {
            conversation_id: ctx.conversation_id.clone(),
            teacher_id: ctx.teacher_id.clone(),
            toolsets_selected: toolsets.iter().map(ToString::to_string).collect(),
            tool_calls: tool_call_counter,
            duration_ms: started.elapsed().as_millis() as u64,
            terminated_reason: finish_reason_label(finish_reason).to_owned(),
        };
        tracing::info!(?metrics, "turn finished");

        TurnOutcome { session, metrics }
    }

    /// Consume one provider round, relaying text/tool-call events downstream
    /// and accumulating the round's assistant text and completed tool calls.
    async fn consume_round(&self, mut round: crate::provider::EventStream, tx: &mpsc::Sender<AgentEvent>) -> RoundResult {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        while let Some(event) = round.next().await {
            match event {
                ProviderEvent::TextStart { id } => {
                    let _ = tx.send(AgentEvent::TextStart { id }).await;
                }
                ProviderEvent::TextDelta { id, delta } => {
                    text.push_str(&delta);
                    let _ = tx.send(AgentEvent::TextDelta { id, delta }).await;
                }
                ProviderEvent::TextEnd { id } => {
                    let _ = tx.send(AgentEvent::TextEnd { id }).await;
                }
                ProviderEvent::ToolCallStart { tool_call_id, tool_name } => {
                    let _ = tx.send(AgentEvent::ToolInputStart { tool_call_id, tool_name }).await;
                }
                ProviderEvent::ToolCallEnd { tool_call_id, tool_name, input } => {
                    let _ = tx
                        .send(AgentEvent::ToolInputAvailable { tool_call_id: tool_call_id.clone(), tool_name: tool_name.clone(), input: input.clone() })
                        .await;
                    tool_calls.push(ToolCallRef { id: tool_call_id, name: tool_name, arguments: input });
                }
                ProviderEvent::ProviderError { message } => {
                    let _ = tx.send(AgentEvent::Error { message }).await;
                    return RoundResult { text, tool_calls, errored: true };
                }
                ProviderEvent::RoundEnd { .. } => break,
            }
        }

        RoundResult { text, tool_calls, errored: false }
    }

    /// Run a batch of tool calls concurrently, each under its own timeout.
    /// Returns `(status, result_json)` per call, in the same order as input.
    async fn execute_tool_calls(&self, calls: &[ToolCallRef], ctx: &AgentContext) -> Vec<(ToolReturnStatus, Value)> {
        let tool_ctx = ctx.to_tool_context();
        let per_tool_timeout = self.budgets.per_tool_timeout;

        let futures = calls.iter().map(|call| {
            let executor = Arc::clone(&self.executor);
            let tool_ctx = tool_ctx.clone();
            let name = call.name.clone();
            let args = call.arguments.clone();

            async move {
                match tokio::time::timeout(per_tool_timeout, executor.call(&name, args, &tool_ctx)).await {
                    Err(_) => (ToolReturnStatus::Error, error_payload("timeout")),
                    Ok(None) => (ToolReturnStatus::Error, error_payload("unknown_tool")),
                    Ok(Some(Err(err))) => (ToolReturnStatus::Error, error_payload(&err.to_string())),
                    Ok(Some(Ok(outcome))) => {
                        let status = tool_outcome_status(outcome.tool_return_status());
                        (status, outcome.into_json())
                    }
                }
            }
        });

        join_all(futures).await
    }

    /// Build the per-round provider message list: system prompt, prior
    /// history (with a progressive-summary prefix if one is recorded),
    /// then the new user turn.
    fn build_provider_messages(
        &self,
        session: &ConversationSession,
        tool_defs: &[gateway_kernel::ToolDefinition],
        message_text: &str,
    ) -> Vec<LlmMessage> {
        let mut messages = vec![LlmMessage::system(self.build_system_prompt(tool_defs))];

        if let Some(summary) = &session.summary {
            messages.push(LlmMessage::user(format!(
                "[earlier conversation summary ({} messages)]: {summary}",
                session.summarized_message_count
            )));
            messages.push(LlmMessage::assistant("Understood, I have the earlier context."));
        }

        for message in &session.messages {
            messages.push(store_message_to_llm_message(message));
        }

        messages.push(LlmMessage::user(message_text));
        messages
    }

    fn build_system_prompt(&self, tool_defs: &[gateway_kernel::ToolDefinition]) -> String {
        let tool_names: Vec<&str> = tool_defs.iter().map(|d| d.name.as_str()).collect();
        format!(
            "You are the teaching assistant for an educational platform. You decide for \
             yourself, turn by turn, whether a tool call is needed to answer — never guess \
             at this from keywords in the message. Any information that is real-time or \
             scoped to the requesting teacher (classes, students, scores, existing \
             artifacts) MUST come from a tool call; never invent it from training data. If \
             a tool call returns status \"error\", tell the user what went wrong instead of \
             fabricating a result. If you need more information to proceed, ask through the \
             ask_clarification tool rather than asking in free text. Tools available this \
             turn: {}.",
            tool_names.join(", ")
        )
    }

    /// Apply truncation (and, if configured, progressive summarization over
    /// the dropped prefix) to the session's message list (§4.2.1, §4.5 step 6).
    async fn commit_history(&self, session: &mut ConversationSession) {
        let is_generation_tool = |name: &str| {
            self.registry
                .lookup(name)
                .map(|def| def.toolset == gateway_kernel::Toolset::Generation)
                .unwrap_or(false)
        };

        let messages = std::mem::take(&mut session.messages);
        let counter = CharHeuristicCounter;
        let outcome = truncate_messages(messages, &counter, &self.truncation_config, is_generation_tool);

        session.messages = outcome.kept;

        if !outcome.truncated || outcome.dropped.is_empty() {
            return;
        }

        let Some(summarizer) = &self.summarizer else {
            return;
        };

        match summarizer.summarize(&outcome.dropped).await {
            Ok(summary) => {
                session.summary = Some(match &session.summary {
                    Some(existing) => format!("{existing}\n{summary}"),
                    None => summary,
                });
                session.summarized_message_count += outcome.dropped.len() as i64;
            }
            Err(err) => {
                tracing::warn!(error = %err, "progressive summarization failed; dropped messages left unsummarized");
            }
        }
    }
}

struct RoundResult {
    text: String,
    tool_calls: Vec<ToolCallRef>,
    errored: bool,
}

fn finish_reason_label(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "stop",
        FinishReason::Budget => "budget",
        FinishReason::Timeout => "timeout",
        FinishReason::Error => "error",
    }
}

fn error_payload(reason: &str) -> Value {
    serde_json::json!({ "status": "error", "reason": reason })
}

fn tool_outcome_status(tag: gateway_kernel::ToolReturnStatusTag) -> ToolReturnStatus {
    use gateway_kernel::ToolReturnStatusTag as K;
    match tag {
        K::Ok => ToolReturnStatus::Ok,
        K::NoResult => ToolReturnStatus::NoResult,
        K::Error => ToolReturnStatus::Error,
        K::Degraded => ToolReturnStatus::Degraded,
        K::Partial => ToolReturnStatus::Partial,
    }
}

/// Convert one persisted [`Message`] into the provider-facing wire shape.
fn store_message_to_llm_message(message: &Message) -> LlmMessage {
    match message {
        Message::User { content, .. } => LlmMessage::user(content.clone()),
        Message::AssistantText { content, .. } => LlmMessage::assistant(content.clone()),
        Message::ToolCall { tool_call_id, tool_name, arguments, .. } => {
            LlmMessage::assistant_tool_call(tool_call_id.clone(), tool_name.clone(), arguments.clone())
        }
        Message::ToolReturn { tool_call_id, result, .. } => LlmMessage::tool_result(tool_call_id.clone(), result.to_string()),
    }
}
