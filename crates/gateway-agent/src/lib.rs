//! Native agent runtime for the conversation gateway (C4, C5, C7).
//!
//! - **[`provider`]** — the `ModelProvider` seam (C4): provider-agnostic
//!   request/response vocabulary a concrete vendor adapter implements.
//! - **[`providers`]** — concrete `ModelProvider` implementations
//!   (currently Anthropic).
//! - **[`runtime`]** — the native agent tool loop (C7): one turn end to end.
//! - **[`stream_adapter`]** — maps the runtime's whole-turn event stream to
//!   the frozen wire protocol (C5).
//! - **[`compaction`]** — progressive summarization over a truncation pass's
//!   dropped message prefix (§4.2.1).
//! - **[`error`]** — unified agent error type via `thiserror`.

pub mod compaction;
pub mod error;
pub mod provider;
pub mod providers;
pub mod runtime;
pub mod stream_adapter;

pub use compaction::ProgressiveSummarizer;
pub use error::{AgentError, Result};
pub use provider::{EventStream, LlmMessage, ModelProvider, ModelSettings, ProviderEvent, Role, ToolCallRef, ToolSchema};
pub use providers::AnthropicProvider;
pub use runtime::{AgentContext, Budgets, NativeAgentRuntime, TurnHandle, TurnMetrics, TurnOutcome};
pub use stream_adapter::{adapt, AgentEvent, AgentEventStream, FinishReason, GatewayEvent, WireFrame, WireStream};
