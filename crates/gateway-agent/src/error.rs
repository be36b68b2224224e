//! Agent error types.
//!
//! All agent subsystems surface errors through [`AgentError`]. Each variant
//! carries enough context for callers to decide how to handle the failure —
//! most map directly onto an L1 (Tool) or L2 (Model) failure class in the
//! turn-loop's failure taxonomy.

/// Unified error type for the agent runtime.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// An HTTP request to the model provider failed.
    #[error("provider request failed: {reason}")]
    ProviderRequestFailed { reason: String },

    /// The provider's response could not be parsed into the expected shape.
    #[error("provider response parse error: {reason}")]
    ProviderParseFailed { reason: String },

    /// The streaming connection was interrupted or produced invalid data.
    #[error("provider stream error: {reason}")]
    ProviderStreamError { reason: String },

    /// A tool invocation raised instead of returning a `status: "error"`
    /// outcome (§4.1's genuinely-exceptional case).
    #[error("tool execution failed for `{tool_name}`: {reason}")]
    ToolExecutionFailed { tool_name: String, reason: String },

    /// A tool call ran past its per-tool timeout (§5).
    #[error("tool `{tool_name}` timed out")]
    ToolTimeout { tool_name: String },

    /// The model called a tool name absent from the registry.
    #[error("unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    /// The turn's tool-call or wall-clock budget was exhausted (§5).
    #[error("turn budget exceeded: {reason}")]
    TurnBudgetExceeded { reason: String },

    /// An error propagated from the kernel crate (registry, selector, tool
    /// contract).
    #[error("kernel error: {0}")]
    Kernel(#[from] gateway_kernel::KernelError),

    /// An error propagated from the store crate (session, artifact,
    /// truncation).
    #[error("store error: {0}")]
    Store(#[from] gateway_store::StoreError),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::ProviderRequestFailed {
            reason: err.to_string(),
        }
    }
}
