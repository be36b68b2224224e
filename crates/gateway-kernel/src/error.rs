//! Kernel error types.
//!
//! All kernel subsystems surface errors through [`KernelError`], the single
//! error type returned by every public API in this crate.

/// Unified error type for the tool registry and toolset selector.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// The requested tool is not registered.
    #[error("tool not found: {name}")]
    ToolNotFound { name: String },

    /// `register` was called twice with the same tool name.
    #[error("duplicate tool registration: {name}")]
    DuplicateTool { name: String },

    /// A toolset name outside the frozen five-name set was requested.
    #[error("unknown toolset: {name}")]
    UnknownToolset { name: String },
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, KernelError>;
