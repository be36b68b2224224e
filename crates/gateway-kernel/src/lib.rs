//! Tool registry and toolset selection for the conversation gateway.
//!
//! - **[`registry`]** — write-once-at-startup tool catalogue, looked up by
//!   name or by toolset membership.
//! - **[`selector`]** — the pure, permissive-inclusion function that decides
//!   which toolsets a turn's prompt should carry.
//! - **[`error`]** — unified error type via [`thiserror`].
//! - **[`tool`]** — the executable `Tool`/`ToolExecutor` contract gateway-tools
//!   implements and gateway-agent's runtime drives.
//! - **[`message_status`]** — the `tool_return.status` vocabulary, mirrored
//!   here so this crate need not depend on gateway-store.

pub mod error;
pub mod message_status;
pub mod registry;
pub mod selector;
pub mod tool;

pub use error::{KernelError, Result};
pub use message_status::ToolReturnStatusTag;
pub use registry::{OutputType, ToolDefinition, ToolRegistry};
pub use selector::{select_toolsets, SelectorContext};
pub use tool::{
    ActionKind, ArtifactTypeTag, ClarifyEvent, ContentFormatTag, Tool, ToolContext, ToolError,
    ToolExecutor, ToolOutcome, ToolResult, ToolStatus,
};

use serde::{Deserialize, Serialize};

/// One of the five fixed toolset buckets tools are tagged with.
///
/// Frozen: these five names, and the invariant that `base_data` and
/// `platform` are always selected, must not change without an explicit
/// architectural decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toolset {
    BaseData,
    Analysis,
    Generation,
    ArtifactOps,
    Platform,
}

impl std::fmt::Display for Toolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::BaseData => "base_data",
            Self::Analysis => "analysis",
            Self::Generation => "generation",
            Self::ArtifactOps => "artifact_ops",
            Self::Platform => "platform",
        };
        write!(f, "{s}")
    }
}
