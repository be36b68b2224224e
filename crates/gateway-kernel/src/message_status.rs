//! A standalone mirror of gateway-store's `ToolReturnStatus`.
//!
//! gateway-kernel does not depend on gateway-store (the dependency runs the
//! other way: gateway-agent depends on both and converts between this tag
//! and the store's persisted enum when it commits a turn to history). The
//! two enums must stay in lockstep — five variants, same snake_case wire
//! names — since both describe the same `tool_return.status` field.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolReturnStatusTag {
    Ok,
    NoResult,
    Error,
    Degraded,
    Partial,
}
