//! Gateway-level error type and its HTTP mapping (§7's error taxonomy).
//!
//! Every pre-turn failure (validation, auth, rate limit, conflicting
//! in-flight turn) short-circuits before a stream is opened and maps to one
//! HTTP status here. Failures *inside* a turn never reach this type — the
//! runtime catches everything into the `AgentEvent`/`GatewayEvent` stream
//! instead (§7's propagation policy).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing/invalid auth token (§6, §7).
    #[error("unauthorized")]
    Unauthorized,

    /// Malformed or incomplete request body (§6, §8's boundary behaviours).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Per-teacher QPS limiter tripped (§5, §6).
    #[error("rate limit exceeded")]
    RateLimited,

    /// A second stream was opened on a `conversation_id` already in flight
    /// (§5's concurrency model, §12 Open Question #3).
    #[error("conversation already has an active turn")]
    ConversationBusy,

    /// `NATIVE_AGENT_ENABLED=false` (§11.4's emergency kill-switch).
    #[error("native agent disabled")]
    AgentDisabled,

    #[error("store error: {0}")]
    Store(#[from] gateway_store::StoreError),

    /// The runtime's outcome channel closed without a result — an L5 System
    /// failure in the runtime itself (§7), never an expected path.
    #[error("internal runtime error")]
    Internal,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            GatewayError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            GatewayError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
            GatewayError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            GatewayError::ConversationBusy => (StatusCode::CONFLICT, "conversation_busy"),
            GatewayError::AgentDisabled => (StatusCode::SERVICE_UNAVAILABLE, "agent_disabled"),
            GatewayError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            GatewayError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({ "error": code, "message": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
