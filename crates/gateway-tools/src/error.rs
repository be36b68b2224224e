//! Infrastructure-level errors for the tool catalogue's collaborators
//! (the external data client and its circuit breaker).
//!
//! Handler-level failures never surface this type directly — every
//! [`gateway_kernel::Tool`] implementation converts these into
//! [`gateway_kernel::ToolError`] at its boundary, matching §4.1's rule that
//! only genuinely exceptional conditions raise instead of returning a
//! `status: "error"` result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExternalDataError {
    #[error("request to {service} failed: {source}")]
    Request {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("circuit breaker open for {service}")]
    CircuitOpen { service: String },

    #[error("{service} returned status {status}: {body}")]
    UpstreamStatus {
        service: String,
        status: u16,
        body: String,
    },
}

impl From<ExternalDataError> for gateway_kernel::ToolError {
    fn from(err: ExternalDataError) -> Self {
        gateway_kernel::ToolError::Upstream(err.to_string())
    }
}
