//! Authentication is an external middleware collaborator (§1): the core
//! only consumes an [`AuthVerifier`] that turns a bearer token into a
//! `teacher_id`, the same way [`gateway_tools::ExternalDataClient`] and
//! [`gateway_agent::ModelProvider`] are consumed as out-of-scope interfaces
//! elsewhere in this workspace.

use axum::http::HeaderMap;

/// Verifies an `Authorization: Bearer <token>` header and resolves the
/// owning `teacher_id`. A production deployment plugs in real token
/// verification (JWT, session lookup, ...); this core ships only the seam.
#[async_trait::async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify(&self, headers: &HeaderMap) -> Option<String>;
}

/// Stub verifier for local development and tests: treats the bearer token
/// itself as the `teacher_id`. Never used in a `debug=false` deployment —
/// the binary wires a real [`AuthVerifier`] there (§11's out-of-scope
/// collaborator boundary; a real implementation lives outside this core).
pub struct BearerEchoVerifier;

#[async_trait::async_trait]
impl AuthVerifier for BearerEchoVerifier {
    async fn verify(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bearer_echo_extracts_token_as_teacher_id() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "Bearer t-1".parse().unwrap());
        assert_eq!(BearerEchoVerifier.verify(&headers).await.as_deref(), Some("t-1"));
    }

    #[tokio::test]
    async fn missing_header_fails_verification() {
        let headers = HeaderMap::new();
        assert!(BearerEchoVerifier.verify(&headers).await.is_none());
    }

    #[tokio::test]
    async fn empty_token_fails_verification() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(BearerEchoVerifier.verify(&headers).await.is_none());
    }
}
