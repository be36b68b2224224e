//! `ExternalDataClient` — the out-of-scope classroom/submission/grade REST
//! collaborator (§1, §11.3), consumed by the `base_data` and `analysis`
//! toolsets only via this trait.
//!
//! [`HttpExternalDataClient`] builds a single pooled `reqwest::Client` once,
//! with a fixed request timeout, wired through
//! [`crate::circuit_breaker::CircuitBreaker`].

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::ExternalDataError;

#[async_trait]
pub trait ExternalDataClient: Send + Sync {
    async fn get_teacher_classes(&self, teacher_id: &str) -> Result<Value, ExternalDataError>;

    async fn get_class_detail(
        &self,
        teacher_id: &str,
        class_id: &str,
    ) -> Result<Value, ExternalDataError>;

    async fn get_assignment_submissions(
        &self,
        teacher_id: &str,
        assignment_id: &str,
    ) -> Result<Value, ExternalDataError>;

    async fn get_student_grades(
        &self,
        teacher_id: &str,
        student_id: &str,
        class_id: Option<&str>,
    ) -> Result<Value, ExternalDataError>;

    async fn resolve_entity(&self, teacher_id: &str, query: &str) -> Result<Value, ExternalDataError>;
}

/// Default `ExternalDataClient`, backed by a pooled `reqwest::Client`.
pub struct HttpExternalDataClient {
    http: reqwest::Client,
    base_url: String,
    breaker: CircuitBreaker,
}

impl HttpExternalDataClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ExternalDataError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ExternalDataError::Request {
                service: "http-client-build".into(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            breaker: CircuitBreaker::with_default_policy(),
        })
    }

    #[instrument(skip(self, query), fields(path))]
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ExternalDataError> {
        if self.breaker.is_open(path) {
            return Err(ExternalDataError::CircuitOpen {
                service: path.to_string(),
            });
        }

        let url = format!("{}{}", self.base_url, path);
        let result = self.http.get(&url).query(query).send().await;

        match result {
            Ok(response) if response.status().is_success() => {
                self.breaker.record_success(path);
                response.json().await.map_err(|source| ExternalDataError::Request {
                    service: path.to_string(),
                    source,
                })
            }
            Ok(response) => {
                self.breaker.record_failure(path);
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                Err(ExternalDataError::UpstreamStatus {
                    service: path.to_string(),
                    status,
                    body,
                })
            }
            Err(source) => {
                self.breaker.record_failure(path);
                Err(ExternalDataError::Request {
                    service: path.to_string(),
                    source,
                })
            }
        }
    }
}

#[async_trait]
impl ExternalDataClient for HttpExternalDataClient {
    async fn get_teacher_classes(&self, teacher_id: &str) -> Result<Value, ExternalDataError> {
        self.get_json("/v1/classes", &[("teacher_id", teacher_id)]).await
    }

    async fn get_class_detail(
        &self,
        teacher_id: &str,
        class_id: &str,
    ) -> Result<Value, ExternalDataError> {
        self.get_json(
            "/v1/classes/detail",
            &[("teacher_id", teacher_id), ("class_id", class_id)],
        )
        .await
    }

    async fn get_assignment_submissions(
        &self,
        teacher_id: &str,
        assignment_id: &str,
    ) -> Result<Value, ExternalDataError> {
        self.get_json(
            "/v1/assignments/submissions",
            &[("teacher_id", teacher_id), ("assignment_id", assignment_id)],
        )
        .await
    }

    async fn get_student_grades(
        &self,
        teacher_id: &str,
        student_id: &str,
        class_id: Option<&str>,
    ) -> Result<Value, ExternalDataError> {
        let mut query = vec![("teacher_id", teacher_id), ("student_id", student_id)];
        if let Some(class_id) = class_id {
            query.push(("class_id", class_id));
        }
        self.get_json("/v1/students/grades", &query).await
    }

    async fn resolve_entity(&self, teacher_id: &str, query: &str) -> Result<Value, ExternalDataError> {
        self.get_json("/v1/entities/resolve", &[("teacher_id", teacher_id), ("q", query)])
            .await
    }
}
