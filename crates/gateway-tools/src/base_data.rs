//! `base_data` toolset — thin read-only wrappers around the out-of-scope
//! classroom/submission/grade REST collaborator (§4.1, §11.3).
//!
//! One struct per toolset, a `tool_xxx` method per tool, dispatched by name
//! from a single `ToolExecutor::call` match.

use std::sync::Arc;

use async_trait::async_trait;
use gateway_kernel::{ToolContext, ToolError, ToolExecutor, ToolOutcome};
use serde_json::Value;
use tracing::instrument;

use crate::external::ExternalDataClient;
use crate::util::{optional_str, require_str, require_teacher_id, wrap_error, wrap_ok};

pub struct BaseDataTools {
    client: Arc<dyn ExternalDataClient>,
}

impl BaseDataTools {
    pub fn new(client: Arc<dyn ExternalDataClient>) -> Self {
        Self { client }
    }

    #[instrument(skip(self, ctx))]
    async fn get_teacher_classes(&self, ctx: &ToolContext) -> Result<ToolOutcome, ToolError> {
        let teacher_id = match require_teacher_id(ctx) {
            Ok(id) => id,
            Err(outcome) => return Ok(ToolOutcome::RawDataMap(outcome)),
        };
        match self.client.get_teacher_classes(teacher_id).await {
            Ok(data) => Ok(ToolOutcome::RawDataMap(wrap_ok(data))),
            Err(_) if ctx.debug => Ok(ToolOutcome::RawDataMap(mock_classes())),
            Err(err) => Ok(ToolOutcome::RawDataMap(wrap_error(err.to_string()))),
        }
    }

    #[instrument(skip(self, args, ctx))]
    async fn get_class_detail(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutcome, ToolError> {
        let teacher_id = match require_teacher_id(ctx) {
            Ok(id) => id,
            Err(outcome) => return Ok(ToolOutcome::RawDataMap(outcome)),
        };
        let class_id = require_str(&args, "class_id")?;
        match self.client.get_class_detail(teacher_id, class_id).await {
            Ok(data) => Ok(ToolOutcome::RawDataMap(wrap_ok(data))),
            Err(_) if ctx.debug => Ok(ToolOutcome::RawDataMap(mock_class_detail(class_id))),
            Err(err) => Ok(ToolOutcome::RawDataMap(wrap_error(err.to_string()))),
        }
    }

    #[instrument(skip(self, args, ctx))]
    async fn get_assignment_submissions(
        &self,
        args: Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let teacher_id = match require_teacher_id(ctx) {
            Ok(id) => id,
            Err(outcome) => return Ok(ToolOutcome::RawDataMap(outcome)),
        };
        let assignment_id = require_str(&args, "assignment_id")?;
        match self
            .client
            .get_assignment_submissions(teacher_id, assignment_id)
            .await
        {
            Ok(data) => Ok(ToolOutcome::RawDataMap(wrap_ok(data))),
            Err(_) if ctx.debug => Ok(ToolOutcome::RawDataMap(mock_submissions(assignment_id))),
            Err(err) => Ok(ToolOutcome::RawDataMap(wrap_error(err.to_string()))),
        }
    }

    #[instrument(skip(self, args, ctx))]
    async fn get_student_grades(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutcome, ToolError> {
        let teacher_id = match require_teacher_id(ctx) {
            Ok(id) => id,
            Err(outcome) => return Ok(ToolOutcome::RawDataMap(outcome)),
        };
        let student_id = require_str(&args, "student_id")?;
        let class_id = optional_str(&args, "class_id").or(ctx.class_id.as_deref());
        match self
            .client
            .get_student_grades(teacher_id, student_id, class_id)
            .await
        {
            Ok(data) => Ok(ToolOutcome::RawDataMap(wrap_ok(data))),
            Err(_) if ctx.debug => Ok(ToolOutcome::RawDataMap(mock_grades(student_id))),
            Err(err) => Ok(ToolOutcome::RawDataMap(wrap_error(err.to_string()))),
        }
    }

    #[instrument(skip(self, args, ctx))]
    async fn resolve_entity(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutcome, ToolError> {
        let teacher_id = match require_teacher_id(ctx) {
            Ok(id) => id,
            Err(outcome) => return Ok(ToolOutcome::RawDataMap(outcome)),
        };
        let query = require_str(&args, "query")?;
        match self.client.resolve_entity(teacher_id, query).await {
            Ok(data) => Ok(ToolOutcome::RawDataMap(wrap_ok(data))),
            Err(_) if ctx.debug => Ok(ToolOutcome::RawDataMap(mock_resolution(query))),
            Err(err) => Ok(ToolOutcome::RawDataMap(wrap_error(err.to_string()))),
        }
    }
}

#[async_trait]
impl ToolExecutor for BaseDataTools {
    async fn call(&self, name: &str, args: Value, ctx: &ToolContext) -> Option<Result<ToolOutcome, ToolError>> {
        let result = match name {
            "get_teacher_classes" => self.get_teacher_classes(ctx).await,
            "get_class_detail" => self.get_class_detail(args, ctx).await,
            "get_assignment_submissions" => self.get_assignment_submissions(args, ctx).await,
            "get_student_grades" => self.get_student_grades(args, ctx).await,
            "resolve_entity" => self.resolve_entity(args, ctx).await,
            _ => return None,
        };
        Some(result)
    }
}

fn mock_classes() -> Value {
    serde_json::json!({"status": "ok", "classes": [{"class_id": "mock-class-1", "name": "Mock Class"}]})
}

fn mock_class_detail(class_id: &str) -> Value {
    serde_json::json!({"status": "ok", "class_id": class_id, "name": "Mock Class", "students": []})
}

fn mock_submissions(assignment_id: &str) -> Value {
    serde_json::json!({"status": "ok", "assignment_id": assignment_id, "submissions": []})
}

fn mock_grades(student_id: &str) -> Value {
    serde_json::json!({"status": "ok", "student_id": student_id, "grades": []})
}

fn mock_resolution(query: &str) -> Value {
    serde_json::json!({"status": "ok", "query": query, "matches": []})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExternalDataError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExternalDataClient for FailingClient {
        async fn get_teacher_classes(&self, _teacher_id: &str) -> Result<Value, ExternalDataError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(ExternalDataError::CircuitOpen { service: "classes".into() })
        }
        async fn get_class_detail(&self, _t: &str, _c: &str) -> Result<Value, ExternalDataError> {
            unreachable!()
        }
        async fn get_assignment_submissions(&self, _t: &str, _a: &str) -> Result<Value, ExternalDataError> {
            unreachable!()
        }
        async fn get_student_grades(&self, _t: &str, _s: &str, _c: Option<&str>) -> Result<Value, ExternalDataError> {
            unreachable!()
        }
        async fn resolve_entity(&self, _t: &str, _q: &str) -> Result<Value, ExternalDataError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn missing_teacher_id_returns_status_error_without_calling_upstream() {
        let client = Arc::new(FailingClient { calls: AtomicUsize::new(0) });
        let tools = BaseDataTools::new(client.clone());
        let ctx = ToolContext::new("", "conv-1");

        let outcome = tools.call("get_teacher_classes", Value::Null, &ctx).await.unwrap().unwrap();
        let json = outcome.into_json();
        assert_eq!(json["status"], "error");
        assert_eq!(json["reason"], "teacher_id required");
        assert_eq!(client.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn upstream_failure_without_debug_surfaces_status_error() {
        let client = Arc::new(FailingClient { calls: AtomicUsize::new(0) });
        let tools = BaseDataTools::new(client);
        let ctx = ToolContext::new("teacher-1", "conv-1");

        let outcome = tools.call("get_teacher_classes", Value::Null, &ctx).await.unwrap().unwrap();
        let json = outcome.into_json();
        assert_eq!(json["status"], "error");
    }

    #[tokio::test]
    async fn upstream_failure_with_debug_falls_back_to_mock_data() {
        let client = Arc::new(FailingClient { calls: AtomicUsize::new(0) });
        let tools = BaseDataTools::new(client);
        let mut ctx = ToolContext::new("teacher-1", "conv-1");
        ctx.debug = true;

        let outcome = tools.call("get_teacher_classes", Value::Null, &ctx).await.unwrap().unwrap();
        let json = outcome.into_json();
        assert_eq!(json["status"], "ok");
        assert!(json["classes"].is_array());
    }

    #[tokio::test]
    async fn unknown_tool_name_returns_none() {
        let client = Arc::new(FailingClient { calls: AtomicUsize::new(0) });
        let tools = BaseDataTools::new(client);
        let ctx = ToolContext::new("teacher-1", "conv-1");
        assert!(tools.call("not_a_tool", Value::Null, &ctx).await.is_none());
    }
}
