//! `platform` toolset — the teacher-platform collaborators that sit outside
//! the conversation gateway entirely (assignment publishing, share links,
//! a private document search index, the structured clarification channel,
//! and the report page builder) (§4.1).
//!
//! `save_as_assignment`, `create_share_link`, and `build_report_page` talk
//! to out-of-scope platform services (§1); here they return a structurally
//! valid placeholder response so the tool-call wire protocol around them is
//! fully exercised. `search_teacher_documents` is a private-only RAG lookup
//! over a document index that, per §4.1, is also out of scope for this
//! core — it returns `no_result` until a real index is wired in.
//! `ask_clarification` is the one tool whose contract is fully native: it
//! always emits a structured [`gateway_kernel::ClarifyEvent`].

use async_trait::async_trait;
use gateway_kernel::{ActionKind, ClarifyEvent, ToolContext, ToolError, ToolExecutor, ToolOutcome, ToolResult};
use serde_json::{json, Value};
use tracing::instrument;

use crate::util::{optional_str, require_str, require_teacher_id};

#[derive(Default)]
pub struct PlatformTools;

impl PlatformTools {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, args))]
    fn save_as_assignment(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let artifact_id = require_str(&args, "artifact_id")?;
        let class_id = require_str(&args, "class_id")?;
        let due_at = optional_str(&args, "due_at");

        Ok(ToolOutcome::ToolResult(
            ToolResult::ok(json!({
                "assignment_id": format!("assignment_{}", uuid::Uuid::now_v7()),
                "artifact_id": artifact_id,
                "class_id": class_id,
                "due_at": due_at,
            }))
            .with_action(ActionKind::Complete),
        ))
    }

    #[instrument(skip(self, args))]
    fn create_share_link(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let artifact_id = require_str(&args, "artifact_id")?;
        let share_id = uuid::Uuid::now_v7();

        Ok(ToolOutcome::ToolResult(
            ToolResult::ok(json!({
                "artifact_id": artifact_id,
                "share_url": format!("placeholder://share/{share_id}"),
            }))
            .with_action(ActionKind::Complete),
        ))
    }

    #[instrument(skip(self, args))]
    fn search_teacher_documents(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let query = require_str(&args, "query")?;
        // Default scope is private-only (no public fallout) per §4.1. No
        // document index is wired into this core, so every query reports
        // no_result rather than fabricating matches.
        let _ = query;
        Ok(ToolOutcome::ToolResult(ToolResult {
            data: json!({"matches": []}),
            status: gateway_kernel::ToolStatus::NoResult,
            artifact_type: None,
            content_format: None,
            action: Some(ActionKind::Complete),
            reason: Some("no private document index is configured".into()),
        }))
    }

    #[instrument(skip(self, args))]
    fn ask_clarification(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let question = require_str(&args, "question")?;
        let options = args
            .get("options")
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        Ok(ToolOutcome::Clarify(ClarifyEvent {
            question: question.to_string(),
            options,
        }))
    }

    #[instrument(skip(self, args))]
    fn build_report_page(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let title = require_str(&args, "title")?;
        let sections = args.get("sections").cloned().unwrap_or_else(|| json!([]));

        Ok(ToolOutcome::ToolResult(
            ToolResult::ok(json!({
                "report_id": format!("report_{}", uuid::Uuid::now_v7()),
                "title": title,
                "sections": sections,
            }))
            .with_action(ActionKind::Complete),
        ))
    }
}

#[async_trait]
impl ToolExecutor for PlatformTools {
    async fn call(&self, name: &str, args: Value, ctx: &ToolContext) -> Option<Result<ToolOutcome, ToolError>> {
        // ask_clarification never touches teacher data and is valid with no
        // identity at all (it is how the model asks the user for one).
        if name != "ask_clarification" {
            if let Err(outcome) = require_teacher_id(ctx) {
                return Some(Ok(ToolOutcome::RawDataMap(outcome)));
            }
        }

        let result = match name {
            "save_as_assignment" => self.save_as_assignment(args),
            "create_share_link" => self.create_share_link(args),
            "search_teacher_documents" => self.search_teacher_documents(args),
            "ask_clarification" => self.ask_clarification(args),
            "build_report_page" => self.build_report_page(args),
            _ => return None,
        };
        Some(result)
    }
}
