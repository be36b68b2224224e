//! The executable side of a tool — the contract gateway-tools implements
//! and gateway-agent's runtime drives (§4.1, §4.5 step 4).
//!
//! [`crate::registry::ToolRegistry`] only ever holds a [`crate::registry::ToolDefinition`]:
//! name, schema, toolset tag. It has no handler. That split exists so the
//! runtime can depend on this crate alone — `Arc<dyn ToolExecutor>` plus the
//! registry — without depending on gateway-tools's concrete catalogue type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Toolset;

/// Business kind of an artifact a tool call produced or touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactTypeTag {
    Quiz,
    Ppt,
    Doc,
    Interactive,
}

/// Technical carrier of that artifact's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormatTag {
    Json,
    Markdown,
    Html,
}

/// Outcome status carried on a [`ToolResult`] envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    NoResult,
    Error,
    Degraded,
    Partial,
}

/// How the model should treat the result: proceed, ask the user, or settle
/// for a degraded outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Complete,
    Clarify,
    Partial,
}

/// The envelope returned by generation/write/RAG tools (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub data: Value,
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<ArtifactTypeTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_format: Option<ContentFormatTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ToolResult {
    /// A plain successful result with no artifact association.
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            status: ToolStatus::Ok,
            artifact_type: None,
            content_format: None,
            action: None,
            reason: None,
        }
    }

    /// The handler-signaled error shape (not a Rust error — §4.1's "the
    /// handler itself signals only via its return value").
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            data: Value::Null,
            status: ToolStatus::Error,
            artifact_type: None,
            content_format: None,
            action: None,
            reason: Some(reason.into()),
        }
    }

    pub fn with_artifact(mut self, artifact_type: ArtifactTypeTag, content_format: ContentFormatTag) -> Self {
        self.artifact_type = Some(artifact_type);
        self.content_format = Some(content_format);
        self
    }

    pub fn with_action(mut self, action: ActionKind) -> Self {
        self.action = Some(action);
        self
    }
}

/// A structured clarifying question — never inferred from free text (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClarifyEvent {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// What a tool handler returns on success, shaped by its declared
/// `output_type` ([`crate::registry::OutputType`]).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToolOutcome {
    RawDataMap(Value),
    ToolResult(ToolResult),
    Clarify(ClarifyEvent),
}

impl ToolOutcome {
    /// The JSON that becomes a persisted `tool_return.result`.
    pub fn into_json(self) -> Value {
        match self {
            ToolOutcome::RawDataMap(v) => v,
            ToolOutcome::ToolResult(r) => serde_json::to_value(r).unwrap_or(Value::Null),
            ToolOutcome::Clarify(c) => serde_json::to_value(c).unwrap_or(Value::Null),
        }
    }

    /// The status to record on the `tool_return` envelope. A raw data map
    /// is `ok` unless it carries its own `status` field (data/analysis
    /// tools are only asked to include one, not required to via the type
    /// system — §4.1's return-type contract is enforced by review).
    pub fn tool_return_status(&self) -> crate::message_status::ToolReturnStatusTag {
        use crate::message_status::ToolReturnStatusTag as S;
        match self {
            ToolOutcome::RawDataMap(v) => match v.get("status").and_then(Value::as_str) {
                Some("error") => S::Error,
                Some("degraded") => S::Degraded,
                Some("partial") => S::Partial,
                Some("no_result") => S::NoResult,
                _ => S::Ok,
            },
            ToolOutcome::ToolResult(r) => match r.status {
                ToolStatus::Ok => S::Ok,
                ToolStatus::NoResult => S::NoResult,
                ToolStatus::Error => S::Error,
                ToolStatus::Degraded => S::Degraded,
                ToolStatus::Partial => S::Partial,
            },
            ToolOutcome::Clarify(_) => S::Ok,
        }
    }
}

/// Per-call request context threaded into every handler (§4.5 step 4).
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub teacher_id: String,
    pub conversation_id: String,
    pub language_hint: Option<String>,
    pub class_id: Option<String>,
    /// Mirrors `DEBUG`; mock-data fallback is only ever permitted when true
    /// (§4.5's teacher-isolation invariant).
    pub debug: bool,
}

impl ToolContext {
    pub fn new(teacher_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            teacher_id: teacher_id.into(),
            conversation_id: conversation_id.into(),
            language_hint: None,
            class_id: None,
            debug: false,
        }
    }
}

/// Raised when a handler cannot even produce a [`ToolOutcome`] — the
/// Runtime's tool loop, not the handler, is responsible for turning this
/// into a `tool_return{status:"error"}` (§4.1's failure semantics: the
/// handler signals intentional failure via `ToolResult::error`, and only
/// genuinely exceptional conditions raise this instead).
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("teacher_id required")]
    MissingTeacherId,
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// One executable tool. Implementations live in gateway-tools.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn toolset(&self) -> Toolset;
    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutcome, ToolError>;
}

/// What the runtime actually holds — something that can run a tool by
/// name without depending on gateway-tools's concrete catalogue type.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// `None` means this executor has no tool by that name — the caller
    /// treats that as the `unknown_tool` case (§4.5 step 4), distinct from
    /// `Some(Err(_))` which is a raised handler failure.
    async fn call(&self, name: &str, args: Value, ctx: &ToolContext) -> Option<Result<ToolOutcome, ToolError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_data_map_status_defaults_to_ok_without_a_status_field() {
        let outcome = ToolOutcome::RawDataMap(serde_json::json!({"classes": []}));
        assert_eq!(outcome.tool_return_status(), crate::message_status::ToolReturnStatusTag::Ok);
    }

    #[test]
    fn raw_data_map_honors_an_explicit_error_status() {
        let outcome = ToolOutcome::RawDataMap(serde_json::json!({"status": "error", "reason": "x"}));
        assert_eq!(outcome.tool_return_status(), crate::message_status::ToolReturnStatusTag::Error);
    }

    #[test]
    fn tool_result_error_carries_a_reason() {
        let result = ToolResult::error("teacher_id required");
        assert_eq!(result.status, ToolStatus::Error);
        assert_eq!(result.reason.as_deref(), Some("teacher_id required"));
    }

    #[test]
    fn clarify_outcome_serializes_with_question_and_options() {
        let outcome = ToolOutcome::Clarify(ClarifyEvent {
            question: "which class?".into(),
            options: vec!["1A".into(), "1B".into()],
        });
        let json = outcome.into_json();
        assert_eq!(json["question"], "which class?");
        assert_eq!(json["options"][0], "1A");
    }

    #[test]
    fn tool_result_with_artifact_round_trips_through_json() {
        let result = ToolResult::ok(serde_json::json!({"quiz_id": "q1"}))
            .with_artifact(ArtifactTypeTag::Quiz, ContentFormatTag::Json)
            .with_action(ActionKind::Complete);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["artifact_type"], "quiz");
        assert_eq!(json["content_format"], "json");
        assert_eq!(json["action"], "complete");
    }
}
