//! Small helpers shared by every toolset handler: argument extraction and
//! the teacher-isolation guard (§4.5's hard invariant).

use gateway_kernel::ToolError;
use serde_json::{json, Value};

/// `{"status":"error","reason":"teacher_id required"}` is itself a valid
/// tool outcome, not a raised [`ToolError`] — the handler signals the
/// failure through its return value, per §4.1.
pub(crate) fn require_teacher_id(ctx: &gateway_kernel::ToolContext) -> Result<&str, Value> {
    if ctx.teacher_id.trim().is_empty() {
        Err(json!({"status": "error", "reason": "teacher_id required"}))
    } else {
        Ok(ctx.teacher_id.as_str())
    }
}

pub(crate) fn require_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing or empty field `{field}`")))
}

pub(crate) fn optional_str<'a>(args: &'a Value, field: &str) -> Option<&'a str> {
    args.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Wrap an upstream payload so it always carries the `status` field the
/// data/analysis return-type contract requires, without clobbering one the
/// upstream already set.
pub(crate) fn wrap_ok(data: Value) -> Value {
    match data {
        Value::Object(mut map) => {
            map.entry("status").or_insert_with(|| json!("ok"));
            Value::Object(map)
        }
        other => json!({"status": "ok", "result": other}),
    }
}

pub(crate) fn wrap_error(reason: impl Into<String>) -> Value {
    json!({"status": "error", "reason": reason.into()})
}

// ── artifact tag <-> store enum conversions ─────────────────────────────
//
// gateway-kernel and gateway-store each define their own artifact-shape
// enums (by design — see gateway_kernel::tool's module doc). gateway-tools
// depends on both, so it owns the conversion at the one place artifacts are
// actually created and read back: here.

pub(crate) fn artifact_type_to_store(tag: gateway_kernel::ArtifactTypeTag) -> gateway_store::ArtifactType {
    use gateway_kernel::ArtifactTypeTag as K;
    use gateway_store::ArtifactType as S;
    match tag {
        K::Quiz => S::Quiz,
        K::Ppt => S::Ppt,
        K::Doc => S::Doc,
        K::Interactive => S::Interactive,
    }
}

pub(crate) fn content_format_to_store(tag: gateway_kernel::ContentFormatTag) -> gateway_store::ContentFormat {
    use gateway_kernel::ContentFormatTag as K;
    use gateway_store::ContentFormat as S;
    match tag {
        K::Json => S::Json,
        K::Markdown => S::Markdown,
        K::Html => S::Html,
    }
}

pub(crate) fn artifact_type_to_tag(t: gateway_store::ArtifactType) -> gateway_kernel::ArtifactTypeTag {
    use gateway_kernel::ArtifactTypeTag as K;
    use gateway_store::ArtifactType as S;
    match t {
        S::Quiz => K::Quiz,
        S::Ppt => K::Ppt,
        S::Doc => K::Doc,
        S::Interactive => K::Interactive,
    }
}

pub(crate) fn content_format_to_tag(f: gateway_store::ContentFormat) -> gateway_kernel::ContentFormatTag {
    use gateway_kernel::ContentFormatTag as K;
    use gateway_store::ContentFormat as S;
    match f {
        S::Json => K::Json,
        S::Markdown => K::Markdown,
        S::Html => K::Html,
    }
}

pub(crate) fn new_artifact_id() -> String {
    format!("artifact_{}", uuid::Uuid::now_v7())
}
