//! Assembles the five toolset handlers into a single
//! [`gateway_kernel::ToolExecutor`] and the matching set of
//! [`gateway_kernel::ToolDefinition`]s to register at startup (§4.1).

use std::sync::Arc;

use async_trait::async_trait;
use gateway_kernel::{OutputType, ToolContext, ToolDefinition, ToolError, ToolExecutor, ToolOutcome, ToolRegistry, Toolset};
use gateway_store::ArtifactStore;
use serde_json::{json, Value};

use crate::analysis::AnalysisTools;
use crate::artifact_ops::ArtifactOpsTools;
use crate::base_data::BaseDataTools;
use crate::external::ExternalDataClient;
use crate::generation::GenerationTools;
use crate::platform::PlatformTools;

/// The full tool catalogue: one handler per toolset, tried in a fixed order.
pub struct ToolCatalog {
    base_data: BaseDataTools,
    analysis: AnalysisTools,
    generation: GenerationTools,
    artifact_ops: ArtifactOpsTools,
    platform: PlatformTools,
}

impl ToolCatalog {
    pub fn new(external: Arc<dyn ExternalDataClient>, artifacts: Arc<ArtifactStore>) -> Self {
        Self {
            base_data: BaseDataTools::new(external),
            analysis: AnalysisTools::new(),
            generation: GenerationTools::new(artifacts.clone()),
            artifact_ops: ArtifactOpsTools::new(artifacts),
            platform: PlatformTools::new(),
        }
    }

    /// Register every definition this catalogue can execute into `registry`.
    /// Called once at startup; duplicate names fail fast (§4.1).
    pub fn register_definitions(registry: &ToolRegistry) -> gateway_kernel::Result<()> {
        for definition in tool_definitions() {
            registry.register(definition)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ToolExecutor for ToolCatalog {
    async fn call(&self, name: &str, args: Value, ctx: &ToolContext) -> Option<Result<ToolOutcome, ToolError>> {
        if let Some(result) = self.base_data.call(name, args.clone(), ctx).await {
            return Some(result);
        }
        if let Some(result) = self.analysis.call(name, args.clone(), ctx).await {
            return Some(result);
        }
        if let Some(result) = self.generation.call(name, args.clone(), ctx).await {
            return Some(result);
        }
        if let Some(result) = self.artifact_ops.call(name, args.clone(), ctx).await {
            return Some(result);
        }
        self.platform.call(name, args, ctx).await
    }
}

fn def(name: &str, description: &str, schema: Value, toolset: Toolset) -> ToolDefinition {
    ToolDefinition::new(name, description, schema, toolset)
}

/// The fixed catalogue of 25 tools across the five toolsets (§4.1's
/// "minimum"; this core registers exactly that minimum).
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        // ── base_data ───────────────────────────────────────────────
        def(
            "get_teacher_classes",
            "List the classes owned by the requesting teacher.",
            json!({"type": "object", "properties": {}}),
            Toolset::BaseData,
        ),
        def(
            "get_class_detail",
            "Fetch roster and metadata for a single class.",
            json!({"type": "object", "properties": {"class_id": {"type": "string"}}, "required": ["class_id"]}),
            Toolset::BaseData,
        ),
        def(
            "get_assignment_submissions",
            "List submissions for a given assignment.",
            json!({"type": "object", "properties": {"assignment_id": {"type": "string"}}, "required": ["assignment_id"]}),
            Toolset::BaseData,
        ),
        def(
            "get_student_grades",
            "Fetch a student's grade history, optionally scoped to one class.",
            json!({
                "type": "object",
                "properties": {"student_id": {"type": "string"}, "class_id": {"type": "string"}},
                "required": ["student_id"]
            }),
            Toolset::BaseData,
        ),
        def(
            "resolve_entity",
            "Resolve a free-text name (student, class, assignment) to a platform entity id.",
            json!({"type": "object", "properties": {"query": {"type": "string"}}, "required": ["query"]}),
            Toolset::BaseData,
        ),
        // ── analysis ────────────────────────────────────────────────
        def(
            "calculate_stats",
            "Compute mean/median/min/max/stddev over a list of scores.",
            json!({"type": "object", "properties": {"scores": {"type": "array", "items": {"type": "number"}}}, "required": ["scores"]}),
            Toolset::Analysis,
        ),
        def(
            "compare_performance",
            "Compare the mean of two score groups.",
            json!({
                "type": "object",
                "properties": {
                    "group_a_scores": {"type": "array", "items": {"type": "number"}},
                    "group_b_scores": {"type": "array", "items": {"type": "number"}},
                    "label_a": {"type": "string"},
                    "label_b": {"type": "string"}
                },
                "required": ["group_a_scores", "group_b_scores"]
            }),
            Toolset::Analysis,
        ),
        def(
            "analyze_student_weakness",
            "Rank topics by a student's miss rate across answered questions.",
            json!({
                "type": "object",
                "properties": {"question_results": {"type": "array", "items": {"type": "object"}}},
                "required": ["question_results"]
            }),
            Toolset::Analysis,
        ),
        def(
            "get_student_error_patterns",
            "Tally recurring error types across a student's incorrect answers.",
            json!({
                "type": "object",
                "properties": {"incorrect_answers": {"type": "array", "items": {"type": "object"}}},
                "required": ["incorrect_answers"]
            }),
            Toolset::Analysis,
        ),
        def(
            "calculate_class_mastery",
            "Summarize a class's mastery scores against a threshold.",
            json!({
                "type": "object",
                "properties": {
                    "student_mastery_scores": {"type": "array", "items": {"type": "number"}},
                    "threshold": {"type": "number"}
                },
                "required": ["student_mastery_scores"]
            }),
            Toolset::Analysis,
        ),
        // ── generation ──────────────────────────────────────────────
        def(
            "generate_quiz_questions",
            "Generate a quiz artifact on a topic.",
            json!({
                "type": "object",
                "properties": {"topic": {"type": "string"}, "question_count": {"type": "integer"}},
                "required": ["topic"]
            }),
            Toolset::Generation,
        )
        .with_output_type(OutputType::ToolResult),
        def(
            "propose_pptx_outline",
            "Propose a slide-by-slide outline for a presentation, without generating the deck.",
            json!({
                "type": "object",
                "properties": {"topic": {"type": "string"}, "slide_count": {"type": "integer"}},
                "required": ["topic"]
            }),
            Toolset::Generation,
        )
        .with_output_type(OutputType::ToolResult),
        def(
            "generate_pptx",
            "Generate a slide-deck artifact from an approved outline.",
            json!({"type": "object", "properties": {"outline": {"type": "array"}}, "required": ["outline"]}),
            Toolset::Generation,
        )
        .with_output_type(OutputType::ToolResult),
        def(
            "generate_docx",
            "Generate a document artifact.",
            json!({"type": "object", "properties": {"title": {"type": "string"}, "body": {"type": "string"}}, "required": ["title"]}),
            Toolset::Generation,
        )
        .with_output_type(OutputType::ToolResult),
        def(
            "render_pdf",
            "Render an existing artifact to a PDF resource.",
            json!({"type": "object", "properties": {"artifact_id": {"type": "string"}}, "required": ["artifact_id"]}),
            Toolset::Generation,
        )
        .with_output_type(OutputType::ToolResult),
        def(
            "generate_interactive_html",
            "Generate an interactive HTML artifact.",
            json!({"type": "object", "properties": {"title": {"type": "string"}, "body": {"type": "string"}}, "required": ["title"]}),
            Toolset::Generation,
        )
        .with_output_type(OutputType::ToolResult),
        def(
            "request_interactive_content",
            "Flag that a piece of student-facing interactive content is needed, for downstream fulfillment.",
            json!({"type": "object", "properties": {"description": {"type": "string"}}, "required": ["description"]}),
            Toolset::Generation,
        )
        .with_output_type(OutputType::ToolResult),
        // ── artifact_ops ────────────────────────────────────────────
        def(
            "get_artifact",
            "Fetch the current content and version of an artifact.",
            json!({"type": "object", "properties": {"artifact_id": {"type": "string"}}, "required": ["artifact_id"]}),
            Toolset::ArtifactOps,
        )
        .with_output_type(OutputType::ToolResult),
        def(
            "patch_artifact",
            "Apply structured edit operations to an existing artifact.",
            json!({
                "type": "object",
                "properties": {"artifact_id": {"type": "string"}, "ops": {"type": "array"}},
                "required": ["artifact_id", "ops"]
            }),
            Toolset::ArtifactOps,
        )
        .with_output_type(OutputType::ToolResult),
        def(
            "regenerate_from_previous",
            "Regenerate an artifact from scratch, informed by its previous version and new instructions.",
            json!({
                "type": "object",
                "properties": {"artifact_id": {"type": "string"}, "instructions": {"type": "string"}},
                "required": ["artifact_id", "instructions"]
            }),
            Toolset::ArtifactOps,
        )
        .with_output_type(OutputType::ToolResult),
        // ── platform ────────────────────────────────────────────────
        def(
            "save_as_assignment",
            "Publish an artifact to a class as an assignment.",
            json!({
                "type": "object",
                "properties": {"artifact_id": {"type": "string"}, "class_id": {"type": "string"}, "due_at": {"type": "string"}},
                "required": ["artifact_id", "class_id"]
            }),
            Toolset::Platform,
        )
        .with_output_type(OutputType::ToolResult),
        def(
            "create_share_link",
            "Mint a shareable link for an artifact.",
            json!({"type": "object", "properties": {"artifact_id": {"type": "string"}}, "required": ["artifact_id"]}),
            Toolset::Platform,
        )
        .with_output_type(OutputType::ToolResult),
        def(
            "search_teacher_documents",
            "Search the teacher's private document index.",
            json!({"type": "object", "properties": {"query": {"type": "string"}}, "required": ["query"]}),
            Toolset::Platform,
        )
        .with_output_type(OutputType::ToolResult),
        def(
            "ask_clarification",
            "Ask the teacher a structured clarifying question before proceeding.",
            json!({
                "type": "object",
                "properties": {"question": {"type": "string"}, "options": {"type": "array", "items": {"type": "string"}}},
                "required": ["question"]
            }),
            Toolset::Platform,
        )
        .with_output_type(OutputType::ClarifyEvent),
        def(
            "build_report_page",
            "Assemble a report page from titled sections.",
            json!({
                "type": "object",
                "properties": {"title": {"type": "string"}, "sections": {"type": "array"}},
                "required": ["title"]
            }),
            Toolset::Platform,
        )
        .with_output_type(OutputType::ToolResult),
    ]
}
