//! `generation` toolset — quiz/slide-deck/document/interactive-HTML
//! authoring tools (§4.1).
//!
//! The real rendering pipelines (PPTX/DOCX/PDF layout engines, interactive
//! HTML templating) are out of scope (§1). Each handler here validates its
//! arguments, builds a structurally valid placeholder payload shaped like
//! the real output, and — for the tools that produce a new artifact —
//! persists it through [`gateway_store::ArtifactStore`] so the rest of the
//! turn (patch, regenerate, share) has something real to operate on (§11.6).

use std::sync::Arc;

use async_trait::async_trait;
use gateway_kernel::{ActionKind, ArtifactTypeTag, ContentFormatTag, ToolContext, ToolError, ToolExecutor, ToolOutcome, ToolResult};
use gateway_store::{Artifact, ArtifactStore, ArtifactType, ContentFormat};
use serde_json::{json, Value};
use tracing::instrument;

use crate::util::{new_artifact_id, require_str, require_teacher_id};

pub struct GenerationTools {
    artifacts: Arc<ArtifactStore>,
}

impl GenerationTools {
    pub fn new(artifacts: Arc<ArtifactStore>) -> Self {
        Self { artifacts }
    }

    async fn persist(
        &self,
        conversation_id: &str,
        artifact_type: ArtifactType,
        content_format: ContentFormat,
        content: Value,
    ) -> Result<Artifact, ToolError> {
        let artifact = Artifact {
            artifact_id: new_artifact_id(),
            conversation_id: conversation_id.to_string(),
            artifact_type,
            content_format,
            content,
            resources: Vec::new(),
            version: 1,
        };
        self.artifacts
            .put(&artifact)
            .await
            .map_err(|err| ToolError::Internal(err.to_string()))?;
        Ok(artifact)
    }

    #[instrument(skip(self, args, ctx))]
    async fn generate_quiz_questions(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutcome, ToolError> {
        let topic = require_str(&args, "topic")?;
        let count = args.get("question_count").and_then(Value::as_u64).unwrap_or(5).clamp(1, 50);

        let questions: Vec<Value> = (1..=count)
            .map(|n| json!({"id": format!("q{n}"), "prompt": format!("{topic} question {n}"), "answer": null}))
            .collect();

        let artifact = self
            .persist(
                &ctx.conversation_id,
                ArtifactType::Quiz,
                ContentFormat::Json,
                json!({"topic": topic, "questions": questions}),
            )
            .await?;

        Ok(ToolOutcome::ToolResult(
            ToolResult::ok(json!({"artifact_id": artifact.artifact_id, "question_count": count}))
                .with_artifact(ArtifactTypeTag::Quiz, ContentFormatTag::Json)
                .with_action(ActionKind::Complete),
        ))
    }

    #[instrument(skip(self, args))]
    async fn propose_pptx_outline(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let topic = require_str(&args, "topic")?;
        let slide_count = args.get("slide_count").and_then(Value::as_u64).unwrap_or(8).clamp(1, 40);

        let outline: Vec<Value> = (1..=slide_count)
            .map(|n| json!({"slide": n, "title": format!("{topic}: section {n}")}))
            .collect();

        Ok(ToolOutcome::ToolResult(
            ToolResult::ok(json!({"topic": topic, "outline": outline})).with_action(ActionKind::Complete),
        ))
    }

    #[instrument(skip(self, args, ctx))]
    async fn generate_pptx(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutcome, ToolError> {
        let outline = args
            .get("outline")
            .cloned()
            .ok_or_else(|| ToolError::InvalidArguments("missing `outline` array".into()))?;

        let slides = outline
            .as_array()
            .ok_or_else(|| ToolError::InvalidArguments("`outline` must be an array".into()))?
            .iter()
            .map(|slide| json!({"title": slide.get("title").cloned().unwrap_or(Value::Null), "body": ""}))
            .collect::<Vec<_>>();

        let artifact = self
            .persist(&ctx.conversation_id, ArtifactType::Ppt, ContentFormat::Json, json!({"slides": slides}))
            .await?;

        Ok(ToolOutcome::ToolResult(
            ToolResult::ok(json!({"artifact_id": artifact.artifact_id, "slide_count": artifact.content["slides"].as_array().map(|a| a.len()).unwrap_or(0)}))
                .with_artifact(ArtifactTypeTag::Ppt, ContentFormatTag::Json)
                .with_action(ActionKind::Complete),
        ))
    }

    #[instrument(skip(self, args, ctx))]
    async fn generate_docx(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutcome, ToolError> {
        let title = require_str(&args, "title")?;
        let body = args.get("body").and_then(Value::as_str).unwrap_or("").to_string();

        let artifact = self
            .persist(
                &ctx.conversation_id,
                ArtifactType::Doc,
                ContentFormat::Markdown,
                json!(format!("# {title}\n\n{body}")),
            )
            .await?;

        Ok(ToolOutcome::ToolResult(
            ToolResult::ok(json!({"artifact_id": artifact.artifact_id, "title": title}))
                .with_artifact(ArtifactTypeTag::Doc, ContentFormatTag::Markdown)
                .with_action(ActionKind::Complete),
        ))
    }

    #[instrument(skip(self, args))]
    async fn render_pdf(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let artifact_id = require_str(&args, "artifact_id")?;
        let artifact = self.artifacts.get(artifact_id).await.map_err(|err| ToolError::Internal(err.to_string()))?;

        Ok(ToolOutcome::ToolResult(
            ToolResult::ok(json!({
                "artifact_id": artifact.artifact_id,
                "pdf_resource": format!("placeholder://render/{}.pdf", artifact.artifact_id),
                "source_version": artifact.version,
            }))
            .with_action(ActionKind::Complete),
        ))
    }

    #[instrument(skip(self, args, ctx))]
    async fn generate_interactive_html(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutcome, ToolError> {
        let title = require_str(&args, "title")?;
        let body = args.get("body").and_then(Value::as_str).unwrap_or("").to_string();
        let html = format!("<!doctype html><html><head><title>{title}</title></head><body>{body}</body></html>");

        let artifact = self
            .persist(&ctx.conversation_id, ArtifactType::Interactive, ContentFormat::Html, json!(html))
            .await?;

        Ok(ToolOutcome::ToolResult(
            ToolResult::ok(json!({"artifact_id": artifact.artifact_id, "title": title}))
                .with_artifact(ArtifactTypeTag::Interactive, ContentFormatTag::Html)
                .with_action(ActionKind::Complete),
        ))
    }

    #[instrument(skip(self, args))]
    async fn request_interactive_content(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let description = require_str(&args, "description")?;
        Ok(ToolOutcome::ToolResult(
            ToolResult::ok(json!({
                "content_request_id": format!("req_{}", uuid::Uuid::now_v7()),
                "description": description,
            }))
            .with_action(ActionKind::Partial),
        ))
    }
}

#[async_trait]
impl ToolExecutor for GenerationTools {
    async fn call(&self, name: &str, args: Value, ctx: &ToolContext) -> Option<Result<ToolOutcome, ToolError>> {
        if let Err(outcome) = require_teacher_id(ctx) {
            return Some(Ok(ToolOutcome::RawDataMap(outcome)));
        }

        let result = match name {
            "generate_quiz_questions" => self.generate_quiz_questions(args, ctx).await,
            "propose_pptx_outline" => self.propose_pptx_outline(args).await,
            "generate_pptx" => self.generate_pptx(args, ctx).await,
            "generate_docx" => self.generate_docx(args, ctx).await,
            "render_pdf" => self.render_pdf(args).await,
            "generate_interactive_html" => self.generate_interactive_html(args, ctx).await,
            "request_interactive_content" => self.request_interactive_content(args).await,
            _ => return None,
        };
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_store::Database;

    async fn tools() -> GenerationTools {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        GenerationTools::new(Arc::new(ArtifactStore::new(db)))
    }

    fn ctx() -> ToolContext {
        ToolContext::new("teacher-1", "conv-1")
    }

    #[tokio::test]
    async fn generate_quiz_questions_persists_an_artifact() {
        let tools = tools().await;
        let args = json!({"topic": "fractions", "question_count": 3});
        let outcome = tools.call("generate_quiz_questions", args, &ctx()).await.unwrap().unwrap();
        let json = outcome.into_json();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["artifact_type"], "quiz");
        assert!(json["data"]["artifact_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn propose_pptx_outline_does_not_persist_an_artifact() {
        let tools = tools().await;
        let args = json!({"topic": "photosynthesis", "slide_count": 4});
        let outcome = tools.call("propose_pptx_outline", args, &ctx()).await.unwrap().unwrap();
        let json = outcome.into_json();
        assert_eq!(json["status"], "ok");
        assert!(json["artifact_type"].is_null());
        assert_eq!(json["data"]["outline"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn render_pdf_references_an_existing_artifact() {
        let tools = tools().await;
        let quiz = tools
            .call("generate_quiz_questions", json!({"topic": "algebra"}), &ctx())
            .await
            .unwrap()
            .unwrap()
            .into_json();
        let artifact_id = quiz["data"]["artifact_id"].as_str().unwrap().to_string();

        let outcome = tools
            .call("render_pdf", json!({"artifact_id": artifact_id}), &ctx())
            .await
            .unwrap()
            .unwrap();
        let json = outcome.into_json();
        assert_eq!(json["status"], "ok");
        assert!(json["data"]["pdf_resource"].as_str().unwrap().contains(&artifact_id));
    }

    #[tokio::test]
    async fn missing_teacher_id_short_circuits_generation_tools() {
        let tools = tools().await;
        let mut no_teacher = ctx();
        no_teacher.teacher_id.clear();
        let outcome = tools
            .call("generate_quiz_questions", json!({"topic": "x"}), &no_teacher)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.into_json()["status"], "error");
    }
}
