//! `artifact_ops` toolset — read, structured patch, and regenerate-from-
//! scratch operations over the store's versioned artifacts (§4.1, §4.7).

use std::sync::Arc;

use async_trait::async_trait;
use gateway_kernel::{ActionKind, ToolContext, ToolError, ToolExecutor, ToolOutcome, ToolResult};
use gateway_store::{apply_patch, Artifact, ArtifactStore, PatchOp};
use serde_json::{json, Value};
use tracing::instrument;

use crate::util::{artifact_type_to_tag, content_format_to_tag, require_str, require_teacher_id};

pub struct ArtifactOpsTools {
    artifacts: Arc<ArtifactStore>,
}

impl ArtifactOpsTools {
    pub fn new(artifacts: Arc<ArtifactStore>) -> Self {
        Self { artifacts }
    }

    #[instrument(skip(self, args))]
    async fn get_artifact(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let artifact_id = require_str(&args, "artifact_id")?;
        match self.artifacts.get(artifact_id).await {
            Ok(artifact) => Ok(ToolOutcome::ToolResult(
                ToolResult::ok(json!({
                    "artifact_id": artifact.artifact_id,
                    "content": artifact.content,
                    "version": artifact.version,
                    "resources": artifact.resources,
                }))
                .with_artifact(
                    artifact_type_to_tag(artifact.artifact_type),
                    content_format_to_tag(artifact.content_format),
                )
                .with_action(ActionKind::Complete),
            )),
            Err(gateway_store::StoreError::NotFound { .. }) => Ok(ToolOutcome::ToolResult(ToolResult::error(
                format!("artifact `{artifact_id}` not found"),
            ))),
            Err(err) => Err(ToolError::Internal(err.to_string())),
        }
    }

    #[instrument(skip(self, args))]
    async fn patch_artifact(&self, args: Value) -> Result<ToolOutcome, ToolError> {
        let artifact_id = require_str(&args, "artifact_id")?;
        let ops: Vec<PatchOp> = serde_json::from_value(
            args.get("ops")
                .cloned()
                .ok_or_else(|| ToolError::InvalidArguments("missing `ops` array".into()))?,
        )
        .map_err(|err| ToolError::InvalidArguments(format!("invalid patch ops: {err}")))?;

        let artifact = self
            .artifacts
            .get(artifact_id)
            .await
            .map_err(|err| ToolError::Internal(err.to_string()))?;

        if ops.is_empty() {
            return Ok(ToolOutcome::ToolResult(
                ToolResult::ok(json!({"artifact_id": artifact.artifact_id, "version": artifact.version}))
                    .with_artifact(
                        artifact_type_to_tag(artifact.artifact_type),
                        content_format_to_tag(artifact.content_format),
                    )
                    .with_action(ActionKind::Complete),
            ));
        }

        match apply_patch(&artifact, &ops) {
            Ok(patched_content) => {
                let mut next = artifact.clone();
                next.content = patched_content;
                next.version += 1;
                self.artifacts
                    .put(&next)
                    .await
                    .map_err(|err| ToolError::Internal(err.to_string()))?;

                Ok(ToolOutcome::ToolResult(
                    ToolResult::ok(json!({"artifact_id": next.artifact_id, "version": next.version}))
                        .with_artifact(
                            artifact_type_to_tag(next.artifact_type),
                            content_format_to_tag(next.content_format),
                        )
                        .with_action(ActionKind::Complete),
                ))
            }
            // apply_patch leaves the artifact untouched on any failure (§8
            // invariant 3): signal the caller to regenerate instead of
            // retrying the same patch.
            Err(err) => Ok(ToolOutcome::ToolResult(
                ToolResult::error(err.to_string()).with_action(ActionKind::Partial),
            )),
        }
    }

    #[instrument(skip(self, args, ctx))]
    async fn regenerate_from_previous(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutcome, ToolError> {
        let artifact_id = require_str(&args, "artifact_id")?;
        let instructions = require_str(&args, "instructions")?;

        let previous = self
            .artifacts
            .get(artifact_id)
            .await
            .map_err(|err| ToolError::Internal(err.to_string()))?;

        let regenerated = Artifact {
            artifact_id: previous.artifact_id.clone(),
            conversation_id: ctx.conversation_id.clone(),
            artifact_type: previous.artifact_type,
            content_format: previous.content_format,
            content: json!({"regenerated_from_version": previous.version, "instructions": instructions, "content": previous.content}),
            resources: previous.resources.clone(),
            version: previous.version + 1,
        };
        self.artifacts
            .put(&regenerated)
            .await
            .map_err(|err| ToolError::Internal(err.to_string()))?;

        Ok(ToolOutcome::ToolResult(
            ToolResult::ok(json!({"artifact_id": regenerated.artifact_id, "version": regenerated.version}))
                .with_artifact(
                    artifact_type_to_tag(regenerated.artifact_type),
                    content_format_to_tag(regenerated.content_format),
                )
                .with_action(ActionKind::Complete),
        ))
    }
}

#[async_trait]
impl ToolExecutor for ArtifactOpsTools {
    async fn call(&self, name: &str, args: Value, ctx: &ToolContext) -> Option<Result<ToolOutcome, ToolError>> {
        if let Err(outcome) = require_teacher_id(ctx) {
            return Some(Ok(ToolOutcome::RawDataMap(outcome)));
        }

        let result = match name {
            "get_artifact" => self.get_artifact(args).await,
            "patch_artifact" => self.patch_artifact(args).await,
            "regenerate_from_previous" => self.regenerate_from_previous(args, ctx).await,
            _ => return None,
        };
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_store::{ArtifactType, ContentFormat, Database};

    async fn tools_with_quiz() -> (ArtifactOpsTools, String) {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        let store = Arc::new(ArtifactStore::new(db));

        let artifact = Artifact {
            artifact_id: "art-1".into(),
            conversation_id: "conv-1".into(),
            artifact_type: ArtifactType::Quiz,
            content_format: ContentFormat::Json,
            content: json!({"questions": ["2+2=?"]}),
            resources: Vec::new(),
            version: 1,
        };
        store.put(&artifact).await.unwrap();

        (ArtifactOpsTools::new(store), artifact.artifact_id)
    }

    fn ctx() -> ToolContext {
        ToolContext::new("teacher-1", "conv-1")
    }

    #[tokio::test]
    async fn get_artifact_returns_current_content() {
        let (tools, artifact_id) = tools_with_quiz().await;
        let outcome = tools
            .call("get_artifact", json!({"artifact_id": artifact_id}), &ctx())
            .await
            .unwrap()
            .unwrap();
        let json = outcome.into_json();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["artifact_type"], "quiz");
    }

    #[tokio::test]
    async fn get_artifact_unknown_id_is_a_tool_result_error() {
        let (tools, _) = tools_with_quiz().await;
        let outcome = tools
            .call("get_artifact", json!({"artifact_id": "nope"}), &ctx())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.into_json()["status"], "error");
    }

    #[tokio::test]
    async fn patch_artifact_bumps_the_version() {
        let (tools, artifact_id) = tools_with_quiz().await;
        let args = json!({
            "artifact_id": artifact_id,
            "ops": [{"replace_text": {"target": "questions[0]", "value": "3+3=?"}}],
        });
        let outcome = tools.call("patch_artifact", args, &ctx()).await.unwrap().unwrap();
        let json = outcome.into_json();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["data"]["version"], 2);
    }

    #[tokio::test]
    async fn regenerate_from_previous_preserves_version_lineage() {
        let (tools, artifact_id) = tools_with_quiz().await;
        let args = json!({"artifact_id": artifact_id, "instructions": "make it harder"});
        let outcome = tools.call("regenerate_from_previous", args, &ctx()).await.unwrap().unwrap();
        let json = outcome.into_json();
        assert_eq!(json["data"]["version"], 2);
    }
}
