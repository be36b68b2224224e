//! Artifact Store & `patch_artifact` dispatch (C3, §4.7).
//!
//! One uniform envelope for every generated object (quiz, slide deck,
//! document, interactive page), versioned per successful write. The patch
//! algorithm dispatches on `content_format`, not `artifact_type` — the
//! editability matrix (§4.7) decides, per type, whether a patch is even
//! attempted or whether the LLM must fall back to `regenerate_from_previous`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

/// Business kind of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Quiz,
    Ppt,
    Doc,
    Interactive,
}

/// Technical carrier of an artifact's `content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    Json,
    Markdown,
    Html,
}

/// Where a resource's bytes actually live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStorage {
    Inline,
    Attached,
    External,
}

/// A single resource (image, audio, attachment) referenced by an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactResource {
    pub id: String,
    pub storage: ResourceStorage,
    pub mime_type: String,
    pub url: Option<String>,
    pub data: Option<String>,
}

/// One versioned artifact envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_id: String,
    pub conversation_id: String,
    pub artifact_type: ArtifactType,
    pub content_format: ContentFormat,
    pub content: Value,
    #[serde(default)]
    pub resources: Vec<ArtifactResource>,
    pub version: i64,
}

/// A single structured edit instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOp {
    ReplaceText { target: String, value: Value },
    InsertBlock { target: String, value: Value },
    DeleteBlock { target: String },
    MoveBlock { target: String, value: Value },
    SetStyle { target: String, value: Value },
    ReplaceMedia { target: String, value: Value },
    TransformStructure { target: String, value: Value },
}

/// Whether a given artifact can be patched in place, and at what granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Editability {
    /// Every `PatchOp` kind is supported.
    Full,
    /// Only text/style ops are supported; structural ops fall back to regen.
    Partial,
    /// No patch is attempted; the caller must regenerate from scratch.
    RegenOnly,
}

/// The frozen v1 editability matrix (§4.7).
pub fn editability(artifact_type: ArtifactType, content_format: ContentFormat) -> Editability {
    use ArtifactType::*;
    use ContentFormat::*;
    match (artifact_type, content_format) {
        (Quiz, Json) => Editability::Full,
        (Ppt, Json) => Editability::Partial,
        (Interactive, Html) => Editability::Full,
        (Doc, Markdown) => Editability::RegenOnly,
        _ => Editability::RegenOnly,
    }
}

/// Applies `ops` to `artifact.content`, dispatched by `content_format`.
///
/// On any op failure the whole patch is rejected and `artifact` is
/// returned unchanged — a `patch_artifact` that fails halfway must never
/// leave the store with a partial version (§8, invariant 3).
pub fn apply_patch(artifact: &Artifact, ops: &[PatchOp]) -> StoreResult<Value> {
    match editability(artifact.artifact_type, artifact.content_format) {
        Editability::RegenOnly => {
            return Err(StoreError::PatchFailed(format!(
                "{:?}/{:?} artifacts are regen-only",
                artifact.artifact_type, artifact.content_format
            )))
        }
        Editability::Partial => {
            for op in ops {
                if matches!(
                    op,
                    PatchOp::InsertBlock { .. }
                        | PatchOp::DeleteBlock { .. }
                        | PatchOp::MoveBlock { .. }
                        | PatchOp::TransformStructure { .. }
                ) {
                    return Err(StoreError::PatchFailed(
                        "structural ops unsupported on partially-editable artifacts".into(),
                    ));
                }
            }
        }
        Editability::Full => {}
    }

    let mut content = artifact.content.clone();
    for op in ops {
        apply_one(&mut content, op, artifact.content_format)?;
    }
    Ok(content)
}

fn apply_one(content: &mut Value, op: &PatchOp, format: ContentFormat) -> StoreResult<()> {
    match format {
        ContentFormat::Json => apply_json_op(content, op),
        ContentFormat::Markdown => apply_markdown_op(content, op),
        ContentFormat::Html => apply_html_op(content, op),
    }
}

/// JSON dispatch: array-index (`[n]`) and dotted-field locators against the
/// structured tree.
fn apply_json_op(content: &mut Value, op: &PatchOp) -> StoreResult<()> {
    match op {
        PatchOp::ReplaceText { target, value } | PatchOp::SetStyle { target, value } => {
            set_at_locator(content, target, value.clone())
        }
        PatchOp::InsertBlock { target, value } => insert_at_locator(content, target, value.clone()),
        PatchOp::DeleteBlock { target } => delete_at_locator(content, target),
        PatchOp::MoveBlock { target, value } => {
            // value carries the destination index for this target's parent array.
            let removed = take_at_locator(content, target)?;
            let dest = value
                .as_u64()
                .ok_or_else(|| StoreError::PatchFailed("move_block requires a numeric destination".into()))?
                as usize;
            insert_at_index(content, parent_locator(target), dest, removed)
        }
        PatchOp::ReplaceMedia { target, value } => set_at_locator(content, target, value.clone()),
        PatchOp::TransformStructure { target, value } => set_at_locator(content, target, value.clone()),
    }
}

/// Markdown dispatch, paragraph granularity only (v1): `content` is stored
/// as `{"paragraphs": [string, ...]}`.
fn apply_markdown_op(content: &mut Value, op: &PatchOp) -> StoreResult<()> {
    let paragraphs = content
        .get_mut("paragraphs")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| StoreError::PatchFailed("markdown content missing paragraphs array".into()))?;

    match op {
        PatchOp::ReplaceText { target, value } => {
            let idx = paragraph_index(target)?;
            let slot = paragraphs
                .get_mut(idx)
                .ok_or_else(|| StoreError::PatchFailed(format!("no paragraph at {idx}")))?;
            *slot = value.clone();
            Ok(())
        }
        PatchOp::InsertBlock { target, value } => {
            let idx = paragraph_index(target)?;
            if idx > paragraphs.len() {
                return Err(StoreError::PatchFailed(format!("insert index {idx} out of range")));
            }
            paragraphs.insert(idx, value.clone());
            Ok(())
        }
        PatchOp::DeleteBlock { target } => {
            let idx = paragraph_index(target)?;
            if idx >= paragraphs.len() {
                return Err(StoreError::PatchFailed(format!("no paragraph at {idx}")));
            }
            paragraphs.remove(idx);
            Ok(())
        }
        _ => Err(StoreError::PatchFailed("unsupported markdown op".into())),
    }
}

/// HTML dispatch, scoped to element selectors: `content` is stored as
/// `{"elements": {"<selector>": <value>, ...}}`.
fn apply_html_op(content: &mut Value, op: &PatchOp) -> StoreResult<()> {
    let elements = content
        .get_mut("elements")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| StoreError::PatchFailed("html content missing elements map".into()))?;

    match op {
        PatchOp::ReplaceText { target, value } | PatchOp::SetStyle { target, value } => {
            elements.insert(target.clone(), value.clone());
            Ok(())
        }
        PatchOp::DeleteBlock { target } => {
            elements
                .remove(target)
                .ok_or_else(|| StoreError::PatchFailed(format!("no element at selector {target}")))?;
            Ok(())
        }
        PatchOp::InsertBlock { target, value } => {
            elements.insert(target.clone(), value.clone());
            Ok(())
        }
        _ => Err(StoreError::PatchFailed("unsupported html op".into())),
    }
}

// ── JSON locator grammar: `questions[2]`, `slides[0].title` ────────────

fn parent_locator(target: &str) -> &str {
    match target.rfind(['.', '[']) {
        Some(i) => &target[..i],
        None => "",
    }
}

fn paragraph_index(target: &str) -> StoreResult<usize> {
    let inner = target
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| StoreError::PatchFailed(format!("invalid paragraph locator: {target}")))?;
    inner
        .parse()
        .map_err(|_| StoreError::PatchFailed(format!("invalid paragraph index: {target}")))
}

fn navigate<'a>(root: &'a mut Value, locator: &str) -> StoreResult<&'a mut Value> {
    if locator.is_empty() {
        return Ok(root);
    }
    let mut current = root;
    for segment in split_locator(locator) {
        current = match segment {
            LocatorSegment::Field(name) => current
                .get_mut(&name)
                .ok_or_else(|| StoreError::PatchFailed(format!("no field {name}")))?,
            LocatorSegment::Index(idx) => current
                .get_mut(idx)
                .ok_or_else(|| StoreError::PatchFailed(format!("no index {idx}")))?,
        };
    }
    Ok(current)
}

enum LocatorSegment {
    Field(String),
    Index(usize),
}

fn split_locator(locator: &str) -> Vec<LocatorSegment> {
    let mut segments = Vec::new();
    for part in locator.split('.') {
        let mut rest = part;
        while let Some(start) = rest.find('[') {
            if start > 0 {
                segments.push(LocatorSegment::Field(rest[..start].to_string()));
            }
            let end = rest[start..].find(']').map(|e| start + e).unwrap_or(rest.len());
            if let Ok(idx) = rest[start + 1..end].parse() {
                segments.push(LocatorSegment::Index(idx));
            }
            rest = &rest[(end + 1).min(rest.len())..];
        }
        if !rest.is_empty() {
            segments.push(LocatorSegment::Field(rest.to_string()));
        }
    }
    segments
}

fn set_at_locator(root: &mut Value, locator: &str, value: Value) -> StoreResult<()> {
    let node = navigate(root, locator)?;
    *node = value;
    Ok(())
}

fn take_at_locator(root: &mut Value, locator: &str) -> StoreResult<Value> {
    let node = navigate(root, locator)?;
    Ok(std::mem::replace(node, Value::Null))
}

fn delete_at_locator(root: &mut Value, locator: &str) -> StoreResult<()> {
    let parent = parent_locator(locator);
    let last = &locator[parent.len()..];
    let container = navigate(root, parent)?;

    if let Some(inner) = last.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let idx: usize = inner
            .parse()
            .map_err(|_| StoreError::PatchFailed(format!("invalid index in {locator}")))?;
        let arr = container
            .as_array_mut()
            .ok_or_else(|| StoreError::PatchFailed(format!("{parent} is not an array")))?;
        if idx >= arr.len() {
            return Err(StoreError::PatchFailed(format!("delete_block: no element at {idx}")));
        }
        arr.remove(idx);
        Ok(())
    } else {
        let field = last.trim_start_matches('.');
        let obj = container
            .as_object_mut()
            .ok_or_else(|| StoreError::PatchFailed(format!("{parent} is not an object")))?;
        obj.remove(field)
            .ok_or_else(|| StoreError::PatchFailed(format!("delete_block: no field {field}")))?;
        Ok(())
    }
}

fn insert_at_locator(root: &mut Value, locator: &str, value: Value) -> StoreResult<()> {
    if let Some(inner) = locator.rsplit_once('[').and_then(|(prefix, rest)| {
        rest.strip_suffix(']').map(|idx| (prefix, idx))
    }) {
        let (parent, idx) = inner;
        let idx: usize = idx
            .parse()
            .map_err(|_| StoreError::PatchFailed(format!("invalid index in {locator}")))?;
        insert_at_index(root, parent, idx, value)
    } else {
        set_at_locator(root, locator, value)
    }
}

fn insert_at_index(root: &mut Value, parent_locator: &str, idx: usize, value: Value) -> StoreResult<()> {
    let container = navigate(root, parent_locator)?;
    let arr = container
        .as_array_mut()
        .ok_or_else(|| StoreError::PatchFailed(format!("{parent_locator} is not an array")))?;
    if idx > arr.len() {
        return Err(StoreError::PatchFailed(format!("insert index {idx} out of range")));
    }
    arr.insert(idx, value);
    Ok(())
}

// ── store ────────────────────────────────────────────────────────────

/// SQLite-backed artifact store.
#[derive(Clone)]
pub struct ArtifactStore {
    db: Database,
}

impl ArtifactStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, artifact_id: &str) -> StoreResult<Artifact> {
        let artifact_id = artifact_id.to_string();
        self.db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT artifact_id, conversation_id, artifact_type, content_format, version, payload \
                     FROM artifacts WHERE artifact_id = ?1",
                    rusqlite::params![artifact_id],
                    |row| {
                        let artifact_type_raw: String = row.get(2)?;
                        let content_format_raw: String = row.get(3)?;
                        let payload_raw: String = row.get(5)?;
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, artifact_type_raw, content_format_raw, row.get::<_, i64>(4)?, payload_raw))
                    },
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                        entity: "artifact",
                        id: artifact_id.clone(),
                    },
                    other => StoreError::Sqlite(other),
                })
                .and_then(|(id, conversation_id, artifact_type, content_format, version, payload)| {
                    let payload: ArtifactPayload = serde_json::from_str(&payload)?;
                    Ok(Artifact {
                        artifact_id: id,
                        conversation_id,
                        artifact_type: serde_json::from_value(serde_json::Value::String(artifact_type))?,
                        content_format: serde_json::from_value(serde_json::Value::String(content_format))?,
                        content: payload.content,
                        resources: payload.resources,
                        version,
                    })
                })
            })
            .await
    }

    /// Writes a new version of the artifact.
    #[instrument(skip(self, artifact))]
    pub async fn put(&self, artifact: &Artifact) -> StoreResult<()> {
        let artifact_id = artifact.artifact_id.clone();
        let conversation_id = artifact.conversation_id.clone();
        let artifact_type = serde_json::to_value(artifact.artifact_type)?
            .as_str()
            .unwrap()
            .to_string();
        let content_format = serde_json::to_value(artifact.content_format)?
            .as_str()
            .unwrap()
            .to_string();
        let version = artifact.version;
        let payload = serde_json::to_string(&ArtifactPayload {
            content: artifact.content.clone(),
            resources: artifact.resources.clone(),
        })?;
        let now = chrono::Utc::now().timestamp();

        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO artifacts (artifact_id, conversation_id, artifact_type, content_format, version, payload, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
                     ON CONFLICT(artifact_id) DO UPDATE SET \
                        version = excluded.version, payload = excluded.payload, updated_at = excluded.updated_at",
                    rusqlite::params![artifact_id, conversation_id, artifact_type, content_format, version, payload, now],
                )?;
                Ok(())
            })
            .await?;

        debug!(artifact_id = %artifact.artifact_id, version = artifact.version, "artifact written");
        Ok(())
    }

    /// The most recent artifact for a conversation, if any.
    #[instrument(skip(self))]
    pub async fn latest(&self, conversation_id: &str) -> StoreResult<Option<Artifact>> {
        let conversation_id = conversation_id.to_string();
        let artifact_id: Option<String> = self
            .db
            .execute(move |conn| {
                let result = conn.query_row(
                    "SELECT artifact_id FROM artifacts WHERE conversation_id = ?1 ORDER BY updated_at DESC LIMIT 1",
                    rusqlite::params![conversation_id],
                    |row| row.get(0),
                );
                match result {
                    Ok(id) => Ok(Some(id)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(StoreError::Sqlite(e)),
                }
            })
            .await?;

        match artifact_id {
            Some(id) => Ok(Some(self.get(&id).await?)),
            None => Ok(None),
        }
    }
}

/// On-disk payload shape: content + resources, separate from the indexed
/// `artifact_type`/`content_format`/`version` columns.
#[derive(Serialize, Deserialize)]
struct ArtifactPayload {
    content: Value,
    #[serde(default)]
    resources: Vec<ArtifactResource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(version: i64) -> Artifact {
        Artifact {
            artifact_id: "art-1".into(),
            conversation_id: "conv-1".into(),
            artifact_type: ArtifactType::Quiz,
            content_format: ContentFormat::Json,
            content: serde_json::json!({"questions": ["q1", "q2", "q3"]}),
            resources: Vec::new(),
            version,
        }
    }

    async fn setup_store() -> ArtifactStore {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        ArtifactStore::new(db)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = setup_store().await;
        let artifact = quiz(1);
        store.put(&artifact).await.unwrap();

        let fetched = store.get("art-1").await.unwrap();
        assert_eq!(fetched.version, 1);
        assert_eq!(fetched.artifact_type, ArtifactType::Quiz);
        assert_eq!(fetched.content["questions"][2], "q3");
    }

    #[tokio::test]
    async fn get_missing_artifact_is_not_found() {
        let store = setup_store().await;
        let result = store.get("nonexistent").await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn put_writes_new_version() {
        let store = setup_store().await;
        store.put(&quiz(1)).await.unwrap();
        store.put(&quiz(2)).await.unwrap();

        let fetched = store.get("art-1").await.unwrap();
        assert_eq!(fetched.version, 2);
    }

    #[tokio::test]
    async fn latest_returns_most_recent_for_conversation() {
        let store = setup_store().await;
        store.put(&quiz(1)).await.unwrap();

        let latest = store.latest("conv-1").await.unwrap();
        assert!(latest.is_some());
        assert_eq!(latest.unwrap().artifact_id, "art-1");

        let none = store.latest("conv-nonexistent").await.unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn editability_matrix_matches_frozen_v1() {
        assert_eq!(editability(ArtifactType::Quiz, ContentFormat::Json), Editability::Full);
        assert_eq!(editability(ArtifactType::Ppt, ContentFormat::Json), Editability::Partial);
        assert_eq!(editability(ArtifactType::Interactive, ContentFormat::Html), Editability::Full);
        assert_eq!(editability(ArtifactType::Doc, ContentFormat::Markdown), Editability::RegenOnly);
    }

    #[test]
    fn replace_text_on_json_quiz() {
        let artifact = quiz(1);
        let ops = vec![PatchOp::ReplaceText {
            target: "questions[2]".into(),
            value: serde_json::json!("fill in the blank"),
        }];
        let patched = apply_patch(&artifact, &ops).unwrap();
        assert_eq!(patched["questions"][2], "fill in the blank");
    }

    #[test]
    fn delete_block_on_json_array() {
        let artifact = quiz(1);
        let ops = vec![PatchOp::DeleteBlock { target: "questions[1]".into() }];
        let patched = apply_patch(&artifact, &ops).unwrap();
        assert_eq!(patched["questions"].as_array().unwrap().len(), 2);
        assert_eq!(patched["questions"][1], "q3");
    }

    #[test]
    fn delete_block_on_missing_index_fails_whole_patch() {
        let artifact = quiz(1);
        let ops = vec![PatchOp::DeleteBlock { target: "questions[99]".into() }];
        assert!(apply_patch(&artifact, &ops).is_err());
    }

    #[test]
    fn regen_only_doc_rejects_any_patch() {
        let artifact = Artifact {
            artifact_type: ArtifactType::Doc,
            content_format: ContentFormat::Markdown,
            content: serde_json::json!({"paragraphs": ["hello"]}),
            ..quiz(1)
        };
        let ops = vec![PatchOp::ReplaceText { target: "[0]".into(), value: serde_json::json!("hi") }];
        assert!(apply_patch(&artifact, &ops).is_err());
    }

    #[test]
    fn partial_ppt_rejects_structural_ops() {
        let artifact = Artifact {
            artifact_type: ArtifactType::Ppt,
            content_format: ContentFormat::Json,
            content: serde_json::json!({"slides": [{"title": "a"}]}),
            ..quiz(1)
        };
        let ops = vec![PatchOp::DeleteBlock { target: "slides[0]".into() }];
        assert!(apply_patch(&artifact, &ops).is_err());

        let text_ops = vec![PatchOp::ReplaceText {
            target: "slides[0].title".into(),
            value: serde_json::json!("b"),
        }];
        let patched = apply_patch(&artifact, &text_ops).unwrap();
        assert_eq!(patched["slides"][0]["title"], "b");
    }

    #[test]
    fn empty_op_list_returns_content_unchanged() {
        let artifact = quiz(1);
        let patched = apply_patch(&artifact, &[]).unwrap();
        assert_eq!(patched, artifact.content);
    }

    #[test]
    fn html_element_patch_by_selector() {
        let artifact = Artifact {
            artifact_type: ArtifactType::Interactive,
            content_format: ContentFormat::Html,
            content: serde_json::json!({"elements": {"#title": "Old"}}),
            ..quiz(1)
        };
        let ops = vec![PatchOp::ReplaceText {
            target: "#title".into(),
            value: serde_json::json!("New"),
        }];
        let patched = apply_patch(&artifact, &ops).unwrap();
        assert_eq!(patched["elements"]["#title"], "New");
    }
}
