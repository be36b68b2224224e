//! Integration tests for gateway-store.
//!
//! These exercise the full on-disk database lifecycle: migrations,
//! conversation session CRUD, artifact versioning and patching, and the
//! in-memory backend, all against a real SQLite file via `tempfile`.

use gateway_store::{
    apply_patch, estimate_tokens, truncate_messages, Artifact, ArtifactStore, ArtifactType,
    CacheLayer, CharHeuristicCounter, ContentFormat, ConversationSession, ConversationStore,
    Database, MemoryConversationStore, Message, PatchOp, SqlSessionStore, StoreError,
    ToolReturnStatus, TruncationConfig,
};

#[tokio::test]
async fn database_open_and_migrate_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let db = Database::open_and_migrate(db_path.clone()).await.unwrap();

    let session_count: i64 = db
        .execute(|conn| {
            let c: i64 = conn.query_row("SELECT count(*) FROM sessions", [], |row| row.get(0))?;
            Ok(c)
        })
        .await
        .unwrap();
    assert_eq!(session_count, 0);

    let artifact_count: i64 = db
        .execute(|conn| {
            let c: i64 = conn.query_row("SELECT count(*) FROM artifacts", [], |row| row.get(0))?;
            Ok(c)
        })
        .await
        .unwrap();
    assert_eq!(artifact_count, 0);

    assert!(db_path.exists());
}

#[tokio::test]
async fn database_open_and_migrate_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_idempotent.db");

    let db1 = Database::open_and_migrate(db_path.clone()).await.unwrap();
    drop(db1);

    let db2 = Database::open_and_migrate(db_path).await.unwrap();
    let count: i64 = db2
        .execute(|conn| {
            let c: i64 = conn.query_row("SELECT count(*) FROM sessions", [], |row| row.get(0))?;
            Ok(c)
        })
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn session_full_lifecycle_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_migrate(dir.path().join("test.db"))
        .await
        .unwrap();
    let store = SqlSessionStore::new(db);

    let mut session = ConversationSession::new("conv-1", "teacher-1");
    session.messages.push(Message::User {
        content: "how many students failed the last quiz?".into(),
        timestamp: 1,
    });
    session.messages.push(Message::ToolCall {
        tool_call_id: "call_1".into(),
        tool_name: "get_student_grades".into(),
        arguments: serde_json::json!({"class_id": "c1"}),
        timestamp: 2,
    });
    session.messages.push(Message::ToolReturn {
        tool_call_id: "call_1".into(),
        tool_name: "get_student_grades".into(),
        result: serde_json::json!({"failed": 3}),
        status: ToolReturnStatus::Ok,
        timestamp: 3,
    });
    session.messages.push(Message::AssistantText {
        content: "3 students failed the last quiz.".into(),
        timestamp: 4,
    });

    store.save(&session).await.unwrap();

    let loaded = store.load("conv-1", "teacher-1").await.unwrap();
    assert_eq!(loaded.messages.len(), 4);
    assert_eq!(loaded.teacher_id, "teacher-1");

    // Saving again with a trimmed history replaces it wholesale.
    let mut trimmed = loaded.clone();
    trimmed.messages.truncate(1);
    store.save(&trimmed).await.unwrap();

    let reloaded = store.load("conv-1", "teacher-1").await.unwrap();
    assert_eq!(reloaded.messages.len(), 1);
}

#[tokio::test]
async fn session_load_of_unknown_conversation_mints_fresh_session() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_migrate(dir.path().join("test.db"))
        .await
        .unwrap();
    let store = SqlSessionStore::new(db);

    let session = store.load("never-seen", "teacher-9").await.unwrap();
    assert!(session.messages.is_empty());
    assert_eq!(session.summarized_message_count, 0);
}

#[tokio::test]
async fn artifact_put_get_and_patch_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_migrate(dir.path().join("test.db"))
        .await
        .unwrap();
    let store = ArtifactStore::new(db);

    let artifact = Artifact {
        artifact_id: "art-quiz-1".into(),
        conversation_id: "conv-1".into(),
        artifact_type: ArtifactType::Quiz,
        content_format: ContentFormat::Json,
        content: serde_json::json!({"questions": ["2+2=?", "3+3=?"]}),
        resources: Vec::new(),
        version: 1,
    };
    store.put(&artifact).await.unwrap();

    let fetched = store.get("art-quiz-1").await.unwrap();
    assert_eq!(fetched.version, 1);

    let patched_content = apply_patch(
        &fetched,
        &[PatchOp::ReplaceText {
            target: "questions[1]".into(),
            value: serde_json::json!("4+4=?"),
        }],
    )
    .unwrap();

    let mut next = fetched;
    next.content = patched_content;
    next.version += 1;
    store.put(&next).await.unwrap();

    let reloaded = store.get("art-quiz-1").await.unwrap();
    assert_eq!(reloaded.version, 2);
    assert_eq!(reloaded.content["questions"][1], "4+4=?");

    let latest = store.latest("conv-1").await.unwrap().unwrap();
    assert_eq!(latest.artifact_id, "art-quiz-1");
}

#[tokio::test]
async fn artifact_not_found_is_a_typed_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_migrate(dir.path().join("test.db"))
        .await
        .unwrap();
    let store = ArtifactStore::new(db);

    let result = store.get("does-not-exist").await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn truncation_applies_to_a_persisted_and_reloaded_history() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_migrate(dir.path().join("test.db"))
        .await
        .unwrap();
    let store = SqlSessionStore::new(db);

    let big = "x".repeat(4000);
    let mut session = ConversationSession::new("conv-long", "teacher-1");
    for i in 0..15 {
        session.messages.push(Message::ToolCall {
            tool_call_id: format!("c{i}"),
            tool_name: "get_teacher_classes".into(),
            arguments: serde_json::json!({}),
            timestamp: i * 2,
        });
        session.messages.push(Message::ToolReturn {
            tool_call_id: format!("c{i}"),
            tool_name: "get_teacher_classes".into(),
            result: serde_json::json!({"data": big}),
            status: ToolReturnStatus::Ok,
            timestamp: i * 2 + 1,
        });
    }
    store.save(&session).await.unwrap();

    let loaded = store.load("conv-long", "teacher-1").await.unwrap();
    let config = TruncationConfig {
        history_token_budget: 4000,
        trigger_ratio: 0.80,
        target_ratio: 0.40,
    };
    let outcome = truncate_messages(loaded.messages, &CharHeuristicCounter, &config, |_| false);

    assert!(outcome.truncated);
    assert!(!outcome.dropped.is_empty());
    assert!(estimate_tokens(&outcome.kept, &CharHeuristicCounter) < estimate_tokens(&outcome.dropped, &CharHeuristicCounter) + 10_000);
}

#[tokio::test]
async fn memory_backend_satisfies_the_same_conversation_store_contract() {
    let store = MemoryConversationStore::new();
    let mut session = ConversationSession::new("conv-mem", "teacher-2");
    session.messages.push(Message::User { content: "hi".into(), timestamp: 1 });
    store.save(&session).await.unwrap();

    let loaded = store.load("conv-mem", "teacher-2").await.unwrap();
    assert_eq!(loaded.messages.len(), 1);

    store.touch("conv-mem").await.unwrap();
}

#[tokio::test]
async fn cache_layer_basic_operations() {
    let cache: CacheLayer<String> = CacheLayer::builder("test-cache")
        .max_capacity(100)
        .ttl_seconds(60)
        .build();

    cache.insert("key1", &"value1".to_string()).await.unwrap();
    let val = cache.get("key1").await;
    assert_eq!(val.as_deref(), Some("value1"));
    assert_eq!(cache.stats().hits(), 1);

    let missing = cache.get("nonexistent").await;
    assert!(missing.is_none());
    assert_eq!(cache.stats().misses(), 1);

    cache.invalidate("key1").await;
    assert!(cache.get("key1").await.is_none());
}
