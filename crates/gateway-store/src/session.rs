//! Conversation session persistence (C2).
//!
//! A [`ConversationSession`] owns its ordered [`Message`] list plus summary
//! state. [`ConversationStore`] is the single interface two backends share —
//! [`SqlSessionStore`] (this module, SQLite-backed, cross-process) and
//! [`crate::memory_store::MemoryConversationStore`] (in-process, `moka`).
//! Selection between them is a deployment config choice; callers never see
//! which one they hold.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::message::Message;

/// Sliding idle TTL: a session with no activity for this long is eligible
/// for expiry by either backend.
pub const SESSION_TTL_SECONDS: i64 = 30 * 60;

/// The persisted state of one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSession {
    pub conversation_id: String,
    pub teacher_id: String,
    pub messages: Vec<Message>,
    pub summary: Option<String>,
    pub summarized_message_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ConversationSession {
    /// A fresh, empty session minted for a conversation with no prior history.
    pub fn new(conversation_id: impl Into<String>, teacher_id: impl Into<String>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            conversation_id: conversation_id.into(),
            teacher_id: teacher_id.into(),
            messages: Vec::new(),
            summary: None,
            summarized_message_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the session's idle TTL has elapsed as of `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        now - self.updated_at > SESSION_TTL_SECONDS
    }
}

/// The interface shared by every Conversation Store backend.
///
/// `load` never fails on a missing conversation — it returns a fresh,
/// empty session — only on an actual storage error.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, conversation_id: &str, teacher_id: &str) -> StoreResult<ConversationSession>;
    async fn save(&self, session: &ConversationSession) -> StoreResult<()>;
    async fn touch(&self, conversation_id: &str) -> StoreResult<()>;
}

/// SQLite-backed [`ConversationStore`] — the cross-process, production backend.
#[derive(Clone)]
pub struct SqlSessionStore {
    db: Database,
}

impl SqlSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationStore for SqlSessionStore {
    #[instrument(skip(self))]
    async fn load(&self, conversation_id: &str, teacher_id: &str) -> StoreResult<ConversationSession> {
        let conversation_id = conversation_id.to_string();
        let teacher_id = teacher_id.to_string();

        let found = self
            .db
            .execute({
                let conversation_id = conversation_id.clone();
                move |conn| {
                    let row = conn.query_row(
                        "SELECT teacher_id, summary, summarized_message_count, created_at, updated_at \
                         FROM sessions WHERE conversation_id = ?1",
                        rusqlite::params![conversation_id],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, Option<String>>(1)?,
                                row.get::<_, i64>(2)?,
                                row.get::<_, i64>(3)?,
                                row.get::<_, i64>(4)?,
                            ))
                        },
                    );
                    match row {
                        Ok(row) => Ok(Some(row)),
                        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                        Err(e) => Err(StoreError::Sqlite(e)),
                    }
                }
            })
            .await?;

        let Some((_teacher_id, summary, summarized_message_count, created_at, updated_at)) = found
        else {
            debug!(conversation_id = %conversation_id, "no existing session, minting empty one");
            return Ok(ConversationSession::new(conversation_id, teacher_id));
        };

        let raw_messages: Vec<String> = self
            .db
            .execute({
                let conversation_id = conversation_id.clone();
                move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT payload FROM session_messages \
                         WHERE conversation_id = ?1 ORDER BY created_at ASC, id ASC",
                    )?;
                    let rows = stmt
                        .query_map(rusqlite::params![conversation_id], |row| row.get(0))?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(rows)
                }
            })
            .await?;

        let messages = raw_messages
            .iter()
            .map(|s| serde_json::from_str(s))
            .collect::<Result<Vec<Message>, _>>()?;

        Ok(ConversationSession {
            conversation_id,
            teacher_id,
            messages,
            summary,
            summarized_message_count,
            created_at,
            updated_at,
        })
    }

    #[instrument(skip(self, session))]
    async fn save(&self, session: &ConversationSession) -> StoreResult<()> {
        let conversation_id = session.conversation_id.clone();
        let teacher_id = session.teacher_id.clone();
        let summary = session.summary.clone();
        let summarized_message_count = session.summarized_message_count;
        let created_at = session.created_at;
        let updated_at = Utc::now().timestamp();
        let payloads = session
            .messages
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        self.db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;

                tx.execute(
                    "INSERT INTO sessions (conversation_id, teacher_id, summary, summarized_message_count, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                     ON CONFLICT(conversation_id) DO UPDATE SET \
                        teacher_id = excluded.teacher_id, \
                        summary = excluded.summary, \
                        summarized_message_count = excluded.summarized_message_count, \
                        updated_at = excluded.updated_at",
                    rusqlite::params![
                        conversation_id,
                        teacher_id,
                        summary,
                        summarized_message_count,
                        created_at,
                        updated_at
                    ],
                )?;

                // Messages are replaced wholesale: the session always owns its
                // full ordered list, and a turn's commit step hands us that
                // list post-truncation, so there is nothing to append here.
                tx.execute(
                    "DELETE FROM session_messages WHERE conversation_id = ?1",
                    rusqlite::params![conversation_id],
                )?;

                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO session_messages (conversation_id, payload, created_at) VALUES (?1, ?2, ?3)",
                    )?;
                    for (i, payload) in payloads.iter().enumerate() {
                        let ts = updated_at + i as i64;
                        stmt.execute(rusqlite::params![conversation_id, payload, ts])?;
                    }
                }

                tx.commit()?;
                Ok(())
            })
            .await?;

        debug!(conversation_id = %session.conversation_id, messages = session.messages.len(), "session saved");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn touch(&self, conversation_id: &str) -> StoreResult<()> {
        let conversation_id = conversation_id.to_string();
        let now = Utc::now().timestamp();
        self.db
            .execute(move |conn| {
                let updated = conn.execute(
                    "UPDATE sessions SET updated_at = ?2 WHERE conversation_id = ?1",
                    rusqlite::params![conversation_id, now],
                )?;
                if updated == 0 {
                    return Err(StoreError::NotFound {
                        entity: "session",
                        id: conversation_id,
                    });
                }
                Ok(())
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────
