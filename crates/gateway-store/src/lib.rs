//! # gateway-store
//!
//! Persistence for the conversation gateway: conversation sessions (C2),
//! artifacts (C3), and the supporting cache/db/migration plumbing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  CacheLayer (moka, sub-microsecond hits) │
//! ├─────────────────────────────────────────┤
//! │  ConversationStore (trait)               │
//! │    SqlSessionStore       (SQLite)        │
//! │    MemoryConversationStore (moka, proc)  │
//! │  ArtifactStore (SQLite)                  │
//! │  truncate_messages (token-budget, §4.2)  │
//! ├─────────────────────────────────────────┤
//! │  Database (rusqlite WAL + mmap)          │
//! │  Migrations (versioned, transactional)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use gateway_store::{Database, SqlSessionStore, ArtifactStore};
//!
//! let db = Database::open_and_migrate("data/gateway.db").await?;
//! let sessions = SqlSessionStore::new(db.clone());
//! let artifacts = ArtifactStore::new(db.clone());
//! ```

pub mod artifact;
pub mod cache;
pub mod db;
pub mod error;
pub mod memory_store;
pub mod message;
pub mod migration;
pub mod session;
pub mod truncation;

// ── re-exports ───────────────────────────────────────────────────────

pub use artifact::{
    apply_patch, editability, Artifact, ArtifactResource, ArtifactStore, ArtifactType,
    ContentFormat, Editability, PatchOp, ResourceStorage,
};
pub use cache::{CacheLayer, CacheLayerBuilder, CacheStats};
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use memory_store::MemoryConversationStore;
pub use message::{Message, ToolReturnStatus};
pub use session::{ConversationSession, ConversationStore, SqlSessionStore, SESSION_TTL_SECONDS};
pub use truncation::{
    estimate_tokens, truncate_messages, CharHeuristicCounter, TokenCounter, TruncationConfig,
    TruncationOutcome,
};
