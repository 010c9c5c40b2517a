//! Database schema and record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered schema migrations. Entry `i` moves the schema to version `i + 1`;
/// applied entries must never be edited, only appended to.
pub const MIGRATIONS: &[&str] = &[
    // 1: sessions with the snapshot blob stored next to the current stage
    r"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    current_stage TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
",
    // 2: listing by recency
    r"
CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at DESC);
",
];

/// Persisted session row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub current_stage: String,
    /// Snapshot JSON, opaque to the database
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
