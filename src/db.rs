//! Session persistence
//!
//! Stores one row per session: the current stage and the snapshot blob.

mod schema;

pub use schema::{SessionRecord, MIGRATIONS};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at the given path. Call [`Self::migrate`]
    /// before use.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    /// Apply pending migrations, returning how many ran.
    ///
    /// The schema version lives in `PRAGMA user_version`, so this is a no-op
    /// on an up-to-date database.
    pub fn migrate(&self) -> DbResult<usize> {
        let mut conn = self.conn()?;
        let current = user_version(&conn)?;

        let mut applied = 0;
        for (version, sql) in (1i64..).zip(MIGRATIONS) {
            if version <= current {
                continue;
            }
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
            applied += 1;
            tracing::info!(version, "Applied database migration");
        }
        Ok(applied)
    }

    /// Current schema version
    pub fn schema_version(&self) -> DbResult<i64> {
        let conn = self.conn()?;
        user_version(&conn)
    }

    // ==================== Session Operations ====================

    /// Get a session by ID, if stored
    pub fn get_session(&self, id: &str) -> DbResult<Option<SessionRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT id, current_stage, state, created_at, updated_at
                 FROM sessions WHERE id = ?1",
                params![id],
                parse_session_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Insert or update a session. `created_at` is kept on update.
    pub fn put_session(&self, id: &str, current_stage: &str, state: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO sessions (id, current_stage, state, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(id) DO UPDATE SET
                current_stage = excluded.current_stage,
                state = excluded.state,
                updated_at = excluded.updated_at",
            params![id, current_stage, state, now],
        )?;
        Ok(())
    }

    /// Delete a session
    pub fn delete_session(&self, id: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DbError::SessionNotFound(id.to_string()));
        }
        Ok(())
    }

    /// List sessions, most recently updated first
    pub fn list_sessions(&self) -> DbResult<Vec<SessionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, current_stage, state, created_at, updated_at
             FROM sessions ORDER BY updated_at DESC, id ASC",
        )?;
        let rows = stmt.query_map([], parse_session_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn user_version(conn: &Connection) -> DbResult<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn parse_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        current_stage: row.get(1)?,
        state: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
