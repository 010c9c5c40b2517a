//! Storage abstraction for session snapshots
//!
//! The service talks to a [`SessionStore`]; [`DatabaseStore`] backs it with
//! SQLite and tests use an in-memory map.

use crate::db::{Database, DbError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// What the store keeps per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub current_stage: String,
    /// Raw snapshot JSON
    pub snapshot: String,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Storage for session snapshots
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a stored session, if any
    async fn load(&self, id: &str) -> Result<Option<StoredSession>, StoreError>;

    /// Create or overwrite a stored session
    async fn save(&self, id: &str, session: &StoredSession) -> Result<(), StoreError>;

    /// Remove a stored session. Returns whether anything was removed.
    async fn remove(&self, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn load(&self, id: &str) -> Result<Option<StoredSession>, StoreError> {
        (**self).load(id).await
    }

    async fn save(&self, id: &str, session: &StoredSession) -> Result<(), StoreError> {
        (**self).save(id, session).await
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        (**self).remove(id).await
    }
}

/// Adapter to use [`Database`] as a [`SessionStore`]
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl SessionStore for DatabaseStore {
    async fn load(&self, id: &str) -> Result<Option<StoredSession>, StoreError> {
        let record = self.db.get_session(id)?;
        Ok(record.map(|r| StoredSession {
            current_stage: r.current_stage,
            snapshot: r.state,
        }))
    }

    async fn save(&self, id: &str, session: &StoredSession) -> Result<(), StoreError> {
        self.db
            .put_session(id, &session.current_stage, &session.snapshot)?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        match self.db.delete_session(id) {
            Ok(()) => Ok(true),
            Err(DbError::SessionNotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DatabaseStore {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        DatabaseStore::new(db)
    }

    #[tokio::test]
    async fn test_database_store_round_trip() {
        let store = store();
        assert!(store.load("s-1").await.unwrap().is_none());

        let session = StoredSession {
            current_stage: "kickoff".to_string(),
            snapshot: r#"{"kickoff":{"transcript":[]}}"#.to_string(),
        };
        store.save("s-1", &session).await.unwrap();
        assert_eq!(store.load("s-1").await.unwrap(), Some(session));
        assert_eq!(store.inner().list_sessions().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_database_store_remove() {
        let store = Arc::new(store());
        let session = StoredSession {
            current_stage: "kickoff".to_string(),
            snapshot: "{}".to_string(),
        };
        store.save("s-1", &session).await.unwrap();

        assert!(store.remove("s-1").await.unwrap());
        assert!(!store.remove("s-1").await.unwrap());
        assert!(store.load("s-1").await.unwrap().is_none());
    }
}
