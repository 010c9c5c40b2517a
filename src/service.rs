//! Session service
//!
//! Glues a [`Workflow`], the LLM and a [`SessionStore`] together. Every
//! operation loads the session, acts on it and writes it back while holding
//! that session's lock, so turns on one session never interleave. Different
//! sessions proceed independently.

use crate::config::Config;
use crate::db::{Database, DbError};
use crate::launchpad::{Session, SessionError, StepContext, StepResult, Workflow};
use crate::llm::{self, LlmError, LlmService};
use crate::store::{DatabaseStore, SessionStore, StoreError, StoredSession};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

/// Whether a turn started from stored state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInit {
    /// No stored snapshot; the session started at the entry stage
    Fresh,
    /// Rebuilt from a stored snapshot
    Resumed,
}

/// Outcome of one [`SessionService::execute`] call
#[derive(Debug, Clone)]
pub struct Turn {
    /// Stage that handled the input
    pub stage: String,
    pub init: SessionInit,
    pub result: StepResult,
}

pub struct SessionService<S: SessionStore> {
    workflow: Arc<Workflow>,
    llm: Arc<dyn LlmService>,
    store: S,
    locks: LockMap,
}

impl SessionService<DatabaseStore> {
    /// Startup path: prepare the database and the LLM from `config`.
    pub fn open(config: &Config, workflow: Arc<Workflow>) -> Result<Self, ServiceError> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %config.db_path.display(), "Opening database");
        let db = Database::open(&config.db_path)?;
        let applied = db.migrate()?;

        let llm = llm::from_config(&config.llm)?;
        tracing::info!(
            model = %llm.model_id(),
            migrations = applied,
            "Session service ready"
        );

        Ok(Self::new(workflow, llm, DatabaseStore::new(db)))
    }
}

impl<S: SessionStore> SessionService<S> {
    pub fn new(workflow: Arc<Workflow>, llm: Arc<dyn LlmService>, store: S) -> Self {
        Self {
            workflow,
            llm,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn workflow(&self) -> &Arc<Workflow> {
        &self.workflow
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a new session at the entry stage and persist it.
    pub async fn create(&self) -> Result<String, ServiceError> {
        let id = uuid::Uuid::new_v4().to_string();
        let _lock = self.acquire(&id).await;

        let session = self.blank(&id);
        let stage = session.current_name().to_string();
        let stored = stored_session(&session)?;
        self.persist(&id, stored).await?;
        tracing::info!(session_id = %id, stage = %stage, "Created session");
        Ok(id)
    }

    /// Feed `input` to the session's current stage.
    ///
    /// Unknown ids start fresh. Nothing is written if the step fails.
    pub async fn execute(&self, id: &str, input: &str) -> Result<Turn, ServiceError> {
        let _lock = self.acquire(id).await;

        let (mut session, init) = match self.restore(id).await? {
            Some(session) => (session, SessionInit::Resumed),
            None => (self.blank(id), SessionInit::Fresh),
        };
        let stage = session.current_name().to_string();

        let result = session.execute(input).await.inspect_err(|e| {
            tracing::warn!(session_id = %id, stage = %stage, error = %e, "Step failed");
        })?;
        let stored = stored_session(&session)?;
        self.persist(id, stored).await?;

        Ok(Turn {
            stage,
            init,
            result,
        })
    }

    /// Move a stored session to its next stage, returning the new stage.
    pub async fn advance(&self, id: &str) -> Result<String, ServiceError> {
        let _lock = self.acquire(id).await;

        let mut session = self.require(id).await?;
        let stage = session.transition()?.to_string();
        let stored = stored_session(&session)?;
        self.persist(id, stored).await?;
        Ok(stage)
    }

    /// Discard every step's substate. The current stage is kept.
    pub async fn reset(&self, id: &str) -> Result<(), ServiceError> {
        let _lock = self.acquire(id).await;

        let mut session = self.require(id).await?;
        session.clear();
        let stored = stored_session(&session)?;
        self.persist(id, stored).await?;
        tracing::info!(session_id = %id, "Reset session");
        Ok(())
    }

    /// Delete a stored session. Returns whether anything was removed.
    pub async fn remove(&self, id: &str) -> Result<bool, ServiceError> {
        let _lock = self.acquire(id).await;
        Ok(self.store.remove(id).await?)
    }

    /// Current stage of a stored session
    pub async fn stage(&self, id: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.store.load(id).await?.map(|s| s.current_stage))
    }

    /// Wait for exclusive access to `id`. The map entry is shared by every
    /// caller still holding or waiting on it and dropped with the last one.
    async fn acquire(&self, id: &str) -> SessionLock<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(id.to_string()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        SessionLock {
            locks: &self.locks,
            id: id.to_string(),
            guard: Some(guard),
        }
    }

    fn context(&self, id: &str) -> StepContext {
        StepContext::new(self.llm.clone()).with_session_id(id)
    }

    fn blank(&self, id: &str) -> Session {
        Session::new(self.workflow.clone(), self.context(id))
    }

    async fn restore(&self, id: &str) -> Result<Option<Session>, ServiceError> {
        let Some(stored) = self.store.load(id).await? else {
            return Ok(None);
        };
        let session = Session::load(
            self.workflow.clone(),
            self.context(id),
            &stored.current_stage,
            &stored.snapshot,
        )?;
        Ok(Some(session))
    }

    async fn require(&self, id: &str) -> Result<Session, ServiceError> {
        self.restore(id)
            .await?
            .ok_or_else(|| ServiceError::SessionNotFound(id.to_string()))
    }

    async fn persist(&self, id: &str, stored: StoredSession) -> Result<(), ServiceError> {
        self.store.save(id, &stored).await?;
        tracing::debug!(session_id = %id, stage = %stored.current_stage, "Persisted session");
        Ok(())
    }
}

/// Serialize a session for the store. Runs before any await: `Session` is
/// `Send` but not `Sync`, so no borrow of it may live across one.
fn stored_session(session: &Session) -> Result<StoredSession, ServiceError> {
    let snapshot = session.dump()?;
    Ok(StoredSession {
        current_stage: session.current_name().to_string(),
        snapshot: snapshot.to_json()?,
    })
}

type LockMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Exclusive access to one session id
struct SessionLock<'a> {
    locks: &'a LockMap,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Release first so our own clone does not count.
        drop(self.guard.take());
        if locks
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launchpad::testing::notes_workflow;
    use crate::launchpad::ErrorKind;
    use crate::llm::testing::MockLlmService;
    use crate::llm::LlmConfig;
    use crate::store::testing::MemoryStore;
    use serde_json::json;

    fn service() -> SessionService<MemoryStore> {
        SessionService::new(
            notes_workflow(),
            Arc::new(MockLlmService::new("test-model")),
            MemoryStore::new(),
        )
    }

    #[tokio::test]
    async fn test_create_persists_entry_stage() {
        let service = service();
        let id = service.create().await.unwrap();

        let stored = service.store().get(&id).unwrap();
        assert_eq!(stored.current_stage, "kickoff");
        assert_eq!(stored.snapshot, r#"{"notes":{"notes":[]}}"#);
    }

    #[tokio::test]
    async fn test_execute_unknown_id_starts_fresh() {
        let service = service();
        let turn = service.execute("s-1", "hello").await.unwrap();

        assert_eq!(turn.stage, "kickoff");
        assert_eq!(turn.init, SessionInit::Fresh);
        assert_eq!(turn.result.response(), Some("hello"));
        assert!(service.store().get("s-1").is_some());

        let turn = service.execute("s-1", "again").await.unwrap();
        assert_eq!(turn.init, SessionInit::Resumed);
    }

    #[tokio::test]
    async fn test_substate_survives_between_turns() {
        let service = service();
        let id = service.create().await.unwrap();
        assert_eq!(service.advance(&id).await.unwrap(), "notes");

        service.execute(&id, "first").await.unwrap();
        let turn = service.execute(&id, "second").await.unwrap();

        assert_eq!(turn.stage, "notes");
        assert_eq!(turn.result.value, json!(2));
        let stored = service.store().get(&id).unwrap();
        assert_eq!(stored.snapshot, r#"{"notes":{"notes":["first","second"]}}"#);
    }

    #[tokio::test]
    async fn test_failed_execute_persists_nothing() {
        let service = service();
        let id = service.create().await.unwrap();
        service.advance(&id).await.unwrap();
        service.execute(&id, "kept").await.unwrap();
        let before = service.store().get(&id).unwrap();

        let err = service.execute(&id, "   ").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Session(ref e) if e.kind() == ErrorKind::StepFailure
        ));
        assert_eq!(service.store().get(&id).unwrap(), before);
    }

    #[tokio::test]
    async fn test_failed_save_surfaces_store_error() {
        let service = service();
        service.store().fail_saves(true);

        let err = service.execute("s-1", "hello").await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Backend(_))));
        assert!(service.store().get("s-1").is_none());
    }

    #[tokio::test]
    async fn test_advance_past_terminal_stage() {
        let service = service();
        let id = service.create().await.unwrap();
        service.advance(&id).await.unwrap();
        assert_eq!(service.advance(&id).await.unwrap(), "review");

        let err = service.advance(&id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Session(SessionError::NoTransition(ref stage)) if stage == "review"
        ));
        assert_eq!(service.stage(&id).await.unwrap().as_deref(), Some("review"));
    }

    #[tokio::test]
    async fn test_advance_and_reset_require_stored_session() {
        let service = service();
        assert!(matches!(
            service.advance("missing").await,
            Err(ServiceError::SessionNotFound(_))
        ));
        assert!(matches!(
            service.reset("missing").await,
            Err(ServiceError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_clears_substate_keeps_stage() {
        let service = service();
        let id = service.create().await.unwrap();
        service.advance(&id).await.unwrap();
        service.execute(&id, "note").await.unwrap();

        service.reset(&id).await.unwrap();

        let stored = service.store().get(&id).unwrap();
        assert_eq!(stored.current_stage, "notes");
        assert_eq!(stored.snapshot, r#"{"notes":{"notes":[]}}"#);
    }

    #[tokio::test]
    async fn test_malformed_stored_snapshot() {
        let service = service();
        service.store().insert(
            "s-1",
            StoredSession {
                current_stage: "kickoff".to_string(),
                snapshot: "[1, 2]".to_string(),
            },
        );

        let err = service.execute("s-1", "hello").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Session(ref e) if e.kind() == ErrorKind::MalformedSnapshot
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let service = service();
        let id = service.create().await.unwrap();

        assert!(service.remove(&id).await.unwrap());
        assert!(!service.remove(&id).await.unwrap());
        assert_eq!(service.stage(&id).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_turns_on_one_session_serialize() {
        let service = Arc::new(service());
        let id = service.create().await.unwrap();
        service.advance(&id).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                let id = id.clone();
                tokio::spawn(async move { service.execute(&id, &format!("note {i}")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = service.store().get(&id).unwrap();
        let snapshot: serde_json::Value = serde_json::from_str(&stored.snapshot).unwrap();
        assert_eq!(snapshot["notes"]["notes"].as_array().unwrap().len(), 8);
        assert_eq!(lock_count(&service), 0);
    }

    fn lock_count<S: SessionStore>(service: &SessionService<S>) -> usize {
        service.locks.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let service = service();
        for i in 0..50 {
            service.execute(&format!("s-{i}"), "hello").await.unwrap();
        }
        let id = service.create().await.unwrap();
        service.advance(&id).await.unwrap();
        service.execute(&id, "   ").await.unwrap_err();
        assert!(service.advance("missing").await.is_err());

        assert_eq!(lock_count(&service), 0);
    }

    #[tokio::test]
    async fn test_queued_callers_keep_sharing_one_lock() {
        let service = Arc::new(service());
        let id = service.create().await.unwrap();

        let held = service.acquire(&id).await;
        let waiter = {
            let service = service.clone();
            let id = id.clone();
            tokio::spawn(async move { service.remove(&id).await })
        };
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        assert!(!waiter.is_finished());

        // Releasing hands the lock to the queued remove; a newcomer must
        // find that same lock rather than a fresh one.
        drop(held);
        let next = service.locks.lock().unwrap().get(&id).cloned().unwrap();
        assert!(next.try_lock().is_err());

        assert!(waiter.await.unwrap().unwrap());
        drop(next);
        assert!(!service.remove(&id).await.unwrap());
        assert_eq!(lock_count(&service), 0);
    }

    #[tokio::test]
    async fn test_open_prepares_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("nested").join("launchpad.db"),
            log_json: false,
            llm: LlmConfig {
                api_key: Some("sk-test".to_string()),
                model: "gpt-4o-mini".to_string(),
                ..LlmConfig::default()
            },
        };

        let service = SessionService::open(&config, notes_workflow()).unwrap();
        let id = service.create().await.unwrap();
        service.execute(&id, "hello").await.unwrap();

        let records = service.store().inner().list_sessions().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert!(config.db_path.exists());
    }

    #[test]
    fn test_open_without_api_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("launchpad.db"),
            log_json: false,
            llm: LlmConfig::default(),
        };

        let err = SessionService::open(&config, notes_workflow()).err().unwrap();
        assert!(matches!(err, ServiceError::Llm(_)));
    }
}
