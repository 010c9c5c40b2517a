//! The step contract
//!
//! A [`Step`] consumes one unit of input and produces a [`StepResult`]. Steps
//! that need to survive a restart also implement [`Dumpable`]; which kind a
//! stage binds is decided once, at registration.

use super::{StepError, StepResult};
use crate::llm::LlmService;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Behavior bound to one stage
#[async_trait]
pub trait Step: Send {
    /// Handle one unit of user input.
    async fn execute(&mut self, input: &str) -> Result<StepResult, StepError>;
}

/// Persistable substate
pub trait Dumpable {
    /// Serialize the step's substate.
    fn dump(&self) -> Result<Value, StepError>;

    /// Replace the step's substate with a previously dumped one.
    fn load(&mut self, state: Value) -> Result<(), StepError>;
}

/// A step whose substate survives restarts
pub trait PersistentStep: Step + Dumpable {}

impl<T: Step + Dumpable> PersistentStep for T {}

/// A step instance as held by a session
pub enum BoundStep {
    Stateless(Box<dyn Step>),
    Persistent(Box<dyn PersistentStep>),
}

impl BoundStep {
    pub async fn execute(&mut self, input: &str) -> Result<StepResult, StepError> {
        match self {
            Self::Stateless(step) => step.execute(input).await,
            Self::Persistent(step) => step.execute(input).await,
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    /// The persistable view, if this step has one.
    pub fn dumpable(&self) -> Option<&dyn PersistentStep> {
        match self {
            Self::Stateless(_) => None,
            Self::Persistent(step) => Some(step.as_ref()),
        }
    }

    pub fn dumpable_mut(&mut self) -> Option<&mut dyn PersistentStep> {
        match self {
            Self::Stateless(_) => None,
            Self::Persistent(step) => Some(step.as_mut()),
        }
    }
}

impl std::fmt::Debug for BoundStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stateless(_) => f.write_str("BoundStep::Stateless"),
            Self::Persistent(_) => f.write_str("BoundStep::Persistent"),
        }
    }
}

/// Collaborators handed to step constructors
///
/// Steps keep a clone; the context never owns or refers back to the session.
#[derive(Clone)]
pub struct StepContext {
    llm: Arc<dyn LlmService>,
    session_id: Option<String>,
}

impl StepContext {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self {
            llm,
            session_id: None,
        }
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn llm(&self) -> &Arc<dyn LlmService> {
        &self.llm
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

impl std::fmt::Debug for StepContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("model", &self.llm.model_id())
            .field("session_id", &self.session_id)
            .finish()
    }
}
