//! Error types for dispatch, transitions and snapshots

use crate::llm::LlmError;
use thiserror::Error;

/// Errors surfaced by a [`Session`](super::Session)
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("current stage {0:?} is not implemented")]
    StageNotImplemented(String),
    #[error("no transition defined from stage {0:?}")]
    NoTransition(String),
    #[error("unknown stage {0:?}")]
    UnknownStage(String),
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(#[source] serde_json::Error),
    #[error("stage {stage:?} rejected its snapshot: {source}")]
    StageSnapshot {
        stage: String,
        #[source]
        source: StepError,
    },
    #[error("failed to dump stage {stage:?}: {source}")]
    StageDump {
        stage: String,
        #[source]
        source: StepError,
    },
    #[error(transparent)]
    Step(#[from] StepError),
}

/// Coarse classification of a [`SessionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The current stage has no bound step
    StageNotImplemented,
    /// The current stage has no successor
    NoTransition,
    /// A stage identifier outside the known set
    UnknownStage,
    /// The snapshot or a stage payload failed to parse
    MalformedSnapshot,
    /// Raised inside a step
    StepFailure,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StageNotImplemented(_) => ErrorKind::StageNotImplemented,
            Self::NoTransition(_) => ErrorKind::NoTransition,
            Self::UnknownStage(_) => ErrorKind::UnknownStage,
            Self::MalformedSnapshot(_) | Self::StageSnapshot { .. } => ErrorKind::MalformedSnapshot,
            Self::StageDump { .. } | Self::Step(_) => ErrorKind::StepFailure,
        }
    }
}

/// Errors raised by a step's own logic
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid substate: {0}")]
    Substate(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}
