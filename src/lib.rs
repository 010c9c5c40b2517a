//! Launchpad - resumable multi-turn step orchestration
//!
//! A conversation moves through named stages. Each stage is handled by a
//! step; persistable steps keep substate that is dumped to a snapshot after
//! every turn and restored on the next one.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod config;
pub mod db;
pub mod launchpad;
pub mod llm;
pub mod resume;
pub mod service;
pub mod steps;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use launchpad::{
    ErrorKind, Session, SessionError, Snapshot, Step, StepContext, StepError, StepRegistry,
    StepResult, TransitionTable, TypedResult, Workflow,
};
pub use service::{SessionInit, SessionService, Turn};
pub use steps::default_workflow;
