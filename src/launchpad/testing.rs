//! Test fixtures for the orchestration engine

use super::{Dumpable, Step, StepContext, StepError, StepRegistry, StepResult, TransitionTable, Workflow};
use crate::llm::testing::MockLlmService;
use crate::steps::EchoStep;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn test_context() -> StepContext {
    StepContext::new(Arc::new(MockLlmService::new("test-model")))
}

/// `kickoff` bound to [`EchoStep`], no successor
pub fn echo_workflow() -> Arc<Workflow> {
    let mut registry = StepRegistry::new();
    registry.register_stateless("kickoff", |_| EchoStep);
    Arc::new(Workflow::new(registry, TransitionTable::new("kickoff")))
}

/// `kickoff -> notes -> review`; only `notes` is persistable
pub fn notes_workflow() -> Arc<Workflow> {
    let mut registry = StepRegistry::new();
    registry
        .register_stateless("kickoff", |_| EchoStep)
        .register_persistent("notes", NotesStep::new)
        .register_stateless("review", |_| EchoStep);
    let table = TransitionTable::linear(["kickoff", "notes", "review"]).unwrap();
    Arc::new(Workflow::new(registry, table))
}

/// Persistable step that accumulates every input
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesStep {
    notes: Vec<String>,
}

impl NotesStep {
    pub fn new(_ctx: &StepContext) -> Self {
        Self::default()
    }

    pub fn with_notes(notes: Vec<String>) -> Self {
        Self { notes }
    }
}

#[async_trait]
impl Step for NotesStep {
    async fn execute(&mut self, input: &str) -> Result<StepResult, StepError> {
        if input.trim().is_empty() {
            return Err(StepError::InvalidInput("empty note".to_string()));
        }
        self.notes.push(input.to_string());
        Ok(StepResult::new(json!(self.notes.len())).with_response("noted"))
    }
}

impl Dumpable for NotesStep {
    fn dump(&self) -> Result<Value, StepError> {
        Ok(serde_json::to_value(self)?)
    }

    fn load(&mut self, state: Value) -> Result<(), StepError> {
        *self = serde_json::from_value(state)?;
        Ok(())
    }
}

/// Persistable step whose dump always fails
pub struct BrokenDumpStep;

#[async_trait]
impl Step for BrokenDumpStep {
    async fn execute(&mut self, _input: &str) -> Result<StepResult, StepError> {
        Ok(StepResult::default())
    }
}

impl Dumpable for BrokenDumpStep {
    fn dump(&self) -> Result<Value, StepError> {
        Err(StepError::Other("disk on fire".to_string()))
    }

    fn load(&mut self, _state: Value) -> Result<(), StepError> {
        Ok(())
    }
}
