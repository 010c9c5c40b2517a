//! Workflow configuration shared by all sessions

use super::{StepRegistry, TransitionTable};
use std::sync::Arc;

/// Step registry plus transition table, built once at startup
#[derive(Debug, Clone)]
pub struct Workflow {
    registry: StepRegistry,
    table: Arc<TransitionTable>,
}

impl Workflow {
    /// Every registered stage is added to `table`, without a successor if
    /// the table did not name it.
    pub fn new(registry: StepRegistry, table: TransitionTable) -> Self {
        let table = registry.stages().fold(table, |table, stage| {
            if table.contains(stage) {
                table
            } else {
                table.with_stage(stage)
            }
        });
        let workflow = Self {
            registry,
            table: Arc::new(table),
        };
        for stage in workflow.unimplemented_stages() {
            tracing::warn!(stage = %stage, "Stage has no registered step");
        }
        workflow
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn table(&self) -> &Arc<TransitionTable> {
        &self.table
    }

    /// Stages the state machine can reach that have no bound step.
    pub fn unimplemented_stages(&self) -> Vec<&str> {
        self.table
            .stages()
            .filter(|stage| !self.registry.contains(stage))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::EchoStep;

    #[test]
    fn test_unimplemented_stages() {
        let mut registry = StepRegistry::new();
        registry.register_stateless("kickoff", |_| EchoStep);
        let workflow = Workflow::new(
            registry,
            TransitionTable::linear(["kickoff", "review"]).unwrap(),
        );
        assert_eq!(workflow.unimplemented_stages(), vec!["review"]);
        assert_eq!(workflow.table().entry(), "kickoff");
    }

    #[test]
    fn test_registered_stages_join_the_table() {
        let mut registry = StepRegistry::new();
        registry
            .register_stateless("kickoff", |_| EchoStep)
            .register_stateless("archive", |_| EchoStep);
        let workflow = Workflow::new(registry, TransitionTable::new("kickoff"));

        assert!(workflow.table().contains("archive"));
        assert!(workflow.table().is_terminal("archive"));
        assert!(workflow.unimplemented_stages().is_empty());
    }
}
