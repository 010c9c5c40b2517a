//! Built-in stages

mod echo;
mod kickoff;

pub use echo::EchoStep;
pub use kickoff::{KickoffOutput, KickoffStep, KICKOFF};

use crate::launchpad::{StepRegistry, TransitionTable, Workflow};

/// The shipped workflow: a single `kickoff` stage with no successor.
pub fn default_workflow() -> Workflow {
    let mut registry = StepRegistry::new();
    registry.register_persistent(KICKOFF, KickoffStep::new);
    Workflow::new(registry, TransitionTable::new(KICKOFF))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_workflow() {
        let workflow = default_workflow();
        assert_eq!(workflow.table().entry(), KICKOFF);
        assert!(workflow.registry().is_persistent(KICKOFF));
        assert!(workflow.unimplemented_stages().is_empty());
        assert!(workflow.table().is_terminal(KICKOFF));
    }
}
