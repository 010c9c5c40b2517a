//! Stage name to step constructor mapping

use super::{BoundStep, PersistentStep, Step, StepContext};
use std::collections::BTreeMap;
use std::sync::Arc;

type StatelessCtor = Arc<dyn Fn(&StepContext) -> Box<dyn Step> + Send + Sync>;
type PersistentCtor = Arc<dyn Fn(&StepContext) -> Box<dyn PersistentStep> + Send + Sync>;

#[derive(Clone)]
enum Constructor {
    Stateless(StatelessCtor),
    Persistent(PersistentCtor),
}

impl Constructor {
    fn build(&self, ctx: &StepContext) -> BoundStep {
        match self {
            Self::Stateless(ctor) => BoundStep::Stateless(ctor(ctx)),
            Self::Persistent(ctor) => BoundStep::Persistent(ctor(ctx)),
        }
    }
}

/// Registered step constructors, at most one per stage
#[derive(Clone, Default)]
pub struct StepRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a step with no persisted substate to `stage`.
    pub fn register_stateless<S, F>(&mut self, stage: impl Into<String>, ctor: F) -> &mut Self
    where
        S: Step + 'static,
        F: Fn(&StepContext) -> S + Send + Sync + 'static,
    {
        let ctor: StatelessCtor =
            Arc::new(move |ctx: &StepContext| -> Box<dyn Step> { Box::new(ctor(ctx)) });
        self.insert(stage.into(), Constructor::Stateless(ctor))
    }

    /// Bind a step whose substate is included in session snapshots.
    pub fn register_persistent<S, F>(&mut self, stage: impl Into<String>, ctor: F) -> &mut Self
    where
        S: PersistentStep + 'static,
        F: Fn(&StepContext) -> S + Send + Sync + 'static,
    {
        let ctor: PersistentCtor =
            Arc::new(move |ctx: &StepContext| -> Box<dyn PersistentStep> { Box::new(ctor(ctx)) });
        self.insert(stage.into(), Constructor::Persistent(ctor))
    }

    fn insert(&mut self, stage: String, ctor: Constructor) -> &mut Self {
        if self.constructors.insert(stage.clone(), ctor).is_some() {
            tracing::warn!(stage = %stage, "Replacing previously registered step");
        }
        self
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.constructors.contains_key(stage)
    }

    pub fn is_persistent(&self, stage: &str) -> bool {
        matches!(self.constructors.get(stage), Some(Constructor::Persistent(_)))
    }

    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Build one fresh step per registered stage.
    pub fn instantiate(&self, ctx: &StepContext) -> BTreeMap<String, BoundStep> {
        self.constructors
            .iter()
            .map(|(stage, ctor)| (stage.clone(), ctor.build(ctx)))
            .collect()
    }
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.constructors.iter().map(|(stage, ctor)| {
                let kind = match ctor {
                    Constructor::Stateless(_) => "stateless",
                    Constructor::Persistent(_) => "persistent",
                };
                (stage, kind)
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launchpad::testing::{test_context, NotesStep};
    use crate::steps::EchoStep;

    #[test]
    fn test_instantiate_binds_every_stage() {
        let mut registry = StepRegistry::new();
        registry
            .register_stateless("kickoff", |_| EchoStep)
            .register_persistent("notes", NotesStep::new);

        let steps = registry.instantiate(&test_context());
        assert_eq!(steps.len(), 2);
        assert!(!steps["kickoff"].is_persistent());
        assert!(steps["notes"].is_persistent());
        assert!(registry.is_persistent("notes"));
        assert!(!registry.is_persistent("kickoff"));
        assert!(!registry.is_persistent("missing"));
    }

    #[test]
    fn test_register_replaces_same_stage() {
        let mut registry = StepRegistry::new();
        registry
            .register_persistent("kickoff", NotesStep::new)
            .register_stateless("kickoff", |_| EchoStep);

        assert_eq!(registry.len(), 1);
        assert!(!registry.is_persistent("kickoff"));
    }
}
