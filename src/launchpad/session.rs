//! Session orchestrator
//!
//! Owns the stage machine and one step per registered stage. Not internally
//! synchronized: callers serialize operations on a single session.

use super::{
    BoundStep, SessionError, Snapshot, StageMachine, StepContext, StepResult, Workflow,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct Session {
    workflow: Arc<Workflow>,
    ctx: StepContext,
    fsm: StageMachine,
    steps: BTreeMap<String, BoundStep>,
}

impl Session {
    /// A blank session at the workflow's entry stage.
    pub fn new(workflow: Arc<Workflow>, ctx: StepContext) -> Self {
        let fsm = StageMachine::new(workflow.table().clone());
        let steps = workflow.registry().instantiate(&ctx);
        Self {
            workflow,
            ctx,
            fsm,
            steps,
        }
    }

    /// Rebuild a session from a stored stage and raw snapshot JSON.
    pub fn load(
        workflow: Arc<Workflow>,
        ctx: StepContext,
        current: &str,
        dump: &str,
    ) -> Result<Self, SessionError> {
        let snapshot = Snapshot::parse(dump)?;
        Self::restore(workflow, ctx, current, snapshot)
    }

    /// Rebuild a session from a stored stage and parsed snapshot.
    ///
    /// `current` must have a registered step. Entries for stages that are
    /// unknown or not persistable are skipped.
    pub fn restore(
        workflow: Arc<Workflow>,
        ctx: StepContext,
        current: &str,
        snapshot: Snapshot,
    ) -> Result<Self, SessionError> {
        if !workflow.registry().contains(current) {
            return Err(SessionError::UnknownStage(current.to_string()));
        }
        let mut session = Self::new(workflow, ctx);
        session.fsm.set_state(current)?;

        let mut restored = 0usize;
        for (stage, state) in snapshot {
            let Some(step) = session.steps.get_mut(&stage).and_then(BoundStep::dumpable_mut)
            else {
                tracing::debug!(stage = %stage, "Ignoring snapshot entry without persistable step");
                continue;
            };
            step.load(state)
                .map_err(|source| SessionError::StageSnapshot { stage, source })?;
            restored += 1;
        }

        tracing::debug!(current = %current, stages = restored, "Session restored");
        Ok(session)
    }

    /// Discard every step and rebuild them blank. The current stage is kept.
    pub fn clear(&mut self) {
        self.steps = self.workflow.registry().instantiate(&self.ctx);
    }

    /// Run the current stage's step with `input`.
    ///
    /// Step errors are returned as-is; the current stage never changes here.
    pub async fn execute(&mut self, input: &str) -> Result<StepResult, SessionError> {
        let stage = self.fsm.current();
        let step = self
            .steps
            .get_mut(stage)
            .ok_or_else(|| SessionError::StageNotImplemented(stage.to_string()))?;

        tracing::debug!(stage = %stage, "Executing step");
        Ok(step.execute(input).await?)
    }

    /// Advance to the next stage.
    pub fn transition(&mut self) -> Result<&str, SessionError> {
        self.fsm.transition()
    }

    /// Current stage and its bound step, if any.
    pub fn current(&self) -> (&str, Option<&BoundStep>) {
        let stage = self.fsm.current();
        (stage, self.steps.get(stage))
    }

    pub fn current_name(&self) -> &str {
        self.fsm.current()
    }

    /// Whether the current stage has no successor.
    pub fn is_terminal(&self) -> bool {
        self.fsm.table().is_terminal(self.fsm.current())
    }

    pub fn step(&self, stage: &str) -> Option<&BoundStep> {
        self.steps.get(stage)
    }

    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    pub fn context(&self) -> &StepContext {
        &self.ctx
    }

    /// Collect the substate of every persistable step.
    ///
    /// Any single failure aborts the dump.
    pub fn dump(&self) -> Result<Snapshot, SessionError> {
        let mut snapshot = Snapshot::new();
        for (stage, step) in &self.steps {
            let Some(step) = step.dumpable() else {
                continue;
            };
            let state = step.dump().map_err(|source| SessionError::StageDump {
                stage: stage.clone(),
                source,
            })?;
            snapshot.insert(stage.clone(), state);
        }
        Ok(snapshot)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("current", &self.fsm.current())
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
