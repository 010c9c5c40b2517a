//! Stage tracking and transition policy
//!
//! The [`TransitionTable`] is supplied by the integrator. It names every known
//! stage, the entry stage, and at most one successor per stage. The successor
//! depends only on the current stage, so transitions are deterministic.

use super::SessionError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Known stages and their successors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    entry: String,
    stages: BTreeSet<String>,
    edges: BTreeMap<String, String>,
}

impl TransitionTable {
    /// A table containing only `entry`, which has no successor.
    pub fn new(entry: impl Into<String>) -> Self {
        let entry = entry.into();
        let mut stages = BTreeSet::new();
        stages.insert(entry.clone());
        Self {
            entry,
            stages,
            edges: BTreeMap::new(),
        }
    }

    /// A linear pipeline: each stage advances to the next one, the last is terminal.
    ///
    /// Returns `None` for an empty list.
    pub fn linear<I, S>(stages: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut iter = stages.into_iter().map(Into::into);
        let mut table = Self::new(iter.next()?);
        let mut prev = table.entry.clone();
        for stage in iter {
            table = table.with_transition(prev, stage.clone());
            prev = stage;
        }
        Some(table)
    }

    /// Declare a stage without a successor.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stages.insert(stage.into());
        self
    }

    /// Declare `from -> to`, adding both stages. A later edge from the same
    /// stage replaces the earlier one.
    #[must_use]
    pub fn with_transition(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let (from, to) = (from.into(), to.into());
        self.stages.insert(from.clone());
        self.stages.insert(to.clone());
        self.edges.insert(from, to);
        self
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.stages.contains(stage)
    }

    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(String::as_str)
    }

    /// The stage that follows `stage`, if any.
    pub fn successor(&self, stage: &str) -> Option<&str> {
        self.edges.get(stage).map(String::as_str)
    }

    /// Whether `stage` has no outgoing transition.
    pub fn is_terminal(&self, stage: &str) -> bool {
        !self.edges.contains_key(stage)
    }
}

/// Tracks the current stage of one session
#[derive(Debug, Clone)]
pub struct StageMachine {
    table: Arc<TransitionTable>,
    current: String,
}

impl StageMachine {
    /// Start at the table's entry stage.
    pub fn new(table: Arc<TransitionTable>) -> Self {
        let current = table.entry.clone();
        Self { table, current }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Advance to the successor of the current stage.
    ///
    /// On error the current stage is unchanged.
    pub fn transition(&mut self) -> Result<&str, SessionError> {
        let next = self
            .table
            .successor(&self.current)
            .ok_or_else(|| SessionError::NoTransition(self.current.clone()))?
            .to_string();
        tracing::debug!(from = %self.current, to = %next, "Stage transition");
        self.current = next;
        Ok(&self.current)
    }

    /// Force the current stage. Only used when restoring a persisted session.
    pub fn set_state(&mut self, stage: &str) -> Result<(), SessionError> {
        if !self.table.contains(stage) {
            return Err(SessionError::UnknownStage(stage.to_string()));
        }
        stage.clone_into(&mut self.current);
        Ok(())
    }
}
