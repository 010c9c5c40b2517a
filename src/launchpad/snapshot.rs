//! Persisted session snapshot
//!
//! Wire format: a JSON object mapping stage identifiers to that stage's own
//! serialized substate. The current stage travels alongside, not inside.

use super::SessionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, Value>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a stored snapshot. Blank input and `null` mean "nothing to restore".
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let stages: Option<BTreeMap<String, Value>> =
            serde_json::from_str(raw).map_err(SessionError::MalformedSnapshot)?;
        Ok(Self(stages.unwrap_or_default()))
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string(&self.0).map_err(SessionError::MalformedSnapshot)
    }

    pub fn get(&self, stage: &str) -> Option<&Value> {
        self.0.get(stage)
    }

    pub fn insert(&mut self, stage: impl Into<String>, state: Value) {
        self.0.insert(stage.into(), state);
    }

    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Snapshot {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
