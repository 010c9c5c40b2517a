//! Property-based tests for dispatch and persistence
//!
//! These tests verify key invariants hold across generated sessions.

use super::testing::{notes_workflow, test_context, NotesStep};
use super::*;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

const STAGES: [&str; 3] = ["kickoff", "notes", "review"];

/// A session positioned at `stage` whose notes step holds `notes`.
fn seeded_session(stage: &str, notes: &[String]) -> Session {
    let snapshot: Snapshot = [(
        "notes".to_string(),
        serde_json::to_value(NotesStep::with_notes(notes.to_vec())).unwrap(),
    )]
    .into_iter()
    .collect();
    Session::restore(notes_workflow(), test_context(), stage, snapshot).unwrap()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_stage() -> impl Strategy<Value = &'static str> {
    prop::sample::select(STAGES.to_vec())
}

fn arb_notes() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Z0-9 ]{1,24}", 0..8)
}

fn arb_foreign_key() -> impl Strategy<Value = String> {
    "[a-z_]{3,12}".prop_filter("must not be a registered stage", |k| {
        !STAGES.contains(&k.as_str())
    })
}

fn arb_payload() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,10}".prop_map(Value::from),
        prop::collection::vec(any::<bool>(), 0..4).prop_map(|v| json!(v)),
    ]
}

fn arb_table() -> impl Strategy<Value = TransitionTable> {
    prop::collection::btree_set("[a-z]{2,6}", 1..6)
        .prop_map(|stages| TransitionTable::linear(stages).unwrap())
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Load(current, Dump()) reproduces an equal dump and the same stage
    #[test]
    fn prop_dump_load_round_trip(stage in arb_stage(), notes in arb_notes()) {
        let original = seeded_session(stage, &notes);
        let dump = original.dump().unwrap();

        let raw = dump.to_json().unwrap();
        let restored = Session::load(notes_workflow(), test_context(), stage, &raw).unwrap();

        prop_assert_eq!(restored.current_name(), stage);
        prop_assert_eq!(restored.dump().unwrap(), dump);
    }

    /// Unknown stage keys are ignored without affecting known ones
    #[test]
    fn prop_unknown_keys_are_ignored(
        notes in arb_notes(),
        foreign in prop::collection::btree_map(arb_foreign_key(), arb_payload(), 0..5),
    ) {
        let mut snapshot = seeded_session("kickoff", &notes).dump().unwrap();
        let expected = snapshot.clone();
        for (key, payload) in foreign {
            snapshot.insert(key, payload);
        }

        let restored = Session::restore(notes_workflow(), test_context(), "kickoff", snapshot);
        prop_assert!(restored.is_ok());
        prop_assert_eq!(restored.unwrap().dump().unwrap(), expected);
    }

    /// Transitions are a deterministic function of the current stage and
    /// failing transitions never move the machine
    #[test]
    fn prop_transitions_are_deterministic(table in arb_table(), steps in 0usize..10) {
        let table = Arc::new(table);
        let mut a = StageMachine::new(table.clone());
        let mut b = StageMachine::new(table.clone());

        for _ in 0..steps {
            let before = a.current().to_string();
            let ra = a.transition().map(str::to_string).map_err(|e| e.kind());
            let rb = b.transition().map(str::to_string).map_err(|e| e.kind());
            prop_assert_eq!(&ra, &rb);
            match ra {
                Ok(next) => prop_assert_eq!(Some(next.as_str()), table.successor(&before)),
                Err(kind) => {
                    prop_assert_eq!(kind, ErrorKind::NoTransition);
                    prop_assert_eq!(a.current(), before.as_str());
                    prop_assert!(table.is_terminal(&before));
                }
            }
        }
    }

    /// SetState accepts exactly the known stages
    #[test]
    fn prop_set_state_membership(table in arb_table(), candidate in "[a-z]{2,6}") {
        let mut fsm = StageMachine::new(Arc::new(table.clone()));
        let result = fsm.set_state(&candidate);
        if table.contains(&candidate) {
            prop_assert!(result.is_ok());
            prop_assert_eq!(fsm.current(), candidate.as_str());
        } else {
            prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::UnknownStage);
            prop_assert_eq!(fsm.current(), table.entry());
        }
    }

    /// A typed projection of a mismatched payload is the zero value
    #[test]
    fn prop_projection_mismatch_is_default(text in "[a-z]{1,10}") {
        let typed = TypedResult::<Vec<u32>>::project(StepResult::new(Value::from(text)));
        prop_assert!(typed.value.is_empty());
    }
}
