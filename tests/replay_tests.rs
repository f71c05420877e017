//! Replay manager integration tests.
//!
//! These tests drive the manager the way a session does: snapshot, record,
//! mutate, then undo by restoring `state_before`.

use chrono::Utc;
use proptest::prelude::*;

use rust_arcade::core::{Payload, StateValue};
use rust_arcade::replay::{ReplayError, ReplayManager, Snapshot};

/// Minimal host: a counter whose state is a map.
struct Counter {
    state: StateValue,
    replay: ReplayManager,
}

impl Counter {
    fn new(max_history: usize) -> Self {
        Self {
            state: StateValue::map().with("value", 0),
            replay: ReplayManager::new(max_history),
        }
    }

    fn value(&self) -> i64 {
        self.state.get_int("value", 0)
    }

    fn add(&mut self, n: i64) {
        let before = Snapshot::new(self.state.clone());
        self.replay.record_action(Utc::now(), "p1", "add", Payload::new(), before);
        let value = self.value() + n;
        self.state = self.state.clone().with("value", value);
    }

    fn undo(&mut self) -> Result<(), ReplayError> {
        let action = self.replay.undo()?;
        self.state = action.state_before.into_state();
        Ok(())
    }
}

#[test]
fn test_undo_restores_previous_state() {
    let mut counter = Counter::new(10);
    counter.add(5);
    counter.add(3);
    assert_eq!(counter.value(), 8);

    counter.undo().unwrap();
    assert_eq!(counter.value(), 5);
    counter.undo().unwrap();
    assert_eq!(counter.value(), 0);
    assert_eq!(counter.undo(), Err(ReplayError::UndoUnavailable));
}

/// Snapshots are unaffected by later mutation of the live state.
#[test]
fn test_snapshot_isolated_from_live_state() {
    let mut counter = Counter::new(10);
    counter.add(1);
    counter.add(1);
    counter.add(1);

    let snapshots: Vec<i64> = counter
        .replay
        .history()
        .map(|a| a.state_before.state().get_int("value", -1))
        .collect();
    assert_eq!(snapshots, vec![0, 1, 2]);
}

/// A new action after undo discards the redo stack.
#[test]
fn test_redo_invalidated_by_new_action() {
    let mut counter = Counter::new(10);
    counter.add(1);
    counter.add(2);
    counter.undo().unwrap();
    assert!(counter.replay.can_redo());

    counter.add(7);

    assert!(!counter.replay.can_redo());
    assert_eq!(counter.replay.redo().unwrap_err(), ReplayError::RedoUnavailable);
}

/// Only the newest `max_history` actions can be undone.
#[test]
fn test_eviction_limits_undo_depth() {
    let mut counter = Counter::new(3);
    for _ in 0..5 {
        counter.add(1);
    }

    let mut undone = 0;
    while counter.undo().is_ok() {
        undone += 1;
    }
    assert_eq!(undone, 3);
    assert_eq!(counter.value(), 2);
}

/// The replay log lists actions oldest first, without snapshots.
#[test]
fn test_replay_log_export() {
    let mut counter = Counter::new(10);
    counter.add(1);
    counter.add(1);

    let log = counter.replay.to_log();
    assert_eq!(log.len(), 2);
    assert!(log.entries.iter().all(|e| e.actor_id == "p1"));
    assert_eq!(log.to_state().as_list().map(|l| l.len()), Some(2));
}

proptest! {
    /// Undoing every recorded action returns to the initial state, and
    /// redoing them all leaves an empty redo stack.
    #[test]
    fn prop_undo_all_returns_to_start(steps in prop::collection::vec(-100i64..100, 1..30)) {
        let mut counter = Counter::new(64);
        for &n in &steps {
            counter.add(n);
        }
        prop_assert_eq!(counter.value(), steps.iter().sum::<i64>());

        for _ in 0..steps.len() {
            counter.undo().unwrap();
        }
        prop_assert_eq!(counter.value(), 0);
        prop_assert_eq!(counter.replay.redo_len(), steps.len());

        for _ in 0..steps.len() {
            counter.replay.redo().unwrap();
        }
        prop_assert!(!counter.replay.can_redo());
        prop_assert_eq!(counter.replay.len(), steps.len());
    }

    /// History never exceeds its bound.
    #[test]
    fn prop_history_bounded(max in 1usize..10, actions in 0usize..40) {
        let mut counter = Counter::new(max);
        for _ in 0..actions {
            counter.add(1);
        }
        prop_assert_eq!(counter.replay.len(), actions.min(max));
    }
}
