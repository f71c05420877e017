//! Undo/redo history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::action::{ReplayAction, ReplayLog, Snapshot};
use crate::core::{Payload, ReplayConfig};

/// Errors from undo/redo.
///
/// These are routine: callers check `can_undo`/`can_redo` or treat the
/// error as a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// There is nothing to undo.
    #[error("nothing to undo")]
    UndoUnavailable,

    /// There is nothing to redo.
    #[error("nothing to redo")]
    RedoUnavailable,
}

/// Undo/redo manager over recorded actions.
///
/// The manager never touches game state. `undo` hands back the action so
/// the caller can restore `state_before`; `redo` hands it back so the
/// caller can reapply it.
///
/// ## Invariants
///
/// - `history` holds at most `max_history` actions; the oldest is evicted
///   first and cannot be recovered.
/// - Recording a new action clears the redo stack.
///
/// ## Example
///
/// ```
/// use rust_arcade::core::{Payload, StateValue};
/// use rust_arcade::replay::{ReplayManager, Snapshot};
///
/// let mut replay = ReplayManager::new(10);
/// let before = Snapshot::new(StateValue::Int(0));
/// replay.record_action(chrono::Utc::now(), "alice", "inc", Payload::new(), before);
///
/// let undone = replay.undo().unwrap();
/// assert_eq!(undone.state_before.state(), &StateValue::Int(0));
/// assert!(replay.can_redo());
/// ```
#[derive(Clone, Debug)]
pub struct ReplayManager<S = Snapshot> {
    history: VecDeque<ReplayAction<S>>,
    redo_stack: Vec<ReplayAction<S>>,
    max_history: usize,
}

impl<S: Clone> ReplayManager<S> {
    /// Create a manager keeping at most `max_history` undoable actions.
    ///
    /// Panics if `max_history` is zero.
    #[must_use]
    pub fn new(max_history: usize) -> Self {
        assert!(max_history > 0, "max_history must be at least 1");
        Self {
            history: VecDeque::with_capacity(max_history.min(1024)),
            redo_stack: Vec::new(),
            max_history,
        }
    }

    /// Create a manager from configuration.
    #[must_use]
    pub fn from_config(config: &ReplayConfig) -> Self {
        Self::new(config.max_history)
    }

    /// Record an action from its parts.
    pub fn record_action(
        &mut self,
        timestamp: DateTime<Utc>,
        actor_id: impl Into<String>,
        action_type: impl Into<String>,
        data: Payload,
        state_before: S,
    ) {
        self.record(ReplayAction {
            timestamp,
            actor_id: actor_id.into(),
            action_type: action_type.into(),
            data,
            state_before,
        });
    }

    /// Record an action. Clears the redo stack.
    pub fn record(&mut self, action: ReplayAction<S>) {
        trace!(actor = %action.actor_id, action_type = %action.action_type, "recording action");
        self.push_history(action);
        if !self.redo_stack.is_empty() {
            debug!(discarded = self.redo_stack.len(), "new action invalidated redo stack");
            self.redo_stack.clear();
        }
    }

    fn push_history(&mut self, action: ReplayAction<S>) {
        self.history.push_back(action);
        while self.history.len() > self.max_history {
            if let Some(evicted) = self.history.pop_front() {
                trace!(action_type = %evicted.action_type, "evicted oldest action");
            }
        }
    }

    /// Check if there is an action to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Check if there is an action to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Undo the most recent action.
    ///
    /// Moves it to the redo stack and returns it. The caller restores its
    /// state from `state_before`.
    pub fn undo(&mut self) -> Result<ReplayAction<S>, ReplayError> {
        let action = self.history.pop_back().ok_or(ReplayError::UndoUnavailable)?;
        self.redo_stack.push(action.clone());
        Ok(action)
    }

    /// Redo the most recently undone action.
    ///
    /// Moves it back to the history and returns it for the caller to
    /// reapply.
    pub fn redo(&mut self) -> Result<ReplayAction<S>, ReplayError> {
        let action = self.redo_stack.pop().ok_or(ReplayError::RedoUnavailable)?;
        self.push_history(action.clone());
        Ok(action)
    }

    /// Forget all history and redo state.
    pub fn clear(&mut self) {
        self.history.clear();
        self.redo_stack.clear();
    }

    /// Number of undoable actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Check if there is no undoable action.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Number of redoable actions.
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// The history bound.
    #[must_use]
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Undoable actions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ReplayAction<S>> {
        self.history.iter()
    }

    /// The most recent undoable action.
    #[must_use]
    pub fn last_action(&self) -> Option<&ReplayAction<S>> {
        self.history.back()
    }

    /// Export the undoable history without snapshots.
    #[must_use]
    pub fn to_log(&self) -> ReplayLog {
        ReplayLog {
            entries: self.history.iter().map(ReplayAction::to_entry).collect(),
        }
    }
}

impl<S: Clone> Default for ReplayManager<S> {
    fn default() -> Self {
        Self::from_config(&ReplayConfig::default())
    }
}
