//! Recorded actions and state snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Payload, StateValue};
use crate::session::Saveable;

/// Immutable capture of a session's state.
///
/// Holds a structurally shared copy of the state tree, so taking a
/// snapshot is cheap and later changes to the live state never show
/// through.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot(StateValue);

impl Snapshot {
    /// Wrap a state tree.
    #[must_use]
    pub fn new(state: StateValue) -> Self {
        Self(state)
    }

    /// Capture the current state of a saveable session.
    #[must_use]
    pub fn capture(source: &(impl Saveable + ?Sized)) -> Self {
        Self(source.save_state())
    }

    /// The captured state.
    #[must_use]
    pub fn state(&self) -> &StateValue {
        &self.0
    }

    /// Unwrap the captured state.
    #[must_use]
    pub fn into_state(self) -> StateValue {
        self.0
    }
}

impl From<StateValue> for Snapshot {
    fn from(state: StateValue) -> Self {
        Self(state)
    }
}

/// One recorded action with the state from just before it was applied.
///
/// `S` is the snapshot type; [`Snapshot`] unless the host keeps its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayAction<S = Snapshot> {
    /// When the action was taken.
    pub timestamp: DateTime<Utc>,

    /// Who took the action.
    pub actor_id: String,

    /// What kind of action it was (game-defined).
    pub action_type: String,

    /// Action parameters.
    pub data: Payload,

    /// State captured strictly before the action was applied.
    pub state_before: S,
}

impl<S> ReplayAction<S> {
    /// Create an action record stamped with the current time.
    pub fn new(
        actor_id: impl Into<String>,
        action_type: impl Into<String>,
        data: Payload,
        state_before: S,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            actor_id: actor_id.into(),
            action_type: action_type.into(),
            data,
            state_before,
        }
    }

    /// The action without its snapshot.
    #[must_use]
    pub fn to_entry(&self) -> ReplayEntry {
        ReplayEntry {
            timestamp: self.timestamp,
            actor_id: self.actor_id.clone(),
            action_type: self.action_type.clone(),
            data: self.data.clone(),
        }
    }
}

/// Snapshot-free record of an action, for exporting replays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayEntry {
    /// When the action was taken.
    pub timestamp: DateTime<Utc>,
    /// Who took the action.
    pub actor_id: String,
    /// What kind of action it was.
    pub action_type: String,
    /// Action parameters.
    pub data: Payload,
}

/// Exportable log of a session's undoable history, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Recorded actions.
    pub entries: Vec<ReplayEntry>,
}

impl ReplayLog {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert to a state tree, for storing inside a save.
    #[must_use]
    pub fn to_state(&self) -> StateValue {
        StateValue::List(
            self.entries
                .iter()
                .map(|e| {
                    StateValue::map()
                        .with("timestamp", e.timestamp.to_rfc3339())
                        .with("actor_id", e.actor_id.as_str())
                        .with("action_type", e.action_type.as_str())
                        .with("data", StateValue::Map(e.data.clone()))
                })
                .collect(),
        )
    }
}
