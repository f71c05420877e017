//! Event types.
//!
//! Events represent things that happen during a session. Event types are
//! an open namespace of strings; [`event_types`] lists the baseline set the
//! runtime itself emits. Games define their own freely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Payload, StateValue};

/// Baseline event type vocabulary.
pub mod event_types {
    /// A session started.
    pub const GAME_START: &str = "GAME_START";
    /// A session reached a terminal state.
    pub const GAME_END: &str = "GAME_END";
    /// A player performed an action.
    pub const PLAYER_MOVE: &str = "PLAYER_MOVE";
    /// Session state changed (after an action, undo, redo or load).
    pub const STATE_CHANGE: &str = "STATE_CHANGE";
    /// A contained failure (for example a failing event handler).
    pub const ERROR: &str = "ERROR";
    /// An action was undone.
    pub const UNDO: &str = "UNDO";
    /// An undone action was reapplied.
    pub const REDO: &str = "REDO";
}

/// An event delivered to subscribers.
///
/// Handlers only ever see `&Event`; once emitted an event is never changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type (for example `PLAYER_MOVE`).
    pub event_type: String,

    /// Event data.
    pub payload: Payload,

    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,

    /// Identifier of the emitter, if any.
    pub source_id: Option<String>,

    /// Per-bus emission counter, starting at 0.
    pub sequence: u64,
}

impl Event {
    /// Create an event stamped with the current time.
    ///
    /// The sequence number is assigned by the bus on emission.
    pub fn new(event_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            timestamp: Utc::now(),
            source_id: None,
            sequence: 0,
        }
    }

    /// Set the source (builder pattern).
    #[must_use]
    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Get a payload value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.payload.get(key)
    }

    /// Check the event type.
    #[must_use]
    pub fn is(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::payload;

    #[test]
    fn test_event_builder() {
        let event = Event::new(event_types::PLAYER_MOVE, payload([("pos", "A1".into())]))
            .with_source("player-1");

        assert!(event.is(event_types::PLAYER_MOVE));
        assert!(!event.is(event_types::ERROR));
        assert_eq!(event.source_id.as_deref(), Some("player-1"));
        assert_eq!(event.get("pos"), Some(&StateValue::Text("A1".into())));
        assert_eq!(event.get("missing"), None);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new("CUSTOM", payload([("n", 3.into())]));
        let json = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, decoded);
    }
}
