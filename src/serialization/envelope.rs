//! Save envelopes: the metadata-wrapped container written to disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Payload, StateValue};

/// Envelope layout version written by this build.
///
/// Loading any other version fails with `UnsupportedVersion`.
pub const ENVELOPE_VERSION: u32 = 1;

/// A complete save: game type, timestamp, metadata and the state tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveEnvelope {
    /// Envelope layout version.
    pub format_version: u32,

    /// Game type that produced the state.
    pub game_type: String,

    /// When the save was generated.
    pub timestamp: DateTime<Utc>,

    /// Open metadata map (player names, turn, play time, ...).
    pub metadata: Payload,

    /// The game's serialized state.
    pub state: StateValue,
}

impl SaveEnvelope {
    /// Wrap a state tree, stamped with the current time.
    pub fn new(game_type: impl Into<String>, state: StateValue) -> Self {
        Self {
            format_version: ENVELOPE_VERSION,
            game_type: game_type.into(),
            timestamp: Utc::now(),
            metadata: Payload::new(),
            state,
        }
    }

    /// Replace the metadata map (builder pattern).
    #[must_use]
    pub fn with_metadata(mut self, metadata: Payload) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add one metadata entry (builder pattern).
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Override the timestamp (builder pattern).
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The envelope without its state.
    #[must_use]
    pub fn header(&self) -> EnvelopeHeader {
        EnvelopeHeader {
            format_version: self.format_version,
            game_type: self.game_type.clone(),
            timestamp: self.timestamp,
            metadata: self.metadata.clone(),
        }
    }
}

/// Everything in an envelope except the state.
///
/// Decoded on its own for save previews.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    /// Envelope layout version.
    pub format_version: u32,

    /// Game type that produced the state.
    pub game_type: String,

    /// When the save was generated.
    pub timestamp: DateTime<Utc>,

    /// Open metadata map.
    pub metadata: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_builder() {
        let envelope = SaveEnvelope::new("war", StateValue::map().with("score", 10))
            .with_meta("player", "alice")
            .with_meta("turn", 3);

        assert_eq!(envelope.format_version, ENVELOPE_VERSION);
        assert_eq!(envelope.game_type, "war");
        assert_eq!(envelope.metadata.len(), 2);
        assert_eq!(envelope.state.get_int("score", 0), 10);
    }

    #[test]
    fn test_header_drops_state() {
        let envelope = SaveEnvelope::new("war", StateValue::map().with("score", 10))
            .with_meta("turn", 3);
        let header = envelope.header();

        assert_eq!(header.game_type, "war");
        assert_eq!(header.timestamp, envelope.timestamp);
        assert_eq!(header.metadata, envelope.metadata);
    }
}
