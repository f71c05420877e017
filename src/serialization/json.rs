//! JSON text format.
//!
//! Layout:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "game_type": "war",
//!   "timestamp": "2024-01-01T12:00:00Z",
//!   "metadata": { "turn": 3 },
//!   "state": { "score": 10 }
//! }
//! ```
//!
//! State trees are written as natural JSON, so saves are readable and
//! hand-editable. The JSON reader caps nesting, so states deeper than
//! [`MAX_JSON_DEPTH`] are rejected when encoding; the binary format has no
//! such cap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::envelope::{EnvelopeHeader, SaveEnvelope};
use super::format::SaveFormat;
use super::{check_version, SerializationError, Serializer};
use crate::core::{map_from_json, map_to_json, StateValue};

/// Deepest state or metadata nesting the JSON format can read back.
///
/// serde_json refuses input nested 128 levels deep; the envelope object
/// takes one of them.
pub const MAX_JSON_DEPTH: usize = 126;

#[derive(Serialize)]
struct JsonEnvelopeOut<'a> {
    format_version: u32,
    game_type: &'a str,
    timestamp: DateTime<Utc>,
    metadata: Map<String, Value>,
    state: Value,
}

#[derive(Deserialize)]
struct JsonEnvelopeIn {
    game_type: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    metadata: Map<String, Value>,
    state: Value,
}

/// Header-only view; serde skips the `state` field without building it.
#[derive(Deserialize)]
struct JsonHeaderIn {
    game_type: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Deserialize)]
struct JsonVersion {
    format_version: u32,
}

/// Human-readable JSON save format.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Create a serializer that writes indented JSON.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: true }
    }

    /// Create a serializer that writes compact single-line JSON.
    #[must_use]
    pub const fn compact() -> Self {
        Self { pretty: false }
    }
}

fn decode_error(err: serde_json::Error) -> SerializationError {
    if err.is_eof() {
        SerializationError::Truncated(err.to_string())
    } else {
        SerializationError::Decode(err.to_string())
    }
}

fn non_finite(what: &str) -> SerializationError {
    SerializationError::Encode(format!("{what} contains a non-finite float"))
}

fn check_depth(what: &str, depth: usize) -> Result<(), SerializationError> {
    if depth > MAX_JSON_DEPTH {
        return Err(SerializationError::Encode(format!(
            "{what} is nested {depth} levels deep, JSON saves allow {MAX_JSON_DEPTH}"
        )));
    }
    Ok(())
}

impl Serializer for JsonSerializer {
    fn format(&self) -> SaveFormat {
        SaveFormat::Json
    }

    fn encode(&self, envelope: &SaveEnvelope) -> Result<Vec<u8>, SerializationError> {
        check_depth("state", envelope.state.depth())?;
        let metadata_depth = 1 + envelope
            .metadata
            .values()
            .map(StateValue::depth)
            .max()
            .unwrap_or(0);
        check_depth("metadata", metadata_depth)?;

        let out = JsonEnvelopeOut {
            format_version: envelope.format_version,
            game_type: &envelope.game_type,
            timestamp: envelope.timestamp,
            metadata: map_to_json(&envelope.metadata).ok_or_else(|| non_finite("metadata"))?,
            state: envelope.state.to_json().ok_or_else(|| non_finite("state"))?,
        };

        let result = if self.pretty {
            serde_json::to_vec_pretty(&out)
        } else {
            serde_json::to_vec(&out)
        };
        result.map_err(|e| SerializationError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<SaveEnvelope, SerializationError> {
        // Version first, so a future layout reports a version error rather
        // than a missing field.
        let version: JsonVersion = serde_json::from_slice(bytes).map_err(decode_error)?;
        check_version(version.format_version)?;

        let envelope: JsonEnvelopeIn = serde_json::from_slice(bytes).map_err(decode_error)?;
        Ok(SaveEnvelope {
            format_version: version.format_version,
            game_type: envelope.game_type,
            timestamp: envelope.timestamp,
            metadata: map_from_json(&envelope.metadata),
            state: StateValue::from_json(&envelope.state),
        })
    }

    fn decode_header(&self, bytes: &[u8]) -> Result<EnvelopeHeader, SerializationError> {
        let version: JsonVersion = serde_json::from_slice(bytes).map_err(decode_error)?;
        check_version(version.format_version)?;

        let header: JsonHeaderIn = serde_json::from_slice(bytes).map_err(decode_error)?;
        Ok(EnvelopeHeader {
            format_version: version.format_version,
            game_type: header.game_type,
            timestamp: header.timestamp,
            metadata: map_from_json(&header.metadata),
        })
    }
}
