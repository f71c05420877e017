//! Save serialization.
//!
//! Converts a [`SaveEnvelope`] to and from bytes. Two formats sit behind
//! the [`Serializer`] trait:
//!
//! - [`JsonSerializer`]: human-readable JSON text
//! - [`BinarySerializer`]: framed bincode with per-section checksums
//!
//! Loading can detect the format from the first bytes, so callers only
//! pick a format when saving.
//!
//! ## Example
//!
//! ```
//! use rust_arcade::core::StateValue;
//! use rust_arcade::serialization::{decode_auto, serializer_for, SaveEnvelope, SaveFormat};
//!
//! let envelope = SaveEnvelope::new("war", StateValue::map().with("score", 10));
//!
//! for format in SaveFormat::ALL {
//!     let bytes = serializer_for(format).encode(&envelope).unwrap();
//!     let decoded = decode_auto(&bytes).unwrap();
//!     assert_eq!(decoded, envelope);
//! }
//! ```

mod binary;
mod envelope;
mod format;
mod json;

use std::io::Read;

pub use binary::{BinarySerializer, FRAME_SIZE, MAGIC};
pub use envelope::{EnvelopeHeader, SaveEnvelope, ENVELOPE_VERSION};
pub use format::SaveFormat;
pub use json::{JsonSerializer, MAX_JSON_DEPTH};

/// Errors from encoding or decoding save data.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// The data ends before the envelope is complete.
    #[error("save data is truncated: {0}")]
    Truncated(String),

    /// The envelope was written by an unknown layout version.
    #[error("unsupported envelope version {found} (this build reads version {supported})")]
    UnsupportedVersion {
        /// Version found in the data.
        found: u32,
        /// Version this build reads.
        supported: u32,
    },

    /// A stored checksum does not match the data.
    #[error("save data is corrupted: {section} checksum mismatch (expected {expected:#010x}, got {actual:#010x})")]
    ChecksumMismatch {
        /// Which section failed verification.
        section: &'static str,
        /// Checksum stored in the frame.
        expected: u32,
        /// Checksum computed from the data.
        actual: u32,
    },

    /// The data matches no known format.
    #[error("unrecognized save format")]
    UnknownFormat,

    /// The envelope could not be encoded.
    #[error("failed to encode save data: {0}")]
    Encode(String),

    /// The data could not be decoded.
    #[error("failed to decode save data: {0}")]
    Decode(String),
}

/// A save format codec.
pub trait Serializer {
    /// The format this serializer reads and writes.
    fn format(&self) -> SaveFormat;

    /// Encode a complete envelope.
    fn encode(&self, envelope: &SaveEnvelope) -> Result<Vec<u8>, SerializationError>;

    /// Decode a complete envelope.
    fn decode(&self, bytes: &[u8]) -> Result<SaveEnvelope, SerializationError>;

    /// Decode only the envelope header, without building the state.
    fn decode_header(&self, bytes: &[u8]) -> Result<EnvelopeHeader, SerializationError>;

    /// Read only the envelope header from a stream.
    ///
    /// The default reads the whole stream. Formats with a length-prefixed
    /// header override this to stop before the state.
    fn read_header(&self, reader: &mut dyn Read) -> Result<EnvelopeHeader, SerializationError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| SerializationError::Decode(e.to_string()))?;
        self.decode_header(&bytes)
    }
}

static JSON: JsonSerializer = JsonSerializer::new();
static BINARY: BinarySerializer = BinarySerializer::new();

/// Get the serializer for a format.
#[must_use]
pub fn serializer_for(format: SaveFormat) -> &'static dyn Serializer {
    match format {
        SaveFormat::Json => &JSON,
        SaveFormat::Binary => &BINARY,
    }
}

/// Detect the format of `bytes` and decode the envelope.
pub fn decode_auto(bytes: &[u8]) -> Result<SaveEnvelope, SerializationError> {
    let format = SaveFormat::detect(bytes).ok_or(SerializationError::UnknownFormat)?;
    serializer_for(format).decode(bytes)
}

/// Check an envelope version against the one this build reads.
pub(crate) fn check_version(found: u32) -> Result<(), SerializationError> {
    if found == ENVELOPE_VERSION {
        Ok(())
    } else {
        Err(SerializationError::UnsupportedVersion {
            found,
            supported: ENVELOPE_VERSION,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateValue;

    #[test]
    fn test_serializer_for() {
        assert_eq!(serializer_for(SaveFormat::Json).format(), SaveFormat::Json);
        assert_eq!(serializer_for(SaveFormat::Binary).format(), SaveFormat::Binary);
    }

    #[test]
    fn test_decode_auto_unknown() {
        let err = decode_auto(b"not a save").unwrap_err();
        assert!(matches!(err, SerializationError::UnknownFormat));
    }

    #[test]
    fn test_decode_auto_both_formats() {
        let envelope = SaveEnvelope::new("chess", StateValue::map().with("turn", 4))
            .with_meta("white", "alice");

        for format in SaveFormat::ALL {
            let bytes = serializer_for(format).encode(&envelope).unwrap();
            assert_eq!(SaveFormat::detect(&bytes), Some(format));
            assert_eq!(decode_auto(&bytes).unwrap(), envelope);
        }
    }

    #[test]
    fn test_default_read_header() {
        let envelope = SaveEnvelope::new("war", StateValue::Int(1));
        let bytes = JSON.encode(&envelope).unwrap();

        let header = JSON.read_header(&mut bytes.as_slice()).unwrap();
        assert_eq!(header, envelope.header());
    }

    #[test]
    fn test_error_display() {
        let err = SerializationError::UnsupportedVersion { found: 9, supported: 1 };
        let msg = err.to_string();
        assert!(msg.contains('9'), "got: {msg}");

        let err = SerializationError::ChecksumMismatch { section: "state", expected: 1, actual: 2 };
        assert!(err.to_string().contains("state checksum"));
    }
}
