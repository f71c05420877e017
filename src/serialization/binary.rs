//! Compact binary format.
//!
//! Frame layout (24 bytes, little-endian), followed by two bincode sections:
//!
//! ```text
//! [0..4]   Magic bytes "GSAV"
//! [4..8]   Envelope version (u32)
//! [8..12]  Header section length (u32)
//! [12..16] State section length (u32)
//! [16..20] xxHash32 of the header section (u32)
//! [20..24] xxHash32 of the state section (u32)
//! [header section: game_type, timestamp, metadata]
//! [state section: StateValue]
//! ```
//!
//! The header section is length-prefixed and checksummed on its own, so a
//! preview reads and verifies only the first `24 + header_len` bytes.

use std::io::{ErrorKind, Read};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh32::xxh32;

use super::envelope::{EnvelopeHeader, SaveEnvelope};
use super::format::SaveFormat;
use super::{check_version, SerializationError, Serializer};
use crate::core::{Payload, StateValue};

/// Magic bytes identifying a binary save.
pub const MAGIC: [u8; 4] = *b"GSAV";

/// Size of the fixed frame in bytes.
pub const FRAME_SIZE: usize = 24;

const XXHASH_SEED: u32 = 0;

#[derive(Serialize)]
struct HeaderSectionOut<'a> {
    game_type: &'a str,
    timestamp: DateTime<Utc>,
    metadata: &'a Payload,
}

#[derive(Deserialize)]
struct HeaderSectionIn {
    game_type: String,
    timestamp: DateTime<Utc>,
    metadata: Payload,
}

/// Parsed fixed-size frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Frame {
    version: u32,
    header_len: u32,
    state_len: u32,
    header_checksum: u32,
    state_checksum: u32,
}

impl Frame {
    fn parse(bytes: &[u8]) -> Result<Self, SerializationError> {
        if bytes.len() < FRAME_SIZE {
            return Err(SerializationError::Truncated(format!(
                "binary save is {} bytes, frame needs {FRAME_SIZE}",
                bytes.len()
            )));
        }
        if bytes[..4] != MAGIC {
            return Err(SerializationError::UnknownFormat);
        }

        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        let frame = Self {
            version: word(4),
            header_len: word(8),
            state_len: word(12),
            header_checksum: word(16),
            state_checksum: word(20),
        };
        check_version(frame.version)?;
        Ok(frame)
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.header_len.to_le_bytes());
        out.extend_from_slice(&self.state_len.to_le_bytes());
        out.extend_from_slice(&self.header_checksum.to_le_bytes());
        out.extend_from_slice(&self.state_checksum.to_le_bytes());
    }
}

fn section_len(len: usize, section: &str) -> Result<u32, SerializationError> {
    u32::try_from(len)
        .map_err(|_| SerializationError::Encode(format!("{section} section exceeds 4 GiB")))
}

fn verify(section: &'static str, data: &[u8], expected: u32) -> Result<(), SerializationError> {
    let actual = xxh32(data, XXHASH_SEED);
    if actual == expected {
        Ok(())
    } else {
        Err(SerializationError::ChecksumMismatch {
            section,
            expected,
            actual,
        })
    }
}

fn decode_header_section(
    frame: &Frame,
    data: &[u8],
) -> Result<EnvelopeHeader, SerializationError> {
    verify("header", data, frame.header_checksum)?;
    let header: HeaderSectionIn =
        bincode::deserialize(data).map_err(|e| SerializationError::Decode(e.to_string()))?;
    Ok(EnvelopeHeader {
        format_version: frame.version,
        game_type: header.game_type,
        timestamp: header.timestamp,
        metadata: header.metadata,
    })
}

/// Compact framed bincode save format.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinarySerializer;

impl BinarySerializer {
    /// Create a binary serializer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Serializer for BinarySerializer {
    fn format(&self) -> SaveFormat {
        SaveFormat::Binary
    }

    fn encode(&self, envelope: &SaveEnvelope) -> Result<Vec<u8>, SerializationError> {
        let header = bincode::serialize(&HeaderSectionOut {
            game_type: &envelope.game_type,
            timestamp: envelope.timestamp,
            metadata: &envelope.metadata,
        })
        .map_err(|e| SerializationError::Encode(e.to_string()))?;
        let state = bincode::serialize(&envelope.state)
            .map_err(|e| SerializationError::Encode(e.to_string()))?;

        let frame = Frame {
            version: envelope.format_version,
            header_len: section_len(header.len(), "header")?,
            state_len: section_len(state.len(), "state")?,
            header_checksum: xxh32(&header, XXHASH_SEED),
            state_checksum: xxh32(&state, XXHASH_SEED),
        };

        let mut out = Vec::with_capacity(FRAME_SIZE + header.len() + state.len());
        frame.write(&mut out);
        out.extend_from_slice(&header);
        out.extend_from_slice(&state);
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<SaveEnvelope, SerializationError> {
        let frame = Frame::parse(bytes)?;

        let header_end = FRAME_SIZE + frame.header_len as usize;
        let state_end = header_end + frame.state_len as usize;
        if bytes.len() < state_end {
            return Err(SerializationError::Truncated(format!(
                "binary save is {} bytes, frame declares {state_end}",
                bytes.len()
            )));
        }
        if bytes.len() > state_end {
            return Err(SerializationError::Decode(format!(
                "{} trailing bytes after state section",
                bytes.len() - state_end
            )));
        }

        let header = decode_header_section(&frame, &bytes[FRAME_SIZE..header_end])?;

        let state_bytes = &bytes[header_end..state_end];
        verify("state", state_bytes, frame.state_checksum)?;
        let state: StateValue = bincode::deserialize(state_bytes)
            .map_err(|e| SerializationError::Decode(e.to_string()))?;

        Ok(SaveEnvelope {
            format_version: header.format_version,
            game_type: header.game_type,
            timestamp: header.timestamp,
            metadata: header.metadata,
            state,
        })
    }

    fn decode_header(&self, bytes: &[u8]) -> Result<EnvelopeHeader, SerializationError> {
        let frame = Frame::parse(bytes)?;
        let header_end = FRAME_SIZE + frame.header_len as usize;
        if bytes.len() < header_end {
            return Err(SerializationError::Truncated(format!(
                "binary save is {} bytes, header ends at {header_end}",
                bytes.len()
            )));
        }
        decode_header_section(&frame, &bytes[FRAME_SIZE..header_end])
    }

    fn read_header(&self, reader: &mut dyn Read) -> Result<EnvelopeHeader, SerializationError> {
        let read_error = |e: std::io::Error| {
            if e.kind() == ErrorKind::UnexpectedEof {
                SerializationError::Truncated(e.to_string())
            } else {
                SerializationError::Decode(e.to_string())
            }
        };

        let mut frame_bytes = [0u8; FRAME_SIZE];
        reader.read_exact(&mut frame_bytes).map_err(read_error)?;
        let frame = Frame::parse(&frame_bytes)?;

        // The declared length is untrusted; read at most that many bytes.
        let mut header = Vec::new();
        reader
            .take(u64::from(frame.header_len))
            .read_to_end(&mut header)
            .map_err(read_error)?;
        if header.len() < frame.header_len as usize {
            return Err(SerializationError::Truncated(format!(
                "header section is {} bytes, frame declares {}",
                header.len(),
                frame.header_len
            )));
        }
        decode_header_section(&frame, &header)
    }
}
