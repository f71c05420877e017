//! Save formats and format detection.

use serde::{Deserialize, Serialize};

use super::binary::MAGIC;

/// On-disk save format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    /// Human-readable JSON text.
    #[default]
    Json,
    /// Compact framed bincode.
    Binary,
}

impl SaveFormat {
    /// All supported formats.
    pub const ALL: [SaveFormat; 2] = [SaveFormat::Json, SaveFormat::Binary];

    /// File extension (without the dot).
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            SaveFormat::Json => "json",
            SaveFormat::Binary => "sav",
        }
    }

    /// Look up a format by file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// Detect the format from the leading bytes of a save.
    ///
    /// Binary saves start with the magic bytes; JSON saves start with `{`
    /// after optional whitespace.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&MAGIC) {
            return Some(SaveFormat::Binary);
        }
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Some(SaveFormat::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveFormat::Json => write!(f, "json"),
            SaveFormat::Binary => write!(f, "binary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions() {
        assert_eq!(SaveFormat::Json.extension(), "json");
        assert_eq!(SaveFormat::Binary.extension(), "sav");
        assert_eq!(SaveFormat::from_extension("sav"), Some(SaveFormat::Binary));
        assert_eq!(SaveFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_detect() {
        assert_eq!(SaveFormat::detect(b"  \n{\"a\":1}"), Some(SaveFormat::Json));
        assert_eq!(SaveFormat::detect(b"GSAV\x01\x00"), Some(SaveFormat::Binary));
        assert_eq!(SaveFormat::detect(b"hello"), None);
        assert_eq!(SaveFormat::detect(b""), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(SaveFormat::Json.to_string(), "json");
        assert_eq!(SaveFormat::Binary.to_string(), "binary");
    }
}
