//! Persistence manager: save files on disk.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::atomic::atomic_write;
use crate::core::{Payload, PersistenceConfig, StateValue};
use crate::serialization::{serializer_for, SaveEnvelope, SaveFormat, SerializationError};
use crate::session::GameSession;

/// Errors from save/load operations.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// A filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A game type or save name cannot be used in a file name.
    #[error("invalid save name component {0:?}")]
    InvalidName(String),

    /// A save was loaded into a session of a different game.
    #[error("save {path} belongs to game type {found:?}, expected {expected:?}")]
    GameTypeMismatch {
        /// The save file.
        path: PathBuf,
        /// Game type of the receiving session.
        expected: String,
        /// Game type recorded in the save.
        found: String,
    },

    /// The save data could not be encoded or decoded.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// The game rejected the loaded state.
    #[error("game rejected loaded state: {0:#}")]
    Session(anyhow::Error),
}

impl PersistenceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Preview of a save file, read from the envelope header only.
#[derive(Clone, Debug, PartialEq)]
pub struct SaveInfo {
    /// Path of the save file.
    pub path: PathBuf,
    /// Detected on-disk format.
    pub format: SaveFormat,
    /// Envelope layout version.
    pub format_version: u32,
    /// Game type that produced the save.
    pub game_type: String,
    /// When the save was generated.
    pub timestamp: DateTime<Utc>,
    /// Save metadata.
    pub metadata: Payload,
    /// File size in bytes.
    pub size_bytes: u64,
}

/// Reads and writes save files in one directory.
///
/// Files are named `{game_type}_{save_name}.{ext}`. The manager holds no
/// state beyond its directory and default format, so it is cheap to clone
/// and share.
///
/// ## Example
///
/// ```
/// use rust_arcade::core::StateValue;
/// use rust_arcade::persistence::PersistenceManager;
///
/// let dir = tempfile::tempdir().unwrap();
/// let saves = PersistenceManager::new(dir.path());
///
/// let path = saves.save("war", &StateValue::map().with("score", 10), "slot1").unwrap();
/// assert_eq!(saves.list_saves("war").unwrap(), vec![path.clone()]);
///
/// let envelope = saves.load(&path).unwrap();
/// assert_eq!(envelope.state.get_int("score", 0), 10);
/// ```
#[derive(Clone, Debug)]
pub struct PersistenceManager {
    save_dir: PathBuf,
    default_format: SaveFormat,
}

impl PersistenceManager {
    /// Create a manager writing JSON saves under `save_dir`.
    ///
    /// The directory is created on first save.
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            default_format: SaveFormat::default(),
        }
    }

    /// Create a manager from configuration.
    #[must_use]
    pub fn from_config(config: &PersistenceConfig) -> Self {
        Self::new(config.save_dir.clone()).with_format(config.default_format)
    }

    /// Set the default save format (builder pattern).
    #[must_use]
    pub fn with_format(mut self, format: SaveFormat) -> Self {
        self.default_format = format;
        self
    }

    /// The save directory.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// The format used when none is given.
    #[must_use]
    pub fn default_format(&self) -> SaveFormat {
        self.default_format
    }

    /// Path a save would be written to.
    pub fn save_path(
        &self,
        game_type: &str,
        save_name: &str,
        format: SaveFormat,
    ) -> Result<PathBuf, PersistenceError> {
        validate_name(game_type)?;
        validate_name(save_name)?;
        Ok(self
            .save_dir
            .join(format!("{game_type}_{save_name}.{}", format.extension())))
    }

    /// Save a state tree in the default format with no metadata.
    pub fn save(
        &self,
        game_type: &str,
        state: &StateValue,
        save_name: &str,
    ) -> Result<PathBuf, PersistenceError> {
        self.save_with(game_type, state, save_name, Payload::new(), self.default_format)
    }

    /// Save a state tree with metadata in a chosen format.
    pub fn save_with(
        &self,
        game_type: &str,
        state: &StateValue,
        save_name: &str,
        metadata: Payload,
        format: SaveFormat,
    ) -> Result<PathBuf, PersistenceError> {
        let envelope = SaveEnvelope::new(game_type, state.clone()).with_metadata(metadata);
        self.save_envelope(&envelope, save_name, format)
    }

    /// Write a prepared envelope.
    pub fn save_envelope(
        &self,
        envelope: &SaveEnvelope,
        save_name: &str,
        format: SaveFormat,
    ) -> Result<PathBuf, PersistenceError> {
        let path = self.save_path(&envelope.game_type, save_name, format)?;
        let bytes = serializer_for(format).encode(envelope)?;
        atomic_write(&path, &bytes).map_err(|e| PersistenceError::io(&path, e))?;

        debug!(path = %path.display(), %format, bytes = bytes.len(), "wrote save");
        Ok(path)
    }

    /// Save a running game session, including its save metadata.
    pub fn save_session(
        &self,
        session: &dyn GameSession,
        save_name: &str,
        format: Option<SaveFormat>,
    ) -> Result<PathBuf, PersistenceError> {
        self.save_with(
            session.game_type(),
            &session.save_state(),
            save_name,
            session.save_metadata(),
            format.unwrap_or(self.default_format),
        )
    }

    /// Load a save, detecting its format from the file contents.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<SaveEnvelope, PersistenceError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| PersistenceError::io(path, e))?;
        let format = SaveFormat::detect(&bytes).ok_or(SerializationError::UnknownFormat)?;
        let envelope = serializer_for(format).decode(&bytes)?;

        debug!(path = %path.display(), %format, game_type = %envelope.game_type, "loaded save");
        Ok(envelope)
    }

    /// Load a save in a known format, skipping detection.
    pub fn load_as(
        &self,
        path: impl AsRef<Path>,
        format: SaveFormat,
    ) -> Result<SaveEnvelope, PersistenceError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| PersistenceError::io(path, e))?;
        Ok(serializer_for(format).decode(&bytes)?)
    }

    /// Load a save into a game session.
    ///
    /// The session is only touched after the file decoded successfully and
    /// its game type matches.
    pub fn load_session(
        &self,
        path: impl AsRef<Path>,
        session: &mut dyn GameSession,
    ) -> Result<SaveEnvelope, PersistenceError> {
        let path = path.as_ref();
        let envelope = self.load(path)?;

        if envelope.game_type != session.game_type() {
            return Err(PersistenceError::GameTypeMismatch {
                path: path.to_path_buf(),
                expected: session.game_type().to_string(),
                found: envelope.game_type,
            });
        }

        session
            .load_state(&envelope.state)
            .map_err(PersistenceError::Session)?;
        Ok(envelope)
    }

    /// List saves for a game type, newest first.
    ///
    /// Matches files named `{game_type}_*` with a known extension. Order is
    /// by modification time, ties broken by file name (descending). A
    /// missing save directory lists as empty.
    pub fn list_saves(&self, game_type: &str) -> Result<Vec<PathBuf>, PersistenceError> {
        validate_name(game_type)?;
        let prefix = format!("{game_type}_");

        let entries = match fs::read_dir(&self.save_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::io(&self.save_dir, e)),
        };

        let mut saves: Vec<(SystemTime, String, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PersistenceError::io(&self.save_dir, e))?;
            let path = entry.path();

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with(&prefix) {
                continue;
            }
            let known_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(SaveFormat::from_extension)
                .is_some();
            if !known_ext {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable save entry");
                    continue;
                }
            };
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            saves.push((modified, name.to_string(), path));
        }

        saves.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        Ok(saves.into_iter().map(|(_, _, path)| path).collect())
    }

    /// Read the envelope header of a save without decoding its state.
    pub fn get_save_info(&self, path: impl AsRef<Path>) -> Result<SaveInfo, PersistenceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PersistenceError::io(path, e))?;
        let size_bytes = file
            .metadata()
            .map_err(|e| PersistenceError::io(path, e))?
            .len();

        let mut reader = BufReader::new(file);
        let leading = reader.fill_buf().map_err(|e| PersistenceError::io(path, e))?;
        let format = SaveFormat::detect(leading).ok_or(SerializationError::UnknownFormat)?;
        let header = serializer_for(format).read_header(&mut reader)?;

        Ok(SaveInfo {
            path: path.to_path_buf(),
            format,
            format_version: header.format_version,
            game_type: header.game_type,
            timestamp: header.timestamp,
            metadata: header.metadata,
            size_bytes,
        })
    }

    /// Delete a save file.
    pub fn delete_save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        fs::remove_file(path).map_err(|e| PersistenceError::io(path, e))?;
        debug!(path = %path.display(), "deleted save");
        Ok(())
    }
}

/// Reject names that would escape the save directory or break the
/// `{game_type}_{save_name}` pattern.
fn validate_name(name: &str) -> Result<(), PersistenceError> {
    let bad = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.chars().any(|c| c == '/' || c == '\\' || c == '\0');
    if bad {
        Err(PersistenceError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}
