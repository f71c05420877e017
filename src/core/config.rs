//! Runtime configuration.
//!
//! Hosts configure the runtime at startup by providing:
//! - `PersistenceConfig`: where saves live and which format to write
//! - `EventConfig`: event history capacities
//! - `ReplayConfig`: undo depth
//! - `PluginsConfig`: plugin search paths and per-plugin settings
//! - `RuntimeConfig`: combines all configuration
//!
//! Every section has defaults, so a config file only needs the keys it
//! changes. Configs can also be built in code with the `with_*` methods.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::value::{map_from_json, Payload};
use crate::serialization::SaveFormat;

/// Default number of events retained per event type.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Default number of events retained across all types.
pub const DEFAULT_GLOBAL_HISTORY_CAPACITY: usize = 500;

/// Default undo depth.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The config text is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value for {key}: {reason}")]
    Invalid {
        /// Dotted key of the offending value.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Save/load configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Directory holding save files. Created on first save.
    pub save_dir: PathBuf,

    /// Format used when a save call does not name one.
    pub default_format: SaveFormat,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("saves"),
            default_format: SaveFormat::Json,
        }
    }
}

/// Event bus configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Events retained per event type.
    pub history_capacity: usize,

    /// Events retained across all types. Zero disables the global ring.
    pub global_history_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            global_history_capacity: DEFAULT_GLOBAL_HISTORY_CAPACITY,
        }
    }
}

/// Undo/redo configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Maximum number of undoable actions. Older actions are evicted.
    pub max_history: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

/// Plugin discovery configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directories scanned by discovery, in order.
    pub dirs: Vec<PathBuf>,

    /// Per-plugin settings, keyed by plugin name.
    ///
    /// Passed to the plugin's `initialize` call.
    pub settings: FxHashMap<String, serde_json::Map<String, serde_json::Value>>,
}

impl PluginsConfig {
    /// Settings for a plugin as a payload (empty if none configured).
    #[must_use]
    pub fn settings_for(&self, name: &str) -> Payload {
        self.settings
            .get(name)
            .map(map_from_json)
            .unwrap_or_default()
    }
}

/// Complete runtime configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Save/load settings.
    pub persistence: PersistenceConfig,

    /// Event bus settings.
    pub events: EventConfig,

    /// Undo/redo settings.
    pub replay: ReplayConfig,

    /// Plugin settings.
    pub plugins: PluginsConfig,
}

impl RuntimeConfig {
    /// Create a configuration with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check that all values are in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replay.max_history == 0 {
            return Err(ConfigError::Invalid {
                key: "replay.max_history",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.events.history_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "events.history_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Set the save directory.
    #[must_use]
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persistence.save_dir = dir.into();
        self
    }

    /// Set the default save format.
    #[must_use]
    pub fn with_default_format(mut self, format: SaveFormat) -> Self {
        self.persistence.default_format = format;
        self
    }

    /// Set the per-type event history capacity.
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.events.history_capacity = capacity;
        self
    }

    /// Set the global event history capacity.
    #[must_use]
    pub fn with_global_history_capacity(mut self, capacity: usize) -> Self {
        self.events.global_history_capacity = capacity;
        self
    }

    /// Set the undo depth.
    #[must_use]
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.replay.max_history = max_history;
        self
    }

    /// Add a plugin search directory.
    #[must_use]
    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugins.dirs.push(dir.into());
        self
    }
}
