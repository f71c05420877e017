//! Plugin identity and lifecycle state.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where a plugin is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// Known but not active.
    #[default]
    Unloaded,
    /// Initialized and registered.
    Loaded,
    /// The last load attempt failed. May be retried.
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadState::Unloaded => "unloaded",
            LoadState::Loaded => "loaded",
            LoadState::Failed => "failed",
        })
    }
}

/// Metadata and lifecycle state of a plugin.
///
/// ## Example
///
/// ```
/// use rust_arcade::plugins::{LoadState, PluginDescriptor};
///
/// let desc = PluginDescriptor::new("chess", "0.3.1")
///     .with_author("Arcade Team")
///     .with_dependency("boards");
///
/// assert_eq!(desc.entry, "chess");
/// assert!(desc.dependencies.contains("boards"));
/// assert_eq!(desc.load_state, LoadState::Unloaded);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique plugin name.
    pub name: String,

    /// Plugin version.
    pub version: String,

    /// Author, if given.
    pub author: String,

    /// Short description.
    pub description: String,

    /// Names of plugins that must be loaded first.
    pub dependencies: BTreeSet<String>,

    /// Name of the registered constructor that creates the plugin.
    pub entry: String,

    /// Manifest the descriptor was read from. `None` for built-ins.
    pub source: Option<PathBuf>,

    /// Current lifecycle state.
    pub load_state: LoadState,
}

impl PluginDescriptor {
    /// Create a descriptor whose entry is its name.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            entry: name.clone(),
            name,
            version: version.into(),
            author: String::new(),
            description: String::new(),
            dependencies: BTreeSet::new(),
            source: None,
            load_state: LoadState::Unloaded,
        }
    }

    /// Set the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a dependency.
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.insert(name.into());
        self
    }

    /// Set the entry constructor name.
    #[must_use]
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    /// Check if the plugin is loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.load_state == LoadState::Loaded
    }
}

impl fmt::Display for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.load_state)
    }
}
