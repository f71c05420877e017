//! Plugin manifests and directory scanning.
//!
//! A plugin directory holds one candidate per entry:
//!
//! - `<name>.plugin.toml`: a single manifest file
//! - `<name>/plugin.toml`: a package directory with a manifest inside
//!
//! Scanning only reads manifests; no plugin code runs.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use super::descriptor::PluginDescriptor;

/// Manifest file suffix for single-file plugins.
pub const MANIFEST_SUFFIX: &str = ".plugin.toml";

/// Manifest file name inside a package directory.
pub const PACKAGE_MANIFEST: &str = "plugin.toml";

/// Errors reading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest is not valid TOML for this schema.
    #[error("malformed manifest {path}: {source}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// TOML decoding error.
        source: toml::de::Error,
    },

    /// The manifest parsed but a required field is empty.
    #[error("invalid manifest {path}: {reason}")]
    Invalid {
        /// Manifest path.
        path: PathBuf,
        /// Which field was rejected.
        reason: String,
    },
}

/// On-disk plugin manifest.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin name.
    pub name: String,
    /// Plugin version string.
    pub version: String,
    /// Author, empty if not given.
    #[serde(default)]
    pub author: String,
    /// Short description, empty if not given.
    #[serde(default)]
    pub description: String,
    /// Names of plugins that must be loaded first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Constructor name. Defaults to `name`.
    #[serde(default)]
    pub entry: Option<String>,
}

impl PluginManifest {
    /// Parse a manifest from TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read and validate a manifest file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::from_toml_str(&text).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let invalid = |reason: &str| ManifestError::Invalid {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        if manifest.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if manifest.version.trim().is_empty() {
            return Err(invalid("version is empty"));
        }
        if manifest.entry.as_deref().is_some_and(|e| e.trim().is_empty()) {
            return Err(invalid("entry is empty"));
        }
        Ok(manifest)
    }

    /// Convert to a descriptor in the `Unloaded` state.
    #[must_use]
    pub fn into_descriptor(self, source: Option<PathBuf>) -> PluginDescriptor {
        let entry = self.entry.unwrap_or_else(|| self.name.clone());
        let mut desc = PluginDescriptor::new(self.name, self.version)
            .with_author(self.author)
            .with_description(self.description)
            .with_entry(entry);
        desc.dependencies.extend(self.dependencies);
        desc.source = source;
        desc
    }
}

/// Read every valid manifest in `dir`, sorted by file name.
///
/// Unreadable or malformed candidates are logged and skipped. A missing
/// or unreadable directory yields an empty list.
pub fn scan_dir(dir: &Path) -> Vec<PluginDescriptor> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "skipping plugin directory");
            return Vec::new();
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| manifest_path(&entry.path()))
        .collect();
    candidates.sort_by(|a, b| candidate_name(a).cmp(candidate_name(b)));

    let mut found = Vec::with_capacity(candidates.len());
    for path in candidates {
        match PluginManifest::from_file(&path) {
            Ok(manifest) => {
                debug!(path = %path.display(), plugin = %manifest.name, "found plugin manifest");
                found.push(manifest.into_descriptor(Some(path)));
            }
            Err(e) => warn!(error = %e, "skipping plugin candidate"),
        }
    }
    found
}

/// Manifest path for a directory entry, if it is a plugin candidate.
fn manifest_path(path: &Path) -> Option<PathBuf> {
    if path.is_dir() {
        let manifest = path.join(PACKAGE_MANIFEST);
        return manifest.is_file().then_some(manifest);
    }
    let name = path.file_name()?.to_str()?;
    (name.ends_with(MANIFEST_SUFFIX) && name.len() > MANIFEST_SUFFIX.len())
        .then(|| path.to_path_buf())
}

/// Name of the directory entry a candidate came from, for ordering.
fn candidate_name(path: &Path) -> &OsStr {
    let entry = if path.file_name() == Some(OsStr::new(PACKAGE_MANIFEST)) {
        path.parent().unwrap_or(path)
    } else {
        path
    };
    entry.file_name().unwrap_or_default()
}
