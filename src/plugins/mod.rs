//! Plugin discovery and lifecycle.
//!
//! Game modules are linked into the host and registered by constructor.
//! Manifests on disk describe plugins without running their code; loading
//! constructs, validates and initializes them.
//!
//! ## Key Components
//!
//! - [`Plugin`]: the capability set a game module implements
//! - [`PluginDescriptor`]: name, version, dependencies and load state
//! - [`PluginManifest`]: TOML manifest read by discovery
//! - [`PluginManager`]: catalog, registry and lifecycle operations

mod descriptor;
mod manager;
mod manifest;
mod plugin;

pub use descriptor::{LoadState, PluginDescriptor};
pub use manager::{PluginError, PluginManager};
pub use manifest::{scan_dir, ManifestError, PluginManifest, MANIFEST_SUFFIX, PACKAGE_MANIFEST};
pub use plugin::{Plugin, PluginConfig, PluginConstructor};
