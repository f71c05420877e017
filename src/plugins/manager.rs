//! Plugin catalog and lifecycle.

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, error, info, warn};

use super::descriptor::{LoadState, PluginDescriptor};
use super::manifest::scan_dir;
use super::plugin::{Plugin, PluginConfig, PluginConstructor};
use crate::core::PluginsConfig;
use crate::events::panic_message;
use crate::session::GameSessionFactory;

/// Errors from plugin management.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    /// Loading failed. The plugin is left `Failed` and unregistered.
    #[error("failed to load plugin `{name}`: {reason}")]
    PluginLoad {
        /// Plugin that failed.
        name: String,
        /// Why loading failed.
        reason: String,
    },

    /// A plugin with this name is already loaded or registered.
    #[error("plugin `{0}` is already registered")]
    DuplicatePlugin(String),

    /// No plugin with this name is known (or loaded, for lookups).
    #[error("plugin `{0}` not found")]
    PluginNotFound(String),
}

/// Catalog of known plugins and registry of loaded ones.
///
/// Plugins are linked into the host: constructors are registered under
/// entry names, and manifests found by [`discover`](Self::discover) point
/// at those entries. A failing or panicking plugin never takes the manager
/// down; its load fails and it is marked [`LoadState::Failed`].
///
/// Loaded plugins are shut down in reverse load order when the manager is
/// dropped.
///
/// ## Example
///
/// ```
/// use rust_arcade::games::war::WarPlugin;
/// use rust_arcade::plugins::PluginManager;
///
/// let mut plugins = PluginManager::new();
/// plugins.register_builtin(WarPlugin::boxed).unwrap();
/// plugins.load_plugin("war").unwrap();
///
/// let factory = plugins.game_factory("war").unwrap();
/// assert_eq!(factory.game_type(), "war");
/// ```
#[derive(Default)]
pub struct PluginManager {
    /// Known plugins in discovery/registration order.
    catalog: Vec<PluginDescriptor>,
    /// Name -> catalog position.
    index: FxHashMap<String, usize>,
    /// Entry name -> constructor.
    constructors: FxHashMap<String, PluginConstructor>,
    loaded: FxHashMap<String, Box<dyn Plugin>>,
    load_order: Vec<String>,
    config: PluginsConfig,
}

impl PluginManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager using configured directories and settings.
    ///
    /// Nothing is scanned until [`discover_configured`](Self::discover_configured).
    #[must_use]
    pub fn from_config(config: &PluginsConfig) -> Self {
        let mut manager = Self::new();
        manager.config = config.clone();
        manager
    }

    /// Register a constructor under an entry name.
    ///
    /// Replaces any constructor already registered under that name.
    pub fn register_entry(&mut self, entry: impl Into<String>, constructor: PluginConstructor) {
        let entry = entry.into();
        if self.constructors.insert(entry.clone(), constructor).is_some() {
            warn!(entry = %entry, "replaced plugin constructor");
        } else {
            debug!(entry = %entry, "registered plugin constructor");
        }
    }

    /// Register a plugin linked into the host.
    ///
    /// Constructs it once to read its metadata, registers the constructor
    /// under the metadata's entry, and adds the plugin to the catalog. The
    /// plugin is not loaded.
    pub fn register_builtin(
        &mut self,
        constructor: PluginConstructor,
    ) -> Result<PluginDescriptor, PluginError> {
        let mut desc = guarded("metadata", || constructor().metadata()).map_err(|reason| {
            PluginError::PluginLoad {
                name: "<builtin>".to_string(),
                reason,
            }
        })?;
        if self.index.contains_key(&desc.name) {
            return Err(PluginError::DuplicatePlugin(desc.name));
        }

        desc.source = None;
        desc.load_state = LoadState::Unloaded;
        self.register_entry(desc.entry.clone(), constructor);
        self.insert_descriptor(desc.clone());
        Ok(desc)
    }

    /// Scan directories for plugin manifests.
    ///
    /// Newly found plugins are appended to the catalog; a name already in
    /// the catalog keeps its existing entry. Bad candidates and missing
    /// directories are logged and skipped. Returns everything the scan
    /// found, in discovery order.
    pub fn discover<P: AsRef<Path>>(&mut self, dirs: &[P]) -> Vec<PluginDescriptor> {
        let mut found = Vec::new();
        for dir in dirs {
            for desc in scan_dir(dir.as_ref()) {
                if self.index.contains_key(&desc.name) {
                    debug!(plugin = %desc.name, "plugin already known, keeping existing entry");
                } else {
                    self.insert_descriptor(desc.clone());
                }
                found.push(desc);
            }
        }
        info!(found = found.len(), known = self.catalog.len(), "plugin discovery finished");
        found
    }

    /// Scan the configured plugin directories.
    pub fn discover_configured(&mut self) -> Vec<PluginDescriptor> {
        let dirs = self.config.dirs.clone();
        self.discover(dirs.as_slice())
    }

    fn insert_descriptor(&mut self, desc: PluginDescriptor) {
        self.index.insert(desc.name.clone(), self.catalog.len());
        self.catalog.push(desc);
    }

    /// Construct, validate and initialize a known plugin.
    ///
    /// On any failure the plugin is marked `Failed`, nothing is registered,
    /// and the load may be retried later.
    pub fn load_plugin(&mut self, name: &str) -> Result<(), PluginError> {
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| PluginError::PluginNotFound(name.to_string()))?;
        if self.catalog[idx].is_loaded() {
            return Err(PluginError::DuplicatePlugin(name.to_string()));
        }

        match self.instantiate(&self.catalog[idx]) {
            Ok(plugin) => {
                self.loaded.insert(name.to_string(), plugin);
                self.load_order.push(name.to_string());
                let desc = &mut self.catalog[idx];
                desc.load_state = LoadState::Loaded;
                info!(plugin = %desc.name, version = %desc.version, "plugin loaded");
                Ok(())
            }
            Err(reason) => {
                self.catalog[idx].load_state = LoadState::Failed;
                error!(plugin = name, reason = %reason, "plugin failed to load");
                Err(PluginError::PluginLoad {
                    name: name.to_string(),
                    reason,
                })
            }
        }
    }

    fn instantiate(&self, desc: &PluginDescriptor) -> Result<Box<dyn Plugin>, String> {
        let constructor = *self
            .constructors
            .get(&desc.entry)
            .ok_or_else(|| format!("no constructor registered for entry `{}`", desc.entry))?;
        let mut plugin = guarded("constructor", constructor)?;
        let meta = guarded("metadata", || plugin.metadata())?;

        if meta.name != desc.name {
            return Err(format!(
                "entry `{}` provides plugin `{}`",
                desc.entry, meta.name
            ));
        }
        if meta.version.trim().is_empty() {
            return Err("plugin reports an empty version".to_string());
        }
        let missing: BTreeSet<&str> = desc
            .dependencies
            .iter()
            .chain(&meta.dependencies)
            .filter(|dep| !self.loaded.contains_key(dep.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            let missing: Vec<&str> = missing.into_iter().collect();
            return Err(format!("missing dependencies: {}", missing.join(", ")));
        }

        let config = PluginConfig::new(self.config.settings_for(&desc.name));
        guarded("initialize", || plugin.initialize(&config))?
            .map_err(|e| format!("initialize failed: {e:#}"))?;
        Ok(plugin)
    }

    /// Shut down and unregister a loaded plugin.
    ///
    /// Returns false if the plugin was not loaded.
    pub fn unload_plugin(&mut self, name: &str) -> bool {
        let Some(mut plugin) = self.loaded.remove(name) else {
            debug!(plugin = name, "unload of plugin that is not loaded");
            return false;
        };

        let dependents: Vec<&str> = self
            .catalog
            .iter()
            .filter(|d| d.is_loaded() && d.dependencies.contains(name))
            .map(|d| d.name.as_str())
            .collect();
        if !dependents.is_empty() {
            warn!(plugin = name, ?dependents, "unloading plugin that loaded plugins depend on");
        }

        if let Err(reason) = guarded("shutdown", || plugin.shutdown()) {
            error!(plugin = name, reason = %reason, "plugin shutdown failed");
        }
        self.load_order.retain(|n| n != name);
        if let Some(&idx) = self.index.get(name) {
            self.catalog[idx].load_state = LoadState::Unloaded;
        }
        info!(plugin = name, "plugin unloaded");
        true
    }

    /// Unload every loaded plugin, most recently loaded first.
    pub fn shutdown_all(&mut self) {
        while let Some(name) = self.load_order.last().cloned() {
            self.unload_plugin(&name);
        }
    }

    /// A loaded plugin.
    pub fn get_plugin(&self, name: &str) -> Result<&dyn Plugin, PluginError> {
        self.loaded
            .get(name)
            .map(|p| p.as_ref())
            .ok_or_else(|| PluginError::PluginNotFound(name.to_string()))
    }

    /// Game session factory of a loaded plugin.
    pub fn game_factory(&self, name: &str) -> Result<Arc<dyn GameSessionFactory>, PluginError> {
        Ok(self.get_plugin(name)?.game_factory())
    }

    /// Descriptor of a known plugin.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&PluginDescriptor> {
        self.index.get(name).map(|&idx| &self.catalog[idx])
    }

    /// All known plugins in discovery order.
    #[must_use]
    pub fn list_plugins(&self) -> &[PluginDescriptor] {
        &self.catalog
    }

    /// Names of loaded plugins in load order.
    #[must_use]
    pub fn loaded_plugins(&self) -> Vec<&str> {
        self.load_order.iter().map(String::as_str).collect()
    }

    /// Check if a plugin is loaded.
    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("catalog", &self.catalog)
            .field("load_order", &self.load_order)
            .finish_non_exhaustive()
    }
}

/// Run plugin code, turning a panic into an error message.
fn guarded<T>(stage: &str, f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|panic| format!("{stage} panicked: {}", panic_message(panic.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Payload;
    use crate::session::GameSession;

    struct NullFactory;

    impl GameSessionFactory for NullFactory {
        fn game_type(&self) -> &str {
            "null"
        }

        fn create(&self, _options: &Payload) -> anyhow::Result<Box<dyn GameSession>> {
            anyhow::bail!("null game cannot be played")
        }
    }

    struct Stub {
        name: &'static str,
        deps: &'static [&'static str],
        fail_init: bool,
    }

    impl Plugin for Stub {
        fn metadata(&self) -> PluginDescriptor {
            self.deps
                .iter()
                .fold(PluginDescriptor::new(self.name, "1.0"), |d, dep| {
                    d.with_dependency(*dep)
                })
        }

        fn initialize(&mut self, _config: &PluginConfig) -> anyhow::Result<()> {
            anyhow::ensure!(!self.fail_init, "refusing to start");
            Ok(())
        }

        fn game_factory(&self) -> Arc<dyn GameSessionFactory> {
            Arc::new(NullFactory)
        }
    }

    fn base() -> Box<dyn Plugin> {
        Box::new(Stub { name: "base", deps: &[], fail_init: false })
    }

    fn addon() -> Box<dyn Plugin> {
        Box::new(Stub { name: "addon", deps: &["base"], fail_init: false })
    }

    fn broken() -> Box<dyn Plugin> {
        Box::new(Stub { name: "broken", deps: &[], fail_init: true })
    }

    #[test]
    fn test_register_and_load() {
        let mut plugins = PluginManager::new();
        plugins.register_builtin(base).unwrap();

        assert_eq!(plugins.descriptor("base").unwrap().load_state, LoadState::Unloaded);
        plugins.load_plugin("base").unwrap();
        assert_eq!(plugins.descriptor("base").unwrap().load_state, LoadState::Loaded);
        assert_eq!(plugins.loaded_plugins(), vec!["base"]);
    }

    #[test]
    fn test_duplicate_load_rejected() {
        let mut plugins = PluginManager::new();
        plugins.register_builtin(base).unwrap();
        plugins.load_plugin("base").unwrap();

        assert_eq!(
            plugins.load_plugin("base"),
            Err(PluginError::DuplicatePlugin("base".into()))
        );
        assert_eq!(plugins.loaded_plugins().len(), 1);
    }

    #[test]
    fn test_duplicate_builtin_rejected() {
        let mut plugins = PluginManager::new();
        plugins.register_builtin(base).unwrap();
        assert!(matches!(
            plugins.register_builtin(base),
            Err(PluginError::DuplicatePlugin(_))
        ));
    }

    #[test]
    fn test_unknown_plugin() {
        let mut plugins = PluginManager::new();
        assert_eq!(
            plugins.load_plugin("ghost"),
            Err(PluginError::PluginNotFound("ghost".into()))
        );
        assert!(plugins.get_plugin("ghost").is_err());
    }

    #[test]
    fn test_failed_initialize_leaves_nothing() {
        let mut plugins = PluginManager::new();
        plugins.register_builtin(broken).unwrap();

        let err = plugins.load_plugin("broken").unwrap_err();
        assert!(matches!(err, PluginError::PluginLoad { .. }));
        assert_eq!(plugins.descriptor("broken").unwrap().load_state, LoadState::Failed);
        assert!(plugins.get_plugin("broken").is_err());
        assert!(plugins.loaded_plugins().is_empty());
    }

    #[test]
    fn test_dependency_must_be_loaded() {
        let mut plugins = PluginManager::new();
        plugins.register_builtin(base).unwrap();
        plugins.register_builtin(addon).unwrap();

        assert!(plugins.load_plugin("addon").is_err());
        plugins.load_plugin("base").unwrap();
        plugins.load_plugin("addon").unwrap();
        assert_eq!(plugins.loaded_plugins(), vec!["base", "addon"]);
    }

    #[test]
    fn test_unload_not_loaded_is_noop() {
        let mut plugins = PluginManager::new();
        plugins.register_builtin(base).unwrap();
        assert!(!plugins.unload_plugin("base"));
        assert!(!plugins.unload_plugin("ghost"));
    }

    #[test]
    fn test_shutdown_all_reverse_order() {
        let mut plugins = PluginManager::new();
        plugins.register_builtin(base).unwrap();
        plugins.register_builtin(addon).unwrap();
        plugins.load_plugin("base").unwrap();
        plugins.load_plugin("addon").unwrap();

        plugins.shutdown_all();
        assert!(plugins.loaded_plugins().is_empty());
        assert_eq!(plugins.descriptor("addon").unwrap().load_state, LoadState::Unloaded);
    }

    #[test]
    fn test_missing_entry_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("orphan.plugin.toml"),
            "name = \"orphan\"\nversion = \"1\"\n",
        )
        .unwrap();

        let mut plugins = PluginManager::new();
        plugins.discover(&[dir.path()]);
        let err = plugins.load_plugin("orphan").unwrap_err();
        assert!(err.to_string().contains("no constructor"));
    }
}
