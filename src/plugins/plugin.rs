//! The plugin capability set.

use std::sync::Arc;

use super::descriptor::PluginDescriptor;
use crate::core::Payload;
use crate::session::GameSessionFactory;

/// Settings handed to a plugin at initialization.
///
/// Comes from the `[plugins.settings.<name>]` table of the runtime
/// configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PluginConfig {
    /// Plugin-specific settings.
    pub settings: Payload,
}

impl PluginConfig {
    /// Create a config from settings.
    #[must_use]
    pub fn new(settings: Payload) -> Self {
        Self { settings }
    }
}

/// A game module the runtime can load.
///
/// Plugins are linked into the host and constructed through a registered
/// entry function. Only `metadata` may be called before `initialize`.
pub trait Plugin: Send {
    /// Name, version and dependencies of this plugin.
    fn metadata(&self) -> PluginDescriptor;

    /// Prepare the plugin. An error aborts the load.
    fn initialize(&mut self, config: &PluginConfig) -> anyhow::Result<()>;

    /// Release resources. Called once when the plugin is unloaded.
    fn shutdown(&mut self) {}

    /// Factory for the game sessions this plugin provides.
    fn game_factory(&self) -> Arc<dyn GameSessionFactory>;
}

/// Constructor registered under an entry name.
pub type PluginConstructor = fn() -> Box<dyn Plugin>;
