//! War as a loadable plugin.

use std::sync::Arc;

use anyhow::{anyhow, ensure};
use tracing::debug;

use super::game::{WarGame, DEFAULT_DECK_SIZE, GAME_TYPE};
use crate::core::{Payload, StateValue};
use crate::plugins::{Plugin, PluginConfig, PluginDescriptor};
use crate::session::{GameSession, GameSessionFactory};

/// Creates War sessions.
///
/// Creation options (all optional): `deck_size`, `seed`, `player1`,
/// `player2`. Without a seed the deal is random.
#[derive(Clone, Debug)]
pub struct WarFactory {
    deck_size: usize,
}

impl WarFactory {
    /// Create a factory dealing `deck_size` cards per player by default.
    #[must_use]
    pub fn new(deck_size: usize) -> Self {
        Self { deck_size }
    }

    /// Create a game directly, without boxing.
    pub fn create_game(&self, options: &Payload) -> anyhow::Result<WarGame> {
        let deck_size = match options.get("deck_size") {
            Some(v) => size_option(v)?,
            None => self.deck_size,
        };
        let seed = match options.get("seed").map(StateValue::as_int) {
            Some(Some(seed)) => seed as u64,
            Some(None) => return Err(anyhow!("`seed` must be an integer")),
            None => rand::random(),
        };
        let name = |key: &str, default: &str| -> anyhow::Result<String> {
            match options.get(key) {
                Some(v) => v
                    .as_text()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("`{key}` must be text")),
                None => Ok(default.to_string()),
            }
        };

        WarGame::new([name("player1", "player1")?, name("player2", "player2")?], deck_size, seed)
    }
}

impl Default for WarFactory {
    fn default() -> Self {
        Self::new(DEFAULT_DECK_SIZE)
    }
}

impl GameSessionFactory for WarFactory {
    fn game_type(&self) -> &str {
        GAME_TYPE
    }

    fn create(&self, options: &Payload) -> anyhow::Result<Box<dyn GameSession>> {
        Ok(Box::new(self.create_game(options)?))
    }
}

/// Plugin providing [`WarFactory`].
///
/// Reads `deck_size` from its settings.
#[derive(Debug, Default)]
pub struct WarPlugin {
    factory: Arc<WarFactory>,
}

impl WarPlugin {
    /// Plugin name and entry.
    pub const NAME: &'static str = "war";

    /// Constructor for registration with a plugin manager.
    pub fn boxed() -> Box<dyn Plugin> {
        Box::new(Self::default())
    }
}

impl Plugin for WarPlugin {
    fn metadata(&self) -> PluginDescriptor {
        PluginDescriptor::new(Self::NAME, env!("CARGO_PKG_VERSION"))
            .with_author("Arcade Team")
            .with_description("Classic War")
    }

    fn initialize(&mut self, config: &PluginConfig) -> anyhow::Result<()> {
        let deck_size = match config.settings.get("deck_size") {
            Some(v) => size_option(v)?,
            None => DEFAULT_DECK_SIZE,
        };
        debug!(deck_size, "war plugin initialized");
        self.factory = Arc::new(WarFactory::new(deck_size));
        Ok(())
    }

    fn game_factory(&self) -> Arc<dyn GameSessionFactory> {
        self.factory.clone()
    }
}

fn size_option(value: &StateValue) -> anyhow::Result<usize> {
    let size = value
        .as_int()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| anyhow!("`deck_size` must be a positive integer"))?;
    ensure!(
        (1..=DEFAULT_DECK_SIZE).contains(&size),
        "`deck_size` must be 1-{DEFAULT_DECK_SIZE}, got {size}"
    );
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::payload;

    #[test]
    fn test_factory_options() {
        let factory = WarFactory::default();
        let game = factory
            .create_game(&payload([
                ("deck_size", 4.into()),
                ("seed", 3.into()),
                ("player1", "ann".into()),
            ]))
            .unwrap();

        assert_eq!(game.cards_left(), [4, 4]);
        assert_eq!(game.players()[0], "ann");
        assert_eq!(game.players()[1], "player2");
    }

    #[test]
    fn test_factory_rejects_bad_options() {
        let factory = WarFactory::default();
        assert!(factory.create_game(&payload([("deck_size", 0.into())])).is_err());
        assert!(factory.create_game(&payload([("seed", "x".into())])).is_err());
    }

    #[test]
    fn test_plugin_reads_settings() {
        let mut plugin = WarPlugin::default();
        plugin
            .initialize(&PluginConfig::new(payload([("deck_size", 10.into())])))
            .unwrap();

        let game = plugin.game_factory().create(&payload([("seed", 1.into())])).unwrap();
        assert_eq!(game.game_type(), "war");
        assert_eq!(
            game.save_state().get("decks").and_then(|d| d.as_list()).map(|d| d.len()),
            Some(2)
        );
    }

    #[test]
    fn test_plugin_rejects_bad_settings() {
        let mut plugin = WarPlugin::default();
        let err = plugin.initialize(&PluginConfig::new(payload([("deck_size", 99.into())])));
        assert!(err.is_err());
    }
}
