//! Two-player War, the reference game.
//!
//! Small enough to read in one sitting, but exercises everything a game
//! plugin needs: seeded setup, validated actions, a terminal state,
//! save/load and save metadata.

mod game;
mod plugin;

pub use game::{WarGame, DEFAULT_DECK_SIZE, GAME_TYPE, PLAY};
pub use plugin::{WarFactory, WarPlugin};
