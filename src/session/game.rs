//! Capabilities a game implements to run inside the runtime.

use crate::core::{Payload, StateValue};

/// State that can be captured and restored.
///
/// `save_state` must capture everything needed to resume: loading what it
/// returned has to reproduce an equivalent game.
pub trait Saveable {
    /// Capture the current state.
    fn save_state(&self) -> StateValue;

    /// Replace the current state with a captured one.
    ///
    /// Implementations validate before mutating, so a rejected state leaves
    /// the game unchanged.
    fn load_state(&mut self, state: &StateValue) -> anyhow::Result<()>;
}

/// A running game.
pub trait GameSession: Saveable {
    /// Game type identifier, used to name and match save files.
    fn game_type(&self) -> &str;

    /// Apply one player action.
    ///
    /// A rejected action returns an error; the caller restores the state
    /// captured before the call.
    fn apply_action(&mut self, actor_id: &str, action_type: &str, data: &Payload)
        -> anyhow::Result<()>;

    /// Check if the game has reached a terminal state.
    fn is_finished(&self) -> bool {
        false
    }

    /// Metadata stored in the header of a save (scores, turn number).
    fn save_metadata(&self) -> Payload {
        Payload::new()
    }
}

/// Creates game sessions. Exposed by plugins.
pub trait GameSessionFactory: Send + Sync {
    /// Game type of the sessions this factory creates.
    fn game_type(&self) -> &str;

    /// Create a new session from creation options.
    fn create(&self, options: &Payload) -> anyhow::Result<Box<dyn GameSession>>;
}

impl<G: Saveable + ?Sized> Saveable for Box<G> {
    fn save_state(&self) -> StateValue {
        (**self).save_state()
    }

    fn load_state(&mut self, state: &StateValue) -> anyhow::Result<()> {
        (**self).load_state(state)
    }
}

impl<G: GameSession + ?Sized> GameSession for Box<G> {
    fn game_type(&self) -> &str {
        (**self).game_type()
    }

    fn apply_action(
        &mut self,
        actor_id: &str,
        action_type: &str,
        data: &Payload,
    ) -> anyhow::Result<()> {
        (**self).apply_action(actor_id, action_type, data)
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn save_metadata(&self) -> Payload {
        (**self).save_metadata()
    }
}
