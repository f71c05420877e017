//! Session driver tying a game to its event bus and undo history.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::Utc;
use tracing::{debug, warn};

use super::game::GameSession;
use crate::core::{payload, Payload, RuntimeConfig, StateValue};
use crate::events::{event_types, EventBus};
use crate::persistence::{PersistenceError, PersistenceManager};
use crate::replay::{ReplayAction, ReplayError, ReplayManager, Snapshot};
use crate::serialization::{SaveEnvelope, SaveFormat};

/// Errors from driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Undo or redo had nothing to work on.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// The game rejected an action. State is unchanged.
    #[error("action `{action_type}` by `{actor_id}` rejected: {error:#}")]
    Action {
        /// Player who attempted the action.
        actor_id: String,
        /// Action kind, as passed to `apply_action`.
        action_type: String,
        /// Error reported by the game.
        error: anyhow::Error,
    },

    /// Restoring a snapshot failed.
    #[error("failed to restore state: {0:#}")]
    Restore(anyhow::Error),

    /// Saving or loading failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// A running game with undo/redo and event notification.
///
/// Every successful action is recorded with the state captured just
/// before it, then announced on the bus as `PLAYER_MOVE` followed by
/// `STATE_CHANGE`. A rejected action leaves the game as it was.
///
/// The bus is shared through `Rc` so handlers can hold a (weak) reference
/// and emit follow-up events.
pub struct Session<G: GameSession> {
    game: G,
    bus: Rc<EventBus>,
    replay: ReplayManager<Snapshot>,
}

impl<G: GameSession> Session<G> {
    /// Wrap a game with a default bus and undo history.
    pub fn new(game: G) -> Self {
        Self::from_config(game, &RuntimeConfig::default())
    }

    /// Wrap a game, sizing the bus and undo history from configuration.
    pub fn from_config(game: G, config: &RuntimeConfig) -> Self {
        Self {
            game,
            bus: Rc::new(EventBus::from_config(&config.events)),
            replay: ReplayManager::from_config(&config.replay),
        }
    }

    /// The game.
    pub fn game(&self) -> &G {
        &self.game
    }

    /// The event bus.
    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// The undo history.
    pub fn replay(&self) -> &ReplayManager<Snapshot> {
        &self.replay
    }

    /// Consume the session, returning the game.
    pub fn into_game(self) -> G {
        self.game
    }

    /// Announce the start of the game.
    pub fn start(&self) {
        self.emit(
            event_types::GAME_START,
            payload([("game_type", self.game.game_type().into())]),
        );
    }

    /// Apply a player action.
    pub fn perform(
        &mut self,
        actor_id: &str,
        action_type: &str,
        data: Payload,
    ) -> Result<(), SessionError> {
        let was_finished = self.game.is_finished();
        let before = Snapshot::capture(&self.game);

        if let Err(error) = self.game.apply_action(actor_id, action_type, &data) {
            debug!(actor = actor_id, action_type, error = %error, "action rejected");
            self.restore(&before)?;
            return Err(SessionError::Action {
                actor_id: actor_id.to_string(),
                action_type: action_type.to_string(),
                error,
            });
        }

        let action = ReplayAction {
            timestamp: Utc::now(),
            actor_id: actor_id.to_string(),
            action_type: action_type.to_string(),
            data,
            state_before: before,
        };
        self.emit(event_types::PLAYER_MOVE, move_payload(&action));
        self.replay.record(action);
        self.state_changed("action", action_type);
        self.check_finished(was_finished);
        Ok(())
    }

    /// Undo the most recent action, restoring the state from before it.
    pub fn undo(&mut self) -> Result<(), SessionError> {
        let action = self.replay.undo()?;

        if let Err(e) = self.restore(&action.state_before) {
            // Put the action back so history matches the game.
            let _ = self.replay.redo();
            return Err(e);
        }

        self.emit(event_types::UNDO, move_payload(&action));
        self.state_changed("undo", &action.action_type);
        Ok(())
    }

    /// Reapply the most recently undone action.
    pub fn redo(&mut self) -> Result<(), SessionError> {
        let action = self.replay.redo()?;
        let was_finished = self.game.is_finished();
        let before = Snapshot::capture(&self.game);

        if let Err(error) =
            self.game
                .apply_action(&action.actor_id, &action.action_type, &action.data)
        {
            warn!(action_type = %action.action_type, error = %error, "redo rejected by game");
            let _ = self.replay.undo();
            self.restore(&before)?;
            return Err(SessionError::Action {
                actor_id: action.actor_id,
                action_type: action.action_type,
                error,
            });
        }

        self.emit(event_types::REDO, move_payload(&action));
        self.state_changed("redo", &action.action_type);
        self.check_finished(was_finished);
        Ok(())
    }

    /// Save the game.
    pub fn save(
        &self,
        persistence: &PersistenceManager,
        save_name: &str,
        format: Option<SaveFormat>,
    ) -> Result<PathBuf, SessionError> {
        Ok(persistence.save_session(&self.game, save_name, format)?)
    }

    /// Load a save into the game. Clears undo history.
    pub fn load(
        &mut self,
        persistence: &PersistenceManager,
        path: impl AsRef<Path>,
    ) -> Result<SaveEnvelope, SessionError> {
        let envelope = persistence.load_session(path, &mut self.game)?;
        self.replay.clear();
        self.state_changed("load", "");
        Ok(envelope)
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<(), SessionError> {
        self.game
            .load_state(snapshot.state())
            .map_err(SessionError::Restore)
    }

    fn state_changed(&self, reason: &str, action_type: &str) {
        self.emit(
            event_types::STATE_CHANGE,
            payload([
                ("reason", reason.into()),
                ("action_type", action_type.into()),
            ]),
        );
    }

    fn check_finished(&self, was_finished: bool) {
        if !was_finished && self.game.is_finished() {
            let mut end = self.game.save_metadata();
            end.insert("game_type".into(), self.game.game_type().into());
            self.emit(event_types::GAME_END, end);
        }
    }

    fn emit(&self, event_type: &str, payload: Payload) {
        self.bus.emit_from(self.game.game_type(), event_type, payload);
    }
}

fn move_payload(action: &ReplayAction) -> Payload {
    payload([
        ("actor_id", action.actor_id.as_str().into()),
        ("action_type", action.action_type.as_str().into()),
        ("data", StateValue::Map(action.data.clone())),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Saveable;
    use std::cell::{Cell, RefCell};

    /// Counter that rejects negative totals and finishes at 10.
    struct Counter {
        total: i64,
    }

    impl Saveable for Counter {
        fn save_state(&self) -> StateValue {
            StateValue::map().with("total", self.total)
        }

        fn load_state(&mut self, state: &StateValue) -> anyhow::Result<()> {
            self.total = state
                .get("total")
                .and_then(StateValue::as_int)
                .ok_or_else(|| anyhow::anyhow!("missing total"))?;
            Ok(())
        }
    }

    impl GameSession for Counter {
        fn game_type(&self) -> &str {
            "counter"
        }

        fn apply_action(
            &mut self,
            _actor_id: &str,
            action_type: &str,
            data: &Payload,
        ) -> anyhow::Result<()> {
            anyhow::ensure!(action_type == "add", "unknown action {action_type}");
            let by = data.get("by").and_then(StateValue::as_int).unwrap_or(1);
            self.total += by;
            anyhow::ensure!(self.total >= 0, "total went negative");
            Ok(())
        }

        fn is_finished(&self) -> bool {
            self.total >= 10
        }
    }

    fn add(by: i64) -> Payload {
        payload([("by", by.into())])
    }

    fn recorded_types(session: &Session<Counter>) -> Rc<RefCell<Vec<String>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        session.bus().subscribe_all(move |e| {
            sink.borrow_mut().push(e.event_type.clone());
            Ok(())
        });
        seen
    }

    #[test]
    fn test_perform_emits_move_then_change() {
        let mut session = Session::new(Counter { total: 0 });
        let seen = recorded_types(&session);

        session.perform("alice", "add", add(2)).unwrap();

        assert_eq!(session.game().total, 2);
        assert_eq!(
            *seen.borrow(),
            vec![event_types::PLAYER_MOVE, event_types::STATE_CHANGE]
        );
        assert_eq!(session.replay().len(), 1);
    }

    #[test]
    fn test_rejected_action_restores_state() {
        let mut session = Session::new(Counter { total: 1 });

        let err = session.perform("bob", "add", add(-5)).unwrap_err();

        assert!(matches!(err, SessionError::Action { .. }));
        assert_eq!(session.game().total, 1);
        assert!(!session.replay().can_undo());
    }

    #[test]
    fn test_undo_redo() {
        let mut session = Session::new(Counter { total: 0 });
        session.perform("alice", "add", add(3)).unwrap();
        session.perform("alice", "add", add(4)).unwrap();

        session.undo().unwrap();
        assert_eq!(session.game().total, 3);
        session.undo().unwrap();
        assert_eq!(session.game().total, 0);
        assert!(matches!(
            session.undo(),
            Err(SessionError::Replay(ReplayError::UndoUnavailable))
        ));

        session.redo().unwrap();
        session.redo().unwrap();
        assert_eq!(session.game().total, 7);
    }

    #[test]
    fn test_game_end_emitted_once() {
        let mut session = Session::new(Counter { total: 8 });
        let seen = recorded_types(&session);

        session.perform("alice", "add", add(5)).unwrap();
        session.perform("alice", "add", add(1)).unwrap();

        let ends = seen
            .borrow()
            .iter()
            .filter(|t| *t == event_types::GAME_END)
            .count();
        assert_eq!(ends, 1);
    }

    #[test]
    fn test_start_emits_game_start() {
        let session = Session::new(Counter { total: 0 });
        session.start();

        let history = session.bus().get_history(Some(event_types::GAME_START));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source_id.as_deref(), Some("counter"));
    }

    /// Counter whose restores and actions can be made to fail.
    struct Flaky {
        total: i64,
        fail_load: Rc<Cell<bool>>,
        fail_apply: Rc<Cell<bool>>,
    }

    impl Flaky {
        fn new() -> (Self, Rc<Cell<bool>>, Rc<Cell<bool>>) {
            let fail_load = Rc::new(Cell::new(false));
            let fail_apply = Rc::new(Cell::new(false));
            let game = Self {
                total: 0,
                fail_load: Rc::clone(&fail_load),
                fail_apply: Rc::clone(&fail_apply),
            };
            (game, fail_load, fail_apply)
        }
    }

    impl Saveable for Flaky {
        fn save_state(&self) -> StateValue {
            StateValue::map().with("total", self.total)
        }

        fn load_state(&mut self, state: &StateValue) -> anyhow::Result<()> {
            anyhow::ensure!(!self.fail_load.get(), "restore refused");
            self.total = state.get_int("total", 0);
            Ok(())
        }
    }

    impl GameSession for Flaky {
        fn game_type(&self) -> &str {
            "flaky"
        }

        fn apply_action(
            &mut self,
            _actor_id: &str,
            _action_type: &str,
            data: &Payload,
        ) -> anyhow::Result<()> {
            // Mutate first so a rejection must be rolled back.
            self.total += data.get("by").and_then(StateValue::as_int).unwrap_or(1);
            anyhow::ensure!(!self.fail_apply.get(), "action refused");
            Ok(())
        }
    }

    #[test]
    fn test_failed_undo_keeps_action_in_history() {
        let (game, fail_load, _) = Flaky::new();
        let mut session = Session::new(game);
        session.perform("alice", "add", add(3)).unwrap();
        let seen = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&seen);
        session.bus().subscribe(event_types::UNDO, move |_| {
            *sink.borrow_mut() += 1;
            Ok(())
        });

        fail_load.set(true);
        let err = session.undo().unwrap_err();

        assert!(matches!(err, SessionError::Restore(_)));
        assert_eq!(session.game().total, 3);
        assert_eq!(session.replay().len(), 1);
        assert_eq!(session.replay().redo_len(), 0);
        assert_eq!(*seen.borrow(), 0);

        fail_load.set(false);
        session.undo().unwrap();
        assert_eq!(session.game().total, 0);
        assert_eq!(session.replay().redo_len(), 1);
    }

    #[test]
    fn test_rejected_redo_keeps_action_on_redo_stack() {
        let (game, _, fail_apply) = Flaky::new();
        let mut session = Session::new(game);
        session.perform("alice", "add", add(3)).unwrap();
        session.undo().unwrap();
        assert_eq!(session.game().total, 0);

        fail_apply.set(true);
        let err = session.redo().unwrap_err();

        assert!(matches!(err, SessionError::Action { .. }));
        assert_eq!(session.game().total, 0);
        assert_eq!(session.replay().len(), 0);
        assert_eq!(session.replay().redo_len(), 1);
        assert!(session.bus().get_history(Some(event_types::REDO)).is_empty());

        fail_apply.set(false);
        session.redo().unwrap();
        assert_eq!(session.game().total, 3);
        assert_eq!(session.replay().len(), 1);
        assert_eq!(session.replay().redo_len(), 0);
    }
}
