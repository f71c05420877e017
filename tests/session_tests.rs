//! Session integration tests.
//!
//! These tests play War through a `Session`, checking that undo/redo,
//! events and save/load agree with each other.

use std::cell::RefCell;
use std::rc::Rc;

use rust_arcade::core::{Payload, RuntimeConfig, StateValue};
use rust_arcade::events::{event_types, Event};
use rust_arcade::games::war::{WarGame, WarPlugin, PLAY};
use rust_arcade::persistence::PersistenceManager;
use rust_arcade::plugins::PluginManager;
use rust_arcade::replay::ReplayError;
use rust_arcade::serialization::SaveFormat;
use rust_arcade::session::{GameSession, Saveable, Session, SessionError};

fn new_session(deck_size: usize) -> Session<WarGame> {
    let game = WarGame::new(["alice".into(), "bob".into()], deck_size, 11).unwrap();
    Session::new(game)
}

fn capture(session: &Session<impl GameSession>) -> Rc<RefCell<Vec<Event>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    session.bus().subscribe_all(move |e| {
        sink.borrow_mut().push(e.clone());
        Ok(())
    });
    events
}

fn types(events: &RefCell<Vec<Event>>) -> Vec<String> {
    events.borrow().iter().map(|e| e.event_type.clone()).collect()
}

/// Undo walks back through every state; redo walks forward again.
#[test]
fn test_war_undo_redo_round_trip() {
    let mut session = new_session(6);
    let mut states = vec![session.game().save_state()];
    for _ in 0..4 {
        session.perform("alice", PLAY, Payload::new()).unwrap();
        states.push(session.game().save_state());
    }

    for expected in states.iter().rev().skip(1) {
        session.undo().unwrap();
        assert_eq!(&session.game().save_state(), expected);
    }
    assert!(matches!(
        session.undo(),
        Err(SessionError::Replay(ReplayError::UndoUnavailable))
    ));

    for expected in states.iter().skip(1) {
        session.redo().unwrap();
        assert_eq!(&session.game().save_state(), expected);
    }
    assert!(!session.replay().can_redo());
}

/// Each action emits PLAYER_MOVE then STATE_CHANGE; the last also GAME_END.
#[test]
fn test_events_through_game_end() {
    let mut session = new_session(2);
    let events = capture(&session);

    session.start();
    session.perform("alice", PLAY, Payload::new()).unwrap();
    session.perform("bob", PLAY, Payload::new()).unwrap();

    assert_eq!(
        types(&events),
        vec![
            event_types::GAME_START,
            event_types::PLAYER_MOVE,
            event_types::STATE_CHANGE,
            event_types::PLAYER_MOVE,
            event_types::STATE_CHANGE,
            event_types::GAME_END,
        ]
    );

    let events = events.borrow();
    let first_move = &events[1];
    assert_eq!(first_move.get("actor_id"), Some(&StateValue::from("alice")));
    assert_eq!(first_move.source_id.as_deref(), Some("war"));
    assert!(events
        .last()
        .and_then(|e| e.get("scores"))
        .and_then(StateValue::as_map)
        .is_some());
}

/// A rejected action changes nothing and records nothing.
#[test]
fn test_rejected_action() {
    let mut session = new_session(4);
    let events = capture(&session);
    let before = session.game().clone();

    let err = session.perform("mallory", PLAY, Payload::new()).unwrap_err();

    assert!(matches!(err, SessionError::Action { .. }));
    assert_eq!(session.game(), &before);
    assert!(!session.replay().can_undo());
    assert!(events.borrow().is_empty());
}

/// Undo and redo are announced.
#[test]
fn test_undo_redo_events() {
    let mut session = new_session(4);
    session.perform("alice", PLAY, Payload::new()).unwrap();
    let events = capture(&session);

    session.undo().unwrap();
    session.redo().unwrap();

    assert_eq!(
        types(&events),
        vec![
            event_types::UNDO,
            event_types::STATE_CHANGE,
            event_types::REDO,
            event_types::STATE_CHANGE,
        ]
    );
}

/// Saving and loading through the session restores the game and clears
/// undo history.
#[test]
fn test_session_save_load() {
    let dir = tempfile::tempdir().unwrap();
    let saves = PersistenceManager::new(dir.path());

    let mut session = new_session(8);
    session.perform("alice", PLAY, Payload::new()).unwrap();
    session.perform("bob", PLAY, Payload::new()).unwrap();
    let saved = session.game().clone();
    let path = session.save(&saves, "slot1", Some(SaveFormat::Binary)).unwrap();

    session.perform("alice", PLAY, Payload::new()).unwrap();
    assert_ne!(session.game(), &saved);

    let envelope = session.load(&saves, &path).unwrap();
    assert_eq!(envelope.game_type, "war");
    assert_eq!(session.game(), &saved);
    assert!(!session.replay().can_undo());
}

/// A session built from a plugin factory uses the configured sizes.
#[test]
fn test_session_from_plugin_and_config() {
    let config = RuntimeConfig::new().with_max_history(2);
    let mut plugins = PluginManager::from_config(&config.plugins);
    plugins.register_builtin(WarPlugin::boxed).unwrap();
    plugins.load_plugin("war").unwrap();

    let game = plugins
        .game_factory("war")
        .unwrap()
        .create(&rust_arcade::core::payload([("seed", 5.into())]))
        .unwrap();
    let mut session = Session::from_config(game, &config);

    for _ in 0..3 {
        session.perform("player1", PLAY, Payload::new()).unwrap();
    }
    assert_eq!(session.replay().len(), 2);
    assert_eq!(session.replay().max_history(), 2);
}
