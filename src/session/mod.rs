//! Game sessions.
//!
//! A game plugs into the runtime by implementing [`GameSession`] (and its
//! [`Saveable`] supertrait). Plugins hand out a [`GameSessionFactory`] to
//! create sessions. [`Session`] drives a game: it snapshots state before
//! each action, records it for undo, and announces changes on its event
//! bus.

mod driver;
mod game;

pub use driver::{Session, SessionError};
pub use game::{GameSession, GameSessionFactory, Saveable};
