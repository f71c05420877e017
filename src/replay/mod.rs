//! Replay and undo/redo.
//!
//! Every player action is recorded together with a snapshot of the state
//! taken just before it was applied. Undo hands back that snapshot; redo
//! hands back the action to reapply. The manager is state-agnostic: it
//! stores snapshots but never restores them itself.
//!
//! ## Key Components
//!
//! - [`Snapshot`]: immutable, structurally shared copy of a state tree
//! - [`ReplayAction`]: one recorded action plus its pre-action snapshot
//! - [`ReplayManager`]: bounded undo history and redo stack
//! - [`ReplayLog`]: snapshot-free export of the history

mod action;
mod manager;

pub use action::{ReplayAction, ReplayEntry, ReplayLog, Snapshot};
pub use manager::{ReplayError, ReplayManager};
