//! Save/load persistence.
//!
//! The [`PersistenceManager`] wraps the serializers with file naming,
//! metadata envelopes, enumeration, cheap previews and atomic writes.
//!
//! ## Directory Layout
//!
//! One configurable root directory; each save is one file named
//! `{game_type}_{save_name}.{ext}` where `ext` is `json` or `sav`.

mod atomic;
mod manager;

pub use manager::{PersistenceError, PersistenceManager, SaveInfo};
