//! Core runtime types: state values and configuration.
//!
//! Everything a game stores, an event carries or a save file holds is a
//! [`StateValue`] tree. Collections are persistent, so cloning a tree is
//! O(1) and never aliases live state.

pub mod config;
pub mod value;

pub use config::{
    ConfigError, EventConfig, PersistenceConfig, PluginsConfig, ReplayConfig, RuntimeConfig,
};
pub use value::{map_from_json, map_to_json, payload, Payload, StateList, StateMap, StateValue};
