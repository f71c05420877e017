//! # rust-arcade
//!
//! Runtime services for pluggable turn-based games.
//!
//! ## Design Principles
//!
//! 1. **Game-Agnostic**: The runtime never looks inside game state. Games
//!    expose it as a [`StateValue`] tree and the runtime stores, snapshots
//!    and serializes it.
//!
//! 2. **Explicit Registration**: Plugins are linked into the host and
//!    registered by constructor. Manifests on disk describe them without
//!    running their code.
//!
//! 3. **Contained Failures**: A failing event handler or plugin is logged
//!    and reported; it never takes the session down.
//!
//! ## Architecture
//!
//! - **Persistent Data Structures**: O(1) snapshot clones via `im-rs`, so
//!   undo history never copies whole states.
//!
//! - **Synchronous Events**: `emit` returns after every subscriber ran.
//!   Handlers may emit further events.
//!
//! - **Self-Describing Saves**: Every save carries a versioned envelope
//!   with game type, timestamp and metadata, readable without decoding
//!   the state.
//!
//! ## Modules
//!
//! - `core`: State values and runtime configuration
//! - `events`: Publish/subscribe event bus with bounded history
//! - `replay`: Undo/redo over recorded actions and snapshots
//! - `serialization`: JSON and binary save codecs
//! - `persistence`: Save files, listing and previews
//! - `session`: Game traits and the session driver
//! - `plugins`: Plugin discovery and lifecycle
//! - `games`: Reference games

pub mod core;
pub mod error;
pub mod events;
pub mod games;
pub mod persistence;
pub mod plugins;
pub mod replay;
pub mod serialization;
pub mod session;

// Re-export commonly used types
pub use crate::core::{
    payload, ConfigError, EventConfig, Payload, PersistenceConfig, PluginsConfig, ReplayConfig,
    RuntimeConfig, StateList, StateMap, StateValue,
};

pub use crate::error::{Error, Result};

pub use crate::events::{event_types, Event, EventBus, SubscriptionId};

pub use crate::replay::{ReplayAction, ReplayError, ReplayLog, ReplayManager, Snapshot};

pub use crate::serialization::{
    EnvelopeHeader, SaveEnvelope, SaveFormat, SerializationError, Serializer,
};

pub use crate::persistence::{PersistenceError, PersistenceManager, SaveInfo};

pub use crate::session::{GameSession, GameSessionFactory, Saveable, Session, SessionError};

pub use crate::plugins::{
    LoadState, Plugin, PluginConfig, PluginDescriptor, PluginError, PluginManager,
};
