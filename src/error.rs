//! Crate-wide error type.

use crate::core::ConfigError;
use crate::persistence::PersistenceError;
use crate::plugins::{ManifestError, PluginError};
use crate::replay::ReplayError;
use crate::serialization::SerializationError;
use crate::session::SessionError;

/// Any runtime error, for hosts that want a single type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result alias using [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
