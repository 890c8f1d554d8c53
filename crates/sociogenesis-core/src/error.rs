//! Error types for the `sociogenesis-core` crate.

use sociogenesis_institutions::InstitutionError;
use sociogenesis_world::WorldError;

use crate::config::ConfigError;

/// Errors surfaced by engine construction and the control API.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Configuration could not be loaded.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The agent substrate rejected an operation.
    #[error("substrate error: {source}")]
    World {
        /// The underlying substrate error.
        #[from]
        source: WorldError,
    },

    /// An institution mutation failed.
    #[error("institution error: {source}")]
    Institution {
        /// The underlying institution error.
        #[from]
        source: InstitutionError,
    },
}
