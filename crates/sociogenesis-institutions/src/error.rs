//! Error types for the `sociogenesis-institutions` crate.
//!
//! Errors surface only at mutation entry points. The per-tick subsystems
//! skip orphaned references instead of failing.

use sociogenesis_types::{RitualId, TabooId, TotemId};
use sociogenesis_world::WorldError;

/// Errors that can occur when mutating the institution registry.
#[derive(Debug, thiserror::Error)]
pub enum InstitutionError {
    /// No totem with the given ID exists.
    #[error("totem not found: {0}")]
    UnknownTotem(TotemId),

    /// No taboo with the given ID exists.
    #[error("taboo not found: {0}")]
    UnknownTaboo(TabooId),

    /// No ritual with the given ID exists.
    #[error("ritual not found: {0}")]
    UnknownRitual(RitualId),

    /// A `NO_MIX` taboo was defined without a target type.
    #[error("NO_MIX taboo requires a target type")]
    MissingTargetType,

    /// A preset ritual referenced a totem index outside the preset.
    #[error("preset ritual references totem index {index} but the preset has {count} totems")]
    PresetTotemIndex {
        /// The referenced index.
        index: u32,
        /// Totems in the preset.
        count: usize,
    },

    /// The agent substrate rejected a preset layout.
    #[error("substrate error: {source}")]
    Substrate {
        /// The underlying substrate error.
        #[from]
        source: WorldError,
    },
}
