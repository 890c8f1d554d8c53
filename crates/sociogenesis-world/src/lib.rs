//! Agent substrate, spatial analysis, and economy for the Sociogenesis engine.
//!
//! This crate owns everything the institution engine reads from or writes to
//! the physical world: the parallel-array agent population, the detection
//! grid, the optional field collaborator, the seeded generator, and the
//! resource/territory economy.
//!
//! # Modules
//!
//! - [`substrate`] -- [`AgentSubstrate`] struct-of-arrays storage with fixed
//!   capacity and index-addressed accessors.
//! - [`grid`] -- Pure spatial grid analysis producing per-cell [`CellStats`].
//! - [`field`] -- [`FieldSampler`] trait and the [`NeutralField`] default.
//! - [`rng`] -- The [`SimRng`] alias and seeded helpers.
//! - [`economy`] -- [`EconomyEngine`]: resource field, harvest, claims, and
//!   inequality metrics.
//! - [`error`] -- Error types for substrate operations.

pub mod economy;
pub mod error;
pub mod field;
pub mod grid;
pub mod rng;
pub mod substrate;

// Re-export primary types at crate root.
pub use economy::{EconomyConfig, EconomyEngine, NEUTRAL_OWNER, UpkeepZone, gini};
pub use error::WorldError;
pub use field::{FieldSample, FieldSampler, NeutralField};
pub use grid::{CellKey, CellStats, DEFAULT_GRID_RESOLUTION, GridMap, analyze, cell_of};
pub use rng::{SimRng, seeded};
pub use substrate::{AgentSubstrate, AgentView, WORLD_EXTENT};
