//! Configuration, clock, and tick orchestration for the Sociogenesis engine.
//!
//! This crate wires the world and institution crates into one deterministic
//! simulation. A [`SociogenesisState`] owns every subsystem; [`run_tick`]
//! drives one pass over them in data-flow order; the control methods on the
//! state serve the presentation layer between passes.
//!
//! # Modules
//!
//! - [`clock`] -- [`SimClock`] and the per-subsystem [`Cadence`] gates.
//! - [`config`] -- Loading `sociogenesis-config.yaml` into
//!   [`SimulationConfig`].
//! - [`control`] -- Snapshots, institution editing, tunables, and presets.
//! - [`tick`] -- [`SociogenesisState`] and the orchestrator pass.
//! - [`error`] -- [`SimError`].
//!
//! [`Cadence`]: clock::Cadence

pub mod clock;
pub mod config;
pub mod control;
pub mod error;
pub mod tick;

pub use clock::{Cadences, SimClock};
pub use config::{ConfigError, SimulationConfig};
pub use error::SimError;
pub use tick::{SociogenesisState, TickSummary, run_tick};
