//! Institution subsystems for the Sociogenesis engine.
//!
//! Everything that turns agent behavior into symbolic institutions and turns
//! institutions back into agent motion lives here. Each subsystem is a plain
//! struct driven by the tick orchestrator in `sociogenesis-core`; none of
//! them owns the agent substrate.
//!
//! # Modules
//!
//! - [`registry`] -- [`InstitutionRegistry`]: totem, taboo, and ritual lists
//!   with placement, removal, patching, and preset loading
//! - [`detector`] -- [`Detector`]: grid-driven institution spawning
//! - [`forces`] -- Clamped totem and ritual steering
//! - [`roles`] -- Transient enforcer, vigilante, and resister roles
//! - [`justice`] -- [`JusticeSystem`]: violations, cases, and judgment
//! - [`culture`] -- [`CultureState`] arrays and the [`CultureEngine`]
//! - [`prestige`] -- [`PrestigeEngine`]: decay, rewards, and leader events
//! - [`leaders`] -- [`LeaderDetector`]: local leaders and their followers
//! - [`tribes`] -- [`TribeLedger`] and the deterministic [`ethos`]
//! - [`naming`] -- Generated totem display names
//! - [`config`] -- Tunables for every subsystem
//! - [`error`] -- [`InstitutionError`]

pub mod config;
pub mod culture;
pub mod detector;
pub mod error;
pub mod forces;
pub mod justice;
pub mod leaders;
pub mod naming;
pub mod prestige;
pub mod registry;
pub mod roles;
pub mod tribes;

// Re-export primary types at crate root.
pub use config::{
    CultureConfig, DEFAULT_FORCE_CLAMP, DetectorConfig, ForceConfig, JusticeConfig, LeaderConfig,
    PrestigeConfig, RoleConfig,
};
pub use culture::{CultureEngine, CultureReport, CultureState, SEED_EPSILON};
pub use detector::{DetectionReport, Detector, MotionProfile};
pub use error::InstitutionError;
pub use forces::{ForceReport, apply_forces, nudge, oracle_direction};
pub use justice::{JusticeReport, JusticeSystem};
pub use leaders::LeaderDetector;
pub use prestige::{PrestigeEngine, PrestigeReport};
pub use registry::InstitutionRegistry;
pub use roles::{RoleReport, RoleState};
pub use tribes::{TribeLedger, ethos};
