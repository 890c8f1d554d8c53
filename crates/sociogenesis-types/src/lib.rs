//! Shared type definitions for the Sociogenesis institution engine.
//!
//! This crate is the single source of truth for the types exchanged between
//! the engine crates and the presentation layer. Snapshot types flow to
//! `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe `u64` wrappers for institution identifiers
//! - [`enums`] -- Closed kind enums (totems, taboos, rituals, roles, chronicle)
//! - [`geometry`] -- [`Vec2`] math with epsilon-guarded normalization
//! - [`structs`] -- Institutions, cases, metrics, snapshots, and presets
//! - [`chronicle`] -- The capped, append-only [`Chronicle`]

pub mod chronicle;
pub mod enums;
pub mod geometry;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use chronicle::{Chronicle, DEFAULT_CHRONICLE_CAPACITY};
pub use enums::{
    CaseResolution, CaseStatus, ChronicleKind, JusticeMode, ResourceMode, RitualKind, RoleKind,
    TabooKind, TotemKind,
};
pub use geometry::{DIRECTION_EPSILON, Vec2};
pub use ids::{CaseId, IdAllocator, RitualId, TabooId, TotemId, TribeId};
pub use structs::{
    AgentSeed, ChronicleEntry, EconomyMetrics, EngineSnapshot, Ethos, InstitutionPreset,
    LeaderInfo, MIN_DUTY_CYCLE, MIN_PERIOD_SEC, MIN_RADIUS, MemeStats, PresetRitual, Ritual,
    RitualPatch, RitualSpec, SocioCase, Taboo, TabooPatch, TabooSpec, Totem, TotemPatch,
    TotemSpec, Tribe,
};
