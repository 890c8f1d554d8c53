//! Core entity structs for the Sociogenesis engine.
//!
//! Institutions (totems, taboos, rituals), tribes, justice cases, and the
//! snapshot/preset payloads exchanged with the presentation layer.
//! Timestamps are simulated seconds since engine start.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CaseResolution, CaseStatus, ChronicleKind, RitualKind, TabooKind, TotemKind};
use crate::geometry::Vec2;
use crate::ids::{CaseId, RitualId, TabooId, TotemId, TribeId};

/// Smallest radius any institution may have.
pub const MIN_RADIUS: f32 = 0.01;

/// Smallest ritual period in seconds.
pub const MIN_PERIOD_SEC: f32 = 0.1;

/// Smallest ritual duty cycle.
pub const MIN_DUTY_CYCLE: f32 = 0.01;

// ---------------------------------------------------------------------------
// Totem
// ---------------------------------------------------------------------------

/// A point institution exerting continuous force on nearby agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Totem {
    /// Unique identifier.
    pub id: TotemId,
    /// Behavior applied inside the radius.
    pub kind: TotemKind,
    /// Center in world coordinates.
    pub position: Vec2,
    /// Influence radius (always > 0).
    pub radius: f32,
    /// Force multiplier.
    pub strength: f32,
    /// Whether the totem was placed manually.
    pub pinned: bool,
    /// Simulated time of creation.
    pub born_at: f64,
    /// Generated or user-supplied display name.
    pub name: String,
    /// Whether the totem was spawned by pattern detection.
    pub emergent: bool,
    /// Agents inside the radius at the last force application.
    #[serde(default, skip_deserializing)]
    pub affected_count: u32,
}

impl Totem {
    /// Whether `point` lies within the radius.
    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance(point) <= self.radius
    }
}

// ---------------------------------------------------------------------------
// Taboo
// ---------------------------------------------------------------------------

/// A zone with a prohibition rule that can be violated and judged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Taboo {
    /// Unique identifier.
    pub id: TabooId,
    /// Prohibition enforced.
    pub kind: TabooKind,
    /// Center in world coordinates.
    pub position: Vec2,
    /// Zone radius (always > 0).
    pub radius: f32,
    /// Push and damping multiplier.
    pub intensity: f32,
    /// Agent type that may not enter (required for [`TabooKind::NoMix`]).
    pub target_type: Option<u32>,
    /// Simulated time of creation.
    pub born_at: f64,
    /// Whether the taboo was spawned by pattern detection.
    pub emergent: bool,
    /// Agents inside the zone at the last justice pass.
    #[serde(default, skip_deserializing)]
    pub affected_count: u32,
}

impl Taboo {
    /// Whether `point` lies within the zone.
    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance(point) <= self.radius
    }

    /// Penetration depth as a fraction of the radius, in `[0, 1]`.
    ///
    /// Zero on or outside the boundary, one at the exact center.
    pub fn penetration(&self, point: Vec2) -> f32 {
        let radius = self.radius.max(MIN_RADIUS);
        let depth = radius - self.position.distance(point);
        (depth / radius).clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Ritual
// ---------------------------------------------------------------------------

/// A periodic, totem-bound behavior active during a duty-cycle window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Ritual {
    /// Unique identifier.
    pub id: RitualId,
    /// Behavior induced while active.
    pub kind: RitualKind,
    /// Owning totem; the ritual is inert if the totem no longer exists.
    pub totem_id: TotemId,
    /// Length of one cycle in seconds (always > 0).
    pub period_sec: f32,
    /// Fraction of the period considered active, in `(0, 1]`.
    pub duty_cycle: f32,
    /// Force multiplier.
    pub intensity: f32,
    /// Simulated time of creation; the cycle phase is measured from here.
    pub born_at: f64,
    /// Whether the ritual was spawned by pattern detection.
    pub emergent: bool,
    /// Agents moved by the ritual at the last force application.
    #[serde(default, skip_deserializing)]
    pub affected_count: u32,
}

impl Ritual {
    /// Whether the ritual is inside the active part of its cycle at `now`.
    pub fn is_active(&self, now: f64) -> bool {
        let period = f64::from(self.period_sec.max(MIN_PERIOD_SEC));
        let duty = f64::from(self.duty_cycle.clamp(MIN_DUTY_CYCLE, 1.0));
        let phase = (now - self.born_at).rem_euclid(period) / period;
        phase < duty
    }
}

// ---------------------------------------------------------------------------
// Tribe
// ---------------------------------------------------------------------------

/// Behavioral leanings of a tribe, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Ethos {
    /// Tendency to hold together.
    pub cohesion_bias: f32,
    /// Tendency toward friction with outsiders.
    pub tension_bias: f32,
}

/// The set of totems dominated by one agent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tribe {
    /// Unique identifier.
    pub id: TribeId,
    /// Dominant agent type the tribe represents.
    pub agent_type: u32,
    /// Totems the tribe controls.
    pub totem_ids: Vec<TotemId>,
    /// Derived behavioral leanings.
    pub ethos: Ethos,
}

// ---------------------------------------------------------------------------
// SocioCase
// ---------------------------------------------------------------------------

/// A justice case opened against a violated taboo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SocioCase {
    /// Unique identifier.
    pub id: CaseId,
    /// Taboo that was violated.
    pub taboo_id: TabooId,
    /// Index of the deepest violator at opening time, if any.
    pub offender: Option<u32>,
    /// Lifecycle state.
    pub status: CaseStatus,
    /// Judgment, once resolved.
    pub resolution: Option<CaseResolution>,
    /// Simulated time the case opened.
    pub opened_at: f64,
    /// Simulated time the case resolved.
    pub resolved_at: Option<f64>,
}

// ---------------------------------------------------------------------------
// Chronicle
// ---------------------------------------------------------------------------

/// One line of the append-only chronicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChronicleEntry {
    /// Simulated time of the event.
    pub at: f64,
    /// Event category.
    pub kind: ChronicleKind,
    /// Icon for display.
    pub icon: String,
    /// Short headline.
    pub message: String,
    /// One-line cause.
    pub cause: String,
    /// One-line consequence.
    pub consequence: String,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Meme distribution summary returned by the meme-stats query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MemeStats {
    /// Agents counted.
    pub total: u32,
    /// Holders per meme id.
    pub counts: Vec<u32>,
    /// Share of `total` per meme id.
    pub shares: Vec<f32>,
    /// Meme with the most holders.
    pub dominant: Option<u32>,
    /// Share held by the dominant meme.
    pub dominant_share: f32,
    /// Whether two memes each hold a near-balanced share.
    pub schism: bool,
}

/// Economy metrics computed from a bounded agent sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EconomyMetrics {
    /// Agents in the sample.
    pub sampled: u32,
    /// Mean energy of the sample.
    pub mean_energy: f32,
    /// Gini coefficient of sampled energies, in `[0, 1]`.
    pub gini: f32,
    /// Fraction of grid cells below the scarcity threshold.
    pub scarcity: f32,
    /// Group holding the most claimed cells.
    pub dominant_group: Option<i32>,
    /// Fraction of claimed cells held by the dominant group.
    pub dominant_share: f32,
    /// Sampled agents below the fatigue threshold.
    pub fatigued: u32,
    /// Consecutive macro-ticks with low mean energy.
    pub low_energy_streak: u32,
}

/// A detected local leader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LeaderInfo {
    /// Agent index within the current pass.
    pub agent: u32,
    /// Agent type.
    pub agent_type: u32,
    /// Composite influence score in `[0, 1]`.
    pub influence: f32,
    /// Followers pulled this pass.
    pub followers: u32,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Read-only view of engine state for the presentation layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EngineSnapshot {
    /// Simulated seconds elapsed.
    pub time: f64,
    /// Orchestrator passes completed.
    pub tick: u64,
    /// Agents in the substrate.
    pub agent_count: u32,
    /// Active totems.
    pub totems: Vec<Totem>,
    /// Active taboos.
    pub taboos: Vec<Taboo>,
    /// Active rituals, including orphaned ones.
    pub rituals: Vec<Ritual>,
    /// Tribes derived at the last detection pass.
    pub tribes: Vec<Tribe>,
    /// Retained justice cases.
    pub cases: Vec<SocioCase>,
    /// Chronicle, oldest first.
    pub chronicle: Vec<ChronicleEntry>,
    /// Meme distribution.
    pub meme_stats: MemeStats,
    /// Latest economy metrics.
    pub economy: EconomyMetrics,
    /// Leaders from the last leader pass.
    pub leaders: Vec<LeaderInfo>,
}

// ---------------------------------------------------------------------------
// Placement specs, patches, and presets
// ---------------------------------------------------------------------------

/// Parameters for placing a totem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TotemSpec {
    /// Behavior.
    pub kind: TotemKind,
    /// Center.
    pub position: Vec2,
    /// Radius; clamped to a safe minimum.
    pub radius: f32,
    /// Force multiplier.
    #[serde(default = "default_unit")]
    pub strength: f32,
    /// Display name; generated when absent.
    #[serde(default)]
    pub name: Option<String>,
}

/// Parameters for placing a taboo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TabooSpec {
    /// Prohibition.
    pub kind: TabooKind,
    /// Center.
    pub position: Vec2,
    /// Radius; clamped to a safe minimum.
    pub radius: f32,
    /// Push and damping multiplier.
    #[serde(default = "default_unit")]
    pub intensity: f32,
    /// Agent type targeted by [`TabooKind::NoMix`].
    #[serde(default)]
    pub target_type: Option<u32>,
}

/// Parameters for placing a ritual on an existing totem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RitualSpec {
    /// Behavior.
    pub kind: RitualKind,
    /// Cycle length in seconds; clamped to a safe minimum.
    pub period_sec: f32,
    /// Active fraction of the cycle; clamped into `(0, 1]`.
    pub duty_cycle: f32,
    /// Force multiplier.
    #[serde(default = "default_unit")]
    pub intensity: f32,
}

/// Partial update for an existing totem. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TotemPatch {
    /// New behavior.
    pub kind: Option<TotemKind>,
    /// New center.
    pub position: Option<Vec2>,
    /// New radius.
    pub radius: Option<f32>,
    /// New strength.
    pub strength: Option<f32>,
    /// New display name.
    pub name: Option<String>,
    /// New pinned flag.
    pub pinned: Option<bool>,
}

/// Partial update for an existing taboo.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TabooPatch {
    /// New prohibition.
    pub kind: Option<TabooKind>,
    /// New center.
    pub position: Option<Vec2>,
    /// New radius.
    pub radius: Option<f32>,
    /// New intensity.
    pub intensity: Option<f32>,
    /// New target type (`Some(None)` clears it).
    pub target_type: Option<Option<u32>>,
}

/// Partial update for an existing ritual.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RitualPatch {
    /// New behavior.
    pub kind: Option<RitualKind>,
    /// New period.
    pub period_sec: Option<f32>,
    /// New duty cycle.
    pub duty_cycle: Option<f32>,
    /// New intensity.
    pub intensity: Option<f32>,
}

/// Initial state for one agent in a preset layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSeed {
    /// Position in `[-1, 1]²`.
    pub position: Vec2,
    /// Initial velocity.
    #[serde(default)]
    pub velocity: Vec2,
    /// Type tag.
    pub agent_type: u32,
    /// Initial energy in `[0, 1]`.
    #[serde(default = "default_unit")]
    pub energy: f32,
}

/// A ritual inside a preset, bound to a preset totem by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PresetRitual {
    /// Index into [`InstitutionPreset::totems`].
    pub totem_index: u32,
    /// Ritual parameters.
    pub spec: RitualSpec,
}

/// Static scenario data that bulk-replaces institutions and, optionally,
/// the agent layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InstitutionPreset {
    /// Preset name for the chronicle.
    pub name: String,
    /// Totems to place.
    #[serde(default)]
    pub totems: Vec<TotemSpec>,
    /// Taboos to place.
    #[serde(default)]
    pub taboos: Vec<TabooSpec>,
    /// Rituals to place.
    #[serde(default)]
    pub rituals: Vec<PresetRitual>,
    /// Agent layout; the substrate is left untouched when empty.
    #[serde(default)]
    pub agents: Vec<AgentSeed>,
}

const fn default_unit() -> f32 {
    1.0
}
