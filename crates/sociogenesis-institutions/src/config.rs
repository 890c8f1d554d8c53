//! Tunables for every institution subsystem.
//!
//! Each struct mirrors one section of `sociogenesis-config.yaml`. Every
//! field has a default, so a partial section deserializes cleanly.
//! [`sanitized`](DetectorConfig::sanitized) on each struct clamps
//! out-of-range values to a safe minimum and logs the clamp.

use serde::{Deserialize, Serialize};
use tracing::warn;

use sociogenesis_types::{JusticeMode, MIN_DUTY_CYCLE, MIN_PERIOD_SEC, MIN_RADIUS};
use sociogenesis_world::grid::cell_size;

/// Per-axis velocity delta bound shared by every force source.
pub const DEFAULT_FORCE_CLAMP: f32 = 0.025;

fn clamp_radius(section: &str, name: &str, value: f32) -> f32 {
    if value.is_nan() || value < MIN_RADIUS {
        warn!(section, name, value, min = MIN_RADIUS, "radius clamped to minimum");
        MIN_RADIUS
    } else {
        value
    }
}

fn clamp_fraction(section: &str, name: &str, value: f32) -> f32 {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        let fixed = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        warn!(section, name, value, fixed, "fraction clamped into [0, 1]");
        fixed
    } else {
        value
    }
}

fn clamp_non_negative(section: &str, name: &str, value: f32) -> f32 {
    if value.is_nan() || value < 0.0 {
        warn!(section, name, value, "negative value clamped to 0");
        0.0
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Institution detector thresholds and spawn limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detection grid cells per axis.
    pub grid_resolution: u32,
    /// Agents a cell needs before it can host a totem.
    pub min_agents: u32,
    /// Mean speed above which a cell is an ORACLE candidate.
    pub oracle_speed: f32,
    /// Mean speed below which a cell is an ARCHIVE candidate.
    pub archive_speed: f32,
    /// Dominant-type fraction that makes a cell a BOND candidate.
    pub bond_purity: f32,
    /// Mean speed a BOND cell must stay under.
    pub bond_max_speed: f32,
    /// Type diversity a RIFT cell must exceed.
    pub rift_diversity: f32,
    /// Distinct types expected in a well-mixed cell.
    pub diversity_norm: u32,
    /// Lower bound of the moderate speed band for RIFT.
    pub rift_min_speed: f32,
    /// Upper bound of the moderate speed band for RIFT.
    pub rift_max_speed: f32,
    /// Minimum distance between totems.
    pub totem_exclusion: f32,
    /// Radius of spawned totems.
    pub totem_radius: f32,
    /// Strength of spawned totems.
    pub totem_strength: f32,
    /// Length of the rolling spawn window in seconds.
    pub spawn_window_sec: f64,
    /// Emergent totems allowed within one window.
    pub spawn_window_max: u32,
    /// Total totem cap.
    pub max_totems: u32,
    /// Total taboo cap.
    pub max_taboos: u32,
    /// Neighbor count every neighbor of an empty cell must exceed for `NO_ENTER`.
    pub taboo_density: u32,
    /// Population a foreign neighbor type needs for `NO_MIX`.
    pub no_mix_min: u32,
    /// Radius of spawned taboos.
    pub taboo_radius: f32,
    /// Minimum distance between taboos.
    pub taboo_exclusion: f32,
    /// Intensity of spawned taboos.
    pub taboo_intensity: f32,
    /// Sampling radius for ritual detection, as a multiple of totem radius.
    pub ritual_sample_factor: f32,
    /// Agents required to classify a ritual.
    pub ritual_min_samples: u32,
    /// Mean tangential speed that marks a procession.
    pub procession_tangential: f32,
    /// Radial magnitude a procession must stay under.
    pub procession_radial_max: f32,
    /// Mean radial velocity (negative is inward) that marks a gathering.
    pub gather_radial: f32,
    /// Tangential magnitude a gathering must stay under.
    pub gather_tangential_max: f32,
    /// Mean speed below which agents are making an offering.
    pub offering_speed: f32,
    /// Total ritual cap.
    pub max_rituals: u32,
    /// Period of spawned rituals in seconds.
    pub ritual_period_sec: f32,
    /// Duty cycle of spawned rituals.
    pub ritual_duty_cycle: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 10,
            min_agents: 8,
            oracle_speed: 0.07,
            archive_speed: 0.02,
            bond_purity: 0.6,
            bond_max_speed: 0.03,
            rift_diversity: 0.5,
            diversity_norm: 4,
            rift_min_speed: 0.02,
            rift_max_speed: 0.07,
            totem_exclusion: 0.3,
            totem_radius: 0.2,
            totem_strength: 1.0,
            spawn_window_sec: 30.0,
            spawn_window_max: 3,
            max_totems: 12,
            max_taboos: 6,
            taboo_density: 6,
            no_mix_min: 5,
            taboo_radius: 0.12,
            taboo_exclusion: 0.25,
            taboo_intensity: 1.0,
            ritual_sample_factor: 2.5,
            ritual_min_samples: 4,
            procession_tangential: 0.02,
            procession_radial_max: 0.01,
            gather_radial: -0.015,
            gather_tangential_max: 0.01,
            offering_speed: 0.01,
            max_rituals: 8,
            ritual_period_sec: 12.0,
            ritual_duty_cycle: 0.4,
        }
    }
}

impl DetectorConfig {
    /// Copy with out-of-range values clamped.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        if c.grid_resolution == 0 {
            warn!("detector grid_resolution clamped to 1");
            c.grid_resolution = 1;
        }
        c.min_agents = c.min_agents.max(1);
        c.diversity_norm = c.diversity_norm.max(1);
        c.ritual_min_samples = c.ritual_min_samples.max(1);
        c.totem_radius = clamp_radius("detector", "totem_radius", c.totem_radius);
        c.taboo_radius = clamp_radius("detector", "taboo_radius", c.taboo_radius);
        c.totem_exclusion = clamp_non_negative("detector", "totem_exclusion", c.totem_exclusion);
        c.taboo_exclusion = clamp_non_negative("detector", "taboo_exclusion", c.taboo_exclusion);
        c.bond_purity = clamp_fraction("detector", "bond_purity", c.bond_purity);
        c.ritual_sample_factor = c.ritual_sample_factor.max(1.0);
        if c.spawn_window_sec.is_nan() || c.spawn_window_sec < 0.0 {
            warn!(value = c.spawn_window_sec, "detector spawn_window_sec clamped to 0");
            c.spawn_window_sec = 0.0;
        }
        if c.ritual_period_sec.is_nan() || c.ritual_period_sec < MIN_PERIOD_SEC {
            warn!(value = c.ritual_period_sec, "detector ritual_period_sec clamped");
            c.ritual_period_sec = MIN_PERIOD_SEC;
        }
        if c.ritual_duty_cycle.is_nan() || !(MIN_DUTY_CYCLE..=1.0).contains(&c.ritual_duty_cycle) {
            warn!(value = c.ritual_duty_cycle, "detector ritual_duty_cycle clamped");
            c.ritual_duty_cycle = if c.ritual_duty_cycle.is_nan() {
                1.0
            } else {
                c.ritual_duty_cycle.clamp(MIN_DUTY_CYCLE, 1.0)
            };
        }
        c
    }
}

// ---------------------------------------------------------------------------
// Forces
// ---------------------------------------------------------------------------

/// Totem and ritual force gains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    /// Per-axis bound on any single velocity delta.
    pub clamp: f32,
    /// BOND attraction gain.
    pub bond_gain: f32,
    /// RIFT repulsion gain.
    pub rift_gain: f32,
    /// ORACLE drift gain.
    pub oracle_gain: f32,
    /// ORACLE oscillator angular frequency in radians per second.
    pub oracle_frequency: f32,
    /// Ritual gain.
    pub ritual_gain: f32,
    /// Ritual zone radius as a multiple of the totem radius.
    pub ritual_radius_factor: f32,
    /// Velocity multiplier applied by an OFFERING.
    pub offering_damping: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            clamp: DEFAULT_FORCE_CLAMP,
            bond_gain: 0.02,
            rift_gain: 0.02,
            oracle_gain: 0.015,
            oracle_frequency: 0.05,
            ritual_gain: 0.015,
            ritual_radius_factor: 2.5,
            offering_damping: 0.9,
        }
    }
}

impl ForceConfig {
    /// Copy with out-of-range values clamped.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        c.clamp = clamp_non_negative("forces", "clamp", c.clamp);
        c.ritual_radius_factor = c.ritual_radius_factor.max(1.0);
        c.offering_damping = clamp_fraction("forces", "offering_damping", c.offering_damping);
        c
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Transient role assignment and steering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// Whether roles are assigned at all.
    pub enabled: bool,
    /// Chance per force application that a neutral agent takes a role.
    pub assign_chance: f32,
    /// Seconds a role lasts before reverting to neutral.
    pub duration_sec: f64,
    /// ENFORCER pursuit gain.
    pub enforcer_gain: f32,
    /// VIGILANTE standoff distance as a multiple of the taboo radius.
    pub vigilante_standoff: f32,
    /// VIGILANTE steering gain.
    pub vigilante_gain: f32,
    /// RESISTER advance gain.
    pub resister_gain: f32,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            assign_chance: 0.002,
            duration_sec: 8.0,
            enforcer_gain: 0.02,
            vigilante_standoff: 1.5,
            vigilante_gain: 0.015,
            resister_gain: 0.015,
        }
    }
}

impl RoleConfig {
    /// Copy with out-of-range values clamped.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        c.assign_chance = clamp_fraction("roles", "assign_chance", c.assign_chance);
        if c.duration_sec.is_nan() || c.duration_sec < 0.0 {
            warn!(value = c.duration_sec, "roles duration_sec clamped to 0");
            c.duration_sec = 0.0;
        }
        c.vigilante_standoff = c.vigilante_standoff.max(1.0);
        c
    }
}

// ---------------------------------------------------------------------------
// Justice
// ---------------------------------------------------------------------------

/// Violation accounting and judgment parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JusticeConfig {
    /// Resolution policy.
    pub mode: JusticeMode,
    /// Accumulated violation that opens a case.
    pub violation_threshold: f32,
    /// Multiplier applied to accumulated violation per application.
    pub violation_decay: f32,
    /// Violation per unit of `NO_ENTER` penetration.
    pub overlap_weight: f32,
    /// Violation per `NO_MIX` trespasser.
    pub no_mix_increment: f32,
    /// Seconds after resolution before a taboo can open a new case.
    pub cooldown_sec: f64,
    /// Occupants above which AUTO mode punishes.
    pub density_threshold: u32,
    /// Outward push gain for elastic and punitive pushes.
    pub push_gain: f32,
    /// Velocity multiplier for banished agents.
    pub punish_damping: f32,
    /// Velocity multiplier for `NO_MIX` trespassers.
    pub no_mix_damping: f32,
    /// Restorative zone radius as a multiple of the taboo radius.
    pub restore_radius_factor: f32,
    /// Pull gain toward the nearest totem under RESTORE.
    pub restore_gain: f32,
    /// Resolved cases kept before pruning.
    pub case_retention: u32,
}

impl Default for JusticeConfig {
    fn default() -> Self {
        Self {
            mode: JusticeMode::Auto,
            violation_threshold: 1.0,
            violation_decay: 0.85,
            overlap_weight: 0.2,
            no_mix_increment: 0.1,
            cooldown_sec: 10.0,
            density_threshold: 10,
            push_gain: 0.02,
            punish_damping: 0.3,
            no_mix_damping: 0.8,
            restore_radius_factor: 1.5,
            restore_gain: 0.015,
            case_retention: 20,
        }
    }
}

impl JusticeConfig {
    /// Copy with out-of-range values clamped.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        c.violation_decay = clamp_fraction("justice", "violation_decay", c.violation_decay);
        c.punish_damping = clamp_fraction("justice", "punish_damping", c.punish_damping);
        c.no_mix_damping = clamp_fraction("justice", "no_mix_damping", c.no_mix_damping);
        c.violation_threshold = clamp_non_negative("justice", "violation_threshold", c.violation_threshold);
        c.restore_radius_factor = c.restore_radius_factor.max(1.0);
        if c.cooldown_sec.is_nan() || c.cooldown_sec < 0.0 {
            warn!(value = c.cooldown_sec, "justice cooldown_sec clamped to 0");
            c.cooldown_sec = 0.0;
        }
        c
    }
}

// ---------------------------------------------------------------------------
// Culture
// ---------------------------------------------------------------------------

/// Meme contagion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CultureConfig {
    /// Distinct memes in circulation (at least 1).
    pub meme_count: u32,
    /// Fraction of agents sampled per macro-tick.
    pub sample_fraction: f32,
    /// Upper bound on the sample.
    pub max_sample: u32,
    /// Radius within which an influencer can convert.
    pub convert_radius: f32,
    /// Resistance as a multiple of the target's own prestige.
    pub resistance_factor: f32,
    /// Steepness of the conversion sigmoid.
    pub sigmoid_steepness: f32,
    /// Probability scale applied to the sigmoid.
    pub base_rate: f32,
    /// Blend toward full strength on conversion.
    pub strength_blend: f32,
    /// Prestige gained by a successful influencer.
    pub influencer_bonus: f32,
    /// Seconds after conversion before an agent can convert again.
    pub cooldown_sec: f64,
    /// Conversions in one tick that count as a wave.
    pub min_wave: u32,
    /// Dominant share that counts as cult dominance.
    pub dominance_share: f32,
    /// Lower share bound for each side of a schism.
    pub schism_low: f32,
    /// Upper share bound for each side of a schism.
    pub schism_high: f32,
    /// Strength given to lazily seeded agents.
    pub seed_strength: f32,
    /// Prestige given to lazily seeded agents.
    pub seed_prestige: f32,
    /// Influence gain multiplier on the conversion probability.
    pub influence_gain: f32,
    /// Weight of field affinity on the conversion probability.
    pub affinity_weight: f32,
    /// Weight of field stress on the conversion probability.
    pub stress_weight: f32,
}

impl Default for CultureConfig {
    fn default() -> Self {
        Self {
            meme_count: 4,
            sample_fraction: 0.2,
            max_sample: 200,
            convert_radius: 0.15,
            resistance_factor: 0.65,
            sigmoid_steepness: 8.0,
            base_rate: 0.5,
            strength_blend: 0.5,
            influencer_bonus: 0.02,
            cooldown_sec: 5.0,
            min_wave: 5,
            dominance_share: 0.6,
            schism_low: 0.28,
            schism_high: 0.68,
            seed_strength: 0.5,
            seed_prestige: 0.1,
            influence_gain: 1.0,
            affinity_weight: 0.3,
            stress_weight: 0.2,
        }
    }
}

impl CultureConfig {
    /// Copy with out-of-range values clamped.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        if c.meme_count < 1 {
            warn!(value = c.meme_count, "culture meme_count clamped to 1");
            c.meme_count = 1;
        }
        c.sample_fraction = clamp_fraction("culture", "sample_fraction", c.sample_fraction);
        c.max_sample = c.max_sample.max(1);
        c.convert_radius = clamp_radius("culture", "convert_radius", c.convert_radius);
        c.strength_blend = clamp_fraction("culture", "strength_blend", c.strength_blend);
        c.base_rate = clamp_fraction("culture", "base_rate", c.base_rate);
        c.seed_strength = c.seed_strength.clamp(0.01, 1.0);
        c.seed_prestige = clamp_fraction("culture", "seed_prestige", c.seed_prestige);
        c.influence_gain = clamp_non_negative("culture", "influence_gain", c.influence_gain);
        if c.cooldown_sec.is_nan() || c.cooldown_sec < 0.0 {
            warn!(value = c.cooldown_sec, "culture cooldown_sec clamped to 0");
            c.cooldown_sec = 0.0;
        }
        c
    }
}

// ---------------------------------------------------------------------------
// Prestige
// ---------------------------------------------------------------------------

/// Prestige decay, rewards, and leader threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrestigeConfig {
    /// Exponential decay rate per second.
    pub decay_rate: f32,
    /// Bonus per macro-tick inside an active ritual zone.
    pub ritual_bonus: f32,
    /// Penalty per macro-tick inside a `NO_ENTER` taboo.
    pub taboo_penalty: f32,
    /// Prestige a leader must exceed.
    pub leader_threshold: f32,
}

impl Default for PrestigeConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.02,
            ritual_bonus: 0.01,
            taboo_penalty: 0.02,
            leader_threshold: 0.6,
        }
    }
}

impl PrestigeConfig {
    /// Copy with out-of-range values clamped.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        c.decay_rate = clamp_non_negative("prestige", "decay_rate", c.decay_rate);
        c.ritual_bonus = clamp_non_negative("prestige", "ritual_bonus", c.ritual_bonus);
        c.taboo_penalty = clamp_non_negative("prestige", "taboo_penalty", c.taboo_penalty);
        c.leader_threshold = clamp_fraction("prestige", "leader_threshold", c.leader_threshold);
        c
    }
}

// ---------------------------------------------------------------------------
// Leaders
// ---------------------------------------------------------------------------

/// Local leader detection and follower attraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderConfig {
    /// Coarse grid cells per axis.
    pub grid_resolution: u32,
    /// Fraction of agents sampled per pass.
    pub sample_fraction: f32,
    /// Upper bound on the sample.
    pub max_sample: u32,
    /// Radius for same-type neighbor counting.
    pub neighbor_radius: f32,
    /// Same-type neighbors a candidate needs.
    pub min_neighbors: u32,
    /// Leaders kept per pass.
    pub max_leaders: u32,
    /// Leaders kept per agent type.
    pub max_per_type: u32,
    /// Radius within which same-type agents follow.
    pub follower_radius: f32,
    /// Follower pull gain.
    pub follow_gain: f32,
    /// Leader forward boost gain.
    pub boost_gain: f32,
}

impl Default for LeaderConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 8,
            sample_fraction: 0.25,
            max_sample: 150,
            neighbor_radius: 0.12,
            min_neighbors: 4,
            max_leaders: 6,
            max_per_type: 2,
            follower_radius: 0.3,
            follow_gain: 0.01,
            boost_gain: 0.01,
        }
    }
}

impl LeaderConfig {
    /// Copy with out-of-range values clamped.
    ///
    /// Neighbors are only searched in the adjacent grid cells, so
    /// `neighbor_radius` is capped at one cell width.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        c.grid_resolution = c.grid_resolution.max(1);
        c.sample_fraction = clamp_fraction("leaders", "sample_fraction", c.sample_fraction);
        c.max_sample = c.max_sample.max(1);
        c.neighbor_radius = clamp_radius("leaders", "neighbor_radius", c.neighbor_radius);
        let cell = cell_size(c.grid_resolution);
        if c.neighbor_radius > cell {
            warn!(
                neighbor_radius = c.neighbor_radius,
                cell,
                grid_resolution = c.grid_resolution,
                "leaders neighbor_radius capped at one cell width"
            );
            c.neighbor_radius = cell;
        }
        c.follower_radius = clamp_radius("leaders", "follower_radius", c.follower_radius);
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_meme_count_clamps_to_one() {
        let c = CultureConfig {
            meme_count: 0,
            ..CultureConfig::default()
        }
        .sanitized();
        assert_eq!(c.meme_count, 1);
    }

    #[test]
    fn negative_radius_clamps_to_minimum() {
        let c = DetectorConfig {
            totem_radius: -3.0,
            ..DetectorConfig::default()
        }
        .sanitized();
        assert!((c.totem_radius - MIN_RADIUS).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_period_clamps_to_minimum() {
        let c = DetectorConfig {
            ritual_period_sec: 0.0,
            ritual_duty_cycle: 0.0,
            ..DetectorConfig::default()
        }
        .sanitized();
        assert!((c.ritual_period_sec - MIN_PERIOD_SEC).abs() < f32::EPSILON);
        assert!((c.ritual_duty_cycle - MIN_DUTY_CYCLE).abs() < f32::EPSILON);
    }

    #[test]
    fn defaults_are_unchanged_by_sanitize() {
        assert_eq!(DetectorConfig::default().sanitized(), DetectorConfig::default());
        assert_eq!(JusticeConfig::default().sanitized(), JusticeConfig::default());
        assert_eq!(CultureConfig::default().sanitized(), CultureConfig::default());
        assert_eq!(LeaderConfig::default().sanitized(), LeaderConfig::default());
    }

    #[test]
    fn leader_radius_is_capped_at_cell_width() {
        let c = LeaderConfig {
            grid_resolution: 10,
            neighbor_radius: 0.5,
            ..LeaderConfig::default()
        }
        .sanitized();
        assert!((c.neighbor_radius - 0.2).abs() < 1e-6);
        let fine = LeaderConfig {
            grid_resolution: 4,
            neighbor_radius: 0.3,
            ..LeaderConfig::default()
        }
        .sanitized();
        assert!((fine.neighbor_radius - 0.3).abs() < f32::EPSILON);
    }
}
