//! Resource and territory economy on a coarse grid.
//!
//! The economy grid is independent of the detection grid. Each cell holds a
//! live resource value `R`, the static base it regenerates toward, a claim
//! owner (`-1` for neutral, otherwise a group id), and a claim strength.
//!
//! # Architecture
//!
//! One macro-tick runs, in order:
//!
//! 1. [`EconomyEngine::step_field`] regenerates `R` toward its target.
//! 2. [`EconomyEngine::harvest`] applies metabolism, harvest, upkeep, and
//!    fatigue to agent energy.
//! 3. [`EconomyEngine::update_claims`] stamps, contests, spreads, and decays
//!    territorial claims.
//! 4. [`EconomyEngine::compute_metrics`] samples agents and emits famine,
//!    inequality, and territory events into the chronicle.
//!
//! # Invariants
//!
//! - `R` and claim strength stay in `[0, 1]`.
//! - The claim owner is `-1` wherever claim strength is effectively zero.
//! - Gini is in `[0, 1]` and exactly zero for equal energies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sociogenesis_types::{Chronicle, ChronicleKind, EconomyMetrics, ResourceMode, Vec2};

use crate::field::FieldSampler;
use crate::grid::{CellKey, cell_of};
use crate::rng::{SimRng, point_in_square, unit};
use crate::substrate::AgentSubstrate;

/// Claim owner value for unclaimed cells.
pub const NEUTRAL_OWNER: i32 = -1;

/// Claim strengths below this are cleared to neutral.
pub const CLAIM_EPSILON: f32 = 1e-3;

/// Energy spread below which a sample is treated as perfectly equal.
const GINI_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Economy tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Cells per axis.
    pub resolution: u32,
    /// Gaussian hotspots in the static base.
    pub hotspots: u32,
    /// Mean hotspot width in world units.
    pub hotspot_sigma: f32,
    /// Resource floor everywhere in the static base.
    pub base_floor: f32,
    /// How the live field chooses its regeneration target.
    pub mode: ResourceMode,
    /// Fraction of the gap to target closed per second.
    pub regen_rate: f32,
    /// Energy lost per second by every agent.
    pub metabolism: f32,
    /// Minimum cell resource for harvesting.
    pub harvest_threshold: f32,
    /// Energy gained per second per unit of local resource.
    pub harvest_rate: f32,
    /// Resource removed per unit of energy harvested.
    pub depletion_per_energy: f32,
    /// Energy below which an agent is fatigued.
    pub fatigue_threshold: f32,
    /// Velocity multiplier applied to fatigued agents.
    pub fatigue_damping: f32,
    /// Energy per second paid inside an upkeep zone.
    pub upkeep_tax: f32,
    /// Strength added when a group reinforces its own cell.
    pub claim_stamp: f32,
    /// Strength removed when another group contests a cell.
    pub claim_contest: f32,
    /// Strength below which a contested cell flips owner.
    pub claim_flip_floor: f32,
    /// Fraction of a strong neighbor's strength spread into a neutral cell.
    pub claim_diffusion: f32,
    /// Neighbor strength required to spread.
    pub claim_diffusion_min: f32,
    /// Fraction of claim strength lost per second.
    pub claim_decay: f32,
    /// Maximum agents sampled for metrics.
    pub sample_size: u32,
    /// Cell resource below which a cell counts as scarce.
    pub scarcity_threshold: f32,
    /// Mean energy below which a macro-tick counts toward famine.
    pub low_energy_threshold: f32,
    /// Consecutive low-energy macro-ticks that trigger a famine.
    pub famine_streak: u32,
    /// Gini change that triggers an inequality spike.
    pub inequality_delta: f32,
    /// Territory share change that triggers a territory shift.
    pub territory_delta: f32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            resolution: 32,
            hotspots: 5,
            hotspot_sigma: 0.18,
            base_floor: 0.05,
            mode: ResourceMode::Static,
            regen_rate: 0.05,
            metabolism: 0.004,
            harvest_threshold: 0.15,
            harvest_rate: 0.03,
            depletion_per_energy: 0.5,
            fatigue_threshold: 0.15,
            fatigue_damping: 0.9,
            upkeep_tax: 0.002,
            claim_stamp: 0.05,
            claim_contest: 0.08,
            claim_flip_floor: 0.05,
            claim_diffusion: 0.1,
            claim_diffusion_min: 0.5,
            claim_decay: 0.01,
            sample_size: 200,
            scarcity_threshold: 0.2,
            low_energy_threshold: 0.2,
            famine_streak: 3,
            inequality_delta: 0.15,
            territory_delta: 0.2,
        }
    }
}

impl EconomyConfig {
    /// Copy with out-of-range values clamped to safe minimums.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        if c.resolution == 0 {
            warn!(resolution = c.resolution, "economy resolution clamped to 1");
            c.resolution = 1;
        }
        if c.sample_size == 0 {
            warn!("economy sample_size clamped to 1");
            c.sample_size = 1;
        }
        if c.famine_streak == 0 {
            warn!("economy famine_streak clamped to 1");
            c.famine_streak = 1;
        }
        if c.hotspot_sigma.is_nan() || c.hotspot_sigma <= 0.0 {
            warn!(sigma = c.hotspot_sigma, "economy hotspot_sigma clamped");
            c.hotspot_sigma = 0.01;
        }
        c.base_floor = c.base_floor.clamp(0.0, 1.0);
        c.regen_rate = c.regen_rate.max(0.0);
        c.metabolism = c.metabolism.max(0.0);
        c.harvest_rate = c.harvest_rate.max(0.0);
        c.depletion_per_energy = c.depletion_per_energy.max(0.0);
        c.fatigue_damping = c.fatigue_damping.clamp(0.0, 1.0);
        c.upkeep_tax = c.upkeep_tax.max(0.0);
        c.claim_stamp = c.claim_stamp.clamp(0.0, 1.0);
        c.claim_contest = c.claim_contest.clamp(0.0, 1.0);
        c.claim_flip_floor = c.claim_flip_floor.clamp(0.0, 1.0);
        c.claim_diffusion = c.claim_diffusion.clamp(0.0, 1.0);
        c.claim_decay = c.claim_decay.clamp(0.0, 1.0);
        c
    }
}

/// Circular zone whose occupants pay upkeep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpkeepZone {
    /// Zone center.
    pub center: Vec2,
    /// Zone radius.
    pub radius: f32,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Grid economy state.
#[derive(Debug, Clone, PartialEq)]
pub struct EconomyEngine {
    config: EconomyConfig,
    resolution: u32,
    resource: Vec<f32>,
    base: Vec<f32>,
    claim_owner: Vec<i32>,
    claim_strength: Vec<f32>,
    metrics: EconomyMetrics,
    previous: Option<EconomyMetrics>,
}

impl EconomyEngine {
    /// Build the grid and generate the static base from `rng`.
    pub fn new(config: &EconomyConfig, rng: &mut SimRng) -> Self {
        let config = config.sanitized();
        let resolution = config.resolution;
        let cells = cell_count(resolution);
        let mut engine = Self {
            config,
            resolution,
            resource: vec![0.0; cells],
            base: vec![0.0; cells],
            claim_owner: vec![NEUTRAL_OWNER; cells],
            claim_strength: vec![0.0; cells],
            metrics: EconomyMetrics::default(),
            previous: None,
        };
        engine.generate_base(rng);
        engine
    }

    /// Regenerate the static base and clear claims and metrics.
    pub fn reset(&mut self, rng: &mut SimRng) {
        self.claim_owner.fill(NEUTRAL_OWNER);
        self.claim_strength.fill(0.0);
        self.metrics = EconomyMetrics::default();
        self.previous = None;
        self.generate_base(rng);
    }

    fn generate_base(&mut self, rng: &mut SimRng) {
        let mut hotspots = Vec::new();
        for _ in 0..self.config.hotspots {
            let center = point_in_square(rng, 0.8);
            let amplitude = 0.5 + 0.5 * unit(rng);
            let sigma = self.config.hotspot_sigma * (0.7 + 0.6 * unit(rng));
            hotspots.push((center, amplitude, sigma));
        }
        let resolution = self.resolution;
        let floor = self.config.base_floor;
        for (idx, slot) in self.base.iter_mut().enumerate() {
            let center = key_of(idx, resolution).center(resolution);
            let mut v = floor;
            for &(c, amp, sigma) in &hotspots {
                let d2 = center.distance(c).powi(2);
                v += amp * (-d2 / (2.0 * sigma * sigma)).exp();
            }
            *slot = v.clamp(0.0, 1.0);
        }
        self.resource.clone_from(&self.base);
        debug!(hotspots = hotspots.len(), resolution, "economy base generated");
    }

    /// Current resource mode.
    pub const fn mode(&self) -> ResourceMode {
        self.config.mode
    }

    /// Switch between static and field-derived regeneration.
    pub const fn set_mode(&mut self, mode: ResourceMode) {
        self.config.mode = mode;
    }

    /// Replace the rates and thresholds. The grid resolution is fixed at
    /// construction; hotspot settings take effect at the next reset.
    pub fn set_config(&mut self, config: &EconomyConfig) {
        let mut clean = config.sanitized();
        if clean.resolution != self.resolution {
            warn!(
                requested = clean.resolution,
                kept = self.resolution,
                "economy resolution cannot change at runtime"
            );
            clean.resolution = self.resolution;
        }
        self.config = clean;
    }

    /// Active configuration.
    pub const fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Cells per axis.
    pub const fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Live resource field, row-major.
    pub fn resource(&self) -> &[f32] {
        &self.resource
    }

    /// Claim strength field, row-major.
    pub fn claim_strength(&self) -> &[f32] {
        &self.claim_strength
    }

    /// Claim owner field, row-major.
    pub fn claim_owner(&self) -> &[i32] {
        &self.claim_owner
    }

    /// Latest metrics.
    pub const fn metrics(&self) -> &EconomyMetrics {
        &self.metrics
    }

    /// Resource value at a world position.
    pub fn resource_at(&self, position: Vec2) -> f32 {
        self.resource
            .get(self.index_of(position))
            .copied()
            .unwrap_or(0.0)
    }

    /// Claim owner (`None` when neutral) and strength at a world position.
    pub fn claim_at(&self, position: Vec2) -> (Option<i32>, f32) {
        let idx = self.index_of(position);
        let owner = self.claim_owner.get(idx).copied().unwrap_or(NEUTRAL_OWNER);
        let strength = self.claim_strength.get(idx).copied().unwrap_or(0.0);
        ((owner != NEUTRAL_OWNER).then_some(owner), strength)
    }

    /// Overwrite the resource of the cell containing `position`.
    pub fn set_resource_at(&mut self, position: Vec2, value: f32) {
        let idx = self.index_of(position);
        if let Some(r) = self.resource.get_mut(idx) {
            *r = clamp_unit(value);
        }
    }

    fn index_of(&self, position: Vec2) -> usize {
        index_of_key(cell_of(position, self.resolution), self.resolution)
    }

    // -----------------------------------------------------------------------
    // Field step
    // -----------------------------------------------------------------------

    /// Ease every cell toward its regeneration target.
    pub fn step_field(&mut self, dt: f32, field: &dyn FieldSampler) {
        let ease = (self.config.regen_rate * dt.max(0.0)).clamp(0.0, 1.0);
        let resolution = self.resolution;
        let mode = self.config.mode;
        for (idx, (r, &base)) in self.resource.iter_mut().zip(&self.base).enumerate() {
            let target = match mode {
                ResourceMode::Static => base,
                ResourceMode::FieldDerived => {
                    let s = field.sample(key_of(idx, resolution).center(resolution)).sanitized();
                    base * (1.0 - s.scarcity) + 0.25 * s.cohesion.max(0.0) - 0.3 * s.tension
                }
            };
            *r = clamp_unit(*r + (clamp_unit(target) - *r) * ease);
        }
    }

    // -----------------------------------------------------------------------
    // Harvest and metabolism
    // -----------------------------------------------------------------------

    /// Apply metabolism, harvest, upkeep, and fatigue to every agent.
    pub fn harvest(
        &mut self,
        substrate: &mut AgentSubstrate,
        dt: f32,
        field: &dyn FieldSampler,
        upkeep: &[UpkeepZone],
    ) {
        let dt = dt.max(0.0);
        let cfg = &self.config;
        let mut fatigued = 0_u32;
        for i in 0..substrate.len() {
            let Some(agent) = substrate.view(i) else { continue };
            let mut energy = agent.energy - cfg.metabolism * dt;

            let idx = index_of_key(cell_of(agent.position, self.resolution), self.resolution);
            if let Some(r) = self.resource.get_mut(idx) {
                if *r > cfg.harvest_threshold {
                    let s = field.sample(agent.position).sanitized();
                    let modifier = (1.0 + 0.5 * s.affinity - 0.5 * s.stress).max(0.0);
                    let headroom = (1.0 - energy).max(0.0);
                    let gain = (cfg.harvest_rate * dt * *r * modifier).min(headroom);
                    energy += gain;
                    *r = clamp_unit(*r - gain * cfg.depletion_per_energy);
                }
            }

            if upkeep
                .iter()
                .any(|z| z.center.distance(agent.position) <= z.radius)
            {
                energy -= cfg.upkeep_tax * dt;
            }

            substrate.set_energy(i, energy);
            if energy < cfg.fatigue_threshold {
                substrate.scale_velocity(i, cfg.fatigue_damping);
                fatigued = fatigued.saturating_add(1);
            }
        }
        debug!(fatigued, "economy harvest applied");
    }

    // -----------------------------------------------------------------------
    // Claims
    // -----------------------------------------------------------------------

    /// Stamp each agent's group onto its cell, then spread and decay claims.
    ///
    /// `group_of` returns the agent's group (its meme id); agents without
    /// one fall back to their type tag.
    pub fn update_claims<G>(&mut self, substrate: &AgentSubstrate, dt: f32, group_of: G)
    where
        G: Fn(usize) -> Option<u32>,
    {
        let cfg = self.config.clone();
        for agent in substrate.views() {
            let group = group_of(agent.index).unwrap_or(agent.agent_type);
            let group = i32::try_from(group).unwrap_or(i32::MAX);
            let idx = index_of_key(cell_of(agent.position, self.resolution), self.resolution);
            let (Some(owner), Some(strength)) =
                (self.claim_owner.get_mut(idx), self.claim_strength.get_mut(idx))
            else {
                continue;
            };
            if *owner == group {
                *strength = clamp_unit(*strength + cfg.claim_stamp);
            } else if *owner == NEUTRAL_OWNER {
                *owner = group;
                *strength = cfg.claim_stamp;
            } else {
                *strength = clamp_unit(*strength - cfg.claim_contest);
                if *strength < cfg.claim_flip_floor {
                    *owner = group;
                    *strength = cfg.claim_stamp;
                }
            }
        }

        self.diffuse_claims();

        let keep = (1.0 - cfg.claim_decay * dt.max(0.0)).clamp(0.0, 1.0);
        for (owner, strength) in self.claim_owner.iter_mut().zip(self.claim_strength.iter_mut()) {
            *strength = clamp_unit(*strength * keep);
            if *strength < CLAIM_EPSILON {
                *strength = 0.0;
                *owner = NEUTRAL_OWNER;
            }
        }
    }

    fn diffuse_claims(&mut self) {
        let owners = self.claim_owner.clone();
        let strengths = self.claim_strength.clone();
        let resolution = self.resolution;
        for idx in 0..owners.len() {
            if owners.get(idx).copied() != Some(NEUTRAL_OWNER) {
                continue;
            }
            let key = key_of(idx, resolution);
            let mut best: Option<(i32, f32)> = None;
            for n in key.neighbors(resolution) {
                if n.row != key.row && n.col != key.col {
                    continue;
                }
                let nidx = index_of_key(n, resolution);
                let (Some(&o), Some(&s)) = (owners.get(nidx), strengths.get(nidx)) else {
                    continue;
                };
                if o != NEUTRAL_OWNER
                    && s >= self.config.claim_diffusion_min
                    && best.is_none_or(|(_, bs)| s > bs)
                {
                    best = Some((o, s));
                }
            }
            if let Some((owner, s)) = best {
                if let (Some(o), Some(st)) =
                    (self.claim_owner.get_mut(idx), self.claim_strength.get_mut(idx))
                {
                    *o = owner;
                    *st = clamp_unit(s * self.config.claim_diffusion);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Metrics
    // -----------------------------------------------------------------------

    /// Sample agents, update metrics, and record threshold events.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute_metrics(
        &mut self,
        substrate: &AgentSubstrate,
        now: f64,
        chronicle: &mut Chronicle,
    ) -> &EconomyMetrics {
        let energies = sample_energies(substrate, self.config.sample_size);
        let sampled = u32::try_from(energies.len()).unwrap_or(u32::MAX);
        let mean_energy = if energies.is_empty() {
            0.0
        } else {
            energies.iter().sum::<f32>() / energies.len() as f32
        };
        let fatigued = u32::try_from(
            energies
                .iter()
                .filter(|&&e| e < self.config.fatigue_threshold)
                .count(),
        )
        .unwrap_or(u32::MAX);

        let scarce = self
            .resource
            .iter()
            .filter(|&&r| r < self.config.scarcity_threshold)
            .count();
        let scarcity = scarce as f32 / self.resource.len().max(1) as f32;

        let (dominant_group, dominant_share) = dominant_territory(&self.claim_owner);

        let low = sampled > 0 && mean_energy < self.config.low_energy_threshold;
        let low_energy_streak = if low {
            self.metrics.low_energy_streak.saturating_add(1)
        } else {
            0
        };

        let metrics = EconomyMetrics {
            sampled,
            mean_energy,
            gini: gini(&energies),
            scarcity,
            dominant_group,
            dominant_share,
            fatigued,
            low_energy_streak,
        };

        if low && low_energy_streak == self.config.famine_streak {
            info!(mean_energy, streak = low_energy_streak, "famine");
            chronicle.record(
                now,
                ChronicleKind::Famine,
                "Famine spreads across the land",
                format!("mean energy {mean_energy:.2} for {low_energy_streak} macro-ticks"),
                format!("{fatigued} sampled agents are fatigued and slowing"),
            );
        }

        if let Some(prev) = &self.previous {
            let delta = metrics.gini - prev.gini;
            if delta.abs() >= self.config.inequality_delta {
                info!(from = prev.gini, to = metrics.gini, "inequality spike");
                chronicle.record(
                    now,
                    ChronicleKind::InequalitySpike,
                    "Inequality shifts sharply",
                    format!("gini moved from {:.2} to {:.2}", prev.gini, metrics.gini),
                    if delta > 0.0 {
                        "energy concentrates in fewer hands"
                    } else {
                        "energy evens out across the population"
                    },
                );
            }

            let changed_owner = matches!(
                (prev.dominant_group, metrics.dominant_group),
                (Some(a), Some(b)) if a != b
            );
            let share_jump =
                (metrics.dominant_share - prev.dominant_share).abs() >= self.config.territory_delta;
            if changed_owner || (share_jump && metrics.dominant_group.is_some()) {
                let group = metrics.dominant_group.unwrap_or(NEUTRAL_OWNER);
                info!(group, share = metrics.dominant_share, "territory shift");
                chronicle.record(
                    now,
                    ChronicleKind::TerritoryShift,
                    format!("Group {group} reshapes the map"),
                    format!(
                        "territory share {:.0}% -> {:.0}%",
                        prev.dominant_share * 100.0,
                        metrics.dominant_share * 100.0
                    ),
                    "claimed land changes hands",
                );
            }
        }

        self.previous = Some(metrics.clone());
        self.metrics = metrics;
        &self.metrics
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn cell_count(resolution: u32) -> usize {
    let r = usize::try_from(resolution).unwrap_or(1);
    r.saturating_mul(r)
}

fn index_of_key(key: CellKey, resolution: u32) -> usize {
    let row = usize::try_from(key.row).unwrap_or(0);
    let col = usize::try_from(key.col).unwrap_or(0);
    let res = usize::try_from(resolution).unwrap_or(1);
    row.saturating_mul(res).saturating_add(col)
}

fn key_of(idx: usize, resolution: u32) -> CellKey {
    let res = usize::try_from(resolution.max(1)).unwrap_or(1);
    let row = u32::try_from(idx.checked_div(res).unwrap_or(0)).unwrap_or(0);
    let col = u32::try_from(idx.checked_rem(res).unwrap_or(0)).unwrap_or(0);
    CellKey::new(col, row)
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

/// Energies of at most `max` agents, taken at a fixed stride.
pub fn sample_energies(substrate: &AgentSubstrate, max: u32) -> Vec<f32> {
    let n = substrate.len();
    let max = usize::try_from(max.max(1)).unwrap_or(usize::MAX);
    let take = n.min(max);
    let stride = n.checked_div(take).unwrap_or(1).max(1);
    (0..take)
        .filter_map(|k| substrate.energy(k.saturating_mul(stride)))
        .collect()
}

/// Gini coefficient of `values` using the sorted-sample formula.
///
/// Returns zero for empty input, zero-sum input, or when every value is
/// equal within a small epsilon. The result is clamped to `[0, 1]`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn gini(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values
        .iter()
        .map(|&v| if v.is_finite() { f64::from(v.max(0.0)) } else { 0.0 })
        .collect();
    sorted.sort_by(f64::total_cmp);

    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return 0.0;
    };
    if max - min <= GINI_EPSILON {
        return 0.0;
    }
    let sum: f64 = sorted.iter().sum();
    if sum <= 0.0 {
        return 0.0;
    }
    let n = sorted.len() as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| (i as f64 + 1.0) * x)
        .sum();
    let g = (2.0 * weighted) / (n * sum) - (n + 1.0) / n;
    g.clamp(0.0, 1.0) as f32
}

/// Owner of the most claimed cells (ties to the lowest id) and its share.
#[allow(clippy::cast_precision_loss)]
fn dominant_territory(owners: &[i32]) -> (Option<i32>, f32) {
    let mut counts: BTreeMap<i32, u32> = BTreeMap::new();
    let mut claimed = 0_u32;
    for &o in owners {
        if o != NEUTRAL_OWNER {
            let c = counts.entry(o).or_insert(0);
            *c = c.saturating_add(1);
            claimed = claimed.saturating_add(1);
        }
    }
    let mut best: Option<(i32, u32)> = None;
    for (&o, &c) in &counts {
        if best.is_none_or(|(_, bc)| c > bc) {
            best = Some((o, c));
        }
    }
    match best {
        Some((o, c)) if claimed > 0 => (Some(o), c as f32 / claimed as f32),
        _ => (None, 0.0),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
mod tests {
    use sociogenesis_types::AgentSeed;

    use super::*;
    use crate::field::{FieldSample, NeutralField};
    use crate::rng::seeded;

    fn population(n: usize, energy: f32, agent_type: u32) -> AgentSubstrate {
        let mut s = AgentSubstrate::new(n.max(1)).unwrap();
        for k in 0..n {
            #[allow(clippy::cast_precision_loss)]
            let x = -0.9 + 1.8 * (k as f32) / (n.max(1) as f32);
            s.push(AgentSeed {
                position: Vec2::new(x, 0.0),
                velocity: Vec2::new(0.01, 0.0),
                agent_type,
                energy,
            })
            .unwrap();
        }
        s
    }

    #[test]
    fn gini_is_zero_for_equal_values() {
        assert!(gini(&[0.4; 50]).abs() < f32::EPSILON);
        assert!(gini(&[]).abs() < f32::EPSILON);
        assert!(gini(&[0.0, 0.0]).abs() < f32::EPSILON);
    }

    #[test]
    fn gini_matches_known_distribution() {
        // One holder of everything among four: (n - 1) / n.
        let g = gini(&[0.0, 0.0, 0.0, 1.0]);
        assert!((g - 0.75).abs() < 1e-5);
    }

    #[test]
    fn gini_stays_in_unit_interval() {
        let mut rng = seeded(3);
        for _ in 0..50 {
            let values: Vec<f32> = (0..37).map(|_| unit(&mut rng)).collect();
            let g = gini(&values);
            assert!((0.0..=1.0).contains(&g));
        }
    }

    #[test]
    fn base_is_deterministic_per_seed() {
        let cfg = EconomyConfig::default();
        let a = EconomyEngine::new(&cfg, &mut seeded(11));
        let b = EconomyEngine::new(&cfg, &mut seeded(11));
        assert_eq!(a.resource(), b.resource());
        assert!(a.resource().iter().all(|r| (0.0..=1.0).contains(r)));
    }

    #[test]
    fn field_derived_mode_stays_clamped() {
        let cfg = EconomyConfig {
            mode: ResourceMode::FieldDerived,
            ..EconomyConfig::default()
        };
        let mut eco = EconomyEngine::new(&cfg, &mut seeded(5));
        let field = |_p: Vec2| FieldSample {
            cohesion: 1.0,
            scarcity: 0.0,
            tension: 0.0,
            affinity: 0.0,
            stress: 0.0,
        };
        for _ in 0..200 {
            eco.step_field(1.0, &field);
        }
        assert!(eco.resource().iter().all(|r| (0.0..=1.0).contains(r)));
    }

    #[test]
    fn metabolism_drains_and_fatigue_damps() {
        let cfg = EconomyConfig {
            harvest_rate: 0.0,
            ..EconomyConfig::default()
        };
        let mut eco = EconomyEngine::new(&cfg, &mut seeded(1));
        let mut s = population(4, 0.1, 0);
        eco.harvest(&mut s, 1.0, &NeutralField, &[]);
        let v = s.view(0).unwrap();
        assert!(v.energy < 0.1);
        assert!(v.velocity.x < 0.01);
    }

    #[test]
    fn upkeep_zone_taxes_occupants() {
        let cfg = EconomyConfig {
            harvest_rate: 0.0,
            metabolism: 0.0,
            ..EconomyConfig::default()
        };
        let mut eco = EconomyEngine::new(&cfg, &mut seeded(1));
        let mut s = population(2, 0.8, 0);
        let zone = UpkeepZone {
            center: s.position(0).unwrap(),
            radius: 0.05,
        };
        eco.harvest(&mut s, 1.0, &NeutralField, &[zone]);
        assert!(s.energy(0).unwrap() < 0.8);
        assert!((s.energy(1).unwrap() - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn claims_stay_bounded_and_neutral_when_empty() {
        let mut eco = EconomyEngine::new(&EconomyConfig::default(), &mut seeded(2));
        let s = population(50, 0.5, 3);
        for _ in 0..100 {
            eco.update_claims(&s, 1.0, |_| None);
        }
        assert!(eco.claim_strength().iter().all(|c| (0.0..=1.0).contains(c)));
        for (o, c) in eco.claim_owner().iter().zip(eco.claim_strength()) {
            if *c < CLAIM_EPSILON {
                assert_eq!(*o, NEUTRAL_OWNER);
            }
        }
        assert_eq!(eco.claim_at(s.position(0).unwrap()).0, Some(3));
    }

    #[test]
    fn contested_cell_flips_owner() {
        let cfg = EconomyConfig {
            claim_decay: 0.0,
            ..EconomyConfig::default()
        };
        let mut eco = EconomyEngine::new(&cfg, &mut seeded(2));
        let s = population(1, 0.5, 0);
        eco.update_claims(&s, 1.0, |_| Some(1));
        assert_eq!(eco.claim_at(s.position(0).unwrap()).0, Some(1));
        eco.update_claims(&s, 1.0, |_| Some(2));
        assert_eq!(eco.claim_at(s.position(0).unwrap()).0, Some(2));
    }

    #[test]
    fn famine_fires_exactly_once_at_streak() {
        let mut eco = EconomyEngine::new(&EconomyConfig::default(), &mut seeded(9));
        let s = population(30, 0.05, 0);
        let mut chronicle = Chronicle::default();
        for tick in 0..6 {
            eco.compute_metrics(&s, f64::from(tick), &mut chronicle);
            let expected = usize::from(tick >= 2);
            assert_eq!(chronicle.count_kind(ChronicleKind::Famine), expected);
        }
        assert_eq!(eco.metrics().low_energy_streak, 6);
    }

    #[test]
    fn sample_is_bounded() {
        let s = population(450, 0.5, 0);
        assert_eq!(sample_energies(&s, 200).len(), 200);
        assert_eq!(sample_energies(&s, 1000).len(), 450);
    }

    #[test]
    fn sudden_inequality_is_recorded() {
        let mut eco = EconomyEngine::new(&EconomyConfig::default(), &mut seeded(4));
        let mut s = population(30, 0.5, 0);
        let mut chronicle = Chronicle::default();
        eco.compute_metrics(&s, 0.0, &mut chronicle);
        assert!(eco.metrics().gini.abs() < f32::EPSILON);
        for i in 0..15 {
            assert!(s.set_energy(i, 0.0));
        }
        eco.compute_metrics(&s, 1.0, &mut chronicle);
        assert!(eco.metrics().gini > 0.4);
        assert_eq!(chronicle.count_kind(ChronicleKind::InequalitySpike), 1);
        eco.compute_metrics(&s, 2.0, &mut chronicle);
        assert_eq!(chronicle.count_kind(ChronicleKind::InequalitySpike), 1);
    }

    #[test]
    fn new_dominant_group_shifts_territory() {
        let cfg = EconomyConfig {
            claim_decay: 0.0,
            ..EconomyConfig::default()
        };
        let mut eco = EconomyEngine::new(&cfg, &mut seeded(2));
        let s = population(1, 0.5, 0);
        let mut chronicle = Chronicle::default();
        eco.update_claims(&s, 1.0, |_| Some(1));
        eco.compute_metrics(&s, 0.0, &mut chronicle);
        assert_eq!(eco.metrics().dominant_group, Some(1));
        assert_eq!(chronicle.count_kind(ChronicleKind::TerritoryShift), 0);

        eco.update_claims(&s, 1.0, |_| Some(2));
        eco.compute_metrics(&s, 1.0, &mut chronicle);
        assert_eq!(eco.metrics().dominant_group, Some(2));
        assert_eq!(chronicle.count_kind(ChronicleKind::TerritoryShift), 1);
    }

    #[test]
    fn runtime_config_keeps_grid_resolution() {
        let mut eco = EconomyEngine::new(&EconomyConfig::default(), &mut seeded(1));
        let cells = eco.resource().len();
        eco.set_config(&EconomyConfig {
            resolution: 4,
            regen_rate: -1.0,
            ..EconomyConfig::default()
        });
        assert_eq!(eco.resolution(), 32);
        assert_eq!(eco.config().resolution, 32);
        assert!(eco.config().regen_rate.abs() < f32::EPSILON);
        assert_eq!(eco.resource().len(), cells);
    }
}
