//! Meme contagion weighted by prestige.
//!
//! # Architecture
//!
//! [`CultureState`] holds four parallel arrays sized to substrate capacity:
//! meme id, meme strength, prestige, and last conversion time. Records with
//! strength below [`SEED_EPSILON`] are treated as never seeded and are
//! seeded from `agent_type % meme_count` before each pass.
//!
//! [`CultureEngine::step`] samples a fraction of agents. Each sampled agent
//! outside its cooldown looks for the strongest influencer of a different
//! meme within `convert_radius` (score `prestige * strength`) and converts
//! with a sigmoid probability of the score margin over its own resistance
//! (`prestige * resistance_factor`). The field sample at the agent shifts
//! that probability: affinity raises it, stress lowers it.
//!
//! # Invariants
//!
//! - Every seeded meme id is in `[0, meme_count)`.
//! - Strength and prestige stay in `[0, 1]`.
//! - All draws come from the injected generator, in agent-sample order.

use rand::Rng;
use tracing::{debug, info};

use sociogenesis_types::{Chronicle, ChronicleKind, MemeStats};
use sociogenesis_world::{AgentSubstrate, FieldSampler, SimRng};

use crate::config::CultureConfig;

/// Strength below which a record counts as unseeded.
pub const SEED_EPSILON: f32 = 1e-4;

// ---------------------------------------------------------------------------
// CultureState
// ---------------------------------------------------------------------------

/// Per-agent cultural state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CultureState {
    meme_id: Vec<u32>,
    meme_strength: Vec<f32>,
    prestige: Vec<f32>,
    last_convert_at: Vec<f64>,
}

impl CultureState {
    /// Allocate unseeded records for `capacity` agents.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            meme_id: vec![0; capacity],
            meme_strength: vec![0.0; capacity],
            prestige: vec![0.0; capacity],
            last_convert_at: vec![f64::NEG_INFINITY; capacity],
        }
    }

    /// Reallocate and clear every record.
    pub fn reset(&mut self, capacity: usize) {
        *self = Self::with_capacity(capacity);
    }

    /// Number of records.
    pub fn capacity(&self) -> usize {
        self.meme_id.len()
    }

    /// Meme carried by agent `index`, if seeded.
    pub fn meme(&self, index: usize) -> Option<u32> {
        let strength = self.meme_strength.get(index).copied()?;
        if strength < SEED_EPSILON {
            return None;
        }
        self.meme_id.get(index).copied()
    }

    /// Meme strength of agent `index`.
    pub fn strength(&self, index: usize) -> f32 {
        self.meme_strength.get(index).copied().unwrap_or(0.0)
    }

    /// Prestige of agent `index`.
    pub fn prestige(&self, index: usize) -> f32 {
        self.prestige.get(index).copied().unwrap_or(0.0)
    }

    /// Last time agent `index` converted.
    pub fn last_convert_at(&self, index: usize) -> f64 {
        self.last_convert_at
            .get(index)
            .copied()
            .unwrap_or(f64::NEG_INFINITY)
    }

    /// Overwrite the meme of agent `index`.
    pub fn set_meme(&mut self, index: usize, meme: u32, strength: f32) {
        if let (Some(m), Some(s)) = (self.meme_id.get_mut(index), self.meme_strength.get_mut(index)) {
            *m = meme;
            *s = strength.clamp(0.0, 1.0);
        }
    }

    /// Overwrite the prestige of agent `index`, clamped to `[0, 1]`.
    pub fn set_prestige(&mut self, index: usize, value: f32) {
        if let Some(p) = self.prestige.get_mut(index) {
            *p = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        }
    }

    /// Add `delta` to the prestige of agent `index`, clamped to `[0, 1]`.
    pub fn add_prestige(&mut self, index: usize, delta: f32) {
        let next = self.prestige(index) + delta;
        self.set_prestige(index, next);
    }

    /// Multiply every prestige value by `factor`.
    pub fn scale_prestige(&mut self, factor: f32) {
        for p in &mut self.prestige {
            *p = (*p * factor).clamp(0.0, 1.0);
        }
    }

    /// Seed every unseeded record among the first `count` agents from its
    /// type. Returns how many were seeded.
    pub fn seed_missing(&mut self, substrate: &AgentSubstrate, config: &CultureConfig) -> u32 {
        let meme_count = config.meme_count.max(1);
        let mut seeded = 0_u32;
        for i in 0..substrate.len().min(self.capacity()) {
            if self.strength(i) >= SEED_EPSILON {
                continue;
            }
            let Some(agent_type) = substrate.agent_type(i) else { continue };
            self.set_meme(i, agent_type.checked_rem(meme_count).unwrap_or(0), config.seed_strength);
            if self.prestige(i) <= 0.0 {
                self.set_prestige(i, config.seed_prestige);
            }
            if let Some(t) = self.last_convert_at.get_mut(i) {
                *t = f64::NEG_INFINITY;
            }
            seeded = seeded.saturating_add(1);
        }
        seeded
    }

    /// Fold every meme id into `[0, meme_count)`.
    pub fn remap_memes(&mut self, meme_count: u32) {
        let meme_count = meme_count.max(1);
        for m in &mut self.meme_id {
            *m = m.checked_rem(meme_count).unwrap_or(0);
        }
    }

    /// Meme distribution over the first `count` seeded agents.
    #[allow(clippy::cast_precision_loss)]
    pub fn meme_stats(&self, count: usize, meme_count: u32, schism_band: (f32, f32)) -> MemeStats {
        let slots = usize::try_from(meme_count.max(1)).unwrap_or(1);
        let mut counts = vec![0_u32; slots];
        for i in 0..count.min(self.capacity()) {
            let Some(meme) = self.meme(i) else { continue };
            let slot = usize::try_from(meme).ok().and_then(|m| counts.get_mut(m));
            if let Some(c) = slot {
                *c = c.saturating_add(1);
            }
        }
        let total: u32 = counts.iter().copied().fold(0, u32::saturating_add);
        let shares: Vec<f32> = counts
            .iter()
            .map(|&c| if total == 0 { 0.0 } else { c as f32 / total as f32 })
            .collect();

        let mut dominant: Option<(u32, u32)> = None;
        for (meme, &c) in (0_u32..).zip(counts.iter()) {
            if c > 0 && dominant.is_none_or(|(_, best)| c > best) {
                dominant = Some((meme, c));
            }
        }
        let dominant_share = dominant.map_or(0.0, |(_, c)| c as f32 / total.max(1) as f32);
        let (low, high) = schism_band;
        let balanced = shares.iter().filter(|&&s| s >= low && s <= high).count();

        MemeStats {
            total,
            counts,
            shares,
            dominant: dominant.map(|(m, _)| m),
            dominant_share,
            schism: balanced >= 2,
        }
    }
}

// ---------------------------------------------------------------------------
// CultureEngine
// ---------------------------------------------------------------------------

/// Outcome of one contagion pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CultureReport {
    /// Records seeded before sampling.
    pub seeded: u32,
    /// Agents sampled.
    pub sampled: u32,
    /// Conversions this pass.
    pub conversions: u32,
    /// Distribution after the pass.
    pub stats: MemeStats,
}

/// Contagion parameters plus the edge-trigger latches for culture events.
#[derive(Debug, Clone, PartialEq)]
pub struct CultureEngine {
    config: CultureConfig,
    dominance_active: bool,
    schism_active: bool,
}

impl CultureEngine {
    /// Create an engine with no latched events.
    pub fn new(config: &CultureConfig) -> Self {
        Self {
            config: config.sanitized(),
            dominance_active: false,
            schism_active: false,
        }
    }

    /// Active parameters.
    pub const fn config(&self) -> &CultureConfig {
        &self.config
    }

    /// Change the number of memes, folding existing ids into range.
    pub fn set_meme_count(&mut self, state: &mut CultureState, meme_count: u32) {
        self.config.meme_count = meme_count;
        self.config = self.config.sanitized();
        state.remap_memes(self.config.meme_count);
    }

    /// Change the conversion probability multiplier.
    pub fn set_influence_gain(&mut self, gain: f32) {
        self.config.influence_gain = gain;
        self.config = self.config.sanitized();
    }

    /// Replace every parameter, folding meme ids into the new count.
    pub fn set_config(&mut self, state: &mut CultureState, config: &CultureConfig) {
        self.config = config.sanitized();
        state.remap_memes(self.config.meme_count);
    }

    /// Clear the event latches.
    pub const fn reset(&mut self) {
        self.dominance_active = false;
        self.schism_active = false;
    }

    /// Distribution over the first `count` agents.
    pub fn meme_stats(&self, state: &CultureState, count: usize) -> MemeStats {
        state.meme_stats(
            count,
            self.config.meme_count,
            (self.config.schism_low, self.config.schism_high),
        )
    }

    /// Conversion probability for an influence margin, before field
    /// modulation.
    pub fn conversion_probability(&self, margin: f32) -> f32 {
        let sigmoid = 1.0 / (1.0 + (-self.config.sigmoid_steepness * margin).exp());
        (self.config.base_rate * sigmoid * self.config.influence_gain).clamp(0.0, 1.0)
    }

    /// Strongest influencer of a different meme within reach of `index`.
    fn best_influencer(&self, state: &CultureState, substrate: &AgentSubstrate, index: usize) -> Option<(usize, f32)> {
        let own = state.meme(index)?;
        let p = substrate.position(index)?;
        let mut best: Option<(usize, f32)> = None;
        for j in 0..substrate.len().min(state.capacity()) {
            if j == index {
                continue;
            }
            let Some(meme) = state.meme(j) else { continue };
            if meme == own {
                continue;
            }
            let Some(q) = substrate.position(j) else { continue };
            if p.distance(q) > self.config.convert_radius {
                continue;
            }
            let score = state.prestige(j) * state.strength(j);
            if score > 0.0 && best.is_none_or(|(_, s)| score > s) {
                best = Some((j, score));
            }
        }
        best
    }

    /// Run one contagion pass.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn step(
        &mut self,
        state: &mut CultureState,
        substrate: &AgentSubstrate,
        field: &dyn FieldSampler,
        now: f64,
        rng: &mut SimRng,
        chronicle: &mut Chronicle,
    ) -> CultureReport {
        let mut report = CultureReport {
            seeded: state.seed_missing(substrate, &self.config),
            ..CultureReport::default()
        };
        let n = substrate.len().min(state.capacity());
        if n == 0 {
            report.stats = self.meme_stats(state, n);
            return report;
        }

        let wanted = (n as f32 * self.config.sample_fraction).ceil() as usize;
        let max_sample = usize::try_from(self.config.max_sample).unwrap_or(usize::MAX);
        let sample = wanted.clamp(1, max_sample.max(1));

        for _ in 0..sample {
            let i = rng.random_range(0..n);
            report.sampled = report.sampled.saturating_add(1);
            if now - state.last_convert_at(i) < self.config.cooldown_sec {
                continue;
            }
            let Some((j, score)) = self.best_influencer(state, substrate, i) else { continue };
            let resistance = state.prestige(i) * self.config.resistance_factor;
            let mut probability = self.conversion_probability(score - resistance);
            if let Some(p) = substrate.position(i) {
                let s = field.sample(p).sanitized();
                let factor = 1.0 + self.config.affinity_weight * s.affinity - self.config.stress_weight * s.stress;
                probability = (probability * factor.max(0.0)).clamp(0.0, 1.0);
            }
            if rng.random::<f32>() >= probability {
                continue;
            }
            let Some(meme) = state.meme(j) else { continue };
            let strength = state.strength(i);
            state.set_meme(i, meme, strength + (1.0 - strength) * self.config.strength_blend);
            state.add_prestige(j, self.config.influencer_bonus);
            if let Some(t) = state.last_convert_at.get_mut(i) {
                *t = now;
            }
            report.conversions = report.conversions.saturating_add(1);
        }

        let stats = self.meme_stats(state, n);
        if report.conversions >= self.config.min_wave {
            info!(conversions = report.conversions, "conversion wave");
            chronicle.record(
                now,
                ChronicleKind::ConversionWave,
                format!("{} agents converted in one season", report.conversions),
                "prestigious neighbors pressed their memes",
                "cultural borders shift",
            );
        }

        let dominant = stats.dominant_share > self.config.dominance_share;
        if dominant && !self.dominance_active {
            let meme = stats.dominant.unwrap_or_default();
            info!(meme, share = stats.dominant_share, "cult dominance");
            chronicle.record(
                now,
                ChronicleKind::CultDominance,
                format!("Meme {meme} dominates the population"),
                format!("{:.0}% of agents share it", stats.dominant_share * 100.0),
                "dissenting memes are at risk of extinction",
            );
        }
        self.dominance_active = dominant;

        if stats.schism && !self.schism_active {
            info!(shares = ?stats.shares, "schism warning");
            chronicle.record(
                now,
                ChronicleKind::SchismWarning,
                "Two memes split the population",
                "neither side holds a clear majority",
                "conflict between the factions is likely",
            );
        }
        self.schism_active = stats.schism;

        debug!(
            sampled = report.sampled,
            conversions = report.conversions,
            seeded = report.seeded,
            "culture pass"
        );
        report.stats = stats;
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
mod tests {
    use sociogenesis_types::{AgentSeed, Vec2};
    use sociogenesis_world::{NeutralField, seeded};

    use super::*;

    fn population(types: &[u32], spacing: f32) -> AgentSubstrate {
        let mut s = AgentSubstrate::new(types.len().max(1)).unwrap();
        for (k, &agent_type) in (0_u16..).zip(types) {
            s.push(AgentSeed {
                position: Vec2::new(-0.9 + spacing * f32::from(k), 0.0),
                velocity: Vec2::ZERO,
                agent_type,
                energy: 1.0,
            })
            .unwrap();
        }
        s
    }

    #[test]
    fn unseeded_agents_take_their_type_meme() {
        let s = population(&[0, 1, 2, 5], 0.5);
        let mut state = CultureState::with_capacity(4);
        let seeded_count = state.seed_missing(&s, &CultureConfig::default());
        assert_eq!(seeded_count, 4);
        assert_eq!(state.meme(3), Some(1));
        assert_eq!(state.seed_missing(&s, &CultureConfig::default()), 0);
    }

    #[test]
    fn balanced_split_reports_schism() {
        let types: Vec<u32> = (0..100).map(|_| 0).collect();
        let s = population(&types, 0.0);
        let mut state = CultureState::with_capacity(100);
        for i in 0..100 {
            let meme = match i {
                0..40 => 0,
                40..75 => 1,
                75..90 => 2,
                _ => 3,
            };
            state.set_meme(i, meme, 1.0);
        }
        let engine = CultureEngine::new(&CultureConfig::default());
        let stats = engine.meme_stats(&state, s.len());
        assert_eq!(stats.total, 100);
        assert_eq!(stats.dominant, Some(0));
        assert!((stats.dominant_share - 0.4).abs() < 1e-6);
        assert!(stats.schism);
    }

    #[test]
    fn strong_influencer_converts_neighbors() {
        let s = population(&[0, 1, 1, 1], 0.01);
        let mut state = CultureState::with_capacity(4);
        let cfg = CultureConfig {
            sample_fraction: 1.0,
            base_rate: 1.0,
            influence_gain: 10.0,
            cooldown_sec: 0.0,
            min_wave: 1,
            ..CultureConfig::default()
        };
        let mut engine = CultureEngine::new(&cfg);
        state.seed_missing(&s, &cfg);
        state.set_meme(0, 0, 1.0);
        state.set_prestige(0, 1.0);
        for i in 1..4 {
            state.set_prestige(i, 0.0);
        }
        let mut chronicle = Chronicle::default();
        let mut rng = seeded(5);
        let mut conversions = 0;
        for tick in 0..10 {
            conversions += engine
                .step(&mut state, &s, &NeutralField, f64::from(tick), &mut rng, &mut chronicle)
                .conversions;
        }
        assert!(conversions > 0);
        assert!(chronicle.count_kind(ChronicleKind::ConversionWave) > 0);
        assert!(state.prestige(0) <= 1.0);
    }

    #[test]
    fn dominance_is_edge_triggered() {
        let s = population(&[0, 0, 0, 1], 0.5);
        let mut state = CultureState::with_capacity(4);
        let cfg = CultureConfig {
            base_rate: 0.0,
            ..CultureConfig::default()
        };
        let mut engine = CultureEngine::new(&cfg);
        let mut chronicle = Chronicle::default();
        let mut rng = seeded(1);
        for tick in 0..3 {
            engine.step(&mut state, &s, &NeutralField, f64::from(tick), &mut rng, &mut chronicle);
        }
        assert_eq!(chronicle.count_kind(ChronicleKind::CultDominance), 1);
    }

    #[test]
    fn shrinking_meme_count_remaps_ids() {
        let s = population(&[3, 2], 0.5);
        let mut state = CultureState::with_capacity(2);
        let mut engine = CultureEngine::new(&CultureConfig::default());
        state.seed_missing(&s, engine.config());
        engine.set_meme_count(&mut state, 2);
        assert_eq!(state.meme(0), Some(1));
        assert_eq!(state.meme(1), Some(0));
        engine.set_meme_count(&mut state, 0);
        assert_eq!(engine.config().meme_count, 1);
    }

    #[test]
    fn same_seed_same_conversions() {
        let types: Vec<u32> = (0..40).map(|k| k % 3).collect();
        let s = population(&types, 0.02);
        let cfg = CultureConfig {
            cooldown_sec: 0.0,
            ..CultureConfig::default()
        };
        let run = |seed| {
            let mut state = CultureState::with_capacity(40);
            let mut engine = CultureEngine::new(&cfg);
            let mut rng = seeded(seed);
            let mut chronicle = Chronicle::default();
            for tick in 0..5 {
                engine.step(&mut state, &s, &NeutralField, f64::from(tick), &mut rng, &mut chronicle);
            }
            (0..40).map(|i| state.meme(i)).collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn schism_warning_is_edge_triggered() {
        let types: Vec<u32> = (0..100).map(|_| 0).collect();
        let s = population(&types, 0.0);
        let mut state = CultureState::with_capacity(100);
        let split = |state: &mut CultureState| {
            for i in 0..100 {
                let meme = match i {
                    0..40 => 0,
                    40..75 => 1,
                    75..90 => 2,
                    _ => 3,
                };
                state.set_meme(i, meme, 1.0);
            }
        };
        split(&mut state);
        let cfg = CultureConfig {
            base_rate: 0.0,
            ..CultureConfig::default()
        };
        let mut engine = CultureEngine::new(&cfg);
        let mut chronicle = Chronicle::default();
        let mut rng = seeded(2);
        for tick in 0..3 {
            engine.step(&mut state, &s, &NeutralField, f64::from(tick), &mut rng, &mut chronicle);
        }
        assert_eq!(chronicle.count_kind(ChronicleKind::SchismWarning), 1);

        for i in 0..100 {
            state.set_meme(i, 0, 1.0);
        }
        let united = engine.step(&mut state, &s, &NeutralField, 3.0, &mut rng, &mut chronicle);
        assert!(!united.stats.schism);

        split(&mut state);
        engine.step(&mut state, &s, &NeutralField, 4.0, &mut rng, &mut chronicle);
        assert_eq!(chronicle.count_kind(ChronicleKind::SchismWarning), 2);
    }
}
