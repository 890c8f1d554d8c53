//! Pattern detection that turns raw agent behavior into institutions.
//!
//! Runs on the coarse detection cadence. Each pass analyzes the spatial
//! grid once and then makes three independent passes over it:
//!
//! - **Totems**: each populated cell is classified by speed, purity, and
//!   type diversity. Candidates too close to an existing totem are
//!   rejected, and spawning is rate-limited to a rolling window.
//! - **Taboos**: an empty cell walled in by dense neighbors becomes
//!   `NO_ENTER`; a single-type cell bordering a populous foreign type becomes
//!   `NO_MIX`. At most one taboo per pass.
//! - **Rituals**: agents around each ritual-less totem are decomposed into
//!   radial and tangential motion and classified as a procession, a
//!   gathering, or an offering. Orphaned rituals do not count against
//!   the ritual cap.
//!
//! # Invariants
//!
//! - Two totems never spawn within the exclusion radius of each other, even
//!   when the detector runs twice with zero elapsed time.
//! - At most `spawn_window_max` emergent totems spawn within any window of
//!   `spawn_window_sec` seconds.

use std::collections::VecDeque;

use tracing::{debug, info};

use sociogenesis_types::{
    Chronicle, ChronicleKind, RitualId, RitualKind, TabooId, TabooKind, TabooSpec, TotemId,
    TotemKind, Vec2,
};
use sociogenesis_world::grid::{CellKey, CellStats, GridMap, analyze};
use sociogenesis_world::{AgentSubstrate, SimRng};

use crate::config::DetectorConfig;
use crate::registry::InstitutionRegistry;

/// Institutions spawned by one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionReport {
    /// New totems.
    pub totems: Vec<TotemId>,
    /// New taboos.
    pub taboos: Vec<TabooId>,
    /// New rituals.
    pub rituals: Vec<RitualId>,
}

impl DetectionReport {
    /// Whether nothing spawned.
    pub fn is_empty(&self) -> bool {
        self.totems.is_empty() && self.taboos.is_empty() && self.rituals.is_empty()
    }
}

/// Mean motion of agents around a totem, relative to its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProfile {
    /// Agents sampled.
    pub samples: u32,
    /// Mean radial velocity; negative is inward.
    pub radial: f32,
    /// Mean signed tangential velocity; positive is counter-clockwise.
    pub tangential: f32,
    /// Mean speed.
    pub speed: f32,
}

/// Rate-limited institution spawner.
#[derive(Debug, Clone, PartialEq)]
pub struct Detector {
    config: DetectorConfig,
    recent_spawns: VecDeque<f64>,
}

impl Detector {
    /// Create a detector with sanitized thresholds.
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            config: config.sanitized(),
            recent_spawns: VecDeque::new(),
        }
    }

    /// Active thresholds.
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Replace the thresholds.
    pub fn set_config(&mut self, config: &DetectorConfig) {
        self.config = config.sanitized();
    }

    /// Forget the spawn window.
    pub fn reset(&mut self) {
        self.recent_spawns.clear();
    }

    /// Run one full detection pass.
    pub fn run(
        &mut self,
        registry: &mut InstitutionRegistry,
        substrate: &AgentSubstrate,
        now: f64,
        rng: &mut SimRng,
        chronicle: &mut Chronicle,
    ) -> DetectionReport {
        let grid = analyze(substrate, self.config.grid_resolution);
        let report = DetectionReport {
            totems: self.detect_totems(registry, &grid, now, rng, chronicle),
            taboos: self.detect_taboos(registry, &grid, now, chronicle),
            rituals: self.detect_rituals(registry, substrate, now, chronicle),
        };
        debug!(
            cells = grid.len(),
            totems = report.totems.len(),
            taboos = report.taboos.len(),
            rituals = report.rituals.len(),
            "detection pass"
        );
        report
    }

    // -----------------------------------------------------------------------
    // Totems
    // -----------------------------------------------------------------------

    /// Classify one cell, or `None` if it hosts no totem.
    #[allow(clippy::cast_precision_loss)]
    pub fn classify_cell(&self, stats: &CellStats) -> Option<TotemKind> {
        let c = &self.config;
        let count = stats.count as f32;
        let min = c.min_agents as f32;
        let speed = stats.mean_speed;
        let purity = stats.purity();

        if speed > c.oracle_speed && count >= 0.5 * min {
            return Some(TotemKind::Oracle);
        }
        let bond = purity > c.bond_purity && speed < c.bond_max_speed && count >= min;
        if bond {
            return Some(TotemKind::Bond);
        }
        if speed < c.archive_speed && count >= 0.7 * min {
            return Some(TotemKind::Archive);
        }
        let norm = stats.count.min(c.diversity_norm).max(1) as f32;
        let diversity = stats.distinct_types() as f32 / norm;
        if diversity > c.rift_diversity
            && (c.rift_min_speed..=c.rift_max_speed).contains(&speed)
            && count >= min
        {
            return Some(TotemKind::Rift);
        }
        None
    }

    fn window_has_room(&mut self, now: f64) -> bool {
        let horizon = now - self.config.spawn_window_sec;
        while self.recent_spawns.front().is_some_and(|&t| t < horizon) {
            self.recent_spawns.pop_front();
        }
        self.recent_spawns.len() < usize::try_from(self.config.spawn_window_max).unwrap_or(usize::MAX)
    }

    fn totem_cap_reached(&self, registry: &InstitutionRegistry) -> bool {
        registry.totems().len() >= usize::try_from(self.config.max_totems).unwrap_or(usize::MAX)
    }

    fn detect_totems(
        &mut self,
        registry: &mut InstitutionRegistry,
        grid: &GridMap,
        now: f64,
        rng: &mut SimRng,
        chronicle: &mut Chronicle,
    ) -> Vec<TotemId> {
        let mut spawned = Vec::new();
        for stats in grid.values() {
            if self.totem_cap_reached(registry) || !self.window_has_room(now) {
                break;
            }
            let Some(kind) = self.classify_cell(stats) else { continue };
            let position = stats.centroid;
            let blocked = registry
                .totems()
                .iter()
                .any(|t| t.position.distance(position) < self.config.totem_exclusion);
            if blocked {
                continue;
            }

            let id = registry.spawn_totem(
                kind,
                position,
                self.config.totem_radius,
                self.config.totem_strength,
                now,
                rng,
            );
            self.recent_spawns.push_back(now);
            spawned.push(id);

            let name = registry.totem(id).map(|t| t.name.clone()).unwrap_or_default();
            info!(totem = %id, kind = kind.label(), name = %name, count = stats.count, "totem emerged");
            chronicle.record(
                now,
                ChronicleKind::TotemEmerged,
                format!("{name} rises as a {} totem", kind.label()),
                format!(
                    "{} agents gathered (purity {:.0}%, mean speed {:.3})",
                    stats.count,
                    stats.purity() * 100.0,
                    stats.mean_speed
                ),
                match kind {
                    TotemKind::Bond => "nearby agents are drawn together",
                    TotemKind::Rift => "nearby agents are pushed apart",
                    TotemKind::Oracle => "nearby agents drift with its turning omen",
                    TotemKind::Archive => "a silent marker of what once stood still",
                },
            );
        }
        spawned
    }

    // -----------------------------------------------------------------------
    // Taboos
    // -----------------------------------------------------------------------

    fn detect_taboos(
        &self,
        registry: &mut InstitutionRegistry,
        grid: &GridMap,
        now: f64,
        chronicle: &mut Chronicle,
    ) -> Vec<TabooId> {
        let cap = usize::try_from(self.config.max_taboos).unwrap_or(usize::MAX);
        if registry.taboos().len() >= cap {
            return Vec::new();
        }
        let Some(spec) = self.find_taboo(registry, grid) else {
            return Vec::new();
        };
        let Ok(id) = registry.spawn_taboo(&spec, now) else {
            return Vec::new();
        };

        info!(taboo = %id, kind = spec.kind.label(), "taboo emerged");
        let (cause, consequence) = match (spec.kind, spec.target_type) {
            (TabooKind::NoMix, Some(t)) => (
                format!("a closed enclave borders a crowd of type {t}"),
                format!("type {t} trespassers are slowed and judged"),
            ),
            _ => (
                "agents crowd around a space they never enter".to_owned(),
                "intruders are pushed out and judged".to_owned(),
            ),
        };
        chronicle.record(
            now,
            ChronicleKind::TabooEmerged,
            format!("A {} taboo takes hold", spec.kind.label()),
            cause,
            consequence,
        );
        vec![id]
    }

    fn taboo_blocked(&self, registry: &InstitutionRegistry, position: Vec2) -> bool {
        registry
            .taboos()
            .iter()
            .any(|t| t.position.distance(position) < self.config.taboo_exclusion)
    }

    fn find_taboo(&self, registry: &InstitutionRegistry, grid: &GridMap) -> Option<TabooSpec> {
        let resolution = self.config.grid_resolution;
        for row in 0..resolution {
            for col in 0..resolution {
                let key = CellKey::new(col, row);
                let neighbors = key.neighbors(resolution);
                let center = key.center(resolution);
                if self.taboo_blocked(registry, center) {
                    continue;
                }
                match grid.get(&key) {
                    None => {
                        let walled = !neighbors.is_empty()
                            && neighbors.iter().all(|n| {
                                grid.get(n).is_some_and(|s| s.count > self.config.taboo_density)
                            });
                        if walled {
                            return Some(TabooSpec {
                                kind: TabooKind::NoEnter,
                                position: center,
                                radius: self.config.taboo_radius,
                                intensity: self.config.taboo_intensity,
                                target_type: None,
                            });
                        }
                    }
                    Some(stats) if stats.distinct_types() == 1 => {
                        let Some((own, _)) = stats.dominant_type() else { continue };
                        for n in &neighbors {
                            let Some(other) = grid.get(n) else { continue };
                            let foreign = other
                                .type_hist
                                .iter()
                                .find(|&(&t, &c)| t != own && c >= self.config.no_mix_min);
                            if let Some((&target, _)) = foreign {
                                return Some(TabooSpec {
                                    kind: TabooKind::NoMix,
                                    position: stats.centroid,
                                    radius: self.config.taboo_radius,
                                    intensity: self.config.taboo_intensity,
                                    target_type: Some(target),
                                });
                            }
                        }
                    }
                    Some(_) => {}
                }
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Rituals
    // -----------------------------------------------------------------------

    /// Mean radial/tangential motion of agents within `radius` of `center`.
    ///
    /// Agents sitting exactly on the center have no radial direction and
    /// are skipped.
    #[allow(clippy::cast_precision_loss)]
    pub fn motion_profile(substrate: &AgentSubstrate, center: Vec2, radius: f32) -> MotionProfile {
        let mut samples = 0_u32;
        let (mut radial, mut tangential, mut speed) = (0.0_f32, 0.0_f32, 0.0_f32);
        for agent in substrate.views() {
            let offset = agent.position - center;
            if offset.length() > radius {
                continue;
            }
            let Some(n) = offset.try_normalize() else { continue };
            radial += agent.velocity.dot(n);
            tangential += agent.velocity.dot(n.perp());
            speed += agent.velocity.length();
            samples = samples.saturating_add(1);
        }
        let inv = 1.0 / samples.max(1) as f32;
        MotionProfile {
            samples,
            radial: radial * inv,
            tangential: tangential * inv,
            speed: speed * inv,
        }
    }

    /// Classify a motion profile into a ritual kind.
    pub fn classify_motion(&self, profile: &MotionProfile) -> Option<RitualKind> {
        let c = &self.config;
        if profile.samples < c.ritual_min_samples {
            return None;
        }
        if profile.tangential.abs() > c.procession_tangential
            && profile.radial.abs() < c.procession_radial_max
        {
            return Some(RitualKind::Procession);
        }
        if profile.radial < c.gather_radial && profile.tangential.abs() < c.gather_tangential_max {
            return Some(RitualKind::Gather);
        }
        if profile.speed < c.offering_speed {
            return Some(RitualKind::Offering);
        }
        None
    }

    fn detect_rituals(
        &self,
        registry: &mut InstitutionRegistry,
        substrate: &AgentSubstrate,
        now: f64,
        chronicle: &mut Chronicle,
    ) -> Vec<RitualId> {
        let cap = usize::try_from(self.config.max_rituals).unwrap_or(usize::MAX);
        let candidates: Vec<(TotemId, Vec2, f32, String)> = registry
            .totems()
            .iter()
            .filter(|t| !registry.has_ritual(t.id))
            .map(|t| (t.id, t.position, t.radius, t.name.clone()))
            .collect();

        let mut spawned = Vec::new();
        for (totem_id, center, radius, name) in candidates {
            if registry.live_ritual_count() >= cap {
                break;
            }
            let profile =
                Self::motion_profile(substrate, center, radius * self.config.ritual_sample_factor);
            let Some(kind) = self.classify_motion(&profile) else { continue };
            let id = registry.spawn_ritual(
                totem_id,
                kind,
                self.config.ritual_period_sec,
                self.config.ritual_duty_cycle,
                now,
            );
            spawned.push(id);
            info!(ritual = %id, totem = %totem_id, kind = kind.label(), "ritual emerged");
            chronicle.record(
                now,
                ChronicleKind::RitualEmerged,
                format!("A {} ritual forms around {name}", kind.label()),
                format!(
                    "{} agents moving radial {:.3}, tangential {:.3}",
                    profile.samples, profile.radial, profile.tangential
                ),
                "the ritual repeats every cycle while its totem stands",
            );
        }
        spawned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
mod tests {
    use sociogenesis_types::{AgentSeed, RitualSpec, TotemSpec};
    use sociogenesis_world::seeded;

    use super::*;

    fn cluster(s: &mut AgentSubstrate, center: Vec2, n: u32, agent_type: u32, vel: Vec2) {
        for k in 0..n {
            #[allow(clippy::cast_precision_loss)]
            let jitter = Vec2::new((k % 3) as f32 * 0.01, (k / 3) as f32 * 0.01);
            s.push(AgentSeed {
                position: center + jitter,
                velocity: vel,
                agent_type,
                energy: 1.0,
            })
            .unwrap();
        }
    }

    fn ring(s: &mut AgentSubstrate, n: u32, radius: f32, radial: f32, tangential: f32) {
        for k in 0..n {
            #[allow(clippy::cast_precision_loss)]
            let dir = Vec2::from_angle(k as f32 * std::f32::consts::TAU / n as f32);
            s.push(AgentSeed {
                position: dir * radius,
                velocity: dir * radial + dir.perp() * tangential,
                agent_type: 0,
                energy: 1.0,
            })
            .unwrap();
        }
    }

    fn bond_at(position: Vec2) -> TotemSpec {
        TotemSpec {
            kind: TotemKind::Bond,
            position,
            radius: 0.2,
            strength: 1.0,
            name: None,
        }
    }

    fn stats(count: u32, types: &[(u32, u32)], speed: f32) -> CellStats {
        CellStats {
            count,
            type_hist: types.iter().copied().collect(),
            mean_velocity: Vec2::ZERO,
            mean_speed: speed,
            centroid: Vec2::ZERO,
        }
    }

    #[test]
    fn still_pure_cell_is_bond_not_archive() {
        let d = Detector::new(&DetectorConfig::default());
        assert_eq!(d.classify_cell(&stats(8, &[(1, 8)], 0.01)), Some(TotemKind::Bond));
    }

    #[test]
    fn still_mixed_cell_is_archive() {
        let d = Detector::new(&DetectorConfig::default());
        let s = stats(6, &[(1, 2), (2, 2), (3, 2)], 0.01);
        assert_eq!(d.classify_cell(&s), Some(TotemKind::Archive));
    }

    #[test]
    fn fast_cell_is_oracle() {
        let d = Detector::new(&DetectorConfig::default());
        assert_eq!(d.classify_cell(&stats(4, &[(1, 4)], 0.09)), Some(TotemKind::Oracle));
    }

    #[test]
    fn diverse_moderate_cell_is_rift() {
        let d = Detector::new(&DetectorConfig::default());
        let s = stats(9, &[(1, 3), (2, 3), (3, 3)], 0.04);
        assert_eq!(d.classify_cell(&s), Some(TotemKind::Rift));
    }

    #[test]
    fn sparse_cell_is_ignored() {
        let d = Detector::new(&DetectorConfig::default());
        assert_eq!(d.classify_cell(&stats(2, &[(1, 2)], 0.01)), None);
    }

    #[test]
    fn repeated_pass_respects_exclusion() {
        let mut s = AgentSubstrate::new(64).unwrap();
        cluster(&mut s, Vec2::new(0.05, 0.05), 9, 1, Vec2::new(0.01, 0.0));
        let mut reg = InstitutionRegistry::new();
        let mut d = Detector::new(&DetectorConfig::default());
        let mut rng = seeded(1);
        let mut chronicle = Chronicle::default();
        let first = d.run(&mut reg, &s, 0.0, &mut rng, &mut chronicle);
        let second = d.run(&mut reg, &s, 0.0, &mut rng, &mut chronicle);
        assert_eq!(first.totems.len(), 1);
        assert!(second.totems.is_empty());
        assert_eq!(chronicle.count_kind(ChronicleKind::TotemEmerged), 1);
    }

    #[test]
    fn spawn_window_limits_bursts() {
        let mut s = AgentSubstrate::new(128).unwrap();
        for k in 0..6 {
            #[allow(clippy::cast_precision_loss)]
            let x = -0.85 + 0.35 * k as f32;
            cluster(&mut s, Vec2::new(x, 0.05), 9, 1, Vec2::new(0.01, 0.0));
        }
        let mut reg = InstitutionRegistry::new();
        let mut d = Detector::new(&DetectorConfig::default());
        let mut rng = seeded(1);
        let mut chronicle = Chronicle::default();
        let first = d.run(&mut reg, &s, 0.0, &mut rng, &mut chronicle);
        assert_eq!(first.totems.len(), 3);
        let soon = d.run(&mut reg, &s, 10.0, &mut rng, &mut chronicle);
        assert!(soon.totems.is_empty());
        let later = d.run(&mut reg, &s, 40.0, &mut rng, &mut chronicle);
        assert_eq!(later.totems.len(), 3);
    }

    #[test]
    fn orbiting_agents_form_a_procession() {
        let mut s = AgentSubstrate::new(16).unwrap();
        for k in 0..8 {
            #[allow(clippy::cast_precision_loss)]
            let angle = k as f32 * std::f32::consts::TAU / 8.0;
            let dir = Vec2::from_angle(angle);
            s.push(AgentSeed {
                position: dir * 0.2,
                velocity: dir.perp() * 0.05,
                agent_type: 0,
                energy: 1.0,
            })
            .unwrap();
        }
        let d = Detector::new(&DetectorConfig::default());
        let profile = Detector::motion_profile(&s, Vec2::ZERO, 0.5);
        assert_eq!(profile.samples, 8);
        assert_eq!(d.classify_motion(&profile), Some(RitualKind::Procession));
    }

    #[test]
    fn walled_empty_cell_becomes_no_enter() {
        let mut s = AgentSubstrate::new(128).unwrap();
        let hole = CellKey::new(5, 5);
        for n in hole.neighbors(10) {
            cluster(&mut s, n.center(10), 7, 1, Vec2::ZERO);
        }
        let reg = InstitutionRegistry::new();
        let d = Detector::new(&DetectorConfig::default());
        let grid = analyze(&s, 10);
        let spec = d.find_taboo(&reg, &grid).unwrap();
        assert_eq!(spec.kind, TabooKind::NoEnter);
        assert!(spec.position.distance(hole.center(10)) < 1e-5);
    }

    #[test]
    fn inward_agents_form_a_gathering() {
        let mut s = AgentSubstrate::new(16).unwrap();
        ring(&mut s, 8, 0.2, -0.03, 0.0);
        let d = Detector::new(&DetectorConfig::default());
        let profile = Detector::motion_profile(&s, Vec2::ZERO, 0.5);
        assert!(profile.radial < -0.02);
        assert_eq!(d.classify_motion(&profile), Some(RitualKind::Gather));
    }

    #[test]
    fn idle_agents_form_an_offering() {
        let mut s = AgentSubstrate::new(16).unwrap();
        ring(&mut s, 6, 0.15, 0.004, 0.0);
        let d = Detector::new(&DetectorConfig::default());
        let profile = Detector::motion_profile(&s, Vec2::ZERO, 0.5);
        assert_eq!(d.classify_motion(&profile), Some(RitualKind::Offering));
    }

    #[test]
    fn detection_pass_spawns_ritual_around_totem() {
        let mut s = AgentSubstrate::new(16).unwrap();
        ring(&mut s, 8, 0.2, 0.0, 0.05);
        let mut reg = InstitutionRegistry::new();
        let mut rng = seeded(1);
        let totem = reg.place_totem(&bond_at(Vec2::ZERO), 0.0, &mut rng);
        let mut d = Detector::new(&DetectorConfig::default());
        let mut chronicle = Chronicle::default();
        let report = d.run(&mut reg, &s, 5.0, &mut rng, &mut chronicle);
        assert_eq!(report.rituals.len(), 1);
        let ritual = reg.ritual(*report.rituals.first().unwrap()).unwrap();
        assert_eq!(ritual.kind, RitualKind::Procession);
        assert_eq!(ritual.totem_id, totem);
        assert!(ritual.emergent);
        assert_eq!(chronicle.count_kind(ChronicleKind::RitualEmerged), 1);
    }

    #[test]
    fn orphaned_rituals_do_not_fill_the_cap() {
        let mut reg = InstitutionRegistry::new();
        let mut rng = seeded(1);
        let gone = reg.place_totem(&bond_at(Vec2::new(0.8, 0.8)), 0.0, &mut rng);
        let spec = RitualSpec {
            kind: RitualKind::Gather,
            period_sec: 10.0,
            duty_cycle: 0.5,
            intensity: 1.0,
        };
        reg.place_ritual(gone, &spec, 0.0).unwrap();
        reg.remove_totem(gone).unwrap();
        let kept = reg.place_totem(&bond_at(Vec2::ZERO), 0.0, &mut rng);

        let mut s = AgentSubstrate::new(16).unwrap();
        ring(&mut s, 8, 0.2, 0.0, 0.05);
        let cfg = DetectorConfig {
            max_rituals: 1,
            ..DetectorConfig::default()
        };
        let mut d = Detector::new(&cfg);
        let mut chronicle = Chronicle::default();
        let report = d.run(&mut reg, &s, 5.0, &mut rng, &mut chronicle);
        assert_eq!(report.rituals.len(), 1);
        assert!(reg.has_ritual(kept));
        assert_eq!(reg.rituals().len(), 2);
        assert_eq!(reg.live_ritual_count(), 1);
    }

    #[test]
    fn enclave_beside_foreign_crowd_becomes_no_mix() {
        let mut s = AgentSubstrate::new(64).unwrap();
        let enclave = CellKey::new(2, 2);
        cluster(&mut s, enclave.center(10), 9, 1, Vec2::ZERO);
        cluster(&mut s, CellKey::new(3, 2).center(10), 6, 2, Vec2::ZERO);
        let mut reg = InstitutionRegistry::new();
        let mut d = Detector::new(&DetectorConfig::default());
        let mut rng = seeded(1);
        let mut chronicle = Chronicle::default();
        let report = d.run(&mut reg, &s, 0.0, &mut rng, &mut chronicle);
        assert_eq!(report.taboos.len(), 1);
        let taboo = reg.taboo(*report.taboos.first().unwrap()).unwrap();
        assert_eq!(taboo.kind, TabooKind::NoMix);
        assert_eq!(taboo.target_type, Some(2));
        assert!(taboo.emergent);
        assert!(taboo.position.distance(enclave.center(10)) < 0.05);
        assert_eq!(chronicle.count_kind(ChronicleKind::TabooEmerged), 1);
    }
}
