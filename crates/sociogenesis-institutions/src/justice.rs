//! Taboo violations, cases, and judgment.
//!
//! Every application measures each taboo's violators and folds their
//! violation into a decaying per-taboo accumulator:
//!
//! - `NO_ENTER`: every agent inside contributes in proportion to its
//!   penetration depth and receives an elastic outward push.
//! - `NO_MIX`: every agent of the target type inside is slowed and
//!   contributes a fixed increment.
//!
//! When the accumulator crosses the threshold, no case is open for the
//! taboo, and the post-resolution cooldown has elapsed, a case opens and is
//! judged in the same pass. In AUTO mode a zone holding more than
//! `density_threshold` agents of any type is punished, otherwise restored:
//!
//! - **PUNISH** removes any inward radial component from each violator's
//!   velocity, damps it, and pushes it outward.
//! - **RESTORE** pulls every agent in a widened zone toward the nearest totem.
//!
//! # Invariants
//!
//! - At most one OPEN case per taboo.
//! - A taboo cannot open a new case until `cooldown_sec` after its last
//!   resolution.
//! - Resolved cases beyond the retention count are pruned, oldest first.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use sociogenesis_types::{
    CaseId, CaseResolution, CaseStatus, Chronicle, ChronicleKind, JusticeMode, SocioCase, Taboo,
    TabooId, TabooKind, Vec2,
};
use sociogenesis_world::AgentSubstrate;

use crate::config::JusticeConfig;
use crate::forces::nudge;
use crate::registry::InstitutionRegistry;

/// Golden angle, used to spread fallback directions for centered agents.
const GOLDEN_ANGLE: f32 = 2.399_963_1;

/// Outcome of one justice application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JusticeReport {
    /// Distinct agents found violating any taboo.
    pub violators: usize,
    /// Cases opened and judged this pass.
    pub judged: Vec<(CaseId, CaseResolution)>,
}

/// Violators of one taboo and what they added this pass.
#[derive(Debug, Default)]
struct Measurement {
    inside: Vec<usize>,
    occupants: usize,
    added: f32,
    offender: Option<usize>,
}

/// Case ledger and per-taboo violation accumulators.
#[derive(Debug, Clone, PartialEq)]
pub struct JusticeSystem {
    config: JusticeConfig,
    cases: Vec<SocioCase>,
    violation: BTreeMap<TabooId, f32>,
    last_resolved: BTreeMap<TabooId, f64>,
    violators: Vec<usize>,
}

impl JusticeSystem {
    /// Create an empty ledger.
    pub fn new(config: &JusticeConfig) -> Self {
        Self {
            config: config.sanitized(),
            cases: Vec::new(),
            violation: BTreeMap::new(),
            last_resolved: BTreeMap::new(),
            violators: Vec::new(),
        }
    }

    /// Active parameters.
    pub const fn config(&self) -> &JusticeConfig {
        &self.config
    }

    /// Change the resolution policy.
    pub const fn set_mode(&mut self, mode: JusticeMode) {
        self.config.mode = mode;
    }

    /// Replace every parameter. Open accumulators and cases are kept.
    pub fn set_config(&mut self, config: &JusticeConfig) {
        self.config = config.sanitized();
    }

    /// Retained cases, oldest first.
    pub fn cases(&self) -> &[SocioCase] {
        &self.cases
    }

    /// Agents found violating any taboo in the last pass, ascending.
    pub fn violators(&self) -> &[usize] {
        &self.violators
    }

    /// Accumulated violation for `taboo`.
    pub fn violation(&self, taboo: TabooId) -> f32 {
        self.violation.get(&taboo).copied().unwrap_or(0.0)
    }

    /// Drop every case and accumulator.
    pub fn reset(&mut self) {
        self.cases.clear();
        self.violation.clear();
        self.last_resolved.clear();
        self.violators.clear();
    }

    fn has_open_case(&self, taboo: TabooId) -> bool {
        self.cases
            .iter()
            .any(|c| c.taboo_id == taboo && c.status == CaseStatus::Open)
    }

    fn cooling_down(&self, taboo: TabooId, now: f64) -> bool {
        self.last_resolved
            .get(&taboo)
            .is_some_and(|&t| now - t < self.config.cooldown_sec)
    }

    /// Run one justice application over every taboo.
    pub fn step(
        &mut self,
        registry: &mut InstitutionRegistry,
        substrate: &mut AgentSubstrate,
        clamp: f32,
        now: f64,
        chronicle: &mut Chronicle,
    ) -> JusticeReport {
        let live: BTreeSet<TabooId> = registry.taboos().iter().map(|t| t.id).collect();
        self.violation.retain(|id, _| live.contains(id));
        self.last_resolved.retain(|id, _| live.contains(id));

        let taboos: Vec<Taboo> = registry.taboos().to_vec();
        let mut all_violators = BTreeSet::new();
        let mut report = JusticeReport::default();
        let mut affected: BTreeMap<TabooId, u32> = BTreeMap::new();

        for taboo in &taboos {
            let Measurement {
                inside,
                occupants,
                added,
                offender,
            } = self.measure(taboo, substrate, clamp);
            affected.insert(taboo.id, u32::try_from(inside.len()).unwrap_or(u32::MAX));
            all_violators.extend(inside.iter().copied());

            let acc = self.violation.entry(taboo.id).or_insert(0.0);
            *acc = *acc * self.config.violation_decay + added;
            let level = *acc;

            if level <= self.config.violation_threshold
                || self.has_open_case(taboo.id)
                || self.cooling_down(taboo.id, now)
            {
                continue;
            }

            let id = registry.ids_mut().case();
            self.cases.push(SocioCase {
                id,
                taboo_id: taboo.id,
                offender: offender.and_then(|o| u32::try_from(o).ok()),
                status: CaseStatus::Open,
                resolution: None,
                opened_at: now,
                resolved_at: None,
            });

            let crowded = occupants > usize::try_from(self.config.density_threshold).unwrap_or(usize::MAX);
            let resolution = match self.config.mode {
                JusticeMode::Retributive => CaseResolution::Punish,
                JusticeMode::Restorative => CaseResolution::Restore,
                JusticeMode::Auto if crowded => CaseResolution::Punish,
                JusticeMode::Auto => CaseResolution::Restore,
            };
            let moved = match resolution {
                CaseResolution::Punish => self.punish(taboo, &inside, substrate, clamp),
                CaseResolution::Restore => self.restore(taboo, registry, substrate, clamp),
            };
            self.resolve(id, resolution, now);
            self.violation.insert(taboo.id, 0.0);
            self.last_resolved.insert(taboo.id, now);
            report.judged.push((id, resolution));

            info!(
                case = %id,
                taboo = %taboo.id,
                resolution = resolution.label(),
                violators = inside.len(),
                violation = level,
                "judgment"
            );
            chronicle.record(
                now,
                ChronicleKind::Judgment,
                format!("Judgment at the {} taboo: {}", taboo.kind.label(), resolution.label()),
                format!("{} violators pushed violation to {level:.2}", inside.len()),
                match resolution {
                    CaseResolution::Punish => format!("{moved} agents banished from the zone"),
                    CaseResolution::Restore => format!("{moved} agents led back toward a totem"),
                },
            );
        }

        for taboo in registry.taboos_mut() {
            taboo.affected_count = affected.get(&taboo.id).copied().unwrap_or(0);
        }
        self.prune();
        self.violators = all_violators.into_iter().collect();
        report.violators = self.violators.len();
        debug!(violators = report.violators, judged = report.judged.len(), "justice pass");
        report
    }

    /// Violators of `taboo`, the violation they add, the deepest one, and
    /// how many agents of any type stand inside. Applies the per-kind
    /// elastic push or damping as a side effect.
    fn measure(&self, taboo: &Taboo, substrate: &mut AgentSubstrate, clamp: f32) -> Measurement {
        let mut inside = Vec::new();
        let mut occupants = 0_usize;
        let mut added = 0.0_f32;
        let mut deepest: Option<(usize, f32)> = None;
        for i in 0..substrate.len() {
            let Some(agent) = substrate.view(i) else { continue };
            if !taboo.contains(agent.position) {
                continue;
            }
            occupants = occupants.saturating_add(1);
            let depth = taboo.penetration(agent.position);
            match taboo.kind {
                TabooKind::NoEnter => {
                    added += self.config.overlap_weight * depth * taboo.intensity;
                    let outward = outward_from(taboo.position, agent.position, i);
                    nudge(substrate, i, outward * (self.config.push_gain * depth * taboo.intensity), clamp);
                }
                TabooKind::NoMix => {
                    if taboo.target_type != Some(agent.agent_type) {
                        continue;
                    }
                    added += self.config.no_mix_increment * taboo.intensity;
                    substrate.scale_velocity(i, self.config.no_mix_damping);
                }
            }
            if deepest.is_none_or(|(_, d)| depth > d) {
                deepest = Some((i, depth));
            }
            inside.push(i);
        }
        Measurement {
            inside,
            occupants,
            added,
            offender: deepest.map(|(i, _)| i),
        }
    }

    /// Banish every violator: strip inward motion, damp, push outward.
    fn punish(&self, taboo: &Taboo, inside: &[usize], substrate: &mut AgentSubstrate, clamp: f32) -> usize {
        let mut moved = 0_usize;
        for &i in inside {
            let Some(agent) = substrate.view(i) else { continue };
            let outward = outward_from(taboo.position, agent.position, i);
            let mut v = agent.velocity;
            let radial = v.dot(outward);
            if radial < 0.0 {
                v = v - outward * radial;
            }
            v = v * self.config.punish_damping;
            let push = (outward * (self.config.push_gain * taboo.intensity.max(0.1))).clamp_axes(clamp);
            if substrate.set_velocity(i, v + push) {
                moved = moved.saturating_add(1);
            }
        }
        moved
    }

    /// Pull every agent in the widened zone toward the nearest totem.
    fn restore(
        &self,
        taboo: &Taboo,
        registry: &InstitutionRegistry,
        substrate: &mut AgentSubstrate,
        clamp: f32,
    ) -> usize {
        let Some(anchor) = registry.nearest_totem(taboo.position).map(|t| t.position) else {
            return 0;
        };
        let reach = taboo.radius * self.config.restore_radius_factor;
        let mut moved = 0_usize;
        for i in 0..substrate.len() {
            let Some(p) = substrate.position(i) else { continue };
            if p.distance(taboo.position) > reach {
                continue;
            }
            let pull = (anchor - p).normalize_or(Vec2::ZERO) * self.config.restore_gain;
            nudge(substrate, i, pull, clamp);
            moved = moved.saturating_add(1);
        }
        moved
    }

    fn resolve(&mut self, id: CaseId, resolution: CaseResolution, now: f64) {
        if let Some(case) = self.cases.iter_mut().find(|c| c.id == id) {
            case.status = CaseStatus::Resolved;
            case.resolution = Some(resolution);
            case.resolved_at = Some(now);
        }
    }

    fn prune(&mut self) {
        let retention = usize::try_from(self.config.case_retention).unwrap_or(usize::MAX);
        let resolved = self
            .cases
            .iter()
            .filter(|c| c.status == CaseStatus::Resolved)
            .count();
        let mut excess = resolved.saturating_sub(retention);
        if excess == 0 {
            return;
        }
        self.cases.retain(|c| {
            if excess > 0 && c.status == CaseStatus::Resolved {
                excess = excess.saturating_sub(1);
                false
            } else {
                true
            }
        });
    }
}

/// Unit vector from `center` toward `point`; agents on the center get a
/// deterministic per-index direction.
#[allow(clippy::cast_precision_loss)]
fn outward_from(center: Vec2, point: Vec2, index: usize) -> Vec2 {
    (point - center).normalize_or(Vec2::from_angle(GOLDEN_ANGLE * index as f32))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
mod tests {
    use sociogenesis_types::{AgentSeed, TabooSpec, TotemKind, TotemSpec};
    use sociogenesis_world::seeded;

    use super::*;

    fn crowd(n: u32, center: Vec2, agent_type: u32) -> AgentSubstrate {
        let mut s = AgentSubstrate::new(64).unwrap();
        for k in 0..n {
            #[allow(clippy::cast_precision_loss)]
            let dir = Vec2::from_angle(k as f32 * 0.7);
            #[allow(clippy::cast_precision_loss)]
            let r = 0.02 + 0.003 * k as f32;
            s.push(AgentSeed {
                position: center + dir * r,
                velocity: -dir * 0.05,
                agent_type,
                energy: 1.0,
            })
            .unwrap();
        }
        s
    }

    fn no_enter(reg: &mut InstitutionRegistry) -> TabooId {
        reg.place_taboo(
            &TabooSpec {
                kind: TabooKind::NoEnter,
                position: Vec2::ZERO,
                radius: 0.1,
                intensity: 1.0,
                target_type: None,
            },
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn crowded_zone_is_punished_outward() {
        let mut reg = InstitutionRegistry::new();
        let taboo = no_enter(&mut reg);
        let mut s = crowd(20, Vec2::ZERO, 0);
        let mut justice = JusticeSystem::new(&JusticeConfig::default());
        let mut chronicle = Chronicle::default();
        let report = justice.step(&mut reg, &mut s, 0.025, 1.0, &mut chronicle);
        assert_eq!(report.judged.len(), 1);
        assert_eq!(report.judged.first().map(|j| j.1), Some(CaseResolution::Punish));
        for v in s.views() {
            let outward = v.position.try_normalize().unwrap();
            assert!(v.velocity.dot(outward) > 0.0);
            assert!(v.velocity.length() < 0.05);
        }
        assert_eq!(reg.taboo(taboo).unwrap().affected_count, 20);
        assert_eq!(chronicle.count_kind(ChronicleKind::Judgment), 1);
    }

    #[test]
    fn cooldown_blocks_reopening() {
        let mut reg = InstitutionRegistry::new();
        no_enter(&mut reg);
        let mut s = crowd(20, Vec2::ZERO, 0);
        let mut justice = JusticeSystem::new(&JusticeConfig::default());
        let mut chronicle = Chronicle::default();
        justice.step(&mut reg, &mut s, 0.025, 1.0, &mut chronicle);
        let again = justice.step(&mut reg, &mut s, 0.025, 3.0, &mut chronicle);
        assert!(again.judged.is_empty());
        let later = justice.step(&mut reg, &mut s, 0.025, 12.0, &mut chronicle);
        assert_eq!(later.judged.len(), 1);
        assert_eq!(
            justice.cases().iter().filter(|c| c.status == CaseStatus::Open).count(),
            0
        );
    }

    #[test]
    fn sparse_zone_is_restored_toward_totem() {
        let mut reg = InstitutionRegistry::new();
        reg.place_totem(
            &TotemSpec {
                kind: TotemKind::Bond,
                position: Vec2::new(0.6, 0.0),
                radius: 0.2,
                strength: 1.0,
                name: None,
            },
            0.0,
            &mut seeded(1),
        );
        no_enter(&mut reg);
        let mut s = crowd(8, Vec2::ZERO, 0);
        let cfg = JusticeConfig {
            violation_threshold: 0.1,
            ..JusticeConfig::default()
        };
        let mut justice = JusticeSystem::new(&cfg);
        let mut chronicle = Chronicle::default();
        let report = justice.step(&mut reg, &mut s, 0.025, 1.0, &mut chronicle);
        assert_eq!(report.judged.first().map(|j| j.1), Some(CaseResolution::Restore));
    }

    #[test]
    fn no_mix_only_targets_its_type() {
        let mut reg = InstitutionRegistry::new();
        reg.place_taboo(
            &TabooSpec {
                kind: TabooKind::NoMix,
                position: Vec2::ZERO,
                radius: 0.2,
                intensity: 1.0,
                target_type: Some(2),
            },
            0.0,
        )
        .unwrap();
        let mut s = crowd(5, Vec2::ZERO, 1);
        let mut justice = JusticeSystem::new(&JusticeConfig::default());
        let mut chronicle = Chronicle::default();
        let report = justice.step(&mut reg, &mut s, 0.025, 1.0, &mut chronicle);
        assert_eq!(report.violators, 0);
        assert!(justice.violation(reg.taboos().first().unwrap().id).abs() < f32::EPSILON);
    }

    #[test]
    fn resolved_cases_are_pruned_to_retention() {
        let mut reg = InstitutionRegistry::new();
        no_enter(&mut reg);
        let cfg = JusticeConfig {
            case_retention: 2,
            cooldown_sec: 0.0,
            ..JusticeConfig::default()
        };
        let mut justice = JusticeSystem::new(&cfg);
        let mut chronicle = Chronicle::default();
        for tick in 0..5 {
            let mut s = crowd(20, Vec2::ZERO, 0);
            justice.step(&mut reg, &mut s, 0.025, f64::from(tick), &mut chronicle);
        }
        assert_eq!(justice.cases().len(), 2);
    }

    #[test]
    fn removed_taboo_is_skipped() {
        let mut reg = InstitutionRegistry::new();
        let taboo = no_enter(&mut reg);
        let mut s = crowd(20, Vec2::ZERO, 0);
        let mut justice = JusticeSystem::new(&JusticeConfig::default());
        let mut chronicle = Chronicle::default();
        reg.remove_taboo(taboo).unwrap();
        let report = justice.step(&mut reg, &mut s, 0.025, 1.0, &mut chronicle);
        assert!(report.judged.is_empty());
        assert!(justice.violation(taboo).abs() < f32::EPSILON);
    }

    #[test]
    fn crowded_no_mix_zone_counts_every_occupant() {
        let mut reg = InstitutionRegistry::new();
        reg.place_taboo(
            &TabooSpec {
                kind: TabooKind::NoMix,
                position: Vec2::ZERO,
                radius: 0.2,
                intensity: 1.0,
                target_type: Some(2),
            },
            0.0,
        )
        .unwrap();
        let mut s = crowd(15, Vec2::ZERO, 1);
        for k in 0..3 {
            s.push(AgentSeed {
                position: Vec2::new(0.05 * k as f32, 0.03),
                velocity: Vec2::new(0.02, 0.0),
                agent_type: 2,
                energy: 1.0,
            })
            .unwrap();
        }
        let cfg = JusticeConfig {
            violation_threshold: 0.1,
            ..JusticeConfig::default()
        };
        let mut justice = JusticeSystem::new(&cfg);
        let mut chronicle = Chronicle::default();
        let report = justice.step(&mut reg, &mut s, 0.025, 1.0, &mut chronicle);
        assert_eq!(report.violators, 3);
        assert_eq!(report.judged.first().map(|j| j.1), Some(CaseResolution::Punish));
    }
}
