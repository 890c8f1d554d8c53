//! Transient agent roles around taboos.
//!
//! Neutral agents occasionally take a role for a fixed duration:
//!
//! - **Enforcer** chases a violator reported by the last justice pass.
//! - **Vigilante** orbits the nearest taboo at a standoff distance.
//! - **Resister** advances on the nearest taboo it is not already inside.
//!
//! Roles are only assigned while at least one taboo exists. An enforcer
//! whose target index no longer exists reverts to neutral.

use rand::Rng;

use sociogenesis_types::{RoleKind, Vec2};
use sociogenesis_world::{AgentSubstrate, SimRng};

use crate::config::RoleConfig;
use crate::forces::nudge;
use crate::registry::InstitutionRegistry;

/// Per-agent role arrays sized to substrate capacity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleState {
    role: Vec<RoleKind>,
    expires_at: Vec<f64>,
    target: Vec<Option<usize>>,
}

/// Role counts after one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleReport {
    /// Roles assigned this step.
    pub assigned: u32,
    /// Active enforcers.
    pub enforcers: u32,
    /// Active vigilantes.
    pub vigilantes: u32,
    /// Active resisters.
    pub resisters: u32,
}

impl RoleState {
    /// Allocate neutral roles for `capacity` agents.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            role: vec![RoleKind::Neutral; capacity],
            expires_at: vec![0.0; capacity],
            target: vec![None; capacity],
        }
    }

    /// Reallocate and clear every role.
    pub fn reset(&mut self, capacity: usize) {
        *self = Self::with_capacity(capacity);
    }

    /// Role of agent `index`.
    pub fn role(&self, index: usize) -> RoleKind {
        self.role.get(index).copied().unwrap_or_default()
    }

    /// Agents currently holding `kind`.
    pub fn count(&self, kind: RoleKind) -> usize {
        self.role.iter().filter(|&&r| r == kind).count()
    }

    /// Force agent `index` into `kind` until `until`.
    pub fn assign(&mut self, index: usize, kind: RoleKind, until: f64, target: Option<usize>) {
        if let (Some(r), Some(e), Some(t)) = (
            self.role.get_mut(index),
            self.expires_at.get_mut(index),
            self.target.get_mut(index),
        ) {
            *r = kind;
            *e = until;
            *t = target;
        }
    }

    fn clear(&mut self, index: usize) {
        self.assign(index, RoleKind::Neutral, 0.0, None);
    }

    /// Expire, assign, and steer roles for one force application.
    ///
    /// `violators` are agent indices found inside a taboo by the most recent
    /// justice pass.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        substrate: &mut AgentSubstrate,
        registry: &InstitutionRegistry,
        violators: &[usize],
        config: &RoleConfig,
        clamp: f32,
        now: f64,
        rng: &mut SimRng,
    ) -> RoleReport {
        let mut report = RoleReport::default();
        let n = substrate.len().min(self.role.len());
        let active = config.enabled && !registry.taboos().is_empty();

        for i in 0..n {
            if !active {
                self.clear(i);
                continue;
            }
            if self.role(i) != RoleKind::Neutral
                && self.expires_at.get(i).is_some_and(|&t| now >= t)
            {
                self.clear(i);
            }
            if self.role(i) == RoleKind::Neutral && rng.random::<f32>() < config.assign_chance {
                let until = now + config.duration_sec;
                let pick = rng.random::<f32>();
                if !violators.is_empty() && pick < 0.4 {
                    let victim = violators
                        .get(rng.random_range(0..violators.len()))
                        .copied()
                        .filter(|&v| v != i);
                    if victim.is_some() {
                        self.assign(i, RoleKind::Enforcer, until, victim);
                    }
                } else if pick < 0.7 {
                    self.assign(i, RoleKind::Vigilante, until, None);
                } else {
                    self.assign(i, RoleKind::Resister, until, None);
                }
                if self.role(i) != RoleKind::Neutral {
                    report.assigned = report.assigned.saturating_add(1);
                }
            }

            let Some(p) = substrate.position(i) else { continue };
            let delta = match self.role(i) {
                RoleKind::Neutral => continue,
                RoleKind::Enforcer => {
                    let chase = self
                        .target
                        .get(i)
                        .copied()
                        .flatten()
                        .and_then(|t| substrate.position(t));
                    let Some(goal) = chase else {
                        self.clear(i);
                        continue;
                    };
                    report.enforcers = report.enforcers.saturating_add(1);
                    (goal - p).normalize_or(Vec2::ZERO) * config.enforcer_gain
                }
                RoleKind::Vigilante => {
                    let Some(taboo) = registry.nearest_taboo(p) else { continue };
                    report.vigilantes = report.vigilantes.saturating_add(1);
                    let offset = p - taboo.position;
                    let outward = offset.normalize_or(Vec2::new(1.0, 0.0));
                    let standoff = taboo.radius * config.vigilante_standoff;
                    let error = ((standoff - offset.length()) / standoff).clamp(-1.0, 1.0);
                    (outward * error + outward.perp()) * config.vigilante_gain
                }
                RoleKind::Resister => {
                    let goal = registry
                        .taboos()
                        .iter()
                        .filter(|t| !t.contains(p))
                        .min_by(|a, b| {
                            a.position.distance(p).total_cmp(&b.position.distance(p))
                        });
                    let Some(taboo) = goal else { continue };
                    report.resisters = report.resisters.saturating_add(1);
                    (taboo.position - p).normalize_or(Vec2::ZERO) * config.resister_gain
                }
            };
            nudge(substrate, i, delta, clamp);
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sociogenesis_types::{AgentSeed, TabooKind, TabooSpec};
    use sociogenesis_world::seeded;

    use super::*;

    fn setup() -> (AgentSubstrate, InstitutionRegistry) {
        let mut s = AgentSubstrate::new(4).unwrap();
        for x in [0.5_f32, -0.5, 0.0] {
            s.push(AgentSeed {
                position: Vec2::new(x, 0.0),
                velocity: Vec2::ZERO,
                agent_type: 0,
                energy: 1.0,
            })
            .unwrap();
        }
        let mut reg = InstitutionRegistry::new();
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
        .unwrap();
        (s, reg)
    }

    #[test]
    fn resister_advances_on_taboo() {
        let (mut s, reg) = setup();
        let mut roles = RoleState::with_capacity(4);
        roles.assign(0, RoleKind::Resister, 10.0, None);
        let cfg = RoleConfig {
            assign_chance: 0.0,
            ..RoleConfig::default()
        };
        let report = roles.step(&mut s, &reg, &[], &cfg, 0.025, 1.0, &mut seeded(1));
        assert_eq!(report.resisters, 1);
        assert!(s.velocity(0).unwrap().x < 0.0);
    }

    #[test]
    fn enforcer_chases_target_and_expires() {
        let (mut s, reg) = setup();
        let mut roles = RoleState::with_capacity(4);
        roles.assign(1, RoleKind::Enforcer, 5.0, Some(2));
        let cfg = RoleConfig {
            assign_chance: 0.0,
            ..RoleConfig::default()
        };
        roles.step(&mut s, &reg, &[2], &cfg, 0.025, 1.0, &mut seeded(1));
        assert!(s.velocity(1).unwrap().x > 0.0);
        roles.step(&mut s, &reg, &[2], &cfg, 0.025, 6.0, &mut seeded(1));
        assert_eq!(roles.role(1), RoleKind::Neutral);
    }

    #[test]
    fn disabled_roles_clear_everyone() {
        let (mut s, reg) = setup();
        let mut roles = RoleState::with_capacity(4);
        roles.assign(0, RoleKind::Vigilante, 100.0, None);
        let cfg = RoleConfig {
            enabled: false,
            ..RoleConfig::default()
        };
        roles.step(&mut s, &reg, &[], &cfg, 0.025, 1.0, &mut seeded(1));
        assert_eq!(roles.count(RoleKind::Vigilante), 0);
        assert_eq!(s.velocity(0).unwrap(), Vec2::ZERO);
    }

    #[test]
    fn certain_assignment_gives_everyone_a_role() {
        let (mut s, reg) = setup();
        let mut roles = RoleState::with_capacity(4);
        let cfg = RoleConfig {
            assign_chance: 1.0,
            ..RoleConfig::default()
        };
        let report = roles.step(&mut s, &reg, &[], &cfg, 0.025, 0.0, &mut seeded(9));
        assert_eq!(report.assigned, 3);
        assert_eq!(roles.count(RoleKind::Neutral), 1);
    }
}
