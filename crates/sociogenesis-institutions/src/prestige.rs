//! Prestige decay, rewards, and leader announcements.

use tracing::{debug, info};

use sociogenesis_types::{Chronicle, ChronicleKind, TabooKind};
use sociogenesis_world::AgentSubstrate;

use crate::config::PrestigeConfig;
use crate::culture::CultureState;
use crate::registry::InstitutionRegistry;

/// Outcome of one prestige pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PrestigeReport {
    /// Agents rewarded for ritual participation.
    pub rewarded: u32,
    /// Agents penalized for trespassing.
    pub penalized: u32,
    /// Highest-prestige agent above the threshold, with its prestige.
    pub leader: Option<(usize, f32)>,
}

/// Prestige dynamics with the last announced leader.
#[derive(Debug, Clone, PartialEq)]
pub struct PrestigeEngine {
    config: PrestigeConfig,
    announced: Option<usize>,
}

impl PrestigeEngine {
    /// Create an engine that has announced nobody.
    pub fn new(config: &PrestigeConfig) -> Self {
        Self {
            config: config.sanitized(),
            announced: None,
        }
    }

    /// Active parameters.
    pub const fn config(&self) -> &PrestigeConfig {
        &self.config
    }

    /// Replace every parameter.
    pub fn set_config(&mut self, config: &PrestigeConfig) {
        self.config = config.sanitized();
    }

    /// Last agent announced as leader.
    pub const fn announced(&self) -> Option<usize> {
        self.announced
    }

    /// Forget the announced leader.
    pub const fn reset(&mut self) {
        self.announced = None;
    }

    /// Decay, reward, penalize, then announce a new leader if one emerged.
    ///
    /// Agents inside several ritual zones are rewarded once.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        state: &mut CultureState,
        substrate: &AgentSubstrate,
        registry: &InstitutionRegistry,
        ritual_radius_factor: f32,
        dt: f32,
        now: f64,
        chronicle: &mut Chronicle,
    ) -> PrestigeReport {
        let mut report = PrestigeReport::default();
        state.scale_prestige((-self.config.decay_rate * dt.max(0.0)).exp());

        let zones = registry.active_ritual_zones(now, ritual_radius_factor);
        let n = substrate.len().min(state.capacity());
        for i in 0..n {
            let Some(p) = substrate.position(i) else { continue };
            if zones.iter().any(|&(c, r)| p.distance(c) <= r) {
                state.add_prestige(i, self.config.ritual_bonus);
                report.rewarded = report.rewarded.saturating_add(1);
            }
            let trespassing = registry
                .taboos()
                .iter()
                .any(|t| t.kind == TabooKind::NoEnter && t.contains(p));
            if trespassing {
                state.add_prestige(i, -self.config.taboo_penalty);
                report.penalized = report.penalized.saturating_add(1);
            }
        }

        for i in 0..n {
            let prestige = state.prestige(i);
            if prestige > self.config.leader_threshold
                && report.leader.is_none_or(|(_, best)| prestige > best)
            {
                report.leader = Some((i, prestige));
            }
        }

        let fresh = report.leader.filter(|&(agent, _)| self.announced != Some(agent));
        if let Some((agent, prestige)) = fresh {
            self.announced = Some(agent);
            let agent_type = substrate.agent_type(agent).unwrap_or_default();
            info!(agent, agent_type, prestige, "leader emerges");
            chronicle.record(
                now,
                ChronicleKind::LeaderEmerges,
                format!("Agent {agent} of type {agent_type} rises as a leader"),
                format!("prestige reached {prestige:.2}"),
                "nearby kin begin to follow",
            );
        }

        debug!(rewarded = report.rewarded, penalized = report.penalized, "prestige pass");
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sociogenesis_types::{AgentSeed, RitualKind, RitualSpec, TabooSpec, TotemKind, TotemSpec, Vec2};
    use sociogenesis_world::seeded;

    use super::*;

    fn two_agents() -> AgentSubstrate {
        let mut s = AgentSubstrate::new(2).unwrap();
        for x in [0.0_f32, 0.8] {
            s.push(AgentSeed {
                position: Vec2::new(x, 0.0),
                velocity: Vec2::ZERO,
                agent_type: 0,
                energy: 1.0,
            })
            .unwrap();
        }
        s
    }

    #[test]
    fn prestige_decays_exponentially() {
        let s = two_agents();
        let mut state = CultureState::with_capacity(2);
        state.set_prestige(0, 0.5);
        let mut engine = PrestigeEngine::new(&PrestigeConfig::default());
        let mut chronicle = Chronicle::default();
        engine.step(&mut state, &s, &InstitutionRegistry::new(), 2.5, 10.0, 1.0, &mut chronicle);
        let expected = 0.5 * (-0.2_f32).exp();
        assert!((state.prestige(0) - expected).abs() < 1e-6);
    }

    #[test]
    fn ritual_rewards_and_taboo_penalizes() {
        let s = two_agents();
        let mut reg = InstitutionRegistry::new();
        let totem = reg.place_totem(
            &TotemSpec {
                kind: TotemKind::Archive,
                position: Vec2::ZERO,
                radius: 0.1,
                strength: 1.0,
                name: None,
            },
            0.0,
            &mut seeded(1),
        );
        reg.place_ritual(
            totem,
            &RitualSpec {
                kind: RitualKind::Gather,
                period_sec: 10.0,
                duty_cycle: 1.0,
                intensity: 1.0,
            },
            0.0,
        )
        .unwrap();
        reg.place_taboo(
            &TabooSpec {
                kind: TabooKind::NoEnter,
                position: Vec2::new(0.8, 0.0),
                radius: 0.1,
                intensity: 1.0,
                target_type: None,
            },
            0.0,
        )
        .unwrap();
        let mut state = CultureState::with_capacity(2);
        state.set_prestige(0, 0.3);
        state.set_prestige(1, 0.3);
        let mut engine = PrestigeEngine::new(&PrestigeConfig::default());
        let report = engine.step(&mut state, &s, &reg, 2.5, 0.0, 1.0, &mut Chronicle::default());
        assert_eq!(report.rewarded, 1);
        assert_eq!(report.penalized, 1);
        assert!(state.prestige(0) > state.prestige(1));
    }

    #[test]
    fn leader_is_announced_once() {
        let s = two_agents();
        let mut state = CultureState::with_capacity(2);
        state.set_prestige(1, 0.9);
        let mut engine = PrestigeEngine::new(&PrestigeConfig::default());
        let mut chronicle = Chronicle::default();
        let reg = InstitutionRegistry::new();
        for tick in 0..3 {
            engine.step(&mut state, &s, &reg, 2.5, 0.0, f64::from(tick), &mut chronicle);
        }
        assert_eq!(chronicle.count_kind(ChronicleKind::LeaderEmerges), 1);
        assert_eq!(engine.announced(), Some(1));
    }
}
