//! Tribes: totems grouped by the agent type that dominates them.
//!
//! Tribes are rebuilt from scratch on every detection pass. A type keeps
//! the same [`TribeId`] for as long as the ledger lives, even across passes
//! where it controls no totem. Ethos is a pure function of type and time.

use std::collections::BTreeMap;

use tracing::debug;

use sociogenesis_types::{Ethos, TotemId, Tribe, TribeId};
use sociogenesis_world::AgentSubstrate;

use crate::registry::InstitutionRegistry;

/// Amplitude of the slow ethos oscillation.
const ETHOS_SWING: f32 = 0.15;

/// Hash `value` with `salt` into `[0, 1)`.
#[allow(clippy::cast_precision_loss)]
fn unit_hash(value: u32, salt: u64) -> f32 {
    let mut z = u64::from(value)
        .wrapping_add(salt)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 40) as f32 / (1_u64 << 24) as f32
}

/// Ethos of `agent_type` at time `now`.
///
/// Each type has a fixed base and a slow oscillation with a per-type
/// frequency and phase. Both biases stay in `[0, 1]`.
#[allow(clippy::cast_possible_truncation)]
pub fn ethos(agent_type: u32, now: f64) -> Ethos {
    let t = now.rem_euclid(1.0e6) as f32;
    let omega = 0.01 + 0.02 * unit_hash(agent_type, 3);
    let phase = core::f32::consts::TAU * unit_hash(agent_type, 4);
    let swing = ETHOS_SWING * (omega * t + phase).sin();
    Ethos {
        cohesion_bias: (0.2 + 0.6 * unit_hash(agent_type, 1) + swing).clamp(0.0, 1.0),
        tension_bias: (0.2 + 0.6 * unit_hash(agent_type, 2) - swing).clamp(0.0, 1.0),
    }
}

/// Current tribes plus the stable id assigned to each type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TribeLedger {
    tribes: Vec<Tribe>,
    ids: BTreeMap<u32, TribeId>,
}

impl TribeLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tribes from the last rebuild, ordered by agent type.
    pub fn tribes(&self) -> &[Tribe] {
        &self.tribes
    }

    /// Forget every tribe and id.
    pub fn reset(&mut self) {
        self.tribes.clear();
        self.ids.clear();
    }

    /// Assign every totem to the type with the most agents inside it and
    /// regroup. Totems with nobody inside belong to no tribe.
    pub fn rebuild(&mut self, registry: &mut InstitutionRegistry, substrate: &AgentSubstrate, now: f64) -> usize {
        let mut owned: BTreeMap<u32, Vec<TotemId>> = BTreeMap::new();
        for totem in registry.totems() {
            let mut hist: BTreeMap<u32, u32> = BTreeMap::new();
            for agent in substrate.views() {
                if totem.contains(agent.position) {
                    let c = hist.entry(agent.agent_type).or_insert(0);
                    *c = c.saturating_add(1);
                }
            }
            let mut best: Option<(u32, u32)> = None;
            for (&agent_type, &count) in &hist {
                if best.is_none_or(|(_, c)| count > c) {
                    best = Some((agent_type, count));
                }
            }
            if let Some((agent_type, _)) = best {
                owned.entry(agent_type).or_default().push(totem.id);
            }
        }

        self.tribes.clear();
        for (agent_type, totem_ids) in owned {
            let id = match self.ids.get(&agent_type) {
                Some(&id) => id,
                None => {
                    let id = registry.ids_mut().tribe();
                    self.ids.insert(agent_type, id);
                    id
                }
            };
            self.tribes.push(Tribe {
                id,
                agent_type,
                totem_ids,
                ethos: ethos(agent_type, now),
            });
        }
        debug!(tribes = self.tribes.len(), "tribes rebuilt");
        self.tribes.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sociogenesis_types::{AgentSeed, TotemKind, TotemSpec, Vec2};
    use sociogenesis_world::seeded;

    use super::*;

    #[test]
    fn ethos_is_deterministic_and_bounded() {
        assert_eq!(ethos(3, 42.0), ethos(3, 42.0));
        assert_ne!(ethos(3, 42.0), ethos(4, 42.0));
        for t in 0..50 {
            let e = ethos(1, f64::from(t) * 37.0);
            assert!((0.0..=1.0).contains(&e.cohesion_bias));
            assert!((0.0..=1.0).contains(&e.tension_bias));
        }
    }

    #[test]
    fn dominant_type_owns_the_totem_and_keeps_its_id() {
        let mut reg = InstitutionRegistry::new();
        let mut rng = seeded(1);
        let totem = reg.place_totem(
            &TotemSpec {
                kind: TotemKind::Bond,
                position: Vec2::ZERO,
                radius: 0.2,
                strength: 1.0,
                name: None,
            },
            0.0,
            &mut rng,
        );
        let mut s = AgentSubstrate::new(8).unwrap();
        for (x, agent_type) in [(0.0_f32, 2_u32), (0.05, 2), (0.1, 1), (0.9, 1)] {
            s.push(AgentSeed {
                position: Vec2::new(x, 0.0),
                velocity: Vec2::ZERO,
                agent_type,
                energy: 1.0,
            })
            .unwrap();
        }
        let mut ledger = TribeLedger::new();
        assert_eq!(ledger.rebuild(&mut reg, &s, 1.0), 1);
        let first = ledger.tribes().first().cloned().unwrap();
        assert_eq!(first.agent_type, 2);
        assert_eq!(first.totem_ids, vec![totem]);

        ledger.rebuild(&mut reg, &s, 2.0);
        assert_eq!(ledger.tribes().first().unwrap().id, first.id);
    }
}
