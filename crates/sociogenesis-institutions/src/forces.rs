//! Totem and ritual forces.
//!
//! Each application walks every totem and every ritual once and converts
//! its state into velocity deltas for the agents inside its zone. Every
//! delta goes through [`nudge`], which clamps each axis to the configured
//! bound before it touches the substrate.
//!
//! # Forces
//!
//! | Source       | Delta inside the zone                              |
//! |--------------|----------------------------------------------------|
//! | BOND         | toward the center, scaled by radial falloff         |
//! | RIFT         | away from the center, scaled by radial falloff      |
//! | ORACLE       | along a slowly rotating per-totem unit vector       |
//! | ARCHIVE      | none                                               |
//! | GATHER       | toward the totem while the ritual is active         |
//! | PROCESSION   | counter-clockwise around the totem while active     |
//! | OFFERING     | damps velocity while active                         |
//!
//! `affected_count` on every totem and ritual is reset at the start of an
//! application and counts the agents inside the zone during that same pass.

use std::collections::BTreeMap;

use sociogenesis_types::{RitualKind, TotemId, TotemKind, Vec2};
use sociogenesis_world::AgentSubstrate;

use crate::config::ForceConfig;
use crate::registry::InstitutionRegistry;

/// Agents touched by one force application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForceReport {
    /// Agent-totem pairs inside a totem radius.
    pub totem_affected: u32,
    /// Agent-ritual pairs moved by an active ritual.
    pub ritual_affected: u32,
}

/// Add `delta` to the velocity of agent `index`, clamping each axis to
/// `±clamp` first. Returns the delta actually applied.
pub fn nudge(substrate: &mut AgentSubstrate, index: usize, delta: Vec2, clamp: f32) -> Vec2 {
    let bounded = delta.clamp_axes(clamp);
    if substrate.add_velocity(index, bounded) {
        bounded
    } else {
        Vec2::ZERO
    }
}

/// Linear falloff: one at the center, zero at the boundary.
pub fn falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / radius).clamp(0.0, 1.0)
}

/// Mix a totem id into a phase in `[0, TAU)`.
#[allow(clippy::cast_precision_loss)]
fn id_phase(id: TotemId) -> f32 {
    let mut z = id.get().wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    let unit = (z >> 40) as f32 / (1_u64 << 24) as f32;
    unit * core::f32::consts::TAU
}

/// The ORACLE drift direction of totem `id` at time `now`.
///
/// A low-frequency oscillator whose phase is seeded from the id, so two
/// oracles never turn in lockstep and the same id always turns the same way.
#[allow(clippy::cast_possible_truncation)]
pub fn oracle_direction(id: TotemId, now: f64, frequency: f32) -> Vec2 {
    let phase = id_phase(id);
    let t = now.rem_euclid(1.0e6) as f32;
    let angle = phase + frequency * t + 0.3 * (0.37 * frequency * t + phase).sin();
    Vec2::from_angle(angle)
}

/// Apply every totem's force and refresh its `affected_count`.
pub fn apply_totem_forces(
    registry: &mut InstitutionRegistry,
    substrate: &mut AgentSubstrate,
    config: &ForceConfig,
    now: f64,
) -> u32 {
    let mut total = 0_u32;
    for totem in registry.totems_mut() {
        totem.affected_count = 0;
        let oracle = oracle_direction(totem.id, now, config.oracle_frequency);
        for i in 0..substrate.len() {
            let Some(p) = substrate.position(i) else { continue };
            let d = p.distance(totem.position);
            if d > totem.radius {
                continue;
            }
            totem.affected_count = totem.affected_count.saturating_add(1);
            let f = falloff(d, totem.radius) * totem.strength;
            let delta = match totem.kind {
                TotemKind::Bond => (totem.position - p).normalize_or(Vec2::ZERO) * (config.bond_gain * f),
                TotemKind::Rift => (p - totem.position).normalize_or(Vec2::ZERO) * (config.rift_gain * f),
                TotemKind::Oracle => oracle * (config.oracle_gain * f),
                TotemKind::Archive => Vec2::ZERO,
            };
            nudge(substrate, i, delta, config.clamp);
        }
        total = total.saturating_add(totem.affected_count);
    }
    total
}

/// Apply every active ritual's force and refresh its `affected_count`.
/// Orphaned and inactive rituals apply nothing.
pub fn apply_ritual_forces(
    registry: &mut InstitutionRegistry,
    substrate: &mut AgentSubstrate,
    config: &ForceConfig,
    now: f64,
) -> u32 {
    let anchors: BTreeMap<TotemId, (Vec2, f32)> = registry
        .totems()
        .iter()
        .map(|t| (t.id, (t.position, t.radius * config.ritual_radius_factor)))
        .collect();

    let mut total = 0_u32;
    for ritual in registry.rituals_mut() {
        ritual.affected_count = 0;
        let Some(&(center, radius)) = anchors.get(&ritual.totem_id) else { continue };
        if !ritual.is_active(now) {
            continue;
        }
        for i in 0..substrate.len() {
            let Some(agent) = substrate.view(i) else { continue };
            let offset = agent.position - center;
            let d = offset.length();
            if d > radius {
                continue;
            }
            ritual.affected_count = ritual.affected_count.saturating_add(1);
            let f = falloff(d, radius) * ritual.intensity;
            let outward = offset.normalize_or(Vec2::ZERO);
            let delta = match ritual.kind {
                RitualKind::Gather => -outward * (config.ritual_gain * f),
                RitualKind::Procession => outward.perp() * (config.ritual_gain * f),
                RitualKind::Offering => {
                    let keep = 1.0 - (1.0 - config.offering_damping) * ritual.intensity.clamp(0.0, 1.0);
                    agent.velocity * (keep - 1.0)
                }
            };
            nudge(substrate, i, delta, config.clamp);
        }
        total = total.saturating_add(ritual.affected_count);
    }
    total
}

/// Apply totem forces, then ritual forces.
pub fn apply_forces(
    registry: &mut InstitutionRegistry,
    substrate: &mut AgentSubstrate,
    config: &ForceConfig,
    now: f64,
) -> ForceReport {
    ForceReport {
        totem_affected: apply_totem_forces(registry, substrate, config, now),
        ritual_affected: apply_ritual_forces(registry, substrate, config, now),
    }
}
