//! Whole-engine properties: determinism, bounded forces, detector
//! exclusion, and economy field bounds.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use sociogenesis_core::{SimulationConfig, SociogenesisState, run_tick};
use sociogenesis_types::{AgentSeed, TotemKind, TotemSpec, Vec2};
use sociogenesis_world::economy::CLAIM_EPSILON;
use sociogenesis_world::{NEUTRAL_OWNER, NeutralField};

const NEVER: f64 = 1.0e9;

fn small_world(seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.world.seed = seed;
    config.world.capacity = 400;
    config.cadence.detection_sec = 2.0;
    config.cadence.force_sec = 0.5;
    config.cadence.justice_sec = 0.5;
    config.cadence.macro_tick_sec = 1.0;
    config
}

fn advance(state: &mut SociogenesisState, ticks: u32, step: f64) {
    let damping = state.config.world.damping;
    for _ in 0..ticks {
        run_tick(state, step, &NeutralField);
        #[allow(clippy::cast_possible_truncation)]
        let dt = (step * state.clock.sim_speed()) as f32;
        state.substrate.integrate(dt, damping);
    }
}

#[test]
fn same_seed_same_history() {
    let run = || {
        let mut state = SociogenesisState::new(&small_world(7)).unwrap();
        state.scatter_population(300).unwrap();
        advance(&mut state, 40, 0.5);
        serde_json::to_string(&state.snapshot()).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn different_seeds_diverge() {
    let snapshot = |seed| {
        let mut state = SociogenesisState::new(&small_world(seed)).unwrap();
        state.scatter_population(100).unwrap();
        advance(&mut state, 4, 0.5);
        state.substrate.views().map(|a| a.position).collect::<Vec<_>>()
    };
    assert_ne!(snapshot(1), snapshot(2));
}

#[test]
fn a_single_force_pass_respects_the_clamp() {
    let mut config = small_world(3);
    config.cadence.detection_sec = NEVER;
    config.cadence.justice_sec = NEVER;
    config.cadence.macro_tick_sec = NEVER;
    config.cadence.force_sec = 1.0;
    config.roles.enabled = false;
    let mut state = SociogenesisState::new(&config).unwrap();
    state.set_force_clamp(0.01);
    state.place_totem(&TotemSpec {
        kind: TotemKind::Rift,
        position: Vec2::ZERO,
        radius: 0.5,
        strength: 10.0,
        name: None,
    });
    for k in 0..16_u16 {
        let dir = Vec2::from_angle(f32::from(k) * 0.39);
        state
            .substrate
            .push(AgentSeed {
                position: dir * 0.1,
                velocity: Vec2::ZERO,
                agent_type: 0,
                energy: 1.0,
            })
            .unwrap();
    }

    let summary = run_tick(&mut state, 1.0, &NeutralField);

    assert_eq!(summary.forces.map(|f| f.totem_affected), Some(16));
    for agent in state.substrate.views() {
        assert!(agent.velocity.x.abs() <= 0.01 + 1e-6);
        assert!(agent.velocity.y.abs() <= 0.01 + 1e-6);
        assert!(agent.velocity.length() > 0.0);
    }
}

#[test]
fn detection_twice_at_one_instant_respects_exclusion() {
    let mut state = SociogenesisState::new(&small_world(11)).unwrap();
    // A still cluster at the center of every cell along one row; neighbors
    // sit closer than the exclusion radius.
    for cell in 0..10_u16 {
        let center = Vec2::new(-0.9 + 0.2 * f32::from(cell), 0.1);
        for k in 0..10_u16 {
            let offset = Vec2::from_angle(f32::from(k) * 0.628) * 0.04;
            state
                .substrate
                .push(AgentSeed {
                    position: center + offset,
                    velocity: Vec2::new(0.005, 0.0),
                    agent_type: 0,
                    energy: 1.0,
                })
                .unwrap();
        }
    }

    let exclusion = state.detector.config().totem_exclusion;
    for _ in 0..2 {
        state.detector.run(
            &mut state.registry,
            &state.substrate,
            5.0,
            &mut state.rng,
            &mut state.chronicle,
        );
    }

    let totems = state.registry.totems();
    assert!(!totems.is_empty());
    for (i, a) in totems.iter().enumerate() {
        for b in &totems[i + 1..] {
            assert!(
                a.position.distance(b.position) >= exclusion,
                "{} and {} overlap",
                a.id,
                b.id
            );
        }
    }
}

#[test]
fn economy_fields_stay_in_bounds() {
    let mut config = small_world(5);
    config.economy.mode = sociogenesis_types::ResourceMode::FieldDerived;
    let mut state = SociogenesisState::new(&config).unwrap();
    state.scatter_population(300).unwrap();
    advance(&mut state, 30, 1.0);

    let economy = &state.economy;
    assert!(economy.resource().iter().all(|r| (0.0..=1.0).contains(r)));
    let strengths = economy.claim_strength();
    assert!(strengths.iter().all(|s| (0.0..=1.0).contains(s)));
    for (strength, owner) in strengths.iter().zip(economy.claim_owner()) {
        if *strength < CLAIM_EPSILON {
            assert_eq!(*owner, NEUTRAL_OWNER);
        }
    }
    assert!(economy.claim_owner().iter().any(|&o| o != NEUTRAL_OWNER));

    let metrics = state.snapshot().economy;
    assert!((0.0..=1.0).contains(&metrics.gini));
    assert!((0.0..=1.0).contains(&metrics.scarcity));
}

#[test]
fn preset_replaces_institutions_and_population() {
    let mut state = SociogenesisState::new(&small_world(9)).unwrap();
    state.scatter_population(50).unwrap();
    advance(&mut state, 5, 1.0);

    let preset: sociogenesis_types::InstitutionPreset = serde_json::from_value(serde_json::json!({
        "name": "two camps",
        "totems": [
            { "kind": "BOND", "position": { "x": -0.5, "y": 0.0 }, "radius": 0.2, "strength": 1.0 },
            { "kind": "BOND", "position": { "x": 0.5, "y": 0.0 }, "radius": 0.2, "strength": 1.0 }
        ],
        "taboos": [
            { "kind": "NO_ENTER", "position": { "x": 0.0, "y": 0.0 }, "radius": 0.1, "intensity": 1.0 }
        ],
        "rituals": [],
        "agents": [
            { "position": { "x": -0.5, "y": 0.1 }, "velocity": { "x": 0.0, "y": 0.0 }, "agent_type": 0, "energy": 1.0 },
            { "position": { "x": 0.5, "y": 0.1 }, "velocity": { "x": 0.0, "y": 0.0 }, "agent_type": 1, "energy": 1.0 }
        ]
    }))
    .unwrap();
    state.load_preset(&preset).unwrap();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.agent_count, 2);
    assert_eq!(snapshot.totems.len(), 2);
    assert_eq!(snapshot.taboos.len(), 1);
    assert!(snapshot.cases.is_empty());
    assert!(snapshot.totems.iter().all(|t| !t.emergent));
}
