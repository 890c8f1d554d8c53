//! Tick orchestration: one pass over every subsystem in data-flow order.
//!
//! Each call to [`run_tick`] advances the clock and then polls each cadence
//! gate in turn:
//!
//! 1. **Detection** -- analyze the grid, spawn totems, taboos, and rituals,
//!    then rebuild tribes.
//! 2. **Forces** -- totem and ritual steering, then transient roles.
//! 3. **Justice** -- violations, cases, and judgment.
//! 4. **Macro tick** -- culture contagion, prestige, leaders, and the
//!    economy (field, harvest, claims, metrics).
//!
//! A gate that is not due skips its phase entirely. Every phase runs to
//! completion before the next begins, and every draw comes from the single
//! [`SimRng`] in the order above, so the pass is deterministic given the
//! same seed, configuration, and step sequence.
//!
//! Positions are never integrated here; the substrate's owner moves agents
//! between passes.

use tracing::{debug, info};

use sociogenesis_institutions::{
    CultureEngine, CultureReport, CultureState, DetectionReport, Detector, ForceReport,
    InstitutionRegistry, JusticeReport, JusticeSystem, LeaderDetector, PrestigeEngine,
    PrestigeReport, RoleReport, RoleState, TribeLedger, apply_forces,
};
use sociogenesis_types::{Chronicle, LeaderInfo, TotemKind};
use sociogenesis_world::{AgentSubstrate, EconomyEngine, FieldSampler, SimRng, UpkeepZone, seeded};

use crate::clock::{Cadences, SimClock};
use crate::config::SimulationConfig;
use crate::error::SimError;

/// Summary of a single orchestrator pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSummary {
    /// The pass number that was executed.
    pub tick: u64,
    /// Simulated time at the end of the pass.
    pub time: f64,
    /// Detection results, when detection ran.
    pub detection: Option<DetectionReport>,
    /// Force results, when forces ran.
    pub forces: Option<ForceReport>,
    /// Role results, when forces ran.
    pub roles: Option<RoleReport>,
    /// Justice results, when justice ran.
    pub justice: Option<JusticeReport>,
    /// Culture results, when the macro tick ran.
    pub culture: Option<CultureReport>,
    /// Prestige results, when the macro tick ran.
    pub prestige: Option<PrestigeReport>,
    /// Chronicle entries recorded during the pass.
    pub chronicle_recorded: u64,
}

/// The mutable simulation state passed through the tick cycle.
///
/// Bundles the substrate, every subsystem, and the shared chronicle and
/// generator. Subsystems borrow disjoint fields during a pass.
#[derive(Debug, Clone)]
pub struct SociogenesisState {
    /// Sanitized configuration the state was built from, kept in sync by
    /// the control setters.
    pub config: SimulationConfig,
    /// Simulated time.
    pub clock: SimClock,
    /// Per-subsystem cadence gates.
    pub cadences: Cadences,
    /// The single seeded generator.
    pub rng: SimRng,
    /// Agent population.
    pub substrate: AgentSubstrate,
    /// Totems, taboos, and rituals.
    pub registry: InstitutionRegistry,
    /// Institution spawner.
    pub detector: Detector,
    /// Per-agent transient roles.
    pub roles: RoleState,
    /// Case ledger.
    pub justice: JusticeSystem,
    /// Per-agent meme and prestige arrays.
    pub culture_state: CultureState,
    /// Contagion engine.
    pub culture: CultureEngine,
    /// Prestige dynamics.
    pub prestige: PrestigeEngine,
    /// Leader scoring.
    pub leader_detector: LeaderDetector,
    /// Leaders from the last macro tick.
    pub leaders: Vec<LeaderInfo>,
    /// Tribes from the last detection pass.
    pub tribes: TribeLedger,
    /// Resource and territory economy.
    pub economy: EconomyEngine,
    /// Shared event log.
    pub chronicle: Chronicle,
}

impl SociogenesisState {
    /// Build an empty world from `config`. The configuration is sanitized
    /// first; the substrate starts with no agents.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::World`] if the substrate cannot be allocated.
    pub fn new(config: &SimulationConfig) -> Result<Self, SimError> {
        let config = config.sanitized();
        let capacity = usize::try_from(config.world.capacity).unwrap_or(usize::MAX);
        let mut rng = seeded(config.world.seed);
        let economy = EconomyEngine::new(&config.economy, &mut rng);
        let chronicle_capacity = usize::try_from(config.chronicle.capacity).unwrap_or(usize::MAX);
        info!(
            name = %config.world.name,
            seed = config.world.seed,
            capacity,
            "sociogenesis state created"
        );
        Ok(Self {
            clock: SimClock::new(config.cadence.sim_speed),
            cadences: Cadences::new(&config.cadence),
            rng,
            substrate: AgentSubstrate::new(capacity)?,
            registry: InstitutionRegistry::new(),
            detector: Detector::new(&config.detector),
            roles: RoleState::with_capacity(capacity),
            justice: JusticeSystem::new(&config.justice),
            culture_state: CultureState::with_capacity(capacity),
            culture: CultureEngine::new(&config.culture),
            prestige: PrestigeEngine::new(&config.prestige),
            leader_detector: LeaderDetector::new(&config.leaders),
            leaders: Vec::new(),
            tribes: TribeLedger::new(),
            economy,
            chronicle: Chronicle::with_capacity(chronicle_capacity),
            config,
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn secs(value: f64) -> f32 {
    value as f32
}

/// Execute one orchestrator pass.
///
/// `step_sec` is scaled by the sim-speed multiplier before it advances the
/// clock. `field` modulates culture and the economy; pass
/// [`NeutralField`](sociogenesis_world::NeutralField) when there is none.
pub fn run_tick(state: &mut SociogenesisState, step_sec: f64, field: &dyn FieldSampler) -> TickSummary {
    let recorded_before = state.chronicle.total_recorded();
    state.clock.advance(step_sec);
    let now = state.clock.time();
    let tick = state.clock.tick();

    let detection = state.cadences.detection.poll(now).map(|_| phase_detection(state, now));
    let (forces, roles) = state
        .cadences
        .forces
        .poll(now)
        .map(|_| phase_forces(state, now))
        .unzip();
    let justice = state.cadences.justice.poll(now).map(|_| phase_justice(state, now));
    let (culture, prestige) = state
        .cadences
        .macro_tick
        .poll(now)
        .map(|elapsed| phase_macro(state, field, now, elapsed))
        .unzip();

    let chronicle_recorded = state.chronicle.total_recorded().saturating_sub(recorded_before);
    debug!(tick, time = now, chronicle_recorded, "tick complete");
    TickSummary {
        tick,
        time: now,
        detection,
        forces,
        roles,
        justice,
        culture,
        prestige,
        chronicle_recorded,
    }
}

/// Detect new institutions and regroup tribes.
fn phase_detection(state: &mut SociogenesisState, now: f64) -> DetectionReport {
    let report = state.detector.run(
        &mut state.registry,
        &state.substrate,
        now,
        &mut state.rng,
        &mut state.chronicle,
    );
    let tribes = state.tribes.rebuild(&mut state.registry, &state.substrate, now);
    if !report.is_empty() {
        info!(
            totems = report.totems.len(),
            taboos = report.taboos.len(),
            rituals = report.rituals.len(),
            tribes,
            "institutions emerged"
        );
    }
    report
}

/// Apply totem, ritual, and role forces.
fn phase_forces(state: &mut SociogenesisState, now: f64) -> (ForceReport, RoleReport) {
    let forces = apply_forces(&mut state.registry, &mut state.substrate, &state.config.forces, now);
    let roles = state.roles.step(
        &mut state.substrate,
        &state.registry,
        state.justice.violators(),
        &state.config.roles,
        state.config.forces.clamp,
        now,
        &mut state.rng,
    );
    debug!(
        totem_affected = forces.totem_affected,
        ritual_affected = forces.ritual_affected,
        assigned = roles.assigned,
        "forces applied"
    );
    (forces, roles)
}

/// Run one justice pass.
fn phase_justice(state: &mut SociogenesisState, now: f64) -> JusticeReport {
    state.justice.step(
        &mut state.registry,
        &mut state.substrate,
        state.config.forces.clamp,
        now,
        &mut state.chronicle,
    )
}

/// Zones whose occupants pay economy upkeep: active ritual zones and every
/// non-ARCHIVE totem.
fn upkeep_zones(registry: &InstitutionRegistry, ritual_radius_factor: f32, now: f64) -> Vec<UpkeepZone> {
    let rituals = registry
        .active_ritual_zones(now, ritual_radius_factor)
        .into_iter()
        .map(|(center, radius)| UpkeepZone { center, radius });
    let totems = registry
        .totems()
        .iter()
        .filter(|t| t.kind != TotemKind::Archive)
        .map(|t| UpkeepZone {
            center: t.position,
            radius: t.radius,
        });
    rituals.chain(totems).collect()
}

/// Culture, prestige, leaders, then the economy.
fn phase_macro(
    state: &mut SociogenesisState,
    field: &dyn FieldSampler,
    now: f64,
    elapsed: f64,
) -> (CultureReport, PrestigeReport) {
    let dt = secs(elapsed);
    let clamp = state.config.forces.clamp;
    let ritual_factor = state.config.forces.ritual_radius_factor;

    let culture = state.culture.step(
        &mut state.culture_state,
        &state.substrate,
        field,
        now,
        &mut state.rng,
        &mut state.chronicle,
    );
    let prestige = state.prestige.step(
        &mut state.culture_state,
        &state.substrate,
        &state.registry,
        ritual_factor,
        dt,
        now,
        &mut state.chronicle,
    );
    state.leaders = state
        .leader_detector
        .run(&mut state.substrate, &state.culture_state, clamp);

    let upkeep = upkeep_zones(&state.registry, ritual_factor, now);
    state.economy.step_field(dt, field);
    state.economy.harvest(&mut state.substrate, dt, field, &upkeep);
    let culture_state = &state.culture_state;
    state
        .economy
        .update_claims(&state.substrate, dt, |i| culture_state.meme(i));
    state
        .economy
        .compute_metrics(&state.substrate, now, &mut state.chronicle);

    (culture, prestige)
}
