//! Headless driver for the Sociogenesis engine.
//!
//! Loads configuration, seeds a population, runs the orchestrator for a
//! fixed number of passes, and prints the final snapshot as JSON.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from the first CLI argument or
//!    `sociogenesis-config.yaml` (defaults when the file is missing)
//! 2. Initialize structured logging (tracing)
//! 3. Build the engine state and scatter the initial population
//! 4. Run the tick loop, integrating positions between passes
//! 5. Print the final snapshot

mod error;

use std::path::{Path, PathBuf};

use sociogenesis_core::config::LoggingConfig;
use sociogenesis_core::{SimulationConfig, SociogenesisState, run_tick};
use sociogenesis_types::Chronicle;
use sociogenesis_world::NeutralField;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "sociogenesis-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging setup, engine construction,
/// or snapshot serialization fails.
fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, found) = load_config(&path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging)?;
    info!("sociogenesis-engine starting");
    if found {
        info!(path = %path.display(), "configuration loaded");
    } else {
        info!(path = %path.display(), "config file not found, using defaults");
    }

    // 3. Build the state and seed agents.
    let mut state = SociogenesisState::new(&config)?;
    let population = state.scatter_population(state.config.world.initial_agents)?;
    info!(
        world_name = %state.config.world.name,
        seed = state.config.world.seed,
        population,
        ticks = state.config.run.ticks,
        step_sec = state.config.run.step_sec,
        "state assembled, entering tick loop"
    );

    // 4. Run the simulation.
    let step_sec = state.config.run.step_sec;
    let damping = state.config.world.damping;
    let chronicle_to_log = state.config.logging.chronicle_to_log;
    for _ in 0..state.config.run.ticks {
        let summary = run_tick(&mut state, step_sec, &NeutralField);
        state.substrate.integrate(integration_dt(step_sec, state.clock.sim_speed()), damping);
        if chronicle_to_log {
            log_new_entries(&state.chronicle, summary.chronicle_recorded);
        }
        debug!(tick = summary.tick, time = summary.time, "pass complete");
    }

    // 5. Report.
    let snapshot = state.snapshot();
    info!(
        time = snapshot.time,
        totems = snapshot.totems.len(),
        taboos = snapshot.taboos.len(),
        rituals = snapshot.rituals.len(),
        tribes = snapshot.tribes.len(),
        leaders = snapshot.leaders.len(),
        chronicle_total = state.chronicle.total_recorded(),
        "sociogenesis-engine run complete"
    );
    if state.config.run.print_snapshot {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}

/// Load the configuration at `path`, or the defaults when it does not
/// exist. The flag reports whether the file was found.
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), EngineError> {
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        Ok((SimulationConfig::default(), false))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_tracing(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level).map_err(|e| EngineError::Logging {
            message: format!("invalid log level {:?}: {e}", logging.level),
        })?,
    };
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
    Ok(())
}

/// Simulated seconds covered by one pass, as the substrate's time step.
#[allow(clippy::cast_possible_truncation)]
const fn integration_dt(step_sec: f64, sim_speed: f64) -> f32 {
    (step_sec * sim_speed) as f32
}

/// Log the `recorded` most recent chronicle entries, oldest first.
fn log_new_entries(chronicle: &Chronicle, recorded: u64) {
    let recorded = usize::try_from(recorded).unwrap_or(usize::MAX);
    let skip = chronicle.len().saturating_sub(recorded);
    for entry in chronicle.iter().skip(skip) {
        info!(
            at = entry.at,
            kind = ?entry.kind,
            cause = %entry.cause,
            consequence = %entry.consequence,
            "{} {}",
            entry.icon,
            entry.message
        );
    }
}
