//! Configuration loading and typed config structures for the Sociogenesis
//! engine.
//!
//! The canonical configuration lives in `sociogenesis-config.yaml` at the
//! project root. Every section is optional; missing sections and fields take
//! the defaults below. Subsystem sections reuse the config structs owned by
//! `sociogenesis-institutions` and `sociogenesis-world`.
//!
//! Loading never rejects out-of-range numbers. Call
//! [`SimulationConfig::sanitized`] to clamp them to safe minimums; each
//! clamp is reported with a `warn!`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use sociogenesis_institutions::{
    CultureConfig, DetectorConfig, ForceConfig, JusticeConfig, LeaderConfig, PrestigeConfig,
    RoleConfig,
};
use sociogenesis_types::DEFAULT_CHRONICLE_CAPACITY;
use sociogenesis_world::EconomyConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `sociogenesis-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed, population, and substrate settings.
    #[serde(default)]
    pub world: WorldConfig,

    /// Subsystem cadences and the sim-speed multiplier.
    #[serde(default)]
    pub cadence: CadenceConfig,

    /// Institution detector thresholds.
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Totem and ritual force gains.
    #[serde(default)]
    pub forces: ForceConfig,

    /// Transient role behavior.
    #[serde(default)]
    pub roles: RoleConfig,

    /// Violations, cases, and judgment.
    #[serde(default)]
    pub justice: JusticeConfig,

    /// Meme contagion.
    #[serde(default)]
    pub culture: CultureConfig,

    /// Prestige decay and rewards.
    #[serde(default)]
    pub prestige: PrestigeConfig,

    /// Leader detection.
    #[serde(default)]
    pub leaders: LeaderConfig,

    /// Resource field, harvest, and territory.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Chronicle retention.
    #[serde(default)]
    pub chronicle: ChronicleConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Headless run parameters.
    #[serde(default)]
    pub run: RunConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string. An empty string yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Copy with every section's out-of-range values clamped.
    pub fn sanitized(&self) -> Self {
        Self {
            world: self.world.sanitized(),
            cadence: self.cadence.sanitized(),
            detector: self.detector.sanitized(),
            forces: self.forces.sanitized(),
            roles: self.roles.sanitized(),
            justice: self.justice.sanitized(),
            culture: self.culture.sanitized(),
            prestige: self.prestige.sanitized(),
            leaders: self.leaders.sanitized(),
            economy: self.economy.sanitized(),
            chronicle: self.chronicle.sanitized(),
            logging: self.logging.clone(),
            run: self.run.sanitized(),
        }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Seed and population configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Seed for the single simulation generator.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Maximum agents the substrate can hold.
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Agents scattered at startup by the headless driver.
    #[serde(default = "default_initial_agents")]
    pub initial_agents: u32,

    /// Distinct agent type tags handed out round-robin.
    #[serde(default = "default_agent_types")]
    pub agent_types: u32,

    /// Largest initial speed per axis.
    #[serde(default = "default_initial_speed")]
    pub initial_speed: f32,

    /// Fraction of velocity lost per integration step.
    #[serde(default = "default_damping")]
    pub damping: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            capacity: default_capacity(),
            initial_agents: default_initial_agents(),
            agent_types: default_agent_types(),
            initial_speed: default_initial_speed(),
            damping: default_damping(),
        }
    }
}

impl WorldConfig {
    /// Copy with out-of-range values clamped.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        if c.capacity == 0 {
            warn!("world capacity clamped to 1");
            c.capacity = 1;
        }
        if c.initial_agents > c.capacity {
            warn!(
                initial_agents = c.initial_agents,
                capacity = c.capacity,
                "initial agents clamped to capacity"
            );
            c.initial_agents = c.capacity;
        }
        if c.agent_types == 0 {
            warn!("world agent_types clamped to 1");
            c.agent_types = 1;
        }
        if !c.initial_speed.is_finite() || c.initial_speed < 0.0 {
            warn!(value = c.initial_speed, "world initial_speed clamped to 0");
            c.initial_speed = 0.0;
        }
        if !c.damping.is_finite() || !(0.0..=1.0).contains(&c.damping) {
            let fixed = if c.damping.is_finite() { c.damping.clamp(0.0, 1.0) } else { 0.0 };
            warn!(value = c.damping, fixed, "world damping clamped into [0, 1]");
            c.damping = fixed;
        }
        c
    }
}

// ---------------------------------------------------------------------------
// Cadence
// ---------------------------------------------------------------------------

/// Shortest interval any cadence may use, in simulated seconds.
pub const MIN_CADENCE_SEC: f64 = 0.01;

/// Largest accepted sim-speed multiplier.
pub const MAX_SIM_SPEED: f64 = 16.0;

/// How often each subsystem runs, in simulated seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Institution detection and tribe rebuild.
    #[serde(default = "default_detection_sec")]
    pub detection_sec: f64,

    /// Totem, ritual, and role forces.
    #[serde(default = "default_force_sec")]
    pub force_sec: f64,

    /// Justice pass.
    #[serde(default = "default_justice_sec")]
    pub justice_sec: f64,

    /// Culture, prestige, leaders, and economy.
    #[serde(default = "default_macro_tick_sec")]
    pub macro_tick_sec: f64,

    /// Multiplier from step time to simulated time.
    #[serde(default = "default_sim_speed")]
    pub sim_speed: f64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            detection_sec: default_detection_sec(),
            force_sec: default_force_sec(),
            justice_sec: default_justice_sec(),
            macro_tick_sec: default_macro_tick_sec(),
            sim_speed: default_sim_speed(),
        }
    }
}

/// Clamp a cadence interval to [`MIN_CADENCE_SEC`].
pub(crate) fn clamp_interval(name: &str, value: f64) -> f64 {
    if value.is_nan() || value < MIN_CADENCE_SEC {
        warn!(name, value, min = MIN_CADENCE_SEC, "cadence clamped to minimum");
        MIN_CADENCE_SEC
    } else {
        value
    }
}

/// Clamp a sim-speed multiplier into `[0, MAX_SIM_SPEED]`.
pub(crate) fn clamp_sim_speed(value: f64) -> f64 {
    if value.is_nan() || !(0.0..=MAX_SIM_SPEED).contains(&value) {
        let fixed = if value.is_nan() { 1.0 } else { value.clamp(0.0, MAX_SIM_SPEED) };
        warn!(value, fixed, "sim_speed clamped");
        fixed
    } else {
        value
    }
}

impl CadenceConfig {
    /// Copy with out-of-range values clamped.
    pub fn sanitized(&self) -> Self {
        Self {
            detection_sec: clamp_interval("detection_sec", self.detection_sec),
            force_sec: clamp_interval("force_sec", self.force_sec),
            justice_sec: clamp_interval("justice_sec", self.justice_sec),
            macro_tick_sec: clamp_interval("macro_tick_sec", self.macro_tick_sec),
            sim_speed: clamp_sim_speed(self.sim_speed),
        }
    }
}

// ---------------------------------------------------------------------------
// Chronicle, logging, run
// ---------------------------------------------------------------------------

/// Chronicle retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronicleConfig {
    /// Entries kept before the oldest are trimmed.
    #[serde(default = "default_chronicle_capacity")]
    pub capacity: u32,
}

impl Default for ChronicleConfig {
    fn default() -> Self {
        Self {
            capacity: default_chronicle_capacity(),
        }
    }
}

impl ChronicleConfig {
    /// Copy with a capacity of at least one.
    pub fn sanitized(&self) -> Self {
        if self.capacity == 0 {
            warn!("chronicle capacity clamped to 1");
            return Self { capacity: 1 };
        }
        self.clone()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit log lines as JSON instead of human-readable text.
    #[serde(default)]
    pub json: bool,

    /// Log each new chronicle entry as it is recorded.
    #[serde(default = "default_true")]
    pub chronicle_to_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            chronicle_to_log: true,
        }
    }
}

/// Headless run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Orchestrator passes to run.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Step time per pass, in seconds before the sim-speed multiplier.
    #[serde(default = "default_step_sec")]
    pub step_sec: f64,

    /// Print the final snapshot as JSON.
    #[serde(default = "default_true")]
    pub print_snapshot: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            step_sec: default_step_sec(),
            print_snapshot: true,
        }
    }
}

impl RunConfig {
    /// Copy with a positive step.
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        c.step_sec = clamp_interval("step_sec", c.step_sec);
        c
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Sociogenesis".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_capacity() -> u32 {
    2_000
}

const fn default_initial_agents() -> u32 {
    600
}

const fn default_agent_types() -> u32 {
    4
}

const fn default_initial_speed() -> f32 {
    0.02
}

const fn default_damping() -> f32 {
    0.02
}

const fn default_detection_sec() -> f64 {
    20.0
}

const fn default_force_sec() -> f64 {
    2.0
}

const fn default_justice_sec() -> f64 {
    2.0
}

const fn default_macro_tick_sec() -> f64 {
    1.0
}

const fn default_sim_speed() -> f64 {
    1.0
}

#[allow(clippy::cast_possible_truncation)]
const fn default_chronicle_capacity() -> u32 {
    DEFAULT_CHRONICLE_CAPACITY as u32
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_ticks() -> u64 {
    1_200
}

const fn default_step_sec() -> f64 {
    0.1
}

const fn default_true() -> bool {
    true
}
