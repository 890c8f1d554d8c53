//! Control surface for the presentation layer.
//!
//! Everything a UI or driver does between passes goes through these
//! methods on [`SociogenesisState`]: read-only snapshots, institution
//! placement and editing, runtime tunables, and preset loading. Each
//! setter re-applies the same clamps as configuration loading.

use rand::Rng;
use tracing::info;

use sociogenesis_types::{
    AgentSeed, ChronicleKind, EngineSnapshot, InstitutionPreset, JusticeMode, MemeStats,
    ResourceMode, Ritual, RitualId, RitualPatch, RitualSpec, Taboo, TabooId, TabooPatch,
    TabooSpec, Totem, TotemId, TotemPatch, TotemSpec, Vec2,
};
use sociogenesis_institutions::{
    CultureConfig, DetectorConfig, ForceConfig, JusticeConfig, LeaderConfig, PrestigeConfig,
    RoleConfig,
};
use sociogenesis_world::rng::point_in_square;
use sociogenesis_world::{EconomyConfig, WORLD_EXTENT, WorldError};

use crate::config::CadenceConfig;
use crate::error::SimError;
use crate::tick::SociogenesisState;

impl SociogenesisState {
    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Read-only view of the whole engine.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            time: self.clock.time(),
            tick: self.clock.tick(),
            agent_count: u32::try_from(self.substrate.len()).unwrap_or(u32::MAX),
            totems: self.registry.totems().to_vec(),
            taboos: self.registry.taboos().to_vec(),
            rituals: self.registry.rituals().to_vec(),
            tribes: self.tribes.tribes().to_vec(),
            cases: self.justice.cases().to_vec(),
            chronicle: self.chronicle.to_vec(),
            meme_stats: self.meme_stats(),
            economy: self.economy.metrics().clone(),
            leaders: self.leaders.clone(),
        }
    }

    /// Meme distribution over the current population.
    pub fn meme_stats(&self) -> MemeStats {
        self.culture.meme_stats(&self.culture_state, self.substrate.len())
    }

    /// Live resource value at `position`.
    pub fn resource_at(&self, position: Vec2) -> f32 {
        self.economy.resource_at(position)
    }

    /// Claim owner and strength at `position`.
    pub fn claim_at(&self, position: Vec2) -> (Option<i32>, f32) {
        self.economy.claim_at(position)
    }

    // -----------------------------------------------------------------------
    // Population
    // -----------------------------------------------------------------------

    /// Append `count` agents at uniform positions with small random
    /// velocities. Types are handed out round-robin over
    /// `world.agent_types`. Returns the new population size.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::World`] once the substrate is full.
    pub fn scatter_population(&mut self, count: u32) -> Result<usize, SimError> {
        let types = self.config.world.agent_types.max(1);
        let speed = self.config.world.initial_speed;
        for k in 0..count {
            let position = point_in_square(&mut self.rng, WORLD_EXTENT);
            let velocity = if speed > 0.0 {
                Vec2::new(
                    self.rng.random_range(-speed..speed),
                    self.rng.random_range(-speed..speed),
                )
            } else {
                Vec2::ZERO
            };
            self.substrate.push(AgentSeed {
                position,
                velocity,
                agent_type: k.checked_rem(types).unwrap_or(0),
                energy: 1.0,
            })?;
        }
        info!(added = count, population = self.substrate.len(), "population scattered");
        Ok(self.substrate.len())
    }

    // -----------------------------------------------------------------------
    // Institutions
    // -----------------------------------------------------------------------

    /// Place a pinned totem.
    pub fn place_totem(&mut self, spec: &TotemSpec) -> TotemId {
        let now = self.clock.time();
        let id = self.registry.place_totem(spec, now, &mut self.rng);
        let name = self.registry.totem(id).map(|t| t.name.clone()).unwrap_or_default();
        self.chronicle.record(
            now,
            ChronicleKind::InstitutionPlaced,
            format!("{} totem \"{name}\" placed", spec.kind.label()),
            "placed by hand",
            format!("agents within {:.2} feel its pull", spec.radius),
        );
        id
    }

    /// Remove a totem. Its rituals stay behind, orphaned and inert.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Institution`] if no totem has this id.
    pub fn remove_totem(&mut self, id: TotemId) -> Result<Totem, SimError> {
        let totem = self.registry.remove_totem(id)?;
        self.chronicle.record(
            self.clock.time(),
            ChronicleKind::InstitutionRemoved,
            format!("Totem \"{}\" removed", totem.name),
            "removed by hand",
            "its rituals fall silent",
        );
        Ok(totem)
    }

    /// Patch a totem in place.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Institution`] if no totem has this id.
    pub fn update_totem(&mut self, id: TotemId, patch: &TotemPatch) -> Result<(), SimError> {
        Ok(self.registry.update_totem(id, patch)?)
    }

    /// Place a taboo.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Institution`] for a `NO_MIX` taboo without a
    /// target type.
    pub fn place_taboo(&mut self, spec: &TabooSpec) -> Result<TabooId, SimError> {
        let now = self.clock.time();
        let id = self.registry.place_taboo(spec, now)?;
        self.chronicle.record(
            now,
            ChronicleKind::InstitutionPlaced,
            format!("{} taboo placed", spec.kind.label()),
            "placed by hand",
            "violations will be judged",
        );
        Ok(id)
    }

    /// Remove a taboo. Its cases are kept but no longer judged.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Institution`] if no taboo has this id.
    pub fn remove_taboo(&mut self, id: TabooId) -> Result<Taboo, SimError> {
        let taboo = self.registry.remove_taboo(id)?;
        self.chronicle.record(
            self.clock.time(),
            ChronicleKind::InstitutionRemoved,
            format!("{} taboo removed", taboo.kind.label()),
            "removed by hand",
            "the zone is open again",
        );
        Ok(taboo)
    }

    /// Patch a taboo in place.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Institution`] if no taboo has this id or the
    /// patch leaves a `NO_MIX` taboo without a target type.
    pub fn update_taboo(&mut self, id: TabooId, patch: &TabooPatch) -> Result<(), SimError> {
        Ok(self.registry.update_taboo(id, patch)?)
    }

    /// Bind a ritual to a totem.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Institution`] if no totem has this id.
    pub fn place_ritual(&mut self, totem: TotemId, spec: &RitualSpec) -> Result<RitualId, SimError> {
        let now = self.clock.time();
        let id = self.registry.place_ritual(totem, spec, now)?;
        self.chronicle.record(
            now,
            ChronicleKind::InstitutionPlaced,
            format!("{} ritual placed at {totem}", spec.kind.label()),
            "placed by hand",
            format!("active {:.0}% of every {:.1}s", spec.duty_cycle * 100.0, spec.period_sec),
        );
        Ok(id)
    }

    /// Remove a ritual.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Institution`] if no ritual has this id.
    pub fn remove_ritual(&mut self, id: RitualId) -> Result<Ritual, SimError> {
        let ritual = self.registry.remove_ritual(id)?;
        self.chronicle.record(
            self.clock.time(),
            ChronicleKind::InstitutionRemoved,
            format!("{} ritual removed", ritual.kind.label()),
            "removed by hand",
            "the gathering disperses",
        );
        Ok(ritual)
    }

    /// Patch a ritual in place.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Institution`] if no ritual has this id.
    pub fn update_ritual(&mut self, id: RitualId, patch: &RitualPatch) -> Result<(), SimError> {
        Ok(self.registry.update_ritual(id, patch)?)
    }

    /// Replace every institution and all culture state with `preset`. A
    /// non-empty agent layout also replaces the population.
    ///
    /// Nothing changes when the preset is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::World`] if the layout exceeds substrate capacity,
    /// or [`SimError::Institution`] if an institution definition is invalid.
    pub fn load_preset(&mut self, preset: &InstitutionPreset) -> Result<(), SimError> {
        let capacity = self.substrate.capacity();
        if preset.agents.len() > capacity {
            return Err(WorldError::CapacityExceeded { capacity }.into());
        }
        let now = self.clock.time();
        self.registry.load_preset(preset, now, &mut self.rng)?;

        if !preset.agents.is_empty() {
            self.substrate.clear();
            for seed in &preset.agents {
                self.substrate.push(*seed)?;
            }
        }
        self.culture_state.reset(capacity);
        self.roles.reset(capacity);
        self.justice.reset();
        self.culture.reset();
        self.prestige.reset();
        self.detector.reset();
        self.tribes.reset();
        self.leaders.clear();

        self.chronicle.record(
            now,
            ChronicleKind::PresetLoaded,
            format!("Preset \"{}\" loaded", preset.name),
            format!(
                "{} totems, {} taboos, {} rituals",
                preset.totems.len(),
                preset.taboos.len(),
                preset.rituals.len()
            ),
            if preset.agents.is_empty() {
                "the population remains".to_owned()
            } else {
                format!("{} agents laid out anew", preset.agents.len())
            },
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tunables
    // -----------------------------------------------------------------------

    /// Change the sim-speed multiplier.
    pub fn set_sim_speed(&mut self, sim_speed: f64) {
        self.clock.set_sim_speed(sim_speed);
        self.config.cadence.sim_speed = self.clock.sim_speed();
    }

    /// Change every subsystem cadence.
    pub fn set_cadence(&mut self, cadence: &CadenceConfig) {
        let clean = cadence.sanitized();
        self.cadences.reconfigure(&clean);
        self.clock.set_sim_speed(clean.sim_speed);
        self.config.cadence = clean;
    }

    /// Change the justice resolution policy.
    pub fn set_justice_mode(&mut self, mode: JusticeMode) {
        self.justice.set_mode(mode);
        self.config.justice.mode = mode;
    }

    /// Change the number of memes, folding existing ids into range.
    pub fn set_meme_count(&mut self, meme_count: u32) {
        self.culture.set_meme_count(&mut self.culture_state, meme_count);
        self.config.culture.meme_count = self.culture.config().meme_count;
    }

    /// Change the conversion probability multiplier.
    pub fn set_influence_gain(&mut self, gain: f32) {
        self.culture.set_influence_gain(gain);
        self.config.culture.influence_gain = self.culture.config().influence_gain;
    }

    /// Switch the economy's regeneration mode.
    pub fn set_economy_mode(&mut self, mode: ResourceMode) {
        self.economy.set_mode(mode);
        self.config.economy.mode = mode;
    }

    /// Enable or disable transient roles.
    pub const fn set_roles_enabled(&mut self, enabled: bool) {
        self.config.roles.enabled = enabled;
    }

    /// Change the per-axis force clamp shared by every force source.
    pub fn set_force_clamp(&mut self, clamp: f32) {
        self.config.forces.clamp = clamp;
        self.config.forces = self.config.forces.sanitized();
    }

    /// Replace every force gain, including the clamp.
    pub fn set_force_config(&mut self, config: &ForceConfig) {
        self.config.forces = config.sanitized();
    }

    /// Replace the transient-role parameters.
    pub fn set_role_config(&mut self, config: &RoleConfig) {
        self.config.roles = config.sanitized();
    }

    /// Replace the justice parameters, mode included.
    pub fn set_justice_config(&mut self, config: &JusticeConfig) {
        self.justice.set_config(config);
        self.config.justice = self.justice.config().clone();
    }

    /// Replace the contagion parameters, folding meme ids into the new
    /// meme count.
    pub fn set_culture_config(&mut self, config: &CultureConfig) {
        self.culture.set_config(&mut self.culture_state, config);
        self.config.culture = self.culture.config().clone();
    }

    /// Replace the prestige parameters.
    pub fn set_prestige_config(&mut self, config: &PrestigeConfig) {
        self.prestige.set_config(config);
        self.config.prestige = self.prestige.config().clone();
    }

    /// Replace the leader-detection parameters.
    pub fn set_leader_config(&mut self, config: &LeaderConfig) {
        self.leader_detector.set_config(config);
        self.config.leaders = self.leader_detector.config().clone();
    }

    /// Replace the economy rates and thresholds. The grid resolution stays
    /// as built.
    pub fn set_economy_config(&mut self, config: &EconomyConfig) {
        self.economy.set_config(config);
        self.config.economy = self.economy.config().clone();
    }

    /// Replace the detector thresholds.
    pub fn set_detector_config(&mut self, config: &DetectorConfig) {
        self.detector.set_config(config);
        self.config.detector = self.detector.config().clone();
    }

    /// Change how many chronicle entries are retained.
    pub fn set_chronicle_capacity(&mut self, capacity: u32) {
        let capacity = capacity.max(1);
        self.chronicle
            .set_capacity(usize::try_from(capacity).unwrap_or(usize::MAX));
        self.config.chronicle.capacity = capacity;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sociogenesis_types::{PresetRitual, RitualKind, TabooKind, TotemKind};

    use crate::config::SimulationConfig;

    use super::*;

    fn small_state() -> SociogenesisState {
        let mut config = SimulationConfig::default();
        config.world.capacity = 64;
        SociogenesisState::new(&config).unwrap()
    }

    fn totem_spec() -> TotemSpec {
        TotemSpec {
            kind: TotemKind::Bond,
            position: Vec2::new(0.2, 0.2),
            radius: 0.2,
            strength: 1.0,
            name: None,
        }
    }

    #[test]
    fn scatter_fills_round_robin_types() {
        let mut state = small_state();
        assert_eq!(state.scatter_population(8).unwrap(), 8);
        assert_eq!(state.substrate.agent_type(5), Some(1));
        assert!(state.scatter_population(100).is_err());
    }

    #[test]
    fn place_and_remove_record_chronicle_entries() {
        let mut state = small_state();
        let id = state.place_totem(&totem_spec());
        assert_eq!(state.snapshot().totems.len(), 1);
        state.remove_totem(id).unwrap();
        assert!(state.remove_totem(id).is_err());
        assert_eq!(state.chronicle.count_kind(ChronicleKind::InstitutionPlaced), 1);
        assert_eq!(state.chronicle.count_kind(ChronicleKind::InstitutionRemoved), 1);
    }

    #[test]
    fn no_mix_without_target_is_rejected() {
        let mut state = small_state();
        let spec = TabooSpec {
            kind: TabooKind::NoMix,
            position: Vec2::ZERO,
            radius: 0.1,
            intensity: 1.0,
            target_type: None,
        };
        assert!(matches!(state.place_taboo(&spec), Err(SimError::Institution { .. })));
        assert!(state.registry.taboos().is_empty());
    }

    #[test]
    fn preset_replaces_institutions_and_agents() {
        let mut state = small_state();
        state.scatter_population(10).unwrap();
        state.place_totem(&totem_spec());
        let preset = InstitutionPreset {
            name: "Village".to_owned(),
            totems: vec![totem_spec(), totem_spec()],
            rituals: vec![PresetRitual {
                totem_index: 1,
                spec: RitualSpec {
                    kind: RitualKind::Gather,
                    period_sec: 8.0,
                    duty_cycle: 0.5,
                    intensity: 1.0,
                },
            }],
            agents: vec![
                AgentSeed {
                    position: Vec2::ZERO,
                    velocity: Vec2::ZERO,
                    agent_type: 2,
                    energy: 0.5,
                };
                3
            ],
            ..InstitutionPreset::default()
        };
        state.load_preset(&preset).unwrap();
        let snap = state.snapshot();
        assert_eq!(snap.totems.len(), 2);
        assert_eq!(snap.rituals.len(), 1);
        assert_eq!(snap.agent_count, 3);
        assert_eq!(state.chronicle.count_kind(ChronicleKind::PresetLoaded), 1);
    }

    #[test]
    fn oversized_preset_changes_nothing() {
        let mut state = small_state();
        state.place_totem(&totem_spec());
        let preset = InstitutionPreset {
            name: "Crowd".to_owned(),
            agents: vec![
                AgentSeed {
                    position: Vec2::ZERO,
                    velocity: Vec2::ZERO,
                    agent_type: 0,
                    energy: 1.0,
                };
                65
            ],
            ..InstitutionPreset::default()
        };
        assert!(state.load_preset(&preset).is_err());
        assert_eq!(state.registry.totems().len(), 1);
    }

    #[test]
    fn setters_clamp_and_sync_config() {
        let mut state = small_state();
        state.set_meme_count(0);
        assert_eq!(state.config.culture.meme_count, 1);
        state.set_sim_speed(-5.0);
        assert!(state.clock.sim_speed().abs() < f64::EPSILON);
        state.set_justice_mode(JusticeMode::Retributive);
        assert_eq!(state.justice.config().mode, JusticeMode::Retributive);
        state.set_force_clamp(-1.0);
        assert!(state.config.forces.clamp >= 0.0);
        state.set_chronicle_capacity(0);
        assert_eq!(state.chronicle.capacity(), 1);
    }

    #[test]
    fn subsystem_configs_replace_and_clamp() {
        let mut state = small_state();
        state.set_economy_config(&EconomyConfig {
            resolution: 8,
            metabolism: -1.0,
            harvest_rate: 0.07,
            ..EconomyConfig::default()
        });
        assert_eq!(state.economy.resolution(), 32);
        assert_eq!(state.config.economy.resolution, 32);
        assert!(state.economy.config().metabolism.abs() < f32::EPSILON);
        assert!((state.config.economy.harvest_rate - 0.07).abs() < f32::EPSILON);

        state.set_justice_config(&JusticeConfig {
            mode: JusticeMode::Restorative,
            cooldown_sec: -4.0,
            ..JusticeConfig::default()
        });
        assert_eq!(state.justice.config().mode, JusticeMode::Restorative);
        assert!(state.config.justice.cooldown_sec.abs() < f64::EPSILON);

        state.culture_state.set_meme(0, 3, 1.0);
        state.set_culture_config(&CultureConfig {
            meme_count: 2,
            ..CultureConfig::default()
        });
        assert_eq!(state.culture_state.meme(0), Some(1));
        assert_eq!(state.config.culture.meme_count, 2);

        state.set_prestige_config(&PrestigeConfig {
            decay_rate: -1.0,
            ..PrestigeConfig::default()
        });
        assert!(state.prestige.config().decay_rate.abs() < f32::EPSILON);

        state.set_leader_config(&LeaderConfig {
            neighbor_radius: 5.0,
            ..LeaderConfig::default()
        });
        assert!((state.config.leaders.neighbor_radius - 0.25).abs() < 1e-6);

        state.set_force_config(&ForceConfig {
            bond_gain: 0.05,
            clamp: -2.0,
            ..ForceConfig::default()
        });
        assert!((state.config.forces.bond_gain - 0.05).abs() < f32::EPSILON);
        assert!(state.config.forces.clamp.abs() < f32::EPSILON);

        state.set_role_config(&RoleConfig {
            assign_chance: 3.0,
            ..RoleConfig::default()
        });
        assert!((state.config.roles.assign_chance - 1.0).abs() < f32::EPSILON);
    }
}
