//! The live institution lists and every mutation entry point.
//!
//! The registry owns totems, taboos, and rituals in creation order along
//! with the shared [`IdAllocator`]. Both the detector (emergent spawns) and
//! the presentation layer (manual placement, patches, presets) mutate it
//! through the methods here, which apply the same clamps either way.
//!
//! # Invariants
//!
//! - Radii are at least [`MIN_RADIUS`]; ritual periods and duty cycles are
//!   clamped into their valid ranges.
//! - A `NO_MIX` taboo always has a target type.
//! - Removing a totem leaves its rituals in place; they become orphaned and
//!   inert rather than failing.

use tracing::{debug, info};

use sociogenesis_types::{
    IdAllocator, InstitutionPreset, MIN_DUTY_CYCLE, MIN_PERIOD_SEC, MIN_RADIUS, Ritual, RitualId,
    RitualKind, RitualPatch, RitualSpec, Taboo, TabooId, TabooKind, TabooPatch, TabooSpec, Totem,
    TotemId, TotemKind, TotemPatch, TotemSpec, Vec2,
};
use sociogenesis_world::SimRng;

use crate::error::InstitutionError;
use crate::naming::totem_name;

fn safe_radius(r: f32) -> f32 {
    if r.is_finite() { r.max(MIN_RADIUS) } else { MIN_RADIUS }
}

fn safe_period(p: f32) -> f32 {
    if p.is_finite() { p.max(MIN_PERIOD_SEC) } else { MIN_PERIOD_SEC }
}

fn safe_duty(d: f32) -> f32 {
    if d.is_finite() { d.clamp(MIN_DUTY_CYCLE, 1.0) } else { 1.0 }
}

fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() { v } else { fallback }
}

/// Totems, taboos, and rituals currently in the world.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstitutionRegistry {
    totems: Vec<Totem>,
    taboos: Vec<Taboo>,
    rituals: Vec<Ritual>,
    ids: IdAllocator,
}

impl InstitutionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            ids: IdAllocator::new(),
            ..Self::default()
        }
    }

    /// Shared identifier allocator (also used for tribes and cases).
    pub const fn ids_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// Totems in creation order.
    pub fn totems(&self) -> &[Totem] {
        &self.totems
    }

    /// Mutable totems, for per-tick counters.
    pub fn totems_mut(&mut self) -> &mut [Totem] {
        &mut self.totems
    }

    /// Taboos in creation order.
    pub fn taboos(&self) -> &[Taboo] {
        &self.taboos
    }

    /// Mutable taboos, for per-tick counters.
    pub fn taboos_mut(&mut self) -> &mut [Taboo] {
        &mut self.taboos
    }

    /// Rituals in creation order, including orphaned ones.
    pub fn rituals(&self) -> &[Ritual] {
        &self.rituals
    }

    /// Mutable rituals, for per-tick counters.
    pub fn rituals_mut(&mut self) -> &mut [Ritual] {
        &mut self.rituals
    }

    /// Look up a totem.
    pub fn totem(&self, id: TotemId) -> Option<&Totem> {
        self.totems.iter().find(|t| t.id == id)
    }

    /// Look up a taboo.
    pub fn taboo(&self, id: TabooId) -> Option<&Taboo> {
        self.taboos.iter().find(|t| t.id == id)
    }

    /// Look up a ritual.
    pub fn ritual(&self, id: RitualId) -> Option<&Ritual> {
        self.rituals.iter().find(|r| r.id == id)
    }

    /// Rituals whose totem still exists.
    pub fn live_ritual_count(&self) -> usize {
        self.rituals
            .iter()
            .filter(|r| self.totem(r.totem_id).is_some())
            .count()
    }

    /// Whether any ritual is bound to `totem`.
    pub fn has_ritual(&self, totem: TotemId) -> bool {
        self.rituals.iter().any(|r| r.totem_id == totem)
    }

    /// Totem closest to `position`.
    pub fn nearest_totem(&self, position: Vec2) -> Option<&Totem> {
        self.totems
            .iter()
            .min_by(|a, b| a.position.distance(position).total_cmp(&b.position.distance(position)))
    }

    /// Taboo closest to `position`.
    pub fn nearest_taboo(&self, position: Vec2) -> Option<&Taboo> {
        self.taboos
            .iter()
            .min_by(|a, b| a.position.distance(position).total_cmp(&b.position.distance(position)))
    }

    /// Center and effective radius of every active, non-orphaned ritual at
    /// `now`, with the radius scaled by `radius_factor`.
    pub fn active_ritual_zones(&self, now: f64, radius_factor: f32) -> Vec<(Vec2, f32)> {
        self.rituals
            .iter()
            .filter(|r| r.is_active(now))
            .filter_map(|r| self.totem(r.totem_id))
            .map(|t| (t.position, t.radius * radius_factor))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Totems
    // -----------------------------------------------------------------------

    /// Place a totem manually. The name is generated when `spec.name` is `None`.
    pub fn place_totem(&mut self, spec: &TotemSpec, now: f64, rng: &mut SimRng) -> TotemId {
        let name = spec.name.clone().unwrap_or_else(|| totem_name(spec.kind, rng));
        let id = self.ids.totem();
        self.totems.push(Totem {
            id,
            kind: spec.kind,
            position: spec.position,
            radius: safe_radius(spec.radius),
            strength: finite_or(spec.strength, 1.0),
            pinned: true,
            born_at: now,
            name,
            emergent: false,
            affected_count: 0,
        });
        info!(totem = %id, kind = spec.kind.label(), "totem placed");
        id
    }

    /// Spawn an emergent totem with a generated name.
    pub fn spawn_totem(
        &mut self,
        kind: TotemKind,
        position: Vec2,
        radius: f32,
        strength: f32,
        now: f64,
        rng: &mut SimRng,
    ) -> TotemId {
        let name = totem_name(kind, rng);
        let id = self.ids.totem();
        self.totems.push(Totem {
            id,
            kind,
            position,
            radius: safe_radius(radius),
            strength: finite_or(strength, 1.0),
            pinned: false,
            born_at: now,
            name,
            emergent: true,
            affected_count: 0,
        });
        id
    }

    /// Remove a totem. Its rituals stay registered but become inert.
    ///
    /// # Errors
    ///
    /// Returns [`InstitutionError::UnknownTotem`] if no such totem exists.
    pub fn remove_totem(&mut self, id: TotemId) -> Result<Totem, InstitutionError> {
        let pos = self
            .totems
            .iter()
            .position(|t| t.id == id)
            .ok_or(InstitutionError::UnknownTotem(id))?;
        let removed = self.totems.remove(pos);
        debug!(totem = %id, orphaned = self.rituals.iter().filter(|r| r.totem_id == id).count(), "totem removed");
        Ok(removed)
    }

    /// Apply a partial update to a totem.
    ///
    /// # Errors
    ///
    /// Returns [`InstitutionError::UnknownTotem`] if no such totem exists.
    pub fn update_totem(&mut self, id: TotemId, patch: &TotemPatch) -> Result<(), InstitutionError> {
        let totem = self
            .totems
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(InstitutionError::UnknownTotem(id))?;
        if let Some(kind) = patch.kind {
            totem.kind = kind;
        }
        if let Some(position) = patch.position {
            totem.position = position;
        }
        if let Some(radius) = patch.radius {
            totem.radius = safe_radius(radius);
        }
        if let Some(strength) = patch.strength {
            totem.strength = finite_or(strength, totem.strength);
        }
        if let Some(name) = &patch.name {
            totem.name.clone_from(name);
        }
        if let Some(pinned) = patch.pinned {
            totem.pinned = pinned;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Taboos
    // -----------------------------------------------------------------------

    /// Place a taboo manually.
    ///
    /// # Errors
    ///
    /// Returns [`InstitutionError::MissingTargetType`] for a `NO_MIX` taboo
    /// without a target type.
    pub fn place_taboo(&mut self, spec: &TabooSpec, now: f64) -> Result<TabooId, InstitutionError> {
        let id = self.insert_taboo(spec, now, false)?;
        info!(taboo = %id, kind = spec.kind.label(), "taboo placed");
        Ok(id)
    }

    /// Spawn an emergent taboo.
    ///
    /// # Errors
    ///
    /// Returns [`InstitutionError::MissingTargetType`] for a `NO_MIX` taboo
    /// without a target type.
    pub fn spawn_taboo(&mut self, spec: &TabooSpec, now: f64) -> Result<TabooId, InstitutionError> {
        self.insert_taboo(spec, now, true)
    }

    fn insert_taboo(
        &mut self,
        spec: &TabooSpec,
        now: f64,
        emergent: bool,
    ) -> Result<TabooId, InstitutionError> {
        if spec.kind == TabooKind::NoMix && spec.target_type.is_none() {
            return Err(InstitutionError::MissingTargetType);
        }
        let id = self.ids.taboo();
        self.taboos.push(Taboo {
            id,
            kind: spec.kind,
            position: spec.position,
            radius: safe_radius(spec.radius),
            intensity: finite_or(spec.intensity, 1.0),
            target_type: spec.target_type,
            born_at: now,
            emergent,
            affected_count: 0,
        });
        Ok(id)
    }

    /// Remove a taboo. Open cases against it are skipped by justice.
    ///
    /// # Errors
    ///
    /// Returns [`InstitutionError::UnknownTaboo`] if no such taboo exists.
    pub fn remove_taboo(&mut self, id: TabooId) -> Result<Taboo, InstitutionError> {
        let pos = self
            .taboos
            .iter()
            .position(|t| t.id == id)
            .ok_or(InstitutionError::UnknownTaboo(id))?;
        Ok(self.taboos.remove(pos))
    }

    /// Apply a partial update to a taboo.
    ///
    /// # Errors
    ///
    /// Returns [`InstitutionError::UnknownTaboo`] if no such taboo exists,
    /// or [`InstitutionError::MissingTargetType`] if the result would be a
    /// `NO_MIX` taboo without a target. The taboo is unchanged on error.
    pub fn update_taboo(&mut self, id: TabooId, patch: &TabooPatch) -> Result<(), InstitutionError> {
        let taboo = self
            .taboos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(InstitutionError::UnknownTaboo(id))?;
        let kind = patch.kind.unwrap_or(taboo.kind);
        let target_type = patch.target_type.unwrap_or(taboo.target_type);
        if kind == TabooKind::NoMix && target_type.is_none() {
            return Err(InstitutionError::MissingTargetType);
        }
        taboo.kind = kind;
        taboo.target_type = target_type;
        if let Some(position) = patch.position {
            taboo.position = position;
        }
        if let Some(radius) = patch.radius {
            taboo.radius = safe_radius(radius);
        }
        if let Some(intensity) = patch.intensity {
            taboo.intensity = finite_or(intensity, taboo.intensity);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rituals
    // -----------------------------------------------------------------------

    /// Place a ritual on an existing totem.
    ///
    /// # Errors
    ///
    /// Returns [`InstitutionError::UnknownTotem`] if the totem does not exist.
    pub fn place_ritual(
        &mut self,
        totem_id: TotemId,
        spec: &RitualSpec,
        now: f64,
    ) -> Result<RitualId, InstitutionError> {
        if self.totem(totem_id).is_none() {
            return Err(InstitutionError::UnknownTotem(totem_id));
        }
        let id = self.insert_ritual(totem_id, spec, now, false);
        info!(ritual = %id, totem = %totem_id, kind = spec.kind.label(), "ritual placed");
        Ok(id)
    }

    /// Spawn an emergent ritual on `totem_id`.
    pub fn spawn_ritual(
        &mut self,
        totem_id: TotemId,
        kind: RitualKind,
        period_sec: f32,
        duty_cycle: f32,
        now: f64,
    ) -> RitualId {
        let spec = RitualSpec {
            kind,
            period_sec,
            duty_cycle,
            intensity: 1.0,
        };
        self.insert_ritual(totem_id, &spec, now, true)
    }

    fn insert_ritual(&mut self, totem_id: TotemId, spec: &RitualSpec, now: f64, emergent: bool) -> RitualId {
        let id = self.ids.ritual();
        self.rituals.push(Ritual {
            id,
            kind: spec.kind,
            totem_id,
            period_sec: safe_period(spec.period_sec),
            duty_cycle: safe_duty(spec.duty_cycle),
            intensity: finite_or(spec.intensity, 1.0),
            born_at: now,
            emergent,
            affected_count: 0,
        });
        id
    }

    /// Remove a ritual.
    ///
    /// # Errors
    ///
    /// Returns [`InstitutionError::UnknownRitual`] if no such ritual exists.
    pub fn remove_ritual(&mut self, id: RitualId) -> Result<Ritual, InstitutionError> {
        let pos = self
            .rituals
            .iter()
            .position(|r| r.id == id)
            .ok_or(InstitutionError::UnknownRitual(id))?;
        Ok(self.rituals.remove(pos))
    }

    /// Apply a partial update to a ritual.
    ///
    /// # Errors
    ///
    /// Returns [`InstitutionError::UnknownRitual`] if no such ritual exists.
    pub fn update_ritual(&mut self, id: RitualId, patch: &RitualPatch) -> Result<(), InstitutionError> {
        let ritual = self
            .rituals
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(InstitutionError::UnknownRitual(id))?;
        if let Some(kind) = patch.kind {
            ritual.kind = kind;
        }
        if let Some(period) = patch.period_sec {
            ritual.period_sec = safe_period(period);
        }
        if let Some(duty) = patch.duty_cycle {
            ritual.duty_cycle = safe_duty(duty);
        }
        if let Some(intensity) = patch.intensity {
            ritual.intensity = finite_or(intensity, ritual.intensity);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bulk
    // -----------------------------------------------------------------------

    /// Drop every institution. Identifiers keep counting upward.
    pub fn clear(&mut self) {
        self.totems.clear();
        self.taboos.clear();
        self.rituals.clear();
    }

    /// Replace every institution with the contents of `preset`.
    ///
    /// The preset is validated first; on error the registry is unchanged.
    /// The agent layout is not handled here.
    ///
    /// # Errors
    ///
    /// Returns [`InstitutionError::MissingTargetType`] for a `NO_MIX` taboo
    /// without a target, or [`InstitutionError::PresetTotemIndex`] for a
    /// ritual bound to a totem index outside the preset.
    pub fn load_preset(
        &mut self,
        preset: &InstitutionPreset,
        now: f64,
        rng: &mut SimRng,
    ) -> Result<(), InstitutionError> {
        if preset
            .taboos
            .iter()
            .any(|t| t.kind == TabooKind::NoMix && t.target_type.is_none())
        {
            return Err(InstitutionError::MissingTargetType);
        }
        for ritual in &preset.rituals {
            let in_range = usize::try_from(ritual.totem_index).is_ok_and(|i| i < preset.totems.len());
            if !in_range {
                return Err(InstitutionError::PresetTotemIndex {
                    index: ritual.totem_index,
                    count: preset.totems.len(),
                });
            }
        }

        self.clear();
        let totem_ids: Vec<TotemId> = preset
            .totems
            .iter()
            .map(|spec| self.place_totem(spec, now, rng))
            .collect();
        for spec in &preset.taboos {
            self.insert_taboo(spec, now, false)?;
        }
        for ritual in &preset.rituals {
            let totem = usize::try_from(ritual.totem_index)
                .ok()
                .and_then(|i| totem_ids.get(i).copied());
            if let Some(totem) = totem {
                self.insert_ritual(totem, &ritual.spec, now, false);
            }
        }
        info!(
            preset = %preset.name,
            totems = self.totems.len(),
            taboos = self.taboos.len(),
            rituals = self.rituals.len(),
            "preset loaded"
        );
        Ok(())
    }
}
