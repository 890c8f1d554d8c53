//! Struct-of-arrays agent substrate.
//!
//! Positions, velocities, type tags, and energy live in parallel contiguous
//! buffers sized to a fixed capacity. Agents are addressed by index in
//! `[0, len)`; indices are only stable within one orchestrator pass. The
//! buffers are reallocated only by an explicit [`AgentSubstrate::reset`].
//!
//! The engine reads positions and types, and mutates velocities and energy
//! in place. Motion integration belongs to the physics collaborator;
//! [`AgentSubstrate::integrate`] is a minimal stand-in used by the headless
//! binary and tests.

use sociogenesis_types::{AgentSeed, Vec2};

use crate::error::WorldError;

/// Half-width of the square world domain.
pub const WORLD_EXTENT: f32 = 1.0;

/// Copy of one agent's state at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentView {
    /// Index within the current pass.
    pub index: usize,
    /// Position in `[-1, 1]²`.
    pub position: Vec2,
    /// Velocity.
    pub velocity: Vec2,
    /// Integer type tag.
    pub agent_type: u32,
    /// Energy in `[0, 1]`.
    pub energy: f32,
}

/// Fixed-capacity parallel-array agent storage.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSubstrate {
    capacity: usize,
    count: usize,
    pos_x: Vec<f32>,
    pos_y: Vec<f32>,
    vel_x: Vec<f32>,
    vel_y: Vec<f32>,
    agent_type: Vec<u32>,
    energy: Vec<f32>,
}

impl AgentSubstrate {
    /// Allocate buffers for `capacity` agents.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, WorldError> {
        if capacity == 0 {
            return Err(WorldError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            count: 0,
            pos_x: vec![0.0; capacity],
            pos_y: vec![0.0; capacity],
            vel_x: vec![0.0; capacity],
            vel_y: vec![0.0; capacity],
            agent_type: vec![0; capacity],
            energy: vec![0.0; capacity],
        })
    }

    /// Reallocate for a new capacity and drop every agent.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ZeroCapacity`] if `capacity` is zero.
    pub fn reset(&mut self, capacity: usize) -> Result<(), WorldError> {
        *self = Self::new(capacity)?;
        Ok(())
    }

    /// Drop every agent without reallocating.
    pub const fn clear(&mut self) {
        self.count = 0;
    }

    /// Append an agent and return its index.
    ///
    /// Position is clamped into the world square and energy into `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CapacityExceeded`] if the substrate is full.
    pub fn push(&mut self, seed: AgentSeed) -> Result<usize, WorldError> {
        let index = self.count;
        if index >= self.capacity {
            return Err(WorldError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let pos = clamp_to_world(seed.position);
        let (Some(px), Some(py), Some(vx), Some(vy), Some(kind), Some(energy)) = (
            self.pos_x.get_mut(index),
            self.pos_y.get_mut(index),
            self.vel_x.get_mut(index),
            self.vel_y.get_mut(index),
            self.agent_type.get_mut(index),
            self.energy.get_mut(index),
        ) else {
            return Err(WorldError::CapacityExceeded {
                capacity: self.capacity,
            });
        };
        *px = pos.x;
        *py = pos.y;
        *vx = finite_or_zero(seed.velocity.x);
        *vy = finite_or_zero(seed.velocity.y);
        *kind = seed.agent_type;
        *energy = seed.energy.clamp(0.0, 1.0);
        self.count = index.saturating_add(1);
        Ok(index)
    }

    /// Number of live agents.
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Whether there are no live agents.
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Maximum agent count before the next reset.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of agent `index`, or `None` when out of range.
    pub fn view(&self, index: usize) -> Option<AgentView> {
        if index >= self.count {
            return None;
        }
        Some(AgentView {
            index,
            position: Vec2::new(*self.pos_x.get(index)?, *self.pos_y.get(index)?),
            velocity: Vec2::new(*self.vel_x.get(index)?, *self.vel_y.get(index)?),
            agent_type: *self.agent_type.get(index)?,
            energy: *self.energy.get(index)?,
        })
    }

    /// Iterate every live agent in index order.
    pub fn views(&self) -> impl Iterator<Item = AgentView> + '_ {
        (0..self.count).filter_map(|i| self.view(i))
    }

    /// Position of agent `index`.
    pub fn position(&self, index: usize) -> Option<Vec2> {
        self.view(index).map(|v| v.position)
    }

    /// Velocity of agent `index`.
    pub fn velocity(&self, index: usize) -> Option<Vec2> {
        self.view(index).map(|v| v.velocity)
    }

    /// Type tag of agent `index`.
    pub fn agent_type(&self, index: usize) -> Option<u32> {
        if index >= self.count {
            return None;
        }
        self.agent_type.get(index).copied()
    }

    /// Energy of agent `index`.
    pub fn energy(&self, index: usize) -> Option<f32> {
        if index >= self.count {
            return None;
        }
        self.energy.get(index).copied()
    }

    /// Overwrite the velocity of agent `index`. Returns `false` when out of range.
    pub fn set_velocity(&mut self, index: usize, velocity: Vec2) -> bool {
        if index >= self.count {
            return false;
        }
        match (self.vel_x.get_mut(index), self.vel_y.get_mut(index)) {
            (Some(vx), Some(vy)) => {
                *vx = finite_or_zero(velocity.x);
                *vy = finite_or_zero(velocity.y);
                true
            }
            _ => false,
        }
    }

    /// Add `delta` to the velocity of agent `index`. Returns `false` when out of range.
    pub fn add_velocity(&mut self, index: usize, delta: Vec2) -> bool {
        match self.velocity(index) {
            Some(v) => self.set_velocity(index, v + delta),
            None => false,
        }
    }

    /// Multiply the velocity of agent `index` by `factor`.
    pub fn scale_velocity(&mut self, index: usize, factor: f32) -> bool {
        match self.velocity(index) {
            Some(v) => self.set_velocity(index, v * factor),
            None => false,
        }
    }

    /// Overwrite the position of agent `index`, clamped into the world square.
    pub fn set_position(&mut self, index: usize, position: Vec2) -> bool {
        if index >= self.count {
            return false;
        }
        let p = clamp_to_world(position);
        match (self.pos_x.get_mut(index), self.pos_y.get_mut(index)) {
            (Some(px), Some(py)) => {
                *px = p.x;
                *py = p.y;
                true
            }
            _ => false,
        }
    }

    /// Overwrite the energy of agent `index`, clamped to `[0, 1]`.
    pub fn set_energy(&mut self, index: usize, energy: f32) -> bool {
        if index >= self.count {
            return false;
        }
        match self.energy.get_mut(index) {
            Some(e) => {
                *e = if energy.is_finite() { energy.clamp(0.0, 1.0) } else { 0.0 };
                true
            }
            None => false,
        }
    }

    /// Add `delta` to the energy of agent `index`, clamped to `[0, 1]`.
    pub fn add_energy(&mut self, index: usize, delta: f32) -> bool {
        match self.energy(index) {
            Some(e) => self.set_energy(index, e + delta),
            None => false,
        }
    }

    /// Check that `index` is live.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::AgentOutOfRange`] otherwise.
    pub const fn check_index(&self, index: usize) -> Result<(), WorldError> {
        if index < self.count {
            Ok(())
        } else {
            Err(WorldError::AgentOutOfRange {
                index,
                count: self.count,
            })
        }
    }

    /// Advance positions by `velocity * dt` with velocity damping, reflecting
    /// off the world boundary.
    pub fn integrate(&mut self, dt: f32, damping: f32) {
        let keep = (1.0 - damping).clamp(0.0, 1.0);
        for i in 0..self.count {
            let Some(view) = self.view(i) else { continue };
            let mut vel = view.velocity * keep;
            let mut pos = view.position + vel * dt;
            if pos.x.abs() > WORLD_EXTENT {
                vel.x = -vel.x;
            }
            if pos.y.abs() > WORLD_EXTENT {
                vel.y = -vel.y;
            }
            pos = clamp_to_world(pos);
            self.set_velocity(i, vel);
            self.set_position(i, pos);
        }
    }
}

/// Clamp a point into the world square; non-finite components become zero.
pub fn clamp_to_world(p: Vec2) -> Vec2 {
    Vec2::new(
        finite_or_zero(p.x).clamp(-WORLD_EXTENT, WORLD_EXTENT),
        finite_or_zero(p.y).clamp(-WORLD_EXTENT, WORLD_EXTENT),
    )
}

const fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}
