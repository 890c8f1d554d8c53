//! Spatial grid analysis over the `[-1, 1]²` domain.
//!
//! [`analyze`] buckets every agent into a fixed-resolution grid and reduces
//! each populated cell to a [`CellStats`] summary. It is a pure O(n) pass
//! with no side effects; an empty substrate yields an empty map.
//!
//! # Invariants
//!
//! - Cell keys order row-major (`row`, then `col`), so iterating the
//!   returned [`GridMap`] is deterministic.
//! - Only populated cells appear in the map.

use std::collections::BTreeMap;

use sociogenesis_types::Vec2;

use crate::substrate::{AgentSubstrate, WORLD_EXTENT};

/// Default detection grid resolution (cells per axis).
pub const DEFAULT_GRID_RESOLUTION: u32 = 10;

/// Row-major cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    /// Row index, increasing with `y`.
    pub row: u32,
    /// Column index, increasing with `x`.
    pub col: u32,
}

impl CellKey {
    /// Build a key from column and row.
    pub const fn new(col: u32, row: u32) -> Self {
        Self { row, col }
    }

    /// World-space center of this cell.
    #[allow(clippy::cast_precision_loss)]
    pub fn center(self, resolution: u32) -> Vec2 {
        let cell = cell_size(resolution);
        Vec2::new(
            -WORLD_EXTENT + (self.col as f32 + 0.5) * cell,
            -WORLD_EXTENT + (self.row as f32 + 0.5) * cell,
        )
    }

    /// The up to eight in-bounds neighbors, row-major.
    pub fn neighbors(self, resolution: u32) -> Vec<Self> {
        let mut out = Vec::with_capacity(8);
        for dr in -1_i64..=1 {
            for dc in -1_i64..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let row = i64::from(self.row).saturating_add(dr);
                let col = i64::from(self.col).saturating_add(dc);
                if let (Ok(row), Ok(col)) = (u32::try_from(row), u32::try_from(col)) {
                    if row < resolution && col < resolution {
                        out.push(Self { row, col });
                    }
                }
            }
        }
        out
    }
}

/// Summary of the agents inside one cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellStats {
    /// Agents in the cell.
    pub count: u32,
    /// Agent count per type tag.
    pub type_hist: BTreeMap<u32, u32>,
    /// Mean velocity vector.
    pub mean_velocity: Vec2,
    /// Mean of per-agent speeds.
    pub mean_speed: f32,
    /// Mean position.
    pub centroid: Vec2,
}

impl CellStats {
    /// Most common type and its count; ties resolve to the lowest tag.
    pub fn dominant_type(&self) -> Option<(u32, u32)> {
        let mut best: Option<(u32, u32)> = None;
        for (&kind, &n) in &self.type_hist {
            if best.is_none_or(|(_, b)| n > b) {
                best = Some((kind, n));
            }
        }
        best
    }

    /// Fraction of the cell held by the dominant type.
    #[allow(clippy::cast_precision_loss)]
    pub fn purity(&self) -> f32 {
        match self.dominant_type() {
            Some((_, n)) if self.count > 0 => n as f32 / self.count as f32,
            _ => 0.0,
        }
    }

    /// Number of distinct type tags present.
    pub fn distinct_types(&self) -> usize {
        self.type_hist.len()
    }

    /// Agents of `agent_type` in the cell.
    pub fn count_of(&self, agent_type: u32) -> u32 {
        self.type_hist.get(&agent_type).copied().unwrap_or(0)
    }
}

/// Populated cells keyed row-major.
pub type GridMap = BTreeMap<CellKey, CellStats>;

/// Side length of one cell in world units.
#[allow(clippy::cast_precision_loss)]
pub fn cell_size(resolution: u32) -> f32 {
    (2.0 * WORLD_EXTENT) / resolution.max(1) as f32
}

/// Cell containing `position`; positions on or past the boundary land in
/// the edge cells.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn cell_of(position: Vec2, resolution: u32) -> CellKey {
    let resolution = resolution.max(1);
    let max_index = resolution.saturating_sub(1);
    let scale = resolution as f32 / (2.0 * WORLD_EXTENT);
    let axis = |v: f32| -> u32 {
        let v = if v.is_finite() { v } else { 0.0 };
        let idx = ((v + WORLD_EXTENT) * scale).floor().max(0.0) as u32;
        idx.min(max_index)
    };
    CellKey {
        row: axis(position.y),
        col: axis(position.x),
    }
}

/// Bucket every agent into the grid and summarize each populated cell.
#[allow(clippy::cast_precision_loss)]
pub fn analyze(substrate: &AgentSubstrate, resolution: u32) -> GridMap {
    #[derive(Default)]
    struct Accum {
        count: u32,
        type_hist: BTreeMap<u32, u32>,
        vel_sum: Vec2,
        speed_sum: f32,
        pos_sum: Vec2,
    }

    let mut cells: BTreeMap<CellKey, Accum> = BTreeMap::new();
    for agent in substrate.views() {
        let acc = cells.entry(cell_of(agent.position, resolution)).or_default();
        acc.count = acc.count.saturating_add(1);
        let slot = acc.type_hist.entry(agent.agent_type).or_insert(0);
        *slot = slot.saturating_add(1);
        acc.vel_sum += agent.velocity;
        acc.speed_sum += agent.velocity.length();
        acc.pos_sum += agent.position;
    }

    cells
        .into_iter()
        .map(|(key, acc)| {
            let inv = 1.0 / acc.count.max(1) as f32;
            (
                key,
                CellStats {
                    count: acc.count,
                    type_hist: acc.type_hist,
                    mean_velocity: acc.vel_sum * inv,
                    mean_speed: acc.speed_sum * inv,
                    centroid: acc.pos_sum * inv,
                },
            )
        })
        .collect()
}

/// Agent indices per populated cell, row-major.
pub fn bucket_indices(substrate: &AgentSubstrate, resolution: u32) -> BTreeMap<CellKey, Vec<usize>> {
    let mut buckets: BTreeMap<CellKey, Vec<usize>> = BTreeMap::new();
    for agent in substrate.views() {
        buckets
            .entry(cell_of(agent.position, resolution))
            .or_default()
            .push(agent.index);
    }
    buckets
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sociogenesis_types::AgentSeed;

    use super::*;

    fn substrate_with(agents: &[(f32, f32, u32, f32, f32)]) -> AgentSubstrate {
        let mut s = AgentSubstrate::new(agents.len().max(1)).unwrap();
        for &(x, y, agent_type, vx, vy) in agents {
            s.push(AgentSeed {
                position: Vec2::new(x, y),
                velocity: Vec2::new(vx, vy),
                agent_type,
                energy: 1.0,
            })
            .unwrap();
        }
        s
    }

    #[test]
    fn empty_substrate_yields_empty_map() {
        let s = AgentSubstrate::new(4).unwrap();
        assert!(analyze(&s, DEFAULT_GRID_RESOLUTION).is_empty());
    }

    #[test]
    fn boundary_positions_land_in_edge_cells() {
        assert_eq!(cell_of(Vec2::new(-1.0, -1.0), 10), CellKey::new(0, 0));
        assert_eq!(cell_of(Vec2::new(1.0, 1.0), 10), CellKey::new(9, 9));
        assert_eq!(cell_of(Vec2::new(0.05, -0.05), 10), CellKey::new(5, 4));
    }

    #[test]
    fn center_round_trips_through_cell_of() {
        let key = CellKey::new(3, 7);
        assert_eq!(cell_of(key.center(10), 10), key);
    }

    #[test]
    fn stats_reduce_counts_and_means() {
        let s = substrate_with(&[
            (0.05, 0.05, 1, 0.02, 0.0),
            (0.06, 0.05, 1, 0.0, 0.02),
            (0.07, 0.05, 2, 0.0, 0.0),
        ]);
        let grid = analyze(&s, 10);
        assert_eq!(grid.len(), 1);
        let stats = grid.values().next().unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.dominant_type(), Some((1, 2)));
        assert_eq!(stats.distinct_types(), 2);
        assert!((stats.mean_speed - 0.04 / 3.0).abs() < 1e-6);
        assert!((stats.centroid.x - 0.06).abs() < 1e-6);
    }

    #[test]
    fn iteration_is_row_major() {
        let s = substrate_with(&[(0.9, -0.9, 0, 0.0, 0.0), (-0.9, 0.9, 0, 0.0, 0.0), (-0.9, -0.9, 0, 0.0, 0.0)]);
        let keys: Vec<CellKey> = analyze(&s, 10).into_keys().collect();
        assert_eq!(keys, vec![CellKey::new(0, 0), CellKey::new(9, 0), CellKey::new(0, 9)]);
    }

    #[test]
    fn corner_cell_has_three_neighbors() {
        assert_eq!(CellKey::new(0, 0).neighbors(10).len(), 3);
        assert_eq!(CellKey::new(4, 4).neighbors(10).len(), 8);
    }
}
