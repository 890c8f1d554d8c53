//! Local leader detection and follower attraction.
//!
//! A strided sample of agents is scored against their same-type neighbors,
//! found through a coarse bucket grid:
//!
//! - **density**: `n / (n + min_neighbors)` for `n` same-type neighbors
//! - **centrality**: `1 / (1 + d / neighbor_radius)` where `d` is the
//!   distance to the neighbors' mean position
//! - **prestige**: taken from the culture state
//!
//! Influence blends the three. The best candidates become leaders, capped
//! globally and per type; each leader pulls its same-type followers and
//! gets a forward boost. Every delta goes through [`nudge`].

use std::collections::BTreeMap;

use tracing::debug;

use sociogenesis_types::{LeaderInfo, Vec2};
use sociogenesis_world::AgentSubstrate;
use sociogenesis_world::grid::{bucket_indices, cell_of};

use crate::config::LeaderConfig;
use crate::culture::CultureState;
use crate::forces::nudge;

const DENSITY_WEIGHT: f32 = 0.4;
const CENTRALITY_WEIGHT: f32 = 0.4;
const PRESTIGE_WEIGHT: f32 = 0.2;

/// Scores and steers local leaders.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderDetector {
    config: LeaderConfig,
}

impl LeaderDetector {
    /// Create a detector.
    pub fn new(config: &LeaderConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    /// Active parameters.
    pub const fn config(&self) -> &LeaderConfig {
        &self.config
    }

    /// Replace every parameter.
    pub fn set_config(&mut self, config: &LeaderConfig) {
        self.config = config.sanitized();
    }

    /// Sampled agent indices, evenly strided.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn sample(&self, count: usize) -> Vec<usize> {
        if count == 0 {
            return Vec::new();
        }
        let wanted = (count as f32 * self.config.sample_fraction).ceil() as usize;
        let max_sample = usize::try_from(self.config.max_sample).unwrap_or(usize::MAX);
        let size = wanted.clamp(1, max_sample.max(1)).min(count);
        let stride = (count / size).max(1);
        (0..size).map(|k| k.saturating_mul(stride)).filter(|&i| i < count).collect()
    }

    /// Score every sampled agent, pick leaders, and steer followers.
    #[allow(clippy::cast_precision_loss)]
    pub fn run(&self, substrate: &mut AgentSubstrate, culture: &CultureState, clamp: f32) -> Vec<LeaderInfo> {
        let resolution = self.config.grid_resolution;
        let buckets = bucket_indices(substrate, resolution);
        let min_neighbors = self.config.min_neighbors.max(1);

        let mut candidates: Vec<(usize, u32, f32)> = Vec::new();
        for i in self.sample(substrate.len()) {
            let Some(agent) = substrate.view(i) else { continue };
            let home = cell_of(agent.position, resolution);
            let mut cells = home.neighbors(resolution);
            cells.push(home);

            let mut neighbors = 0_u32;
            let mut sum = Vec2::ZERO;
            for j in cells.iter().filter_map(|c| buckets.get(c)).flatten().copied() {
                if j == i {
                    continue;
                }
                let Some(other) = substrate.view(j) else { continue };
                if other.agent_type != agent.agent_type
                    || other.position.distance(agent.position) > self.config.neighbor_radius
                {
                    continue;
                }
                neighbors = neighbors.saturating_add(1);
                sum += other.position;
            }
            if neighbors < min_neighbors {
                continue;
            }
            let mean = sum * (1.0 / neighbors as f32);
            let centrality = 1.0 / (1.0 + mean.distance(agent.position) / self.config.neighbor_radius);
            let density = neighbors as f32 / (neighbors as f32 + min_neighbors as f32);
            let influence = (DENSITY_WEIGHT * density
                + CENTRALITY_WEIGHT * centrality
                + PRESTIGE_WEIGHT * culture.prestige(i))
            .clamp(0.0, 1.0);
            candidates.push((i, agent.agent_type, influence));
        }
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));

        let max_leaders = usize::try_from(self.config.max_leaders).unwrap_or(usize::MAX);
        let mut per_type: BTreeMap<u32, u32> = BTreeMap::new();
        let mut leaders = Vec::new();
        for (index, agent_type, influence) in candidates {
            if leaders.len() >= max_leaders {
                break;
            }
            let held = per_type.entry(agent_type).or_insert(0);
            if *held >= self.config.max_per_type {
                continue;
            }
            *held = held.saturating_add(1);
            let followers = self.steer(substrate, index, agent_type, influence, clamp);
            leaders.push(LeaderInfo {
                agent: u32::try_from(index).unwrap_or(u32::MAX),
                agent_type,
                influence,
                followers,
            });
        }
        debug!(leaders = leaders.len(), "leader pass");
        leaders
    }

    /// Pull same-type agents toward the leader and boost the leader forward.
    fn steer(&self, substrate: &mut AgentSubstrate, leader: usize, agent_type: u32, influence: f32, clamp: f32) -> u32 {
        let Some(anchor) = substrate.view(leader) else { return 0 };
        let mut followers = 0_u32;
        for j in 0..substrate.len() {
            if j == leader {
                continue;
            }
            let Some(other) = substrate.view(j) else { continue };
            if other.agent_type != agent_type
                || other.position.distance(anchor.position) > self.config.follower_radius
            {
                continue;
            }
            let pull = (anchor.position - other.position).normalize_or(Vec2::ZERO)
                * (self.config.follow_gain * influence);
            nudge(substrate, j, pull, clamp);
            followers = followers.saturating_add(1);
        }
        if let Some(heading) = anchor.velocity.try_normalize() {
            nudge(substrate, leader, heading * (self.config.boost_gain * influence), clamp);
        }
        followers
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sociogenesis_types::AgentSeed;

    use super::*;

    fn cluster(s: &mut AgentSubstrate, center: Vec2, agent_type: u32, n: u16) {
        for k in 0..n {
            let offset = Vec2::from_angle(f32::from(k)) * 0.05;
            s.push(AgentSeed {
                position: center + offset,
                velocity: Vec2::new(0.01, 0.0),
                agent_type,
                energy: 1.0,
            })
            .unwrap();
        }
    }

    fn full_sample() -> LeaderConfig {
        LeaderConfig {
            sample_fraction: 1.0,
            ..LeaderConfig::default()
        }
    }

    #[test]
    fn dense_cluster_produces_a_leader() {
        let mut s = AgentSubstrate::new(16).unwrap();
        cluster(&mut s, Vec2::new(0.3, 0.3), 1, 8);
        let detector = LeaderDetector::new(&full_sample());
        let leaders = detector.run(&mut s, &CultureState::with_capacity(16), 0.025);
        assert!(!leaders.is_empty());
        assert!(leaders.iter().all(|l| l.agent_type == 1));
        assert!(leaders.iter().all(|l| (0.0..=1.0).contains(&l.influence)));
        assert!(leaders.first().unwrap().followers >= 4);
    }

    #[test]
    fn leaders_are_capped_per_type() {
        let mut s = AgentSubstrate::new(64).unwrap();
        cluster(&mut s, Vec2::new(-0.5, -0.5), 0, 10);
        cluster(&mut s, Vec2::new(0.5, 0.5), 0, 10);
        cluster(&mut s, Vec2::new(0.5, -0.5), 0, 10);
        let detector = LeaderDetector::new(&full_sample());
        let leaders = detector.run(&mut s, &CultureState::with_capacity(64), 0.025);
        assert_eq!(leaders.len(), 2);
    }

    #[test]
    fn isolated_agents_never_lead() {
        let mut s = AgentSubstrate::new(4).unwrap();
        for x in [-0.8_f32, -0.2, 0.4] {
            s.push(AgentSeed {
                position: Vec2::new(x, 0.0),
                velocity: Vec2::ZERO,
                agent_type: 0,
                energy: 1.0,
            })
            .unwrap();
        }
        let detector = LeaderDetector::new(&full_sample());
        assert!(detector.run(&mut s, &CultureState::with_capacity(4), 0.025).is_empty());
    }
}
