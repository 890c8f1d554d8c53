//! The single seeded generator threaded through every stochastic step.
//!
//! World generation, contagion draws, role assignment, and preset scatter
//! all consume the same [`SimRng`] instance in a fixed order, so replaying
//! a seed with the same tick sequence reproduces identical outcomes.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use sociogenesis_types::Vec2;

/// Generator type used across the engine.
pub type SimRng = SmallRng;

/// Create the engine generator from a world seed.
pub fn seeded(seed: u64) -> SimRng {
    SmallRng::seed_from_u64(seed)
}

/// Uniform point in the `[-extent, extent]²` square.
pub fn point_in_square(rng: &mut SimRng, extent: f32) -> Vec2 {
    let extent = extent.abs().max(f32::EPSILON);
    Vec2::new(
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
    )
}

/// Uniform draw in `[0, 1)`.
pub fn unit(rng: &mut SimRng) -> f32 {
    rng.random::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = seeded(42);
        let mut b = seeded(42);
        for _ in 0..16 {
            assert_eq!(unit(&mut a).to_bits(), unit(&mut b).to_bits());
        }
    }

    #[test]
    fn points_stay_in_square() {
        let mut rng = seeded(7);
        for _ in 0..200 {
            let p = point_in_square(&mut rng, 0.9);
            assert!(p.x.abs() <= 0.9 && p.y.abs() <= 0.9);
        }
    }
}
