//! Point samples from the optional field collaborator.
//!
//! The field modulates economy regeneration and culture conversion only.
//! When no collaborator is attached the engine uses [`NeutralField`], whose
//! samples are all zero and leave both subsystems unmodulated.

use sociogenesis_types::Vec2;

/// Field values at one world position. Zero is neutral for every channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldSample {
    /// Local tendency to cluster, in `[-1, 1]`.
    pub cohesion: f32,
    /// Local resource pressure, in `[0, 1]`.
    pub scarcity: f32,
    /// Local conflict pressure, in `[0, 1]`.
    pub tension: f32,
    /// Receptiveness to influence, in `[-1, 1]`.
    pub affinity: f32,
    /// Environmental stress, in `[0, 1]`.
    pub stress: f32,
}

impl FieldSample {
    /// The neutral sample.
    pub const NEUTRAL: Self = Self {
        cohesion: 0.0,
        scarcity: 0.0,
        tension: 0.0,
        affinity: 0.0,
        stress: 0.0,
    };

    /// Copy with every channel clamped into its documented range and
    /// non-finite values replaced by zero.
    pub fn sanitized(self) -> Self {
        let fix = |v: f32, lo: f32, hi: f32| if v.is_finite() { v.clamp(lo, hi) } else { 0.0 };
        Self {
            cohesion: fix(self.cohesion, -1.0, 1.0),
            scarcity: fix(self.scarcity, 0.0, 1.0),
            tension: fix(self.tension, 0.0, 1.0),
            affinity: fix(self.affinity, -1.0, 1.0),
            stress: fix(self.stress, 0.0, 1.0),
        }
    }
}

/// Source of field samples.
pub trait FieldSampler {
    /// Sample the field at `position`.
    fn sample(&self, position: Vec2) -> FieldSample;
}

/// Sampler that always returns [`FieldSample::NEUTRAL`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralField;

impl FieldSampler for NeutralField {
    fn sample(&self, _position: Vec2) -> FieldSample {
        FieldSample::NEUTRAL
    }
}

impl<F: Fn(Vec2) -> FieldSample> FieldSampler for F {
    fn sample(&self, position: Vec2) -> FieldSample {
        self(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_field_is_all_zero() {
        assert_eq!(NeutralField.sample(Vec2::new(0.3, -0.2)), FieldSample::default());
    }

    #[test]
    fn closures_act_as_samplers() {
        let field = |p: Vec2| FieldSample {
            stress: p.x,
            ..FieldSample::NEUTRAL
        };
        assert!((field.sample(Vec2::new(0.4, 0.0)).stress - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn sanitize_clamps_and_drops_nan() {
        let s = FieldSample {
            cohesion: 3.0,
            scarcity: f32::NAN,
            tension: -1.0,
            affinity: -4.0,
            stress: 0.5,
        }
        .sanitized();
        assert!((s.cohesion - 1.0).abs() < f32::EPSILON);
        assert!(s.scarcity.abs() < f32::EPSILON);
        assert!(s.tension.abs() < f32::EPSILON);
        assert!((s.affinity + 1.0).abs() < f32::EPSILON);
    }
}
