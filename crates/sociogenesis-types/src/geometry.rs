//! Minimal 2D vector math for the `[-1, 1]²` simulation domain.

use core::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Distance below which a direction is considered undefined.
pub const DIRECTION_EPSILON: f32 = 1e-6;

/// A 2D vector used for positions, velocities, and steering deltas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component.
    pub y: f32,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Construct a vector from components.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians from the positive x axis.
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    /// Euclidean length.
    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    /// Squared length.
    pub fn length_sq(self) -> f32 {
        self.x.mul_add(self.x, self.y * self.y)
    }

    /// Distance to another point.
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Dot product.
    pub fn dot(self, other: Self) -> f32 {
        self.x.mul_add(other.x, self.y * other.y)
    }

    /// Counter-clockwise perpendicular.
    pub const fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Unit vector in the same direction, or `None` when the length is
    /// below [`DIRECTION_EPSILON`].
    pub fn try_normalize(self) -> Option<Self> {
        let len = self.length();
        if len <= DIRECTION_EPSILON || !len.is_finite() {
            return None;
        }
        Some(Self::new(self.x / len, self.y / len))
    }

    /// Unit vector in the same direction, or `fallback` when undefined.
    pub fn normalize_or(self, fallback: Self) -> Self {
        self.try_normalize().unwrap_or(fallback)
    }

    /// Clamp each axis independently to `[-limit, limit]`.
    ///
    /// Non-finite components collapse to zero so a degenerate force can
    /// never inject `NaN` into agent velocities.
    pub fn clamp_axes(self, limit: f32) -> Self {
        let limit = limit.abs();
        let clamp = |v: f32| if v.is_finite() { v.clamp(-limit, limit) } else { 0.0 };
        Self::new(clamp(self.x), clamp(self.y))
    }

    /// Whether both components are finite.
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}
