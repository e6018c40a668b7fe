#![warn(missing_docs)]

//! Math types for the vcad closest-point kernel.
//!
//! Thin wrappers around nalgebra providing the point, vector, and
//! parameter-interval types shared by geometry evaluation, spatial
//! indexing, and projection.

use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// A closed real interval `[min, max]`, used for parameter domains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
}

impl Interval {
    /// Create an interval. Bounds are taken as given; see [`Interval::is_valid`].
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// The unit interval `[0, 1]`.
    pub const fn unit() -> Self {
        Self::new(0.0, 1.0)
    }

    /// True if both bounds are finite and `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Clamp `t` into the interval.
    ///
    /// Unlike `f64::clamp` this never panics; an inverted interval clamps
    /// to `max`.
    pub fn clamp(&self, t: f64) -> f64 {
        t.max(self.min).min(self.max)
    }

    /// True if `t` lies in the interval (bounds included).
    pub fn contains(&self, t: f64) -> bool {
        t >= self.min && t <= self.max
    }

    /// Linear interpolation: `lerp(0) == min`, `lerp(1) == max`.
    pub fn lerp(&self, s: f64) -> f64 {
        if s >= 1.0 {
            self.max
        } else {
            self.min + s * (self.max - self.min)
        }
    }

    /// Which bound `t` sits on or past: `Some(-1)` for the lower bound,
    /// `Some(1)` for the upper, `None` for the interior.
    pub fn bound_side(&self, t: f64) -> Option<i8> {
        if t <= self.min {
            Some(-1)
        } else if t >= self.max {
            Some(1)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_clamp_and_lerp() {
        let i = Interval::new(-2.0, 4.0);
        assert!((i.clamp(10.0) - 4.0).abs() < 1e-12);
        assert!((i.clamp(-3.0) + 2.0).abs() < 1e-12);
        assert!((i.lerp(0.5) - 1.0).abs() < 1e-12);
        assert!(i.contains(4.0) && !i.contains(4.1));
        let odd = Interval::new(-10.3, 0.7);
        assert_eq!(odd.lerp(1.0), 0.7);
        assert_eq!(Interval::new(1.0, 0.0).clamp(0.5), 0.0);
    }

    #[test]
    fn test_interval_validity() {
        assert!(Interval::unit().is_valid());
        assert!(Interval::new(1.0, 1.0).is_valid());
        assert!(!Interval::new(1.0, 0.0).is_valid());
        assert!(!Interval::new(0.0, f64::INFINITY).is_valid());
        assert!(!Interval::new(f64::NAN, 1.0).is_valid());
    }

    #[test]
    fn test_bound_side() {
        let i = Interval::unit();
        assert_eq!(i.bound_side(0.0), Some(-1));
        assert_eq!(i.bound_side(1.0), Some(1));
        assert_eq!(i.bound_side(0.5), None);
    }
}
