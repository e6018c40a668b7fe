#![warn(missing_docs)]

//! Analytic surface and curve evaluators for the vcad kernel.
//!
//! Provides trait-based abstractions for parametric surfaces and curves
//! together with their first and second derivatives, which is what
//! closest-point refinement consumes. Concrete implementations cover the
//! common analytic types: planes, cylinders, spheres, tori, lines, and
//! circles.

use std::f64::consts::PI;
use vcad_kernel_math::{Dir3, Interval, Point2, Point3, Vec3};

// =============================================================================
// Surface types
// =============================================================================

/// A parametric surface in 3D space.
///
/// Second derivatives are optional: surfaces that cannot supply them cheaply
/// keep the default `None` and consumers fall back to first-order methods.
pub trait Surface: Send + Sync + std::fmt::Debug {
    /// Evaluate the surface at parameter `(u, v)` to get a 3D point.
    fn evaluate(&self, uv: Point2) -> Point3;

    /// Partial derivative with respect to u at `(u, v)`.
    fn d_du(&self, uv: Point2) -> Vec3;

    /// Partial derivative with respect to v at `(u, v)`.
    fn d_dv(&self, uv: Point2) -> Vec3;

    /// Second partial derivative `∂²S/∂u²`.
    fn d2_duu(&self, _uv: Point2) -> Option<Vec3> {
        None
    }

    /// Mixed partial derivative `∂²S/∂u∂v`.
    fn d2_duv(&self, _uv: Point2) -> Option<Vec3> {
        None
    }

    /// Second partial derivative `∂²S/∂v²`.
    fn d2_dvv(&self, _uv: Point2) -> Option<Vec3> {
        None
    }

    /// Natural parameter domain as `(u_range, v_range)`.
    fn domain(&self) -> (Interval, Interval);

    /// Clone this surface into a boxed trait object.
    fn clone_box(&self) -> Box<dyn Surface>;
}

impl Clone for Box<dyn Surface> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Unbounded extent used for the open directions of planes and cylinders.
const UNBOUNDED: f64 = 1e10;

/// Pick a unit vector perpendicular to `axis`.
fn perpendicular(axis: &Dir3) -> Dir3 {
    let arbitrary = if axis.as_ref().x.abs() < 0.9 {
        Vec3::x()
    } else {
        Vec3::y()
    };
    Dir3::new_normalize(arbitrary - arbitrary.dot(axis.as_ref()) * axis.as_ref())
}

// =============================================================================
// Plane
// =============================================================================

/// An infinite plane defined by an origin point and a coordinate frame.
///
/// Parameterization: `P(u, v) = origin + u * x_dir + v * y_dir`
#[derive(Debug, Clone)]
pub struct Plane {
    /// Origin point on the plane.
    pub origin: Point3,
    /// Unit vector along the u direction.
    pub x_dir: Dir3,
    /// Unit vector along the v direction.
    pub y_dir: Dir3,
}

impl Plane {
    /// Create a plane from origin and two direction vectors.
    /// The vectors do not need to be normalized.
    pub fn new(origin: Point3, x_dir: Vec3, y_dir: Vec3) -> Self {
        Self {
            origin,
            x_dir: Dir3::new_normalize(x_dir),
            y_dir: Dir3::new_normalize(y_dir),
        }
    }

    /// XY plane at the origin.
    pub fn xy() -> Self {
        Self::new(Point3::origin(), Vec3::x(), Vec3::y())
    }
}

impl Surface for Plane {
    fn evaluate(&self, uv: Point2) -> Point3 {
        self.origin + uv.x * self.x_dir.as_ref() + uv.y * self.y_dir.as_ref()
    }

    fn d_du(&self, _uv: Point2) -> Vec3 {
        *self.x_dir.as_ref()
    }

    fn d_dv(&self, _uv: Point2) -> Vec3 {
        *self.y_dir.as_ref()
    }

    fn d2_duu(&self, _uv: Point2) -> Option<Vec3> {
        Some(Vec3::zeros())
    }

    fn d2_duv(&self, _uv: Point2) -> Option<Vec3> {
        Some(Vec3::zeros())
    }

    fn d2_dvv(&self, _uv: Point2) -> Option<Vec3> {
        Some(Vec3::zeros())
    }

    fn domain(&self) -> (Interval, Interval) {
        (
            Interval::new(-UNBOUNDED, UNBOUNDED),
            Interval::new(-UNBOUNDED, UNBOUNDED),
        )
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Cylinder
// =============================================================================

/// A cylindrical surface defined by an axis line and radius.
///
/// Parameterization: `P(u, v) = center + radius * (cos(u) * x_dir + sin(u) * y_dir) + v * axis`
///
/// Where `u ∈ [0, 2π)` is the angular parameter and `v` is the height along the axis.
#[derive(Debug, Clone)]
pub struct CylinderSurface {
    /// Center point at the base of the cylinder axis.
    pub center: Point3,
    /// Unit direction along the cylinder axis.
    pub axis: Dir3,
    /// Reference direction for u=0 (perpendicular to axis).
    pub ref_dir: Dir3,
    /// Radius of the cylinder.
    pub radius: f64,
}

impl CylinderSurface {
    /// Create a cylinder with axis along Z, centered at origin.
    pub fn new(radius: f64) -> Self {
        Self {
            center: Point3::origin(),
            axis: Dir3::new_normalize(Vec3::z()),
            ref_dir: Dir3::new_normalize(Vec3::x()),
            radius,
        }
    }

    /// Create a cylinder with a custom center and axis.
    pub fn with_axis(center: Point3, axis: Vec3, radius: f64) -> Self {
        let axis = Dir3::new_normalize(axis);
        Self {
            center,
            ref_dir: perpendicular(&axis),
            axis,
            radius,
        }
    }

    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }

    /// Radial unit vector at angle `u` and its u-derivative.
    fn radial(&self, u: f64) -> (Vec3, Vec3) {
        let (sin_u, cos_u) = u.sin_cos();
        let x = self.ref_dir.as_ref();
        let y = self.y_dir();
        (cos_u * x + sin_u * y, -sin_u * x + cos_u * y)
    }
}

impl Surface for CylinderSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        let (e, _) = self.radial(uv.x);
        self.center + self.radius * e + uv.y * self.axis.as_ref()
    }

    fn d_du(&self, uv: Point2) -> Vec3 {
        let (_, de) = self.radial(uv.x);
        self.radius * de
    }

    fn d_dv(&self, _uv: Point2) -> Vec3 {
        *self.axis.as_ref()
    }

    fn d2_duu(&self, uv: Point2) -> Option<Vec3> {
        let (e, _) = self.radial(uv.x);
        Some(-self.radius * e)
    }

    fn d2_duv(&self, _uv: Point2) -> Option<Vec3> {
        Some(Vec3::zeros())
    }

    fn d2_dvv(&self, _uv: Point2) -> Option<Vec3> {
        Some(Vec3::zeros())
    }

    fn domain(&self) -> (Interval, Interval) {
        (
            Interval::new(0.0, 2.0 * PI),
            Interval::new(-UNBOUNDED, UNBOUNDED),
        )
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Sphere
// =============================================================================

/// A spherical surface defined by center and radius.
///
/// Parameterization: `P(u, v) = center + radius * (cos(v) * (cos(u) * x + sin(u) * y) + sin(v) * z)`
///
/// Where `u ∈ [0, 2π)` is longitude and `v ∈ [-π/2, π/2]` is latitude.
#[derive(Debug, Clone)]
pub struct SphereSurface {
    /// Center of the sphere.
    pub center: Point3,
    /// Radius of the sphere.
    pub radius: f64,
    /// Reference direction for u=0 (perpendicular to axis).
    pub ref_dir: Dir3,
    /// Axis direction (north pole).
    pub axis: Dir3,
}

impl SphereSurface {
    /// Create a sphere centered at origin with the given radius.
    pub fn new(radius: f64) -> Self {
        Self::with_center(Point3::origin(), radius)
    }

    /// Create a sphere with a custom center.
    pub fn with_center(center: Point3, radius: f64) -> Self {
        Self {
            center,
            radius,
            ref_dir: Dir3::new_normalize(Vec3::x()),
            axis: Dir3::new_normalize(Vec3::z()),
        }
    }

    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }

    /// Equatorial unit vector at longitude `u` and its u-derivative.
    fn equatorial(&self, u: f64) -> (Vec3, Vec3) {
        let (sin_u, cos_u) = u.sin_cos();
        let x = self.ref_dir.as_ref();
        let y = self.y_dir();
        (cos_u * x + sin_u * y, -sin_u * x + cos_u * y)
    }
}

impl Surface for SphereSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        let (e, _) = self.equatorial(uv.x);
        let (sin_v, cos_v) = uv.y.sin_cos();
        self.center + self.radius * (cos_v * e + sin_v * self.axis.as_ref())
    }

    fn d_du(&self, uv: Point2) -> Vec3 {
        let (_, de) = self.equatorial(uv.x);
        self.radius * uv.y.cos() * de
    }

    fn d_dv(&self, uv: Point2) -> Vec3 {
        let (e, _) = self.equatorial(uv.x);
        let (sin_v, cos_v) = uv.y.sin_cos();
        self.radius * (-sin_v * e + cos_v * self.axis.as_ref())
    }

    fn d2_duu(&self, uv: Point2) -> Option<Vec3> {
        let (e, _) = self.equatorial(uv.x);
        Some(-self.radius * uv.y.cos() * e)
    }

    fn d2_duv(&self, uv: Point2) -> Option<Vec3> {
        let (_, de) = self.equatorial(uv.x);
        Some(-self.radius * uv.y.sin() * de)
    }

    fn d2_dvv(&self, uv: Point2) -> Option<Vec3> {
        let (e, _) = self.equatorial(uv.x);
        let (sin_v, cos_v) = uv.y.sin_cos();
        Some(-self.radius * (cos_v * e + sin_v * self.axis.as_ref()))
    }

    fn domain(&self) -> (Interval, Interval) {
        (
            Interval::new(0.0, 2.0 * PI),
            Interval::new(-PI / 2.0, PI / 2.0),
        )
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Torus
// =============================================================================

/// A toroidal surface defined by center, axis, and two radii.
///
/// Parameterization:
/// ```text
/// P(u, v) = center + (R + r·cos(v))·(cos(u)·ref_dir + sin(u)·y_dir) + r·sin(v)·axis
/// ```
#[derive(Debug, Clone)]
pub struct TorusSurface {
    /// Center of the torus.
    pub center: Point3,
    /// Unit direction of the torus axis.
    pub axis: Dir3,
    /// Reference direction for u=0 (perpendicular to axis).
    pub ref_dir: Dir3,
    /// Major radius: distance from center to tube center.
    pub major_radius: f64,
    /// Minor radius: radius of the tube.
    pub minor_radius: f64,
}

impl TorusSurface {
    /// Create a torus centered at origin with axis along Z.
    pub fn new(major_radius: f64, minor_radius: f64) -> Self {
        Self::with_axis(Point3::origin(), Vec3::z(), major_radius, minor_radius)
    }

    /// Create a torus with a custom center and axis.
    pub fn with_axis(center: Point3, axis: Vec3, major_radius: f64, minor_radius: f64) -> Self {
        let axis = Dir3::new_normalize(axis);
        Self {
            center,
            ref_dir: perpendicular(&axis),
            axis,
            major_radius,
            minor_radius,
        }
    }

    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }

    /// Tube-center direction at angle `u` and its u-derivative.
    fn ring(&self, u: f64) -> (Vec3, Vec3) {
        let (sin_u, cos_u) = u.sin_cos();
        let x = self.ref_dir.as_ref();
        let y = self.y_dir();
        (cos_u * x + sin_u * y, -sin_u * x + cos_u * y)
    }
}

impl Surface for TorusSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        let (e, _) = self.ring(uv.x);
        let (sin_v, cos_v) = uv.y.sin_cos();
        self.center
            + (self.major_radius + self.minor_radius * cos_v) * e
            + self.minor_radius * sin_v * self.axis.as_ref()
    }

    fn d_du(&self, uv: Point2) -> Vec3 {
        let (_, de) = self.ring(uv.x);
        (self.major_radius + self.minor_radius * uv.y.cos()) * de
    }

    fn d_dv(&self, uv: Point2) -> Vec3 {
        let (e, _) = self.ring(uv.x);
        let (sin_v, cos_v) = uv.y.sin_cos();
        self.minor_radius * (-sin_v * e + cos_v * self.axis.as_ref())
    }

    fn d2_duu(&self, uv: Point2) -> Option<Vec3> {
        let (e, _) = self.ring(uv.x);
        Some(-(self.major_radius + self.minor_radius * uv.y.cos()) * e)
    }

    fn d2_duv(&self, uv: Point2) -> Option<Vec3> {
        let (_, de) = self.ring(uv.x);
        Some(-self.minor_radius * uv.y.sin() * de)
    }

    fn d2_dvv(&self, uv: Point2) -> Option<Vec3> {
        let (e, _) = self.ring(uv.x);
        let (sin_v, cos_v) = uv.y.sin_cos();
        Some(-self.minor_radius * (cos_v * e + sin_v * self.axis.as_ref()))
    }

    fn domain(&self) -> (Interval, Interval) {
        (Interval::new(0.0, 2.0 * PI), Interval::new(0.0, 2.0 * PI))
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Curve types
// =============================================================================

/// A parametric curve in 3D space.
pub trait Curve3d: Send + Sync + std::fmt::Debug {
    /// Evaluate the curve at parameter `t` to get a 3D point.
    fn evaluate(&self, t: f64) -> Point3;

    /// Tangent vector (first derivative) at parameter `t`.
    fn tangent(&self, t: f64) -> Vec3;

    /// Second derivative at parameter `t`, if available.
    fn second_derivative(&self, _t: f64) -> Option<Vec3> {
        None
    }

    /// Parameter domain.
    fn domain(&self) -> Interval;

    /// Clone into a boxed trait object.
    fn clone_box(&self) -> Box<dyn Curve3d>;
}

impl Clone for Box<dyn Curve3d> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A 3D line segment defined by origin and direction.
///
/// Parameterization: `P(t) = origin + t * direction`, `t ∈ [0, 1]`.
#[derive(Debug, Clone)]
pub struct Line3d {
    /// Starting point.
    pub origin: Point3,
    /// Direction (magnitude is the segment length).
    pub direction: Vec3,
}

impl Line3d {
    /// Create a line so that `t=0` gives `start` and `t=1` gives `end`.
    pub fn from_points(start: Point3, end: Point3) -> Self {
        Self {
            origin: start,
            direction: end - start,
        }
    }
}

impl Curve3d for Line3d {
    fn evaluate(&self, t: f64) -> Point3 {
        self.origin + t * self.direction
    }

    fn tangent(&self, _t: f64) -> Vec3 {
        self.direction
    }

    fn second_derivative(&self, _t: f64) -> Option<Vec3> {
        Some(Vec3::zeros())
    }

    fn domain(&self) -> Interval {
        Interval::unit()
    }

    fn clone_box(&self) -> Box<dyn Curve3d> {
        Box::new(self.clone())
    }
}

/// A circle in 3D space defined by center, normal, and radius.
///
/// Parameterization: `P(t) = center + radius * (cos(t) * x_dir + sin(t) * y_dir)`
#[derive(Debug, Clone)]
pub struct Circle3d {
    /// Center of the circle.
    pub center: Point3,
    /// Radius.
    pub radius: f64,
    /// Reference direction for t=0.
    pub x_dir: Dir3,
    /// Second in-plane direction.
    pub y_dir: Dir3,
}

impl Circle3d {
    /// Create a circle in the XY plane centered at the given point.
    pub fn new(center: Point3, radius: f64) -> Self {
        Self::with_normal(center, radius, Vec3::z())
    }

    /// Create a circle with a custom normal direction.
    pub fn with_normal(center: Point3, radius: f64, normal: Vec3) -> Self {
        let n = Dir3::new_normalize(normal);
        let x = perpendicular(&n);
        let y = Dir3::new_normalize(n.as_ref().cross(x.as_ref()));
        Self {
            center,
            radius,
            x_dir: x,
            y_dir: y,
        }
    }
}

impl Curve3d for Circle3d {
    fn evaluate(&self, t: f64) -> Point3 {
        let (sin_t, cos_t) = t.sin_cos();
        self.center + self.radius * (cos_t * self.x_dir.as_ref() + sin_t * self.y_dir.as_ref())
    }

    fn tangent(&self, t: f64) -> Vec3 {
        let (sin_t, cos_t) = t.sin_cos();
        self.radius * (-sin_t * self.x_dir.as_ref() + cos_t * self.y_dir.as_ref())
    }

    fn second_derivative(&self, t: f64) -> Option<Vec3> {
        let (sin_t, cos_t) = t.sin_cos();
        Some(-self.radius * (cos_t * self.x_dir.as_ref() + sin_t * self.y_dir.as_ref()))
    }

    fn domain(&self) -> Interval {
        Interval::new(0.0, 2.0 * PI)
    }

    fn clone_box(&self) -> Box<dyn Curve3d> {
        Box::new(self.clone())
    }
}
