//! JSON scene files: a list of analytic faces with optional trims.
//!
//! ```json
//! {
//!   "faces": [
//!     { "type": "sphere", "center": [0, 0, 0], "radius": 1.0 },
//!     { "type": "plane", "origin": [0, 0, -1], "x_dir": [1, 0, 0], "y_dir": [0, 1, 0],
//!       "u": [-2, 2], "v": [-2, 2] },
//!     { "type": "circle", "center": [0, 0, 2], "normal": [0, 0, 1], "radius": 0.5 }
//!   ]
//! }
//! ```
//!
//! Omitted `u`/`v`/`t` ranges fall back to the surface's natural domain.
//! Planes have no useful natural domain and must be trimmed.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use vcad_kernel_geom::{Circle3d, CylinderSurface, Line3d, Plane, SphereSurface, TorusSurface};
use vcad_kernel_math::{Interval, Point3, Vec3};
use vcad_kernel_projection::Brep;

/// A parsed scene file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scene {
    /// Faces in file order; face indices in the output refer to this order.
    pub faces: Vec<SceneFace>,
}

/// One face of a scene.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneFace {
    /// A trimmed plane, `origin + u * x_dir + v * y_dir`.
    Plane {
        /// Point at `(u, v) = (0, 0)`.
        origin: [f64; 3],
        /// Direction of increasing `u`; normalized on load.
        x_dir: [f64; 3],
        /// Direction of increasing `v`; normalized on load.
        y_dir: [f64; 3],
        /// Trim along `x_dir`.
        u: [f64; 2],
        /// Trim along `y_dir`.
        v: [f64; 2],
    },
    /// A cylinder trimmed along its axis.
    Cylinder {
        /// Point on the axis at `v = 0`.
        center: [f64; 3],
        /// Axis direction, `+z` if omitted.
        #[serde(default = "z_axis")]
        axis: [f64; 3],
        /// Must be positive.
        radius: f64,
        /// Angle range in radians, full turn if omitted.
        u: Option<[f64; 2]>,
        /// Height range along the axis.
        v: [f64; 2],
    },
    /// A sphere, optionally trimmed in longitude and latitude.
    Sphere {
        /// Sphere center.
        center: [f64; 3],
        /// Must be positive.
        radius: f64,
        /// Longitude range in radians, full turn if omitted.
        u: Option<[f64; 2]>,
        /// Latitude range in radians, pole to pole if omitted.
        v: Option<[f64; 2]>,
    },
    /// A torus around `axis`.
    Torus {
        /// Torus center.
        center: [f64; 3],
        /// Axis of revolution, `+z` if omitted.
        #[serde(default = "z_axis")]
        axis: [f64; 3],
        /// Distance from the center to the tube center.
        major_radius: f64,
        /// Tube radius.
        minor_radius: f64,
        /// Angle around the axis.
        u: Option<[f64; 2]>,
        /// Angle around the tube.
        v: Option<[f64; 2]>,
    },
    /// A straight edge from `start` (`t = 0`) to `end` (`t = 1`).
    Line {
        /// Point at `t = 0`.
        start: [f64; 3],
        /// Point at `t = 1`.
        end: [f64; 3],
        /// Sub-range of `[0, 1]`.
        t: Option<[f64; 2]>,
    },
    /// A circular edge.
    Circle {
        /// Circle center.
        center: [f64; 3],
        /// Plane normal, `+z` if omitted.
        #[serde(default = "z_axis")]
        normal: [f64; 3],
        /// Must be positive.
        radius: f64,
        /// Angle range in radians, full turn if omitted.
        t: Option<[f64; 2]>,
    },
}

fn z_axis() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

fn point(p: [f64; 3]) -> Point3 {
    Point3::new(p[0], p[1], p[2])
}

fn direction(name: &str, d: [f64; 3]) -> Result<Vec3> {
    let v = Vec3::new(d[0], d[1], d[2]);
    if !(v.norm() > 0.0 && v.iter().all(|c| c.is_finite())) {
        bail!("{name} must be a finite non-zero vector, got {d:?}");
    }
    Ok(v)
}

fn positive(name: &str, value: f64) -> Result<f64> {
    if !(value.is_finite() && value > 0.0) {
        bail!("{name} must be positive, got {value}");
    }
    Ok(value)
}

fn interval([lo, hi]: [f64; 2]) -> Interval {
    Interval::new(lo, hi)
}

fn range(r: Option<[f64; 2]>, natural: Interval) -> Interval {
    r.map_or(natural, interval)
}

impl Scene {
    /// Parse a scene from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(json).context("failed to parse scene")?;
        Ok(scene)
    }

    /// Build the face collection. Faces keep their order in the file.
    pub fn to_brep(&self) -> Result<Brep> {
        let mut brep = Brep::new();
        for (i, face) in self.faces.iter().enumerate() {
            add_face(&mut brep, face).with_context(|| format!("face {i}"))?;
        }
        Ok(brep)
    }
}

fn add_face(brep: &mut Brep, face: &SceneFace) -> Result<()> {
    match *face {
        SceneFace::Plane {
            origin,
            x_dir,
            y_dir,
            u,
            v,
        } => {
            let x = direction("x_dir", x_dir)?;
            let y = direction("y_dir", y_dir)?;
            if x.cross(&y).norm() <= f64::EPSILON * x.norm() * y.norm() {
                bail!("x_dir and y_dir are parallel");
            }
            let plane = Plane::new(point(origin), x, y);
            brep.add_surface_face(Box::new(plane), interval(u), interval(v));
        }
        SceneFace::Cylinder {
            center,
            axis,
            radius,
            u,
            v,
        } => {
            let surface = CylinderSurface::with_axis(point(center), direction("axis", axis)?, positive("radius", radius)?);
            let natural_u = vcad_kernel_geom::Surface::domain(&surface).0;
            brep.add_surface_face(Box::new(surface), range(u, natural_u), interval(v));
        }
        SceneFace::Sphere { center, radius, u, v } => {
            let surface = SphereSurface::with_center(point(center), positive("radius", radius)?);
            let (natural_u, natural_v) = vcad_kernel_geom::Surface::domain(&surface);
            brep.add_surface_face(Box::new(surface), range(u, natural_u), range(v, natural_v));
        }
        SceneFace::Torus {
            center,
            axis,
            major_radius,
            minor_radius,
            u,
            v,
        } => {
            let surface = TorusSurface::with_axis(
                point(center),
                direction("axis", axis)?,
                positive("major_radius", major_radius)?,
                positive("minor_radius", minor_radius)?,
            );
            let (natural_u, natural_v) = vcad_kernel_geom::Surface::domain(&surface);
            brep.add_surface_face(Box::new(surface), range(u, natural_u), range(v, natural_v));
        }
        SceneFace::Line { start, end, t } => {
            if start == end {
                bail!("line start and end coincide");
            }
            let line = Line3d::from_points(point(start), point(end));
            brep.add_curve_face(Box::new(line), range(t, Interval::unit()));
        }
        SceneFace::Circle {
            center,
            normal,
            radius,
            t,
        } => {
            let circle = Circle3d::with_normal(point(center), positive("radius", radius)?, direction("normal", normal)?);
            let natural = vcad_kernel_geom::Curve3d::domain(&circle);
            brep.add_curve_face(Box::new(circle), range(t, natural));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcad_kernel_projection::{BrepFaces, ParamDomain};

    #[test]
    fn test_parse_all_face_types() {
        let scene = Scene::from_json(
            r#"{
                "faces": [
                    { "type": "plane", "origin": [0, 0, 0], "x_dir": [1, 0, 0], "y_dir": [0, 1, 0],
                      "u": [-1, 1], "v": [-2, 2] },
                    { "type": "cylinder", "center": [0, 0, 0], "radius": 1.0, "v": [0, 3] },
                    { "type": "sphere", "center": [1, 2, 3], "radius": 2.0 },
                    { "type": "torus", "center": [0, 0, 0], "axis": [0, 1, 0],
                      "major_radius": 3.0, "minor_radius": 0.5, "u": [0, 1] },
                    { "type": "line", "start": [0, 0, 0], "end": [1, 1, 1] },
                    { "type": "circle", "center": [0, 0, 0], "radius": 1.0, "t": [0, 1.5] }
                ]
            }"#,
        )
        .unwrap();
        let brep = scene.to_brep().unwrap();
        assert_eq!(brep.len(), 6);

        let faces = brep.faces();
        assert_eq!(
            brep.domain(faces[0]),
            Some(ParamDomain::rect(Interval::new(-1.0, 1.0), Interval::new(-2.0, 2.0)))
        );
        let torus = brep.domain(faces[3]).unwrap();
        assert_eq!(torus.u(), Interval::new(0.0, 1.0));
        assert!((torus.v().unwrap().max - 2.0 * std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(brep.domain(faces[5]), Some(ParamDomain::Curve(Interval::new(0.0, 1.5))));
    }

    #[test]
    fn test_rejects_bad_faces() {
        let bad = [
            r#"{ "faces": [ { "type": "sphere", "center": [0, 0, 0], "radius": -1.0 } ] }"#,
            r#"{ "faces": [ { "type": "plane", "origin": [0, 0, 0], "x_dir": [1, 0, 0],
                 "y_dir": [2, 0, 0], "u": [0, 1], "v": [0, 1] } ] }"#,
            r#"{ "faces": [ { "type": "line", "start": [1, 1, 1], "end": [1, 1, 1] } ] }"#,
            r#"{ "faces": [ { "type": "circle", "center": [0, 0, 0], "normal": [0, 0, 0], "radius": 1.0 } ] }"#,
        ];
        for json in bad {
            let scene = Scene::from_json(json).unwrap();
            assert!(scene.to_brep().is_err(), "accepted {json}");
        }
    }

    #[test]
    fn test_unknown_face_type() {
        let json = r#"{ "faces": [ { "type": "cone", "radius": 1.0 } ] }"#;
        assert!(Scene::from_json(json).is_err());
    }
}
