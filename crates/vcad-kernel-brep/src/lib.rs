#![warn(missing_docs)]

//! Face collections for vcad closest-point queries.
//!
//! A [`Brep`] here is an ordered set of bounded faces, each backed by an
//! analytic surface or curve from `vcad_kernel_geom`. Consumers do not
//! depend on the concrete type: they go through the [`BrepFaces`] and
//! [`FaceEvaluator`] capability traits, so any face store that can list
//! faces, report their domains, and evaluate positions and derivatives can
//! be projected onto.

mod handle;
mod param;

pub use handle::BrepRef;
pub use param::{ParamDomain, Parameter};

use slotmap::{new_key_type, SlotMap};
use vcad_kernel_geom::{Curve3d, Surface};
use vcad_kernel_math::{Interval, Point3, Vec3};

new_key_type! {
    /// Opaque identifier of a face within a [`Brep`].
    pub struct FaceId;
}

/// Second derivatives at a parameter.
///
/// For curve faces only `duu` is meaningful; `duv` and `dvv` are zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondDerivatives {
    /// `∂²S/∂u²` (or `C''(t)` for curves).
    pub duu: Vec3,
    /// `∂²S/∂u∂v`.
    pub duv: Vec3,
    /// `∂²S/∂v²`.
    pub dvv: Vec3,
}

/// Position and derivatives of a face at one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceEval {
    /// Position.
    pub point: Point3,
    /// First derivative along `u` (or `t`).
    pub du: Vec3,
    /// First derivative along `v`; `None` for curve faces.
    pub dv: Option<Vec3>,
    /// Second derivatives, when the evaluator supplies them.
    pub second: Option<SecondDerivatives>,
}

/// Topology-side capability: which faces exist and where they are defined.
pub trait BrepFaces: Send + Sync {
    /// Face identifiers in stable order.
    fn faces(&self) -> Vec<FaceId>;

    /// Parameter bounds of a face, `None` if the face is unknown.
    fn domain(&self, face: FaceId) -> Option<ParamDomain>;
}

/// Geometry-side capability: evaluate a face at a parameter.
pub trait FaceEvaluator: Send + Sync {
    /// Position and derivatives of `face` at `param`.
    ///
    /// Returns `None` if the face is unknown or `param` has the wrong kind
    /// for the face.
    fn evaluate(&self, face: FaceId, param: Parameter) -> Option<FaceEval>;
}

/// The geometry carried by a face.
#[derive(Debug, Clone)]
pub enum FaceGeometry {
    /// A surface patch, parameterized by `(u, v)`.
    Surface(Box<dyn Surface>),
    /// A curve (wire edge), parameterized by `t`.
    Curve(Box<dyn Curve3d>),
}

/// A bounded face: geometry plus the parameter domain it is trimmed to.
#[derive(Debug, Clone)]
pub struct Face {
    /// Underlying geometry.
    pub geometry: FaceGeometry,
    /// Parameter bounds.
    pub domain: ParamDomain,
}

impl Face {
    /// Evaluate position and derivatives at `param`.
    pub fn evaluate(&self, param: Parameter) -> Option<FaceEval> {
        match (&self.geometry, param) {
            (FaceGeometry::Surface(s), Parameter::Surface(uv)) => {
                let second = match (s.d2_duu(uv), s.d2_duv(uv), s.d2_dvv(uv)) {
                    (Some(duu), Some(duv), Some(dvv)) => Some(SecondDerivatives { duu, duv, dvv }),
                    _ => None,
                };
                Some(FaceEval {
                    point: s.evaluate(uv),
                    du: s.d_du(uv),
                    dv: Some(s.d_dv(uv)),
                    second,
                })
            }
            (FaceGeometry::Curve(c), Parameter::Curve(t)) => Some(FaceEval {
                point: c.evaluate(t),
                du: c.tangent(t),
                dv: None,
                second: c.second_derivative(t).map(|duu| SecondDerivatives {
                    duu,
                    duv: Vec3::zeros(),
                    dvv: Vec3::zeros(),
                }),
            }),
            _ => None,
        }
    }
}

/// An ordered collection of bounded faces.
///
/// Faces are never removed, so insertion order is stable and is the order
/// reported by [`BrepFaces::faces`].
#[derive(Debug, Clone, Default)]
pub struct Brep {
    faces: SlotMap<FaceId, Face>,
    order: Vec<FaceId>,
}

impl Brep {
    /// Create an empty face collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a surface face trimmed to `u × v`.
    pub fn add_surface_face(&mut self, surface: Box<dyn Surface>, u: Interval, v: Interval) -> FaceId {
        self.insert(Face {
            geometry: FaceGeometry::Surface(surface),
            domain: ParamDomain::rect(u, v),
        })
    }

    /// Add a surface face over the surface's full natural domain.
    pub fn add_surface(&mut self, surface: Box<dyn Surface>) -> FaceId {
        let (u, v) = surface.domain();
        self.add_surface_face(surface, u, v)
    }

    /// Add a curve face trimmed to `t`.
    pub fn add_curve_face(&mut self, curve: Box<dyn Curve3d>, t: Interval) -> FaceId {
        self.insert(Face {
            geometry: FaceGeometry::Curve(curve),
            domain: ParamDomain::Curve(t),
        })
    }

    /// Add a curve face over the curve's natural domain.
    pub fn add_curve(&mut self, curve: Box<dyn Curve3d>) -> FaceId {
        let t = curve.domain();
        self.add_curve_face(curve, t)
    }

    fn insert(&mut self, face: Face) -> FaceId {
        let id = self.faces.insert(face);
        self.order.push(id);
        id
    }

    /// Look up a face.
    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id)
    }

    /// Position of a face in insertion order.
    pub fn face_index(&self, id: FaceId) -> Option<usize> {
        self.order.iter().position(|&f| f == id)
    }

    /// Number of faces.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if the collection has no faces.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate faces in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (FaceId, &Face)> + '_ {
        self.order.iter().map(move |&id| (id, &self.faces[id]))
    }
}

impl BrepFaces for Brep {
    fn faces(&self) -> Vec<FaceId> {
        self.order.clone()
    }

    fn domain(&self, face: FaceId) -> Option<ParamDomain> {
        self.faces.get(face).map(|f| f.domain)
    }
}

impl FaceEvaluator for Brep {
    fn evaluate(&self, face: FaceId, param: Parameter) -> Option<FaceEval> {
        self.faces.get(face)?.evaluate(param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use vcad_kernel_geom::{Circle3d, Plane, SphereSurface};
    use vcad_kernel_math::Point2;

    #[test]
    fn test_faces_keep_insertion_order() {
        let mut brep = Brep::new();
        let a = brep.add_surface(Box::new(SphereSurface::new(1.0)));
        let b = brep.add_surface_face(Box::new(Plane::xy()), Interval::unit(), Interval::unit());
        let c = brep.add_curve(Box::new(Circle3d::new(Point3::origin(), 2.0)));
        assert_eq!(brep.faces(), vec![a, b, c]);
        assert_eq!(brep.face_index(c), Some(2));
        assert_eq!(brep.len(), 3);
    }

    #[test]
    fn test_domain_reports_trim() {
        let mut brep = Brep::new();
        let f = brep.add_surface_face(Box::new(Plane::xy()), Interval::new(-1.0, 0.0), Interval::unit());
        let d = brep.domain(f).unwrap();
        assert_eq!(d.u(), Interval::new(-1.0, 0.0));
        let sphere = brep.add_surface(Box::new(SphereSurface::new(1.0)));
        let d = brep.domain(sphere).unwrap();
        assert!((d.u().max - 2.0 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_surface_face() {
        let mut brep = Brep::new();
        let f = brep.add_surface(Box::new(SphereSurface::new(2.0)));
        let eval = brep.evaluate(f, Parameter::Surface(Point2::new(0.0, 0.0))).unwrap();
        assert!((eval.point.x - 2.0).abs() < 1e-12);
        assert!(eval.dv.is_some());
        assert!(eval.second.is_some());
    }

    #[test]
    fn test_evaluate_curve_face() {
        let mut brep = Brep::new();
        let f = brep.add_curve(Box::new(Circle3d::new(Point3::origin(), 1.0)));
        let eval = brep.evaluate(f, Parameter::Curve(PI / 2.0)).unwrap();
        assert!((eval.point.y - 1.0).abs() < 1e-12);
        assert!(eval.dv.is_none());
        assert!((eval.second.unwrap().duu.y + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_rejects_wrong_parameter_kind() {
        let mut brep = Brep::new();
        let f = brep.add_surface(Box::new(Plane::xy()));
        assert!(brep.evaluate(f, Parameter::Curve(0.5)).is_none());
        assert!(brep.evaluate(FaceId::default(), Parameter::Curve(0.5)).is_none());
    }
}
