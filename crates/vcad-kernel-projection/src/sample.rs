//! Face sampling.
//!
//! Every face is covered by a rectangular grid in parameter space. The grid
//! density along each direction comes from a coarse probe of the face: the
//! model-space length and the total tangent turning along that direction.
//! Flat, short directions get few samples; long or strongly curved ones get
//! more, within the configured bounds.

use tracing::debug;
use vcad_kernel_brep::{BrepFaces, FaceEval, FaceEvaluator, FaceId, ParamDomain, Parameter};
use vcad_kernel_math::{Point3, Vec3};
use vcad_kernel_spatial::PointCloud;

use crate::config::{SamplingParams, Tolerance};
use crate::error::{ProjectionError, Result};

/// Probe segments per direction when estimating length and turning.
const PROBE_SEGMENTS: usize = 8;

/// A model-space point on a face, tagged with where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    /// Position in model space.
    pub position: Point3,
    /// Parameter on `face`.
    pub parameter: Parameter,
    /// Source face.
    pub face: FaceId,
}

/// All samples of a brep, in face order.
///
/// Sample ordinals are stable for the lifetime of the set and are the
/// ordinals reported by the spatial index built over it.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<SamplePoint>,
}

impl SampleSet {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample by ordinal.
    pub fn get(&self, ordinal: usize) -> Option<&SamplePoint> {
        self.samples.get(ordinal)
    }

    /// Iterate samples in ordinal order.
    pub fn iter(&self) -> std::slice::Iter<'_, SamplePoint> {
        self.samples.iter()
    }

    /// All samples.
    pub fn as_slice(&self) -> &[SamplePoint] {
        &self.samples
    }

    /// Number of samples taken from `face`.
    pub fn face_sample_count(&self, face: FaceId) -> usize {
        self.samples.iter().filter(|s| s.face == face).count()
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a SamplePoint;
    type IntoIter = std::slice::Iter<'a, SamplePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl PointCloud for SampleSet {
    fn count(&self) -> usize {
        self.samples.len()
    }

    fn dim(&self) -> usize {
        3
    }

    fn coordinate(&self, index: usize, axis: usize) -> f64 {
        self.samples[index].position[axis]
    }
}

/// Sample every face of `brep`.
///
/// Deterministic: the same brep and settings always give the same samples
/// in the same order.
pub fn generate_samples<B>(brep: &B, tolerance: Tolerance, params: &SamplingParams) -> Result<SampleSet>
where
    B: BrepFaces + FaceEvaluator + ?Sized,
{
    params.validate()?;
    let faces = brep.faces();
    if faces.is_empty() {
        return Err(ProjectionError::EmptyBrep);
    }

    let spacing = params.spacing.map(|s| s.max(tolerance.get()));
    let mut samples = Vec::new();

    for face in faces {
        let domain = brep.domain(face).ok_or_else(|| {
            ProjectionError::invalid_configuration(format!("face {face:?} has no parameter domain"))
        })?;
        if !domain.is_valid() {
            return Err(ProjectionError::invalid_configuration(format!(
                "face {face:?} has an invalid parameter domain {domain:?}"
            )));
        }

        let (nu, nv) = grid_size(brep, face, &domain, spacing, params)?;
        let before = samples.len();
        for j in 0..nv {
            let sv = fraction(j, nv);
            for i in 0..nu {
                let parameter = domain.at(fraction(i, nu), sv);
                let position = evaluate(brep, face, parameter)?.point;
                samples.push(SamplePoint {
                    position,
                    parameter,
                    face,
                });
            }
        }
        debug!(?face, nu, nv, count = samples.len() - before, "sampled face");
    }

    Ok(SampleSet { samples })
}

/// `i / (n - 1)`, or 0 for a single sample.
fn fraction(i: usize, n: usize) -> f64 {
    if n > 1 {
        i as f64 / (n - 1) as f64
    } else {
        0.0
    }
}

fn evaluate<B>(brep: &B, face: FaceId, parameter: Parameter) -> Result<FaceEval>
where
    B: FaceEvaluator + ?Sized,
{
    let eval = brep.evaluate(face, parameter).ok_or_else(|| {
        ProjectionError::invalid_configuration(format!(
            "face {face:?} could not be evaluated at {parameter:?}"
        ))
    })?;
    if !(eval.point.coords.iter().all(|c| c.is_finite())) {
        return Err(ProjectionError::invalid_configuration(format!(
            "face {face:?} evaluates to a non-finite point at {parameter:?}"
        )));
    }
    Ok(eval)
}

/// Running length and turning along one probe line.
#[derive(Default)]
struct Extent {
    length: f64,
    turning: f64,
}

impl Extent {
    fn from_line(points: &[Point3], tangents: &[Vec3]) -> Self {
        let length = points.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
        let turning = tangents
            .windows(2)
            .filter(|w| w[0].norm() > 0.0 && w[1].norm() > 0.0)
            .map(|w| w[0].angle(&w[1]))
            .sum();
        Self { length, turning }
    }

    fn max(self, other: Self) -> Self {
        Self {
            length: self.length.max(other.length),
            turning: self.turning.max(other.turning),
        }
    }

    fn count(&self, spacing: Option<f64>, params: &SamplingParams) -> usize {
        let by_length = spacing.map_or(0.0, |s| (self.length / s).ceil());
        let by_turning = (self.turning / params.max_turn_angle).ceil();
        let wanted = by_length.max(by_turning);
        // Saturate before converting so huge faces cannot overflow.
        let wanted = if wanted.is_finite() {
            wanted.min(params.max_per_direction as f64) as usize + 1
        } else {
            params.max_per_direction
        };
        wanted.clamp(params.min_per_direction, params.max_per_direction)
    }
}

/// Samples along `u` and `v` for one face. Curve faces get `(n, 1)`.
fn grid_size<B>(
    brep: &B,
    face: FaceId,
    domain: &ParamDomain,
    spacing: Option<f64>,
    params: &SamplingParams,
) -> Result<(usize, usize)>
where
    B: FaceEvaluator + ?Sized,
{
    let steps = PROBE_SEGMENTS + 1;
    let probe_v = if domain.dim() == 2 { steps } else { 1 };

    // Probe grid, row-major over v.
    let mut evals = Vec::with_capacity(steps * probe_v);
    for j in 0..probe_v {
        for i in 0..steps {
            let param = domain.at(fraction(i, steps), fraction(j, probe_v));
            evals.push(evaluate(brep, face, param)?);
        }
    }

    let mut along_u = Extent::default();
    for row in evals.chunks(steps) {
        let points: Vec<Point3> = row.iter().map(|e| e.point).collect();
        let tangents: Vec<Vec3> = row.iter().map(|e| e.du).collect();
        along_u = along_u.max(Extent::from_line(&points, &tangents));
    }
    let nu = along_u.count(spacing, params);

    if probe_v == 1 {
        return Ok((nu, 1));
    }

    let mut along_v = Extent::default();
    for i in 0..steps {
        let column: Vec<&FaceEval> = (0..probe_v).map(|j| &evals[j * steps + i]).collect();
        let points: Vec<Point3> = column.iter().map(|e| e.point).collect();
        let tangents: Vec<Vec3> = column.iter().filter_map(|e| e.dv).collect();
        along_v = along_v.max(Extent::from_line(&points, &tangents));
    }
    let nv = along_v.count(spacing, params);

    Ok((nu, nv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcad_kernel_brep::Brep;
    use vcad_kernel_geom::{Circle3d, Line3d, Plane, SphereSurface};
    use vcad_kernel_math::Interval;

    fn tol() -> Tolerance {
        Tolerance::new(1e-6).unwrap()
    }

    #[test]
    fn test_empty_brep() {
        let brep = Brep::new();
        let err = generate_samples(&brep, tol(), &SamplingParams::default()).unwrap_err();
        assert_eq!(err, ProjectionError::EmptyBrep);
    }

    #[test]
    fn test_fixed_grid_counts() {
        let mut brep = Brep::new();
        let sphere = brep.add_surface(Box::new(SphereSurface::new(1.0)));
        let edge = brep.add_curve(Box::new(Circle3d::new(Point3::origin(), 2.0)));
        let set = generate_samples(&brep, tol(), &SamplingParams::grid(10)).unwrap();
        assert_eq!(set.face_sample_count(sphere), 100);
        assert_eq!(set.face_sample_count(edge), 10);
        assert_eq!(set.len(), 110);
        assert_eq!(set.count(), 110);
        assert_eq!(set.dim(), 3);
    }

    #[test]
    fn test_samples_include_domain_corners() {
        let mut brep = Brep::new();
        let u = Interval::new(-2.0, 3.0);
        let v = Interval::new(0.5, 1.5);
        brep.add_surface_face(Box::new(Plane::xy()), u, v);
        let set = generate_samples(&brep, tol(), &SamplingParams::grid(4)).unwrap();
        let has = |x: f64, y: f64| {
            set.iter()
                .any(|s| (s.position - Point3::new(x, y, 0.0)).norm() < 1e-12)
        };
        assert!(has(-2.0, 0.5));
        assert!(has(3.0, 0.5));
        assert!(has(-2.0, 1.5));
        assert!(has(3.0, 1.5));
    }

    #[test]
    fn test_samples_lie_on_faces() {
        let mut brep = Brep::new();
        brep.add_surface(Box::new(SphereSurface::new(2.5)));
        let set = generate_samples(&brep, tol(), &SamplingParams::default()).unwrap();
        for s in &set {
            assert!((s.position.coords.norm() - 2.5).abs() < 1e-12);
            let eval = brep.evaluate(s.face, s.parameter).unwrap();
            assert!((eval.point - s.position).norm() < 1e-12);
        }
    }

    #[test]
    fn test_deterministic() {
        let mut brep = Brep::new();
        brep.add_surface(Box::new(SphereSurface::new(1.0)));
        brep.add_curve(Box::new(Line3d::from_points(Point3::origin(), Point3::new(1.0, 1.0, 0.0))));
        let a = generate_samples(&brep, tol(), &SamplingParams::default()).unwrap();
        let b = generate_samples(&brep, tol(), &SamplingParams::default()).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_curvature_drives_density() {
        let mut brep = Brep::new();
        let sphere = brep.add_surface(Box::new(SphereSurface::new(1.0)));
        let plane = brep.add_surface_face(Box::new(Plane::xy()), Interval::unit(), Interval::unit());
        let set = generate_samples(&brep, tol(), &SamplingParams::default()).unwrap();
        // Longitude turns 2π and latitude π, at π/8 per step.
        let n = set.face_sample_count(sphere);
        assert!(n >= 17 * 9 && n <= 18 * 10, "sphere got {n} samples");
        // A flat unit square has no turning and falls back to the minimum.
        assert_eq!(set.face_sample_count(plane), 16);
    }

    #[test]
    fn test_spacing_drives_density() {
        let mut brep = Brep::new();
        let line = brep.add_curve_face(
            Box::new(Line3d::from_points(Point3::origin(), Point3::new(10.0, 0.0, 0.0))),
            Interval::unit(),
        );
        // 10 / 0.45 = 22.2, rounded up, plus the closing endpoint.
        let params = SamplingParams::default().with_spacing(0.45);
        let set = generate_samples(&brep, tol(), &params).unwrap();
        assert_eq!(set.face_sample_count(line), 24);

        // Spacing is floored at the tolerance and capped by max_per_direction.
        let params = SamplingParams::default().with_spacing(1e-12);
        let set = generate_samples(&brep, tol(), &params).unwrap();
        assert_eq!(set.face_sample_count(line), 64);
    }

    #[test]
    fn test_invalid_domain() {
        let mut brep = Brep::new();
        brep.add_surface_face(Box::new(Plane::xy()), Interval::new(1.0, 0.0), Interval::unit());
        let err = generate_samples(&brep, tol(), &SamplingParams::default()).unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidConfiguration(_)));
    }
}
