//! The closest-point solver.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};
use vcad_kernel_brep::{Brep, BrepFaces, BrepRef, FaceEvaluator};
use vcad_kernel_math::Point3;
use vcad_kernel_spatial::{KdTree, Neighbor};

use crate::config::{ProjectionConfig, Tolerance};
use crate::error::{ProjectionError, Result};
use crate::refine::{refine, RefineOptions};
use crate::result::ProjectionResult;
use crate::sample::{generate_samples, SamplePoint, SampleSet};

/// Projects points onto the closest point of a brep.
///
/// Construction samples every face and indexes the samples; after that the
/// solver is immutable and can answer queries from many threads at once.
///
/// ```
/// use std::sync::Arc;
/// use vcad_kernel_brep::Brep;
/// use vcad_kernel_geom::SphereSurface;
/// use vcad_kernel_math::Point3;
/// use vcad_kernel_projection::ProjectionSolver;
///
/// let mut brep = Brep::new();
/// brep.add_surface(Box::new(SphereSurface::new(1.0)));
///
/// let solver = ProjectionSolver::new(Arc::new(brep), 1e-6).unwrap();
/// let hit = solver.project(&Point3::new(0.0, 3.0, 0.0)).unwrap();
/// assert!((hit.distance - 2.0).abs() < 1e-6);
/// ```
#[derive(Debug)]
pub struct ProjectionSolver<B = Brep> {
    brep: Arc<B>,
    config: ProjectionConfig,
    samples: SampleSet,
    index: KdTree,
}

impl<B: BrepFaces + FaceEvaluator> ProjectionSolver<B> {
    /// Build a solver with default settings and the given tolerance.
    ///
    /// Fails with [`ProjectionError::InvalidConfiguration`] if `tolerance`
    /// is not positive and finite, and with [`ProjectionError::EmptyBrep`]
    /// if the brep has no faces.
    pub fn new(brep: Arc<B>, tolerance: f64) -> Result<Self> {
        let config = ProjectionConfig {
            tolerance: Tolerance::new(tolerance)?,
            ..Default::default()
        };
        Self::with_config(brep, config)
    }

    /// Build a solver with explicit settings.
    ///
    /// Every face must report a valid parameter domain; sampling fails with
    /// [`ProjectionError::InvalidConfiguration`] otherwise.
    pub fn with_config(brep: Arc<B>, config: ProjectionConfig) -> Result<Self> {
        config.validate()?;

        let samples = generate_samples(brep.as_ref(), config.tolerance, &config.sampling)?;
        let index = KdTree::build(&samples)?;

        info!(
            faces = brep.faces().len(),
            samples = samples.len(),
            tolerance = config.tolerance.get(),
            "built projection solver"
        );

        Ok(Self {
            brep,
            config,
            samples,
            index,
        })
    }

    /// Build a solver from a possibly-empty handle.
    ///
    /// An empty handle fails with [`ProjectionError::EmptyBrep`].
    pub fn from_ref(handle: &BrepRef<B>, config: ProjectionConfig) -> Result<Self> {
        let brep = handle.shared().ok_or(ProjectionError::EmptyBrep)?;
        Self::with_config(brep, config)
    }

    /// Closest point on the brep to `query`.
    ///
    /// Non-finite queries are rejected. Refinement failures are not
    /// errors: the affected face contributes its seed sample instead, and
    /// the result reports `converged == false` if that seed wins.
    pub fn project(&self, query: &Point3) -> Result<ProjectionResult> {
        let coords = [query.x, query.y, query.z];
        let nearest = self.index.nearest(&coords)?;
        let seeds = self.candidate_seeds(&coords, nearest)?;

        let mut best: Option<ProjectionResult> = None;
        for seed in seeds {
            let candidate = self.refine_seed(seed, query)?;
            debug!(
                face = ?candidate.face,
                distance = candidate.distance,
                converged = candidate.converged,
                iterations = candidate.iterations,
                "refined candidate"
            );
            // Strict comparison keeps the earlier (nearer-seeded) face on ties.
            if best.map_or(true, |b| candidate.distance < b.distance) {
                best = Some(candidate);
            }
        }

        match best {
            Some(result) => Ok(result),
            None => Ok(self.seed_result(self.sample(nearest.ordinal)?, query, 0)),
        }
    }

    /// Project many points in parallel. Results are in input order.
    pub fn project_batch(&self, queries: &[Point3]) -> Result<Vec<ProjectionResult>> {
        debug!(count = queries.len(), "projecting batch");
        queries.par_iter().map(|q| self.project(q)).collect()
    }

    /// Project many points on the calling thread. Same results as
    /// [`Self::project_batch`].
    pub fn project_batch_sequential(&self, queries: &[Point3]) -> Result<Vec<ProjectionResult>> {
        queries.iter().map(|q| self.project(q)).collect()
    }

    /// Seeds for refinement among the samples near the query, nearest first.
    ///
    /// Each face contributes its nearest sample, up to `max_candidate_faces`
    /// faces. A face also contributes any sample that coincides with its
    /// nearest one at a different parameter, such as the `u = 0` and
    /// `u = 2π` copies on a periodic seam, since refinement cannot cross a
    /// domain bound.
    fn candidate_seeds(&self, coords: &[f64; 3], nearest: Neighbor) -> Result<Vec<&SamplePoint>> {
        let tolerance = self.config.tolerance.get();
        let radius = nearest.distance() * self.config.candidate_ratio + tolerance;
        let near = self.index.within_radius(coords, radius * radius)?;

        let mut seeds = vec![self.sample(nearest.ordinal)?];
        let mut faces = 1;
        for neighbor in near {
            if neighbor.ordinal == nearest.ordinal {
                continue;
            }
            let sample = self.sample(neighbor.ordinal)?;
            match seeds.iter().find(|s| s.face == sample.face) {
                None if faces < self.config.max_candidate_faces => {
                    faces += 1;
                    seeds.push(sample);
                }
                Some(first)
                    if first.parameter != sample.parameter
                        && (first.position - sample.position).norm() <= tolerance =>
                {
                    seeds.push(sample);
                }
                _ => {}
            }
        }
        Ok(seeds)
    }

    fn refine_seed(&self, seed: &SamplePoint, query: &Point3) -> Result<ProjectionResult> {
        let Some(domain) = self.brep.domain(seed.face) else {
            // Checked when sampling; a brep that drops a domain later only loses refinement.
            warn!(face = ?seed.face, "face lost its parameter domain, using seed sample");
            return Ok(self.seed_result(seed, query, 0));
        };
        let options = RefineOptions {
            tolerance: self.config.tolerance.get(),
            max_iterations: self.config.max_iterations,
        };

        match refine(self.brep.as_ref(), seed.face, &domain, seed.parameter, query, &options) {
            Ok(r) => Ok(ProjectionResult {
                query: *query,
                point: r.point,
                parameter: r.parameter,
                face: seed.face,
                distance: r.distance,
                converged: true,
                iterations: r.iterations,
            }),
            Err(ProjectionError::DidNotConverge {
                face,
                reason,
                iterations,
            }) => {
                warn!(?face, %reason, iterations, "refinement failed, using seed sample");
                Ok(self.seed_result(seed, query, iterations))
            }
            Err(e) => Err(e),
        }
    }

    fn seed_result(&self, seed: &SamplePoint, query: &Point3, iterations: usize) -> ProjectionResult {
        ProjectionResult {
            query: *query,
            point: seed.position,
            parameter: seed.parameter,
            face: seed.face,
            distance: (seed.position - query).norm(),
            converged: false,
            iterations,
        }
    }

    fn sample(&self, ordinal: usize) -> Result<&SamplePoint> {
        self.samples.get(ordinal).ok_or_else(|| {
            ProjectionError::invalid_configuration(format!("sample ordinal {ordinal} out of range"))
        })
    }
}

impl<B> ProjectionSolver<B> {
    /// The samples the index was built over.
    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    /// The spatial index over [`Self::samples`].
    pub fn index(&self) -> &KdTree {
        &self.index
    }

    /// Active settings.
    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// The projected-onto brep.
    pub fn brep(&self) -> &Arc<B> {
        &self.brep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingParams;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use vcad_kernel_brep::{FaceEval, FaceId, ParamDomain, Parameter};
    use vcad_kernel_geom::{Circle3d, CylinderSurface, Plane, SphereSurface, TorusSurface};
    use vcad_kernel_math::{Interval, Vec3};

    fn unit_sphere_solver() -> ProjectionSolver {
        let mut brep = Brep::new();
        brep.add_surface(Box::new(SphereSurface::new(1.0)));
        let config = ProjectionConfig::with_tolerance(1e-6)
            .unwrap()
            .sampling(SamplingParams::grid(10));
        ProjectionSolver::with_config(Arc::new(brep), config).unwrap()
    }

    /// A sphere, a cylinder, a torus and a circular edge, spread apart.
    fn mixed_brep() -> Brep {
        let mut brep = Brep::new();
        brep.add_surface(Box::new(SphereSurface::with_center(Point3::new(-3.0, 0.0, 0.0), 1.0)));
        brep.add_surface_face(
            Box::new(CylinderSurface::with_axis(Point3::new(3.0, 0.0, -1.0), Vec3::z(), 0.75)),
            Interval::new(0.0, 2.0 * std::f64::consts::PI),
            Interval::new(0.0, 2.0),
        );
        brep.add_surface(Box::new(TorusSurface::with_axis(
            Point3::new(0.0, 4.0, 0.0),
            Vec3::z(),
            1.5,
            0.4,
        )));
        brep.add_curve(Box::new(Circle3d::new(Point3::new(0.0, -4.0, 0.0), 1.0)));
        brep
    }

    fn random_queries(n: usize, seed: u64) -> Vec<Point3> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                Point3::new(
                    rng.gen_range(-6.0..6.0),
                    rng.gen_range(-6.0..6.0),
                    rng.gen_range(-3.0..3.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_unit_sphere() {
        let solver = unit_sphere_solver();
        let result = solver.project(&Point3::new(2.0, 0.0, 0.0)).unwrap();
        assert!((result.point - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-5);
        assert!((result.distance - 1.0).abs() < 1e-6);
        assert!(result.converged);
        assert_eq!(result.query, Point3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_sphere_random_queries() {
        let solver = unit_sphere_solver();
        for q in random_queries(50, 7) {
            // Stay clear of the centre and of the degenerate poles.
            if q.coords.norm() < 0.5 || q.z.abs() > q.xy().coords.norm() {
                continue;
            }
            let result = solver.project(&q).unwrap();
            assert_relative_eq!(result.distance, (q.coords.norm() - 1.0).abs(), epsilon = 1e-5);
            assert_relative_eq!(result.offset().norm(), result.distance, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_query_on_sample() {
        let solver = unit_sphere_solver();
        // Pick a sample away from the poles.
        let sample = solver
            .samples()
            .iter()
            .find(|s| s.parameter.v().is_some_and(|v| v.abs() < 1.0))
            .copied()
            .unwrap();
        let result = solver.project(&sample.position).unwrap();
        assert!(result.distance < 1e-6);
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_nearest_sample_on_wrong_face() {
        // Two half-planes meeting along the y axis: A lies flat, B rises at 45°.
        let mut brep = Brep::new();
        let a = brep.add_surface_face(
            Box::new(Plane::xy()),
            Interval::new(-10.0, 0.0),
            Interval::new(-1.0, 1.0),
        );
        let b = brep.add_surface_face(
            Box::new(Plane::new(Point3::origin(), Vec3::new(1.0, 0.0, 1.0), Vec3::y())),
            Interval::new(0.0, 10.0),
            Interval::new(-1.0, 1.0),
        );
        let config = ProjectionConfig::default().sampling(SamplingParams::grid(3));
        let solver = ProjectionSolver::with_config(Arc::new(brep), config).unwrap();

        let query = Point3::new(0.0, 0.0, 1.0);
        let nearest = solver.index().nearest(&[0.0, 0.0, 1.0]).unwrap();
        assert_eq!(solver.samples().get(nearest.ordinal).unwrap().face, a);

        let result = solver.project(&query).unwrap();
        assert_eq!(result.face, b);
        assert!((result.distance - 0.5_f64.sqrt()).abs() < 1e-9);
        assert!((result.point - Point3::new(0.5, 0.0, 0.5)).norm() < 1e-9);
        assert!(result.converged);
    }

    #[test]
    fn test_candidate_face_cap() {
        let mut brep = Brep::new();
        brep.add_surface_face(Box::new(Plane::xy()), Interval::new(-10.0, 0.0), Interval::new(-1.0, 1.0));
        brep.add_surface_face(
            Box::new(Plane::new(Point3::origin(), Vec3::new(1.0, 0.0, 1.0), Vec3::y())),
            Interval::new(0.0, 10.0),
            Interval::new(-1.0, 1.0),
        );
        let config = ProjectionConfig::default()
            .sampling(SamplingParams::grid(3))
            .max_candidate_faces(1);
        let solver = ProjectionSolver::with_config(Arc::new(brep), config).unwrap();
        // Only the nearest sample's face is refined, so the flat face wins.
        let result = solver.project(&Point3::new(0.0, 0.0, 1.0)).unwrap();
        assert!((result.distance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_result_never_worse_than_nearest_sample() {
        let solver = ProjectionSolver::with_config(Arc::new(mixed_brep()), ProjectionConfig::default()).unwrap();
        for q in random_queries(200, 11) {
            let result = solver.project(&q).unwrap();
            let nearest = solver.index().nearest(&[q.x, q.y, q.z]).unwrap();
            assert!(result.distance <= nearest.distance() + 1e-12);
            let domain = solver.brep().domain(result.face).unwrap();
            assert!(domain.contains(result.parameter));
            let eval = solver.brep().evaluate(result.face, result.parameter).unwrap();
            assert!((eval.point - result.point).norm() < 1e-12);
        }
    }

    #[test]
    fn test_batch_matches_sequential() {
        let solver = ProjectionSolver::with_config(Arc::new(mixed_brep()), ProjectionConfig::default()).unwrap();
        let queries = random_queries(300, 3);
        let parallel = solver.project_batch(&queries).unwrap();
        let sequential = solver.project_batch_sequential(&queries).unwrap();
        assert_eq!(parallel, sequential);
        for (q, r) in queries.iter().zip(&parallel) {
            assert_eq!(*q, r.query);
        }
        assert!(solver.project_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_curve_face() {
        let mut brep = Brep::new();
        let edge = brep.add_curve(Box::new(Circle3d::new(Point3::origin(), 1.0)));
        let solver = ProjectionSolver::new(Arc::new(brep), 1e-8).unwrap();
        let result = solver.project(&Point3::new(0.0, 3.0, 1.0)).unwrap();
        assert_eq!(result.face, edge);
        assert!((result.point - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-6);
        assert!((result.distance - 5.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_query_outside_trimmed_face() {
        let mut brep = Brep::new();
        brep.add_surface_face(Box::new(Plane::xy()), Interval::unit(), Interval::unit());
        let solver = ProjectionSolver::new(Arc::new(brep), 1e-6).unwrap();
        let result = solver.project(&Point3::new(3.0, -2.0, 1.0)).unwrap();
        assert!((result.point - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
        assert!(result.converged);
    }

    #[test]
    fn test_failed_refinement_falls_back_to_seed() {
        let mut brep = Brep::new();
        brep.add_surface(Box::new(SphereSurface::new(1.0)));
        let config = ProjectionConfig::default()
            .max_iterations(1)
            .sampling(SamplingParams::grid(5));
        let solver = ProjectionSolver::with_config(Arc::new(brep), config).unwrap();
        let q = Point3::new(1.3, 1.7, 0.4);
        let result = solver.project(&q).unwrap();
        let nearest = solver.index().nearest(&[q.x, q.y, q.z]).unwrap();
        assert!(!result.converged);
        assert_eq!(result.point, solver.samples().get(nearest.ordinal).unwrap().position);
        assert!((result.distance - nearest.distance()).abs() < 1e-12);
    }

    /// A unit square that hides its derivatives, so refinement is singular.
    struct Opaque;

    impl BrepFaces for Opaque {
        fn faces(&self) -> Vec<FaceId> {
            vec![FaceId::default()]
        }

        fn domain(&self, _face: FaceId) -> Option<ParamDomain> {
            Some(ParamDomain::rect(Interval::unit(), Interval::unit()))
        }
    }

    impl FaceEvaluator for Opaque {
        fn evaluate(&self, _face: FaceId, param: Parameter) -> Option<FaceEval> {
            Some(FaceEval {
                point: Point3::new(param.u(), param.v()?, 0.0),
                du: Vec3::zeros(),
                dv: Some(Vec3::zeros()),
                second: None,
            })
        }
    }

    #[test]
    fn test_custom_brep_singular_refinement() {
        let solver = ProjectionSolver::new(Arc::new(Opaque), 1e-6).unwrap();
        let result = solver.project(&Point3::new(0.3, 0.3, 1.0)).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert!((result.point - Point3::new(1.0 / 3.0, 1.0 / 3.0, 0.0)).norm() < 1e-12);
    }

    /// The unit square in the xy plane, on the null face id.
    struct Flat;

    impl BrepFaces for Flat {
        fn faces(&self) -> Vec<FaceId> {
            vec![FaceId::default()]
        }

        fn domain(&self, _face: FaceId) -> Option<ParamDomain> {
            Some(ParamDomain::rect(Interval::unit(), Interval::unit()))
        }
    }

    impl FaceEvaluator for Flat {
        fn evaluate(&self, _face: FaceId, param: Parameter) -> Option<FaceEval> {
            Some(FaceEval {
                point: Point3::new(param.u(), param.v()?, 0.0),
                du: Vec3::x(),
                dv: Some(Vec3::y()),
                second: None,
            })
        }
    }

    #[test]
    fn test_custom_brep_null_face_id() {
        let solver = ProjectionSolver::new(Arc::new(Flat), 1e-6).unwrap();
        assert_eq!(solver.samples().len(), 16);
        let result = solver.project(&Point3::new(0.3, 0.3, 1.0)).unwrap();
        assert!(result.converged);
        assert_eq!(result.face, FaceId::default());
        assert!((result.point - Point3::new(0.3, 0.3, 0.0)).norm() < 1e-9);
        assert!((result.distance - 1.0).abs() < 1e-9);

        let batch = solver
            .project_batch(&[Point3::new(0.9, 0.1, -2.0), Point3::new(2.0, 0.5, 0.0)])
            .unwrap();
        assert!((batch[0].point - Point3::new(0.9, 0.1, 0.0)).norm() < 1e-9);
        assert!((batch[1].point - Point3::new(1.0, 0.5, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_periodic_seam_co_seeds() {
        let solver = unit_sphere_solver();
        let coords = [2.0, -0.05, 0.0];
        let nearest = solver.index().nearest(&coords).unwrap();
        let seeds = solver.candidate_seeds(&coords, nearest).unwrap();

        // The u = 0 and u = 2π copies of the same seam sample are both tried.
        let tau = 2.0 * std::f64::consts::PI;
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].face, seeds[1].face);
        assert!((seeds[0].position - seeds[1].position).norm() <= 1e-6);
        let mut us: Vec<f64> = seeds.iter().map(|s| s.parameter.u()).collect();
        us.sort_by(f64::total_cmp);
        assert!(us[0].abs() < 1e-12);
        assert!((us[1] - tau).abs() < 1e-12);

        // Refinement from u = 0 is pinned at the bound; only the 2π copy reaches the foot.
        let query = Point3::new(2.0, -0.05, 0.0);
        let result = solver.project(&query).unwrap();
        assert!(result.converged);
        assert!((result.parameter.u() - (tau - 0.05_f64.atan2(2.0))).abs() < 1e-6);
        assert!(result.parameter.v().unwrap().abs() < 1e-6);
        assert!((result.distance - (query.coords.norm() - 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_construction_errors() {
        let mut brep = Brep::new();
        brep.add_surface(Box::new(SphereSurface::new(1.0)));
        let brep = Arc::new(brep);

        for bad in [0.0, -1e-6, f64::NAN] {
            assert!(matches!(
                ProjectionSolver::new(brep.clone(), bad),
                Err(ProjectionError::InvalidConfiguration(_))
            ));
        }
        assert!(matches!(
            ProjectionSolver::new(Arc::new(Brep::new()), 1e-6),
            Err(ProjectionError::EmptyBrep)
        ));
        assert!(matches!(
            ProjectionSolver::from_ref(&BrepRef::<Brep>::empty(), ProjectionConfig::default()),
            Err(ProjectionError::EmptyBrep)
        ));
        let handle = BrepRef::from_arc(brep.clone());
        let solver = ProjectionSolver::from_ref(&handle, ProjectionConfig::default()).unwrap();
        assert!(Arc::ptr_eq(solver.brep(), &brep));
    }

    #[test]
    fn test_non_finite_query() {
        let solver = unit_sphere_solver();
        let err = solver.project(&Point3::new(f64::NAN, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, ProjectionError::Spatial(_)));
        assert!(solver
            .project_batch(&[Point3::origin(), Point3::new(0.0, f64::INFINITY, 0.0)])
            .is_err());
    }
}
