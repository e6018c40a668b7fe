//! Projection results.

use serde::Serialize;
use vcad_kernel_brep::{FaceId, Parameter};
use vcad_kernel_math::{Point3, Vec3};

/// The closest point found on a brep for one query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectionResult {
    /// The query point.
    pub query: Point3,
    /// Closest point found on the brep.
    pub point: Point3,
    /// Parameter of `point` on `face`.
    pub parameter: Parameter,
    /// Face `point` lies on.
    pub face: FaceId,
    /// Distance from `query` to `point`.
    pub distance: f64,
    /// False if refinement on the chosen face did not converge and `point`
    /// is the seed sample.
    pub converged: bool,
    /// Newton iterations spent on the chosen face.
    pub iterations: usize,
}

impl ProjectionResult {
    /// Vector from the query to the closest point.
    pub fn offset(&self) -> Vec3 {
        self.point - self.query
    }
}
