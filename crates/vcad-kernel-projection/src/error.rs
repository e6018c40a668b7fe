//! Error types for closest-point projection.

use thiserror::Error;
use vcad_kernel_brep::FaceId;
use vcad_kernel_spatial::SpatialError;

/// Why local refinement on one face gave up.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceFailure {
    /// The iteration cap was reached before the update became small enough.
    #[error("iteration limit reached")]
    IterationLimit,
    /// The linearized stationarity system could not be solved.
    #[error("singular linear system")]
    SingularSystem,
    /// No step along the Newton direction reduced the distance.
    #[error("no descent along the Newton direction")]
    NoDescent,
    /// A position, derivative, or update was NaN or infinite.
    #[error("non-finite value during iteration")]
    NonFinite,
    /// The face evaluator returned nothing for a parameter inside the domain.
    #[error("face evaluation failed")]
    EvaluationFailed,
}

/// Errors that can occur while building a solver or answering a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    /// Tolerance, iteration cap, candidate settings, sampling settings, or a
    /// face domain is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The brep has no faces to sample.
    #[error("brep has no faces")]
    EmptyBrep,

    /// Spatial index construction or lookup failed.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// Local refinement on a face did not converge.
    ///
    /// The solver recovers from this by falling back to the seed sample;
    /// it never surfaces from [`crate::ProjectionSolver::project`].
    #[error("projection did not converge on face {face:?} after {iterations} iterations: {reason}")]
    DidNotConverge {
        /// Face being refined.
        face: FaceId,
        /// Why refinement stopped.
        reason: ConvergenceFailure,
        /// Iterations completed before stopping.
        iterations: usize,
    },
}

impl ProjectionError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(details: impl Into<String>) -> Self {
        Self::InvalidConfiguration(details.into())
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProjectionError::invalid_configuration("tolerance must be positive");
        assert!(format!("{err}").contains("tolerance must be positive"));

        let err = ProjectionError::EmptyBrep;
        assert!(format!("{err}").contains("no faces"));

        let err: ProjectionError = SpatialError::DimensionMismatch { expected: 3, found: 2 }.into();
        assert!(format!("{err}").contains("dimension mismatch"));

        let err = ProjectionError::DidNotConverge {
            face: FaceId::default(),
            reason: ConvergenceFailure::SingularSystem,
            iterations: 4,
        };
        assert!(format!("{err}").contains("singular"));
    }
}
