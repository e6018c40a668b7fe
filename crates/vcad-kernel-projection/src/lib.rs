#![warn(missing_docs)]

//! Closest-point projection onto B-rep faces.
//!
//! A [`ProjectionSolver`] samples every face of a brep once, indexes the
//! samples in a k-d tree, and then answers "closest point on the brep to
//! this point" queries:
//!
//! 1. find the nearest sample and every sample within a configurable
//!    multiple of its distance,
//! 2. take one seed per nearby face and refine it with a damped Newton
//!    iteration on the face's parameter domain,
//! 3. return the candidate with the smallest true distance.
//!
//! The nearest sample is only a heuristic: on curved or adjacent faces the
//! true closest point may belong to a face whose samples are all farther
//! away, which is why several faces are refined. The result is the best
//! refined candidate, not a certified global minimum.
//!
//! Refinement failures (singular systems, stalls, iteration cap) are
//! contained per candidate: the face falls back to its seed sample and the
//! result is flagged with `converged == false`.

pub mod config;
pub mod error;
pub mod refine;
mod result;
mod sample;
mod solver;

pub use config::{ProjectionConfig, SamplingParams, Tolerance};
pub use error::{ConvergenceFailure, ProjectionError, Result};
pub use result::ProjectionResult;
pub use sample::{generate_samples, SamplePoint, SampleSet};
pub use solver::ProjectionSolver;

pub use vcad_kernel_brep::{Brep, BrepFaces, BrepRef, FaceEvaluator, FaceId, ParamDomain, Parameter};
