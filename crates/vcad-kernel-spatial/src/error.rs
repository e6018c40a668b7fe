//! Error types for spatial indexing.

use thiserror::Error;

/// Errors that can occur while building or querying a spatial index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpatialError {
    /// The point cloud or query is unusable (empty, zero-dimensional, or non-finite).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A query's dimension differs from the indexed cloud's dimension.
    #[error("dimension mismatch: index is {expected}-dimensional, query has {found} coordinates")]
    DimensionMismatch {
        /// Dimension of the indexed cloud.
        expected: usize,
        /// Dimension of the offending query.
        found: usize,
    },
}

impl SpatialError {
    /// Create an invalid input error.
    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::InvalidInput(details.into())
    }
}

/// Result type for spatial index operations.
pub type Result<T> = std::result::Result<T, SpatialError>;
