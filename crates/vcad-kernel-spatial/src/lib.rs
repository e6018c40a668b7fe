#![warn(missing_docs)]

//! Spatial indexing for the vcad kernel.
//!
//! An immutable k-d tree answering nearest, k-nearest, and fixed-radius
//! queries over a point cloud of any dimension.
//!
//! - [`PointCloud`] - adaptor exposing point count and per-axis coordinates
//! - [`KdTree`] - the index; build once, query from any number of threads
//! - [`Neighbor`] - query result (cloud ordinal and squared distance)
//!
//! # Example
//!
//! ```
//! use nalgebra::Point3;
//! use vcad_kernel_spatial::KdTree;
//!
//! let points = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 2.0, 0.0),
//! ];
//! let tree = KdTree::build(&points).unwrap();
//! let hit = tree.nearest(&[0.9, 0.1, 0.0]).unwrap();
//! assert_eq!(hit.ordinal, 1);
//! ```

mod cloud;
mod error;
mod kdtree;

pub use cloud::{FlatCloud, PointCloud};
pub use error::{Result, SpatialError};
pub use kdtree::{KdTree, Neighbor};
