//! Point cloud adaptors.
//!
//! The index never owns caller geometry directly. It reads it once, at build
//! time, through [`PointCloud`], which only exposes a point count and
//! per-axis coordinate access.

use nalgebra::Point;

use crate::error::{Result, SpatialError};

/// Read-only access to a fixed set of points.
pub trait PointCloud {
    /// Number of points.
    fn count(&self) -> usize;

    /// Number of coordinates per point.
    fn dim(&self) -> usize;

    /// Coordinate `axis` of point `index`.
    ///
    /// Callers guarantee `index < count()` and `axis < dim()`.
    fn coordinate(&self, index: usize, axis: usize) -> f64;
}

impl<const D: usize> PointCloud for [Point<f64, D>] {
    fn count(&self) -> usize {
        self.len()
    }

    fn dim(&self) -> usize {
        D
    }

    fn coordinate(&self, index: usize, axis: usize) -> f64 {
        self[index][axis]
    }
}

impl<const D: usize> PointCloud for [[f64; D]] {
    fn count(&self) -> usize {
        self.len()
    }

    fn dim(&self) -> usize {
        D
    }

    fn coordinate(&self, index: usize, axis: usize) -> f64 {
        self[index][axis]
    }
}

impl<T> PointCloud for Vec<T>
where
    [T]: PointCloud,
{
    fn count(&self) -> usize {
        self.as_slice().count()
    }

    fn dim(&self) -> usize {
        self.as_slice().dim()
    }

    fn coordinate(&self, index: usize, axis: usize) -> f64 {
        self.as_slice().coordinate(index, axis)
    }
}

/// A row-major point cloud of runtime dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatCloud {
    dim: usize,
    coords: Vec<f64>,
}

impl FlatCloud {
    /// Wrap `coords` as consecutive `dim`-tuples.
    ///
    /// Fails if `dim` is zero or `coords.len()` is not a multiple of `dim`.
    pub fn new(dim: usize, coords: Vec<f64>) -> Result<Self> {
        if dim == 0 {
            return Err(SpatialError::invalid_input("point dimension must be at least 1"));
        }
        if coords.len() % dim != 0 {
            return Err(SpatialError::invalid_input(format!(
                "{} coordinates do not divide into {dim}-dimensional points",
                coords.len()
            )));
        }
        Ok(Self { dim, coords })
    }

    /// Coordinates of point `index`.
    pub fn point(&self, index: usize) -> Option<&[f64]> {
        self.coords.get(index * self.dim..(index + 1) * self.dim)
    }
}

impl PointCloud for FlatCloud {
    fn count(&self) -> usize {
        self.coords.len() / self.dim
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn coordinate(&self, index: usize, axis: usize) -> f64 {
        self.coords[index * self.dim + axis]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point2, Point3};

    #[test]
    fn test_nalgebra_points() {
        let pts = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)];
        assert_eq!(pts.count(), 2);
        assert_eq!(pts.dim(), 3);
        assert!((pts.coordinate(1, 2) - 6.0).abs() < 1e-12);

        let flat = [Point2::new(7.0, 8.0)];
        assert_eq!(flat[..].dim(), 2);
        assert!((flat[..].coordinate(0, 1) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_arrays() {
        let pts = vec![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]];
        assert_eq!(pts.count(), 3);
        assert!((pts.coordinate(2, 0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_cloud_validation() {
        assert!(FlatCloud::new(0, vec![]).is_err());
        assert!(FlatCloud::new(3, vec![1.0, 2.0]).is_err());
        let c = FlatCloud::new(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(c.count(), 2);
        assert_eq!(c.point(1), Some(&[3.0, 4.0][..]));
        assert_eq!(c.point(2), None);
    }
}
