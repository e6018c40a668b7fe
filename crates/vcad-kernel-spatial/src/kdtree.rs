//! Immutable k-d tree over a fixed point cloud.
//!
//! The tree is stored implicitly: points are permuted so that the node for
//! the index range `[lo, hi)` sits at `lo + (hi - lo) / 2`, with its left
//! subtree in `[lo, mid)` and right subtree in `[mid + 1, hi)`. The split
//! axis is `depth % dim`. Nothing is mutated after [`KdTree::build`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rayon::prelude::*;
use tracing::debug;

use crate::cloud::PointCloud;
use crate::error::{Result, SpatialError};

/// A nearest-neighbor query result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the point in the cloud the index was built from.
    pub ordinal: usize,
    /// Squared Euclidean distance to the query.
    pub distance_squared: f64,
}

impl Neighbor {
    /// Euclidean distance to the query.
    pub fn distance(&self) -> f64 {
        self.distance_squared.sqrt()
    }

    /// Ordering by distance, then ordinal. This is the tie-break used by
    /// every query: among equidistant points the lowest ordinal wins.
    fn rank(&self, other: &Self) -> Ordering {
        self.distance_squared
            .total_cmp(&other.distance_squared)
            .then(self.ordinal.cmp(&other.ordinal))
    }
}

/// Max-heap entry for k-nearest search.
#[derive(Debug, Clone, Copy)]
struct Ranked(Neighbor);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank(&other.0)
    }
}

/// Nearest-neighbor index over a fixed D-dimensional point cloud.
///
/// Built once, read-only afterwards, and safe to share across threads.
/// Rebuilding means constructing a new index.
#[derive(Debug, Clone)]
pub struct KdTree {
    dim: usize,
    /// Coordinates in tree order, `dim` values per node.
    coords: Vec<f64>,
    /// Cloud ordinal of each node.
    ordinals: Vec<usize>,
}

impl KdTree {
    /// Build an index over `cloud` by recursive median split on alternating axes.
    ///
    /// Fails with [`SpatialError::InvalidInput`] if the cloud is empty,
    /// zero-dimensional, or contains a non-finite coordinate.
    pub fn build<C: PointCloud + ?Sized>(cloud: &C) -> Result<Self> {
        let count = cloud.count();
        let dim = cloud.dim();
        if count == 0 {
            return Err(SpatialError::invalid_input("cannot build an index over an empty point cloud"));
        }
        if dim == 0 {
            return Err(SpatialError::invalid_input("point dimension must be at least 1"));
        }

        let mut source = Vec::with_capacity(count * dim);
        for i in 0..count {
            for axis in 0..dim {
                let c = cloud.coordinate(i, axis);
                if !c.is_finite() {
                    return Err(SpatialError::invalid_input(format!(
                        "point {i} has non-finite coordinate on axis {axis}"
                    )));
                }
                source.push(c);
            }
        }

        let mut order: Vec<usize> = (0..count).collect();
        partition(&source, dim, &mut order, 0);

        let mut coords = Vec::with_capacity(count * dim);
        for &i in &order {
            coords.extend_from_slice(&source[i * dim..(i + 1) * dim]);
        }

        debug!(points = count, dim, "built k-d tree");

        Ok(Self {
            dim,
            coords,
            ordinals: order,
        })
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.ordinals.len()
    }

    /// Always false: an index cannot be built over an empty cloud.
    pub fn is_empty(&self) -> bool {
        self.ordinals.is_empty()
    }

    /// Dimension of the indexed points.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The single nearest point to `query`.
    ///
    /// Among equidistant points the lowest ordinal is returned.
    pub fn nearest(&self, query: &[f64]) -> Result<Neighbor> {
        self.check_query(query)?;
        let mut best = Neighbor {
            ordinal: usize::MAX,
            distance_squared: f64::INFINITY,
        };
        self.search_nearest(query, 0, self.len(), 0, &mut best);
        Ok(best)
    }

    /// Nearest point for each query, in query order.
    ///
    /// Queries are independent and run on the rayon thread pool; the call
    /// returns once every result is ready.
    pub fn nearest_batch<Q>(&self, queries: &[Q]) -> Result<Vec<Neighbor>>
    where
        Q: AsRef<[f64]> + Sync,
    {
        queries
            .par_iter()
            .map(|q| self.nearest(q.as_ref()))
            .collect()
    }

    /// Up to `k` nearest points, sorted by distance then ordinal.
    pub fn nearest_k(&self, query: &[f64], k: usize) -> Result<Vec<Neighbor>> {
        self.check_query(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.search_k(query, 0, self.len(), 0, k, &mut heap);
        Ok(heap.into_sorted_vec().into_iter().map(|r| r.0).collect())
    }

    /// Every point with squared distance `<= radius_squared`, sorted by
    /// distance then ordinal.
    pub fn within_radius(&self, query: &[f64], radius_squared: f64) -> Result<Vec<Neighbor>> {
        self.check_query(query)?;
        if radius_squared.is_nan() {
            return Err(SpatialError::invalid_input("radius is NaN"));
        }
        let mut found = Vec::new();
        self.search_radius(query, 0, self.len(), 0, radius_squared, &mut found);
        found.sort_by(Neighbor::rank);
        Ok(found)
    }

    fn check_query(&self, query: &[f64]) -> Result<()> {
        if query.len() != self.dim {
            return Err(SpatialError::DimensionMismatch {
                expected: self.dim,
                found: query.len(),
            });
        }
        if query.iter().any(|c| !c.is_finite()) {
            return Err(SpatialError::invalid_input("query has a non-finite coordinate"));
        }
        Ok(())
    }

    fn point(&self, node: usize) -> &[f64] {
        &self.coords[node * self.dim..(node + 1) * self.dim]
    }

    fn neighbor(&self, query: &[f64], node: usize) -> Neighbor {
        Neighbor {
            ordinal: self.ordinals[node],
            distance_squared: distance_squared(query, self.point(node)),
        }
    }

    /// Split offset of `query` from the node's splitting plane, and the
    /// (near, far) child ranges.
    fn split(&self, query: &[f64], lo: usize, mid: usize, hi: usize, depth: usize) -> (f64, [(usize, usize); 2]) {
        let axis = depth % self.dim;
        let diff = query[axis] - self.point(mid)[axis];
        let left = (lo, mid);
        let right = (mid + 1, hi);
        if diff < 0.0 {
            (diff, [left, right])
        } else {
            (diff, [right, left])
        }
    }

    fn search_nearest(&self, query: &[f64], lo: usize, hi: usize, depth: usize, best: &mut Neighbor) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let candidate = self.neighbor(query, mid);
        if candidate.rank(best) == Ordering::Less {
            *best = candidate;
        }

        let (diff, [near, far]) = self.split(query, lo, mid, hi, depth);
        self.search_nearest(query, near.0, near.1, depth + 1, best);
        // `<=` so that an equidistant point with a lower ordinal is still found.
        if diff * diff <= best.distance_squared {
            self.search_nearest(query, far.0, far.1, depth + 1, best);
        }
    }

    fn search_k(
        &self,
        query: &[f64],
        lo: usize,
        hi: usize,
        depth: usize,
        k: usize,
        heap: &mut BinaryHeap<Ranked>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let candidate = Ranked(self.neighbor(query, mid));
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }

        let (diff, [near, far]) = self.split(query, lo, mid, hi, depth);
        self.search_k(query, near.0, near.1, depth + 1, k, heap);
        let bound = if heap.len() < k {
            f64::INFINITY
        } else {
            heap.peek().map_or(f64::INFINITY, |worst| worst.0.distance_squared)
        };
        if diff * diff <= bound {
            self.search_k(query, far.0, far.1, depth + 1, k, heap);
        }
    }

    fn search_radius(
        &self,
        query: &[f64],
        lo: usize,
        hi: usize,
        depth: usize,
        radius_squared: f64,
        found: &mut Vec<Neighbor>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let candidate = self.neighbor(query, mid);
        if candidate.distance_squared <= radius_squared {
            found.push(candidate);
        }

        let (diff, [near, far]) = self.split(query, lo, mid, hi, depth);
        self.search_radius(query, near.0, near.1, depth + 1, radius_squared, found);
        if diff * diff <= radius_squared {
            self.search_radius(query, far.0, far.1, depth + 1, radius_squared, found);
        }
    }
}

/// Arrange `order` into implicit k-d tree layout.
fn partition(source: &[f64], dim: usize, order: &mut [usize], depth: usize) {
    if order.len() <= 1 {
        return;
    }
    let axis = depth % dim;
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        source[a * dim + axis]
            .total_cmp(&source[b * dim + axis])
            .then(a.cmp(&b))
    });
    let (left, rest) = order.split_at_mut(mid);
    partition(source, dim, left, depth + 1);
    partition(source, dim, &mut rest[1..], depth + 1);
}

fn distance_squared(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
