//! Neighbor-graph dimensionality reduction ahead of density clustering.
//!
//! [`NeighborProjection`] follows the first half of UMAP: a cosine k-nearest-neighbor
//! graph whose edges carry fuzzy membership strengths (smooth kNN distances with
//! local connectivity 1, then a fuzzy union to symmetrize). Instead of optimizing a
//! layout with negative sampling, each point is pulled toward its weighted
//! neighbors and the smoothed cloud is projected onto its leading principal axes.
//! The result keeps local neighborhoods tight, which is what the clustering step
//! downstream needs, and is fully determined by the input and `random_state`.

use std::collections::BTreeMap;

use rand::prelude::*;

use crate::cluster::util::{normalize_in_place, validate_points};
use crate::cluster::DistanceMetric;
use crate::error::{Error, Result};

/// Maps high-dimensional points into a lower-dimensional space.
pub trait Reducer {
    /// Fit on `data` and return one reduced point per input point.
    fn fit_transform(&self, data: &[Vec<f32>]) -> Result<Vec<Vec<f32>>>;
}

const SMOOTH_K_TOLERANCE: f64 = 1e-5;
const SMOOTH_K_MAX_ITER: usize = 64;
const MIN_K_DIST_SCALE: f64 = 1e-3;
const POWER_ITERATIONS: usize = 100;

/// Cosine kNN fuzzy-graph smoothing followed by a principal-axis projection.
#[derive(Debug, Clone)]
pub struct NeighborProjection {
    n_neighbors: usize,
    n_components: usize,
    random_state: u64,
}

impl NeighborProjection {
    /// Create a reducer with the given neighborhood size and output dimension.
    pub fn new(n_neighbors: usize, n_components: usize) -> Self {
        Self {
            n_neighbors,
            n_components,
            ..Self::default()
        }
    }

    /// Seed for the power-iteration start vectors.
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    fn validate(&self, n_points: usize) -> Result<()> {
        if self.n_neighbors < 2 {
            return Err(Error::invalid("n_neighbors", "must be at least 2"));
        }
        if self.n_components == 0 {
            return Err(Error::invalid("n_components", "must be at least 1"));
        }
        if self.n_neighbors >= n_points {
            return Err(Error::TooFewPoints {
                n_points,
                required: self.n_neighbors,
            });
        }
        Ok(())
    }
}

impl Default for NeighborProjection {
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            n_components: 2,
            random_state: 42,
        }
    }
}

impl Reducer for NeighborProjection {
    fn fit_transform(&self, data: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        let dim = validate_points(data)?;
        self.validate(data.len())?;

        let normalized: Vec<Vec<f32>> = data
            .iter()
            .map(|p| {
                let mut v = p.clone();
                normalize_in_place(&mut v);
                v
            })
            .collect();

        let knn = nearest_neighbors(&normalized, self.n_neighbors);
        let graph = fuzzy_graph(&knn, self.n_neighbors);
        let smoothed = smooth(&normalized, &graph, dim);

        let mut rng = StdRng::seed_from_u64(self.random_state);
        Ok(principal_projection(&smoothed, dim, self.n_components, &mut rng))
    }
}

/// Exact kNN in cosine distance; each row is sorted by distance.
fn nearest_neighbors(points: &[Vec<f32>], k: usize) -> Vec<Vec<(usize, f64)>> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let mut row: Vec<(usize, f64)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (j, DistanceMetric::Cosine.distance(&points[i], &points[j])))
                .collect();
            row.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            row.truncate(k);
            row
        })
        .collect()
}

/// Binary search for sigma so that `sum exp(-(d - rho) / sigma) == log2(k)`.
fn smooth_knn_sigma(dists: &[f64], rho: f64, k: usize) -> f64 {
    let target = (k as f64).log2();
    let (mut lo, mut hi, mut mid) = (0.0f64, f64::INFINITY, 1.0f64);

    for _ in 0..SMOOTH_K_MAX_ITER {
        let psum: f64 = dists
            .iter()
            .map(|&d| {
                let gap = d - rho;
                if gap > 0.0 {
                    (-gap / mid).exp()
                } else {
                    1.0
                }
            })
            .sum();

        if (psum - target).abs() < SMOOTH_K_TOLERANCE {
            break;
        }
        if psum > target {
            hi = mid;
            mid = (lo + hi) / 2.0;
        } else {
            lo = mid;
            mid = if hi.is_infinite() { mid * 2.0 } else { (lo + hi) / 2.0 };
        }
    }

    let mean = dists.iter().sum::<f64>() / dists.len().max(1) as f64;
    mid.max(MIN_K_DIST_SCALE * mean)
}

/// Directed membership strengths, symmetrized with the fuzzy union `a + b - ab`.
fn fuzzy_graph(knn: &[Vec<(usize, f64)>], k: usize) -> Vec<BTreeMap<usize, f64>> {
    let n = knn.len();
    let directed: Vec<BTreeMap<usize, f64>> = knn
        .iter()
        .map(|row| {
            let dists: Vec<f64> = row.iter().map(|&(_, d)| d).collect();
            let rho = dists.iter().copied().find(|&d| d > 0.0).unwrap_or(0.0);
            let sigma = smooth_knn_sigma(&dists, rho, k);
            row.iter()
                .map(|&(j, d)| {
                    let w = if d - rho <= 0.0 || sigma <= 0.0 {
                        1.0
                    } else {
                        (-(d - rho) / sigma).exp()
                    };
                    (j, w)
                })
                .collect()
        })
        .collect();

    let mut graph: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
    for (i, row) in directed.iter().enumerate() {
        for (&j, &a) in row {
            let b = directed[j].get(&i).copied().unwrap_or(0.0);
            let w = a + b - a * b;
            graph[i].insert(j, w);
            graph[j].insert(i, w);
        }
    }
    graph
}

fn smooth(points: &[Vec<f32>], graph: &[BTreeMap<usize, f64>], dim: usize) -> Vec<Vec<f64>> {
    points
        .iter()
        .zip(graph)
        .map(|(p, edges)| {
            let mut acc: Vec<f64> = p.iter().map(|&x| f64::from(x)).collect();
            let mut total = 1.0;
            for (&j, &w) in edges {
                for (a, &x) in acc.iter_mut().zip(&points[j]) {
                    *a += w * f64::from(x);
                }
                total += w;
            }
            debug_assert_eq!(acc.len(), dim);
            acc.iter_mut().for_each(|a| *a /= total);
            acc
        })
        .collect()
}

/// Project centered points onto their `n_components` leading principal axes.
///
/// Axes are found by power iteration without forming the covariance matrix;
/// components past the data's rank come out as zeros.
fn principal_projection<R: Rng>(
    points: &[Vec<f64>],
    dim: usize,
    n_components: usize,
    rng: &mut R,
) -> Vec<Vec<f32>> {
    let n = points.len();
    let mut mean = vec![0.0f64; dim];
    for p in points {
        for (m, &x) in mean.iter_mut().zip(p) {
            *m += x;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n as f64);
    let centered: Vec<Vec<f64>> = points
        .iter()
        .map(|p| p.iter().zip(&mean).map(|(x, m)| x - m).collect())
        .collect();

    let mut axes: Vec<Vec<f64>> = Vec::with_capacity(n_components);
    for _ in 0..n_components {
        let mut v: Vec<f64> = (0..dim).map(|_| rng.random::<f64>() * 2.0 - 1.0).collect();
        if !orthonormalize(&mut v, &axes) {
            axes.push(vec![0.0; dim]);
            continue;
        }
        for _ in 0..POWER_ITERATIONS {
            // v <- X^T X v
            let scores: Vec<f64> = centered.iter().map(|row| dot(row, &v)).collect();
            let mut next = vec![0.0f64; dim];
            for (row, &s) in centered.iter().zip(&scores) {
                for (acc, &x) in next.iter_mut().zip(row) {
                    *acc += s * x;
                }
            }
            if !orthonormalize(&mut next, &axes) {
                // No variance left outside the axes found so far.
                break;
            }
            let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
            v = next;
            if delta < 1e-10 {
                break;
            }
        }
        let variance: f64 = centered.iter().map(|row| dot(row, &v).powi(2)).sum();
        if variance <= f64::EPSILON {
            axes.push(vec![0.0; dim]);
        } else {
            axes.push(v);
        }
    }

    centered
        .iter()
        .map(|row| axes.iter().map(|axis| dot(row, axis) as f32).collect())
        .collect()
}

/// Gram-Schmidt `v` against `basis` and normalize; false if nothing is left.
fn orthonormalize(v: &mut [f64], basis: &[Vec<f64>]) -> bool {
    for b in basis {
        let proj = dot(v, b);
        for (x, &y) in v.iter_mut().zip(b) {
            *x -= proj * y;
        }
    }
    let norm = dot(v, v).sqrt();
    if norm < 1e-12 {
        return false;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    true
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
