use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Label given to points that were not confidently assigned to any cluster.
pub const NOISE_LABEL: i32 = -1;

/// Everything a density clustering run exposes about one fitted dataset.
///
/// All per-point vectors have the same length and are ordered like the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResult {
    /// Cluster label per point; [`NOISE_LABEL`] for noise, otherwise `0..k`.
    pub labels: Vec<i32>,
    /// Membership strength per point in `[0, 1]`; noise points carry 0.
    pub probabilities: Vec<f64>,
    /// Stability score per selected cluster, indexed by label.
    pub persistence: Vec<f64>,
    /// GLOSH outlier score per point in `[0, 1]`.
    pub outlier_scores: Vec<f64>,
    /// Density-based validity of the whole clustering, computed on the MST.
    pub relative_validity: f64,
    /// Mutual-reachability minimum spanning tree `(u, v, distance)`, sorted by distance.
    pub min_spanning_tree: Vec<(usize, usize, f64)>,
}

impl ClusteringResult {
    /// A clustering in which every one of `n` points is noise.
    pub fn all_noise(n: usize) -> Self {
        Self {
            labels: vec![NOISE_LABEL; n],
            probabilities: vec![0.0; n],
            persistence: Vec::new(),
            outlier_scores: vec![0.0; n],
            relative_validity: 0.0,
            min_spanning_tree: Vec::new(),
        }
    }

    /// Number of clustered points (including noise).
    pub fn n_points(&self) -> usize {
        self.labels.len()
    }

    /// Number of distinct non-noise labels.
    ///
    /// A selected cluster that kept no points (leaf selection on a tree with
    /// no leaves) has a persistence entry but is not counted.
    pub fn n_clusters(&self) -> usize {
        self.labels
            .iter()
            .filter(|&&l| l != NOISE_LABEL)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Number of points labeled as noise.
    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE_LABEL).count()
    }

    /// Labels widened to `i64`, the form the agreement metrics consume.
    pub fn labels_i64(&self) -> Vec<i64> {
        self.labels.iter().map(|&l| i64::from(l)).collect()
    }
}
