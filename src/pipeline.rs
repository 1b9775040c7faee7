//! Reduce-then-cluster pipeline evaluated once per trial.

use tracing::trace;

use crate::cluster::{
    ClusterSelectionMethod, ClusteringResult, DensityClusterer, DistanceMetric, Hdbscan,
};
use crate::error::Result;
use crate::params::ParameterSet;
use crate::reduce::{NeighborProjection, Reducer};

/// Seed used for the reduction when the caller does not pick one.
pub const DEFAULT_RANDOM_STATE: u64 = 42;

/// Runs the reduction and clustering steps with explicit parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterGenerator;

impl ClusterGenerator {
    /// Reduce `embeddings` to `n_components` dimensions, then cluster them.
    ///
    /// Deterministic for identical inputs and `random_state`.
    #[allow(clippy::too_many_arguments)]
    pub fn generate(
        embeddings: &[Vec<f32>],
        min_cluster_size: usize,
        cluster_selection_epsilon: f64,
        cluster_selection_method: ClusterSelectionMethod,
        metric: DistanceMetric,
        n_neighbors: usize,
        n_components: usize,
        random_state: u64,
    ) -> Result<ClusteringResult> {
        let reduced = NeighborProjection::new(n_neighbors, n_components)
            .with_random_state(random_state)
            .fit_transform(embeddings)?;
        trace!(
            n_points = reduced.len(),
            n_components,
            "reduced embeddings"
        );

        Hdbscan::new(min_cluster_size)
            .with_cluster_selection_epsilon(cluster_selection_epsilon)
            .with_cluster_selection_method(cluster_selection_method)
            .with_metric(metric)
            .fit(&reduced)
    }
}

/// [`ClusterGenerator::generate`] driven by a decoded [`ParameterSet`].
pub fn generate_clusters(
    embeddings: &[Vec<f32>],
    params: &ParameterSet,
    random_state: u64,
) -> Result<ClusteringResult> {
    ClusterGenerator::generate(
        embeddings,
        params.min_cluster_size,
        params.cluster_selection_epsilon,
        params.cluster_selection_method,
        params.metric,
        params.n_neighbors,
        params.n_components,
        random_state,
    )
}
