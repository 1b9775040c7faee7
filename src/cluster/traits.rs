use super::result::ClusteringResult;
use crate::error::Result;

/// Common interface for density clusterers that report noise, soft memberships,
/// and a validity statistic alongside the hard labels.
pub trait DensityClusterer {
    /// Fit the model on `data` and return the full clustering result.
    fn fit(&self, data: &[Vec<f32>]) -> Result<ClusteringResult>;

    /// Convenience: fit and keep only the labels.
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<i32>> {
        Ok(self.fit(data)?.labels)
    }
}
