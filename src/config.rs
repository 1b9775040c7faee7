//! JSON-loadable trainer configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::objective::CostStrategy;
use crate::params::CostFunctionParams;
use crate::pipeline::DEFAULT_RANDOM_STATE;
use crate::search::{SearchAlgorithm, SearchAlgorithmKind, SearchSpace};
use crate::trainer::ClusterTrainer;

/// Everything needed to set up and run a search, minus the data.
///
/// Missing fields take their defaults, so `{}` is a valid configuration:
///
/// ```rust
/// use clump_tune::TrainerConfig;
///
/// let config: TrainerConfig = serde_json::from_str(r#"{"strategy": "rand_score", "max_evals": 20}"#).unwrap();
/// assert_eq!(config.max_evals, 20);
/// assert_eq!(config.cost_strategy().unwrap().name(), "rand_score");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// `"default"` or `"rand_score"`.
    pub strategy: String,
    /// Weights for the `"default"` strategy.
    pub weights: CostFunctionParams,
    pub space: SearchSpace,
    pub max_evals: usize,
    pub algorithm: SearchAlgorithmKind,
    /// Seed for the search algorithm.
    pub seed: u64,
    /// Seed for the reduction step.
    pub random_state: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            strategy: "default".to_string(),
            weights: CostFunctionParams::default(),
            space: SearchSpace::default_space(),
            max_evals: 100,
            algorithm: SearchAlgorithmKind::Tpe,
            seed: 0,
            random_state: DEFAULT_RANDOM_STATE,
        }
    }
}

impl TrainerConfig {
    /// Parse a configuration file.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, [`Error::Config`] if it is
    /// not a valid configuration.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.as_ref().display())))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Resolve the strategy name, attaching the configured weights.
    pub fn cost_strategy(&self) -> Result<CostStrategy> {
        CostStrategy::from_name(&self.strategy, self.weights)
    }

    /// The configured search algorithm, seeded with `seed`.
    pub fn search_algorithm(&self) -> Box<dyn SearchAlgorithm> {
        self.algorithm.build(self.seed)
    }

    /// A trainer over the given data with this configuration applied.
    pub fn trainer(&self, embeddings: Vec<Vec<f32>>, labels: Vec<i64>) -> Result<ClusterTrainer> {
        Ok(
            ClusterTrainer::new(self.space.clone(), self.cost_strategy()?, embeddings, labels)?
                .with_random_state(self.random_state),
        )
    }
}
