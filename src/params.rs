//! Typed pipeline parameters and objective weights.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cluster::{ClusterSelectionMethod, DistanceMetric};
use crate::error::{Error, Result};
use crate::search::{ParameterConfig, ParameterDomain, ParameterValue, SearchSpace};

pub const N_NEIGHBORS: &str = "n_neighbors";
pub const N_COMPONENTS: &str = "n_components";
pub const MIN_CLUSTER_SIZE: &str = "min_cluster_size";
pub const CLUSTER_SELECTION_EPSILON: &str = "cluster_selection_epsilon";
pub const CLUSTER_SELECTION_METHOD: &str = "cluster_selection_method";
pub const METRIC: &str = "metric";

/// Parameter names in exported column order.
pub const PARAMETER_COLUMNS: [&str; 6] = [
    CLUSTER_SELECTION_EPSILON,
    CLUSTER_SELECTION_METHOD,
    METRIC,
    MIN_CLUSTER_SIZE,
    N_COMPONENTS,
    N_NEIGHBORS,
];

/// One point in the search space, decoded into the types the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub n_neighbors: usize,
    pub n_components: usize,
    pub min_cluster_size: usize,
    pub cluster_selection_epsilon: f64,
    pub cluster_selection_method: ClusterSelectionMethod,
    pub metric: DistanceMetric,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            n_components: 5,
            min_cluster_size: 5,
            cluster_selection_epsilon: 0.0,
            cluster_selection_method: ClusterSelectionMethod::Eom,
            metric: DistanceMetric::Euclidean,
        }
    }
}

impl ParameterSet {
    /// Encode back into a sampled configuration.
    pub fn to_config(&self) -> ParameterConfig {
        let int = |v: usize| ParameterValue::Int(v as i64);
        ParameterConfig::from([
            (N_NEIGHBORS.to_string(), int(self.n_neighbors)),
            (N_COMPONENTS.to_string(), int(self.n_components)),
            (MIN_CLUSTER_SIZE.to_string(), int(self.min_cluster_size)),
            (
                CLUSTER_SELECTION_EPSILON.to_string(),
                ParameterValue::Float(self.cluster_selection_epsilon),
            ),
            (
                CLUSTER_SELECTION_METHOD.to_string(),
                self.cluster_selection_method.as_str().into(),
            ),
            (METRIC.to_string(), self.metric.as_str().into()),
        ])
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n_neighbors={} n_components={} min_cluster_size={} epsilon={} method={} metric={}",
            self.n_neighbors,
            self.n_components,
            self.min_cluster_size,
            self.cluster_selection_epsilon,
            self.cluster_selection_method,
            self.metric
        )
    }
}

fn lookup<'a>(config: &'a ParameterConfig, name: &'static str) -> Result<&'a ParameterValue> {
    config
        .get(name)
        .ok_or_else(|| Error::MissingParameter(name.to_string()))
}

fn count(config: &ParameterConfig, name: &'static str) -> Result<usize> {
    let value = lookup(config, name)?;
    value
        .as_int()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| Error::invalid(name, format!("expected a non-negative integer, got {value}")))
}

fn text<'a>(config: &'a ParameterConfig, name: &'static str) -> Result<&'a str> {
    let value = lookup(config, name)?;
    value
        .as_str()
        .ok_or_else(|| Error::invalid(name, format!("expected a name, got {value}")))
}

impl TryFrom<&ParameterConfig> for ParameterSet {
    type Error = Error;

    fn try_from(config: &ParameterConfig) -> Result<Self> {
        let epsilon = lookup(config, CLUSTER_SELECTION_EPSILON)?;
        let cluster_selection_epsilon = epsilon
            .as_float()
            .filter(|e| e.is_finite() && *e >= 0.0)
            .ok_or_else(|| {
                Error::invalid(
                    "cluster_selection_epsilon",
                    format!("expected a finite non-negative number, got {epsilon}"),
                )
            })?;

        Ok(Self {
            n_neighbors: count(config, N_NEIGHBORS)?,
            n_components: count(config, N_COMPONENTS)?,
            min_cluster_size: count(config, MIN_CLUSTER_SIZE)?,
            cluster_selection_epsilon,
            cluster_selection_method: text(config, CLUSTER_SELECTION_METHOD)?.parse()?,
            metric: text(config, METRIC)?.parse()?,
        })
    }
}

impl SearchSpace {
    /// The space searched when no other is configured.
    pub fn default_space() -> Self {
        SearchSpace::new()
            .with(N_NEIGHBORS, ParameterDomain::IntRange { low: 3, high: 50 })
            .with(N_COMPONENTS, ParameterDomain::IntRange { low: 2, high: 15 })
            .with(MIN_CLUSTER_SIZE, ParameterDomain::IntRange { low: 2, high: 30 })
            .with(
                CLUSTER_SELECTION_EPSILON,
                ParameterDomain::Uniform { low: 0.0, high: 1.0 },
            )
            .with(
                CLUSTER_SELECTION_METHOD,
                ParameterDomain::Choice {
                    options: vec!["eom".into(), "leaf".into()],
                },
            )
            .with(
                METRIC,
                ParameterDomain::Choice {
                    options: vec!["euclidean".into(), "manhattan".into(), "chebyshev".into()],
                },
            )
    }
}

/// Weights of the default composite cost.
///
/// The cost rewards `val_w * relative_validity`, `prob_w * probability` and
/// `pers_w * persistence`, and charges `penalty_w * penalty` and
/// `outlier_w * outlier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostFunctionParams {
    pub val_w: f64,
    pub prob_w: f64,
    pub pers_w: f64,
    pub penalty_w: f64,
    pub outlier_w: f64,
}

impl Default for CostFunctionParams {
    fn default() -> Self {
        Self {
            val_w: 1.0,
            prob_w: 1.0,
            pers_w: 1.0,
            penalty_w: 1.0,
            outlier_w: 1.0,
        }
    }
}

impl CostFunctionParams {
    pub fn with_val_w(mut self, w: f64) -> Self {
        self.val_w = w;
        self
    }

    pub fn with_prob_w(mut self, w: f64) -> Self {
        self.prob_w = w;
        self
    }

    pub fn with_pers_w(mut self, w: f64) -> Self {
        self.pers_w = w;
        self
    }

    pub fn with_penalty_w(mut self, w: f64) -> Self {
        self.penalty_w = w;
        self
    }

    pub fn with_outlier_w(mut self, w: f64) -> Self {
        self.outlier_w = w;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_space_samples_decode() {
        let space = SearchSpace::default_space();
        space.validate().unwrap();
        assert_eq!(space.len(), 6);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let params = ParameterSet::try_from(&space.sample_random(&mut rng)).unwrap();
            assert!((3..=50).contains(&params.n_neighbors));
            assert!((2..=15).contains(&params.n_components));
            assert!((2..=30).contains(&params.min_cluster_size));
            assert!((0.0..=1.0).contains(&params.cluster_selection_epsilon));
            assert_ne!(params.metric, DistanceMetric::Cosine);
        }
    }

    #[test]
    fn config_round_trip() {
        let params = ParameterSet {
            cluster_selection_method: ClusterSelectionMethod::Leaf,
            metric: DistanceMetric::Chebyshev,
            cluster_selection_epsilon: 0.25,
            ..ParameterSet::default()
        };
        assert_eq!(ParameterSet::try_from(&params.to_config()).unwrap(), params);
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let mut config = ParameterSet::default().to_config();
        config.remove(METRIC);
        assert!(matches!(
            ParameterSet::try_from(&config),
            Err(Error::MissingParameter(name)) if name == "metric"
        ));
    }

    #[test]
    fn mistyped_values_are_invalid() {
        let base = ParameterSet::default().to_config();

        let mut config = base.clone();
        config.insert(N_NEIGHBORS.into(), ParameterValue::Int(-3));
        assert!(matches!(
            ParameterSet::try_from(&config),
            Err(Error::InvalidParameter { name: "n_neighbors", .. })
        ));

        let mut config = base.clone();
        config.insert(METRIC.into(), ParameterValue::Float(1.0));
        assert!(matches!(
            ParameterSet::try_from(&config),
            Err(Error::InvalidParameter { name: "metric", .. })
        ));

        let mut config = base.clone();
        config.insert(CLUSTER_SELECTION_METHOD.into(), "middle".into());
        assert!(ParameterSet::try_from(&config).is_err());

        let mut config = base;
        config.insert(CLUSTER_SELECTION_EPSILON.into(), ParameterValue::Float(-0.1));
        assert!(matches!(
            ParameterSet::try_from(&config),
            Err(Error::InvalidParameter { name: "cluster_selection_epsilon", .. })
        ));
    }

    #[test]
    fn integral_floats_are_accepted_as_counts() {
        let mut config = ParameterSet::default().to_config();
        config.insert(MIN_CLUSTER_SIZE.into(), ParameterValue::Float(7.0));
        assert_eq!(ParameterSet::try_from(&config).unwrap().min_cluster_size, 7);
    }

    #[test]
    fn weights_deserialize_with_defaults() {
        let w: CostFunctionParams = serde_json::from_str(r#"{"val_w": 2.0}"#).unwrap();
        assert_eq!(w, CostFunctionParams::default().with_val_w(2.0));
    }
}
