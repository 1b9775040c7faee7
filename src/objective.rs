//! Trial scoring.
//!
//! A [`Scorer`] turns one [`ClusteringResult`] plus ground-truth labels into a
//! [`TrialRecord`]: summary statistics of the clustering, agreement scores
//! against the truth, and the scalar loss the search minimises. Which loss
//! depends on the [`CostStrategy`]:
//!
//! - `Default(w)`: `-(val_w·validity + prob_w·probability + pers_w·persistence)
//!   + (penalty_w·penalty + outlier_w·outlier)`
//! - `RandScore`: `-adjusted_rand_score`
//!
//! The scorer holds no state between calls; the caller owns the [`TrialLog`].

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cluster::ClusteringResult;
use crate::error::{Error, Result};
use crate::metrics::{self, ExternalScores};
use crate::params::{CostFunctionParams, ParameterSet, PARAMETER_COLUMNS};

/// Agreement-score columns, in the order they are computed.
pub const EXTERNAL_COLUMNS: [&str; 6] = [
    "adjusted_rand_score",
    "homogeneity_completeness_v_measure",
    "homogeneity_score",
    "v_measure_score",
    "completeness_score",
    "adjusted_mutual_info_score",
];

/// Clustering statistics that enter the default cost.
pub const STAT_COLUMNS: [&str; 5] = ["relative_validity", "probability", "persistence", "penalty", "outlier"];

pub const WEIGHT_COLUMNS: [&str; 5] = ["val_w", "prob_w", "pers_w", "penalty_w", "outlier_w"];

/// How a clustering is turned into a loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "weights", rename_all = "snake_case")]
pub enum CostStrategy {
    /// Weighted composite of internal statistics.
    Default(CostFunctionParams),
    /// Negative adjusted Rand index against the ground truth.
    RandScore,
}

impl Default for CostStrategy {
    fn default() -> Self {
        CostStrategy::Default(CostFunctionParams::default())
    }
}

impl CostStrategy {
    /// Resolve a strategy name, attaching `weights` when it uses them.
    pub fn from_name(name: &str, weights: CostFunctionParams) -> Result<Self> {
        match name {
            "default" => Ok(CostStrategy::Default(weights)),
            "rand_score" => Ok(CostStrategy::RandScore),
            other => Err(Error::Config(format!(
                "unknown cost strategy {other:?}, expected \"default\" or \"rand_score\""
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CostStrategy::Default(_) => "default",
            CostStrategy::RandScore => "rand_score",
        }
    }

    pub fn weights(&self) -> Option<CostFunctionParams> {
        match self {
            CostStrategy::Default(w) => Some(*w),
            CostStrategy::RandScore => None,
        }
    }

    /// Exported column names, in order.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = Vec::with_capacity(24);
        match self {
            CostStrategy::Default(_) => {
                columns.extend(EXTERNAL_COLUMNS);
                columns.extend(STAT_COLUMNS);
                columns.extend(["score", "cluster_size"]);
                columns.extend(WEIGHT_COLUMNS);
            }
            CostStrategy::RandScore => {
                columns.extend(STAT_COLUMNS);
                columns.push("cluster_size");
                columns.extend(EXTERNAL_COLUMNS);
                columns.push("score");
            }
        }
        columns.extend(PARAMETER_COLUMNS);
        columns
    }

    fn cost(&self, stats: &ClusterStats, external: &ExternalScores) -> f64 {
        match self {
            CostStrategy::RandScore => -external.adjusted_rand_score,
            CostStrategy::Default(w) => {
                -(w.val_w * stats.relative_validity + w.prob_w * stats.probability + w.pers_w * stats.persistence)
                    + (w.penalty_w * stats.penalty + w.outlier_w * stats.outlier)
            }
        }
    }
}

impl fmt::Display for CostStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CostStrategy {
    type Err = Error;

    /// Parses a strategy name with default weights.
    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s, CostFunctionParams::default())
    }
}

/// Internal statistics of one clustering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub relative_validity: f64,
    /// Mean membership probability over all points, noise included.
    pub probability: f64,
    /// Mean persistence over clusters.
    pub persistence: f64,
    /// Fraction of points labeled noise.
    pub penalty: f64,
    /// Mean outlier score over all points.
    pub outlier: f64,
    /// Distinct labels, noise counted as one.
    pub cluster_size: usize,
}

impl ClusterStats {
    pub fn from_result(result: &ClusteringResult) -> Self {
        let n = result.n_points();
        let penalty = if n == 0 {
            0.0
        } else {
            result.noise_count() as f64 / n as f64
        };
        Self {
            relative_validity: result.relative_validity,
            probability: mean(&result.probabilities),
            persistence: mean(&result.persistence),
            penalty,
            outlier: mean(&result.outlier_scores),
            cluster_size: result.labels.iter().collect::<BTreeSet<_>>().len(),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Everything recorded about one evaluated configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub external: ExternalScores,
    pub stats: ClusterStats,
    /// The loss; lower is better.
    pub score: f64,
    /// Weights in effect, for the weighted strategy only.
    pub weights: Option<CostFunctionParams>,
    pub params: ParameterSet,
}

impl TrialRecord {
    /// Column names a record exports under `strategy`.
    pub fn columns(strategy: &CostStrategy) -> Vec<&'static str> {
        strategy.columns()
    }

    /// Fail if any two columns of the `strategy` schema share a name.
    pub fn validate_schema(strategy: &CostStrategy) -> Result<()> {
        let mut seen = HashSet::new();
        for column in strategy.columns() {
            if !seen.insert(column) {
                return Err(Error::SchemaCollision(column.to_string()));
            }
        }
        Ok(())
    }
}

/// Append-only record of every trial, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialLog(Vec<TrialRecord>);

impl TrialLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TrialRecord) {
        self.0.push(record);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrialRecord> {
        self.0.iter()
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.0
    }

    /// Index and record with the lowest score; the first wins ties.
    pub fn best(&self) -> Option<(usize, &TrialRecord)> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.score.is_nan())
            .min_by(|(_, a), (_, b)| a.score.total_cmp(&b.score))
    }
}

impl<'a> IntoIterator for &'a TrialLog {
    type Item = &'a TrialRecord;
    type IntoIter = std::slice::Iter<'a, TrialRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Scores clusterings under a fixed [`CostStrategy`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Scorer {
    strategy: CostStrategy,
}

impl Scorer {
    pub fn new(strategy: CostStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &CostStrategy {
        &self.strategy
    }

    /// Score `clusters` against the ground-truth `labels`.
    ///
    /// # Errors
    ///
    /// [`Error::LengthMismatch`] if `labels` and the clustering cover a
    /// different number of points.
    pub fn score(
        &self,
        clusters: &ClusteringResult,
        labels: &[i64],
        params: &ParameterSet,
    ) -> Result<TrialRecord> {
        if labels.len() != clusters.n_points() {
            return Err(Error::LengthMismatch {
                expected: clusters.n_points(),
                found: labels.len(),
            });
        }

        let stats = ClusterStats::from_result(clusters);
        if clusters.n_points() > 0 && clusters.noise_count() == clusters.n_points() {
            warn!(n_points = clusters.n_points(), %params, "every point labeled noise");
        }

        let external = metrics::external_scores(&clusters.labels_i64(), labels)?;
        debug!(
            adjusted_rand_score = external.adjusted_rand_score,
            homogeneity_completeness_v_measure = %external.homogeneity_completeness_v_measure,
            adjusted_mutual_info_score = external.adjusted_mutual_info_score,
            relative_validity = stats.relative_validity,
            probability = stats.probability,
            persistence = stats.persistence,
            penalty = stats.penalty,
            outlier = stats.outlier,
            cluster_size = stats.cluster_size,
            "trial metrics"
        );

        Ok(TrialRecord {
            score: self.strategy.cost(&stats, &external),
            external,
            stats,
            weights: self.strategy.weights(),
            params: *params,
        })
    }
}
