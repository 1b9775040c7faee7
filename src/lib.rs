//! Hyperparameter search for embedding clustering.
//!
//! `clump-tune` tunes a two-step pipeline, neighbor-graph reduction followed by
//! HDBSCAN, against labeled embeddings. Each trial draws a configuration from
//! a [`SearchSpace`], clusters the data, and scores the result with a
//! [`CostStrategy`]: either a weighted composite of internal statistics
//! (validity, membership probability, persistence, noise, outlier scores) or
//! the negative adjusted Rand index against the labels. Every trial is kept in
//! a [`TrialLog`] that can be exported as CSV or JSON.
//!
//! - [`cluster`]: HDBSCAN with probabilities, GLOSH outlier scores,
//!   persistence and relative validity
//! - [`reduce`]: cosine kNN fuzzy-graph smoothing and principal projection
//! - [`search`]: search spaces, TPE and random search
//! - [`metrics`]: agreement scores between two labelings
//! - [`trainer`]: the search driver

#![forbid(unsafe_code)]

pub mod cluster;
pub mod config;
pub mod embedding;
pub mod error;
pub mod export;
pub mod metrics;
pub mod objective;
pub mod params;
pub mod pipeline;
pub mod reduce;
pub mod search;
pub mod trainer;

pub use cluster::{
    ClusterSelectionMethod, ClusteringResult, DensityClusterer, DistanceMetric, Hdbscan, NOISE_LABEL,
};
pub use config::TrainerConfig;
pub use embedding::load_embedding;
pub use error::{Error, Result};
pub use export::{export, Table};
pub use metrics::{external_scores, ExternalScores};
pub use objective::{ClusterStats, CostStrategy, Scorer, TrialLog, TrialRecord};
pub use params::{CostFunctionParams, ParameterSet};
pub use pipeline::{generate_clusters, ClusterGenerator, DEFAULT_RANDOM_STATE};
pub use reduce::{NeighborProjection, Reducer};
pub use search::{
    ParameterConfig, ParameterDomain, ParameterValue, RandomSearch, SearchAlgorithm,
    SearchAlgorithmKind, SearchSpace, SearchTrial, Tpe,
};
pub use trainer::{BestResult, ClusterTrainer, TrialOutcome};
