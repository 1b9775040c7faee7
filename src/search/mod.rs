//! Sequential hyperparameter search.
//!
//! A [`SearchAlgorithm`] proposes the next configuration from a
//! [`SearchSpace`] given the history of evaluated trials. Two are provided:
//!
//! | Algorithm | Uses history | Notes |
//! |-----------|--------------|-------|
//! | [`Tpe`] | yes | random startup, then `l(x)/g(x)` maximisation |
//! | [`RandomSearch`] | no | baseline |
//!
//! Both are seeded: the same seed, space, and losses reproduce the same
//! sequence of suggestions.

mod random;
mod space;
mod tpe;
mod trial;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use random::RandomSearch;
pub use space::{ParameterConfig, ParameterDomain, ParameterValue, SearchSpace};
pub use tpe::Tpe;
pub use trial::{best_trial, SearchTrial, TrialStatus};

/// Proposes configurations to evaluate.
pub trait SearchAlgorithm {
    /// Next configuration to try. `history` holds every trial so far, in
    /// evaluation order.
    fn suggest(&mut self, space: &SearchSpace, history: &[SearchTrial]) -> Result<ParameterConfig>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Selectable search algorithm, as named in configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchAlgorithmKind {
    #[default]
    Tpe,
    Random,
}

impl SearchAlgorithmKind {
    pub fn build(self, seed: u64) -> Box<dyn SearchAlgorithm> {
        match self {
            SearchAlgorithmKind::Tpe => Box::new(Tpe::new(seed)),
            SearchAlgorithmKind::Random => Box::new(RandomSearch::new(seed)),
        }
    }
}

impl fmt::Display for SearchAlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchAlgorithmKind::Tpe => "tpe",
            SearchAlgorithmKind::Random => "random",
        })
    }
}

impl FromStr for SearchAlgorithmKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tpe" => Ok(SearchAlgorithmKind::Tpe),
            "random" => Ok(SearchAlgorithmKind::Random),
            other => Err(Error::Config(format!("unknown search algorithm: {other}"))),
        }
    }
}
