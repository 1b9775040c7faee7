use rand::rngs::StdRng;
use rand::SeedableRng;

use super::space::{ParameterConfig, SearchSpace};
use super::trial::SearchTrial;
use super::SearchAlgorithm;
use crate::error::Result;

/// Independent uniform draws from every domain; ignores history.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    rng: StdRng,
}

impl RandomSearch {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SearchAlgorithm for RandomSearch {
    fn suggest(&mut self, space: &SearchSpace, _history: &[SearchTrial]) -> Result<ParameterConfig> {
        space.validate()?;
        Ok(space.sample_random(&mut self.rng))
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
