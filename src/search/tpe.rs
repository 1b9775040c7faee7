//! Tree-structured Parzen Estimator.
//!
//! Bergstra et al. (2011), "Algorithms for Hyper-Parameter Optimization".
//! After a random startup phase, completed trials are split at the `gamma`
//! loss quantile into a "good" set `l(x)` and a "bad" set `g(x)`, and each
//! parameter is drawn independently to maximise `l(x) / g(x)`.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use super::space::{ParameterConfig, ParameterDomain, ParameterValue, SearchSpace};
use super::trial::SearchTrial;
use super::SearchAlgorithm;
use crate::error::Result;

/// TPE search with a seeded generator.
#[derive(Debug, Clone)]
pub struct Tpe {
    /// Quantile for splitting good/bad (default: 0.25)
    gamma: f64,
    /// Number of startup trials sampled at random (default: 10)
    n_startup: usize,
    /// Candidates drawn from `l(x)` per continuous parameter (default: 24)
    n_candidates: usize,
    /// KDE bandwidth as a fraction of one tenth of the range (default: 1.0)
    kde_bandwidth: f64,
    rng: StdRng,
}

impl Tpe {
    /// Create a TPE search whose draws are fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            gamma: 0.25,
            n_startup: 10,
            n_candidates: 24,
            kde_bandwidth: 1.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Set gamma (quantile for splitting), clamped to `[0.01, 0.99]`.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma.clamp(0.01, 0.99);
        self
    }

    /// Set number of startup trials (at least one).
    pub fn with_startup(mut self, n: usize) -> Self {
        self.n_startup = n.max(1);
        self
    }

    /// Set number of EI candidates per continuous parameter (at least one).
    pub fn with_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }

    fn tpe_sample(&mut self, space: &SearchSpace, completed: &[&SearchTrial]) -> ParameterConfig {
        let n_good = ((completed.len() as f64) * self.gamma).ceil() as usize;
        let n_good = n_good.max(1).min(completed.len() - 1);

        let mut sorted = completed.to_vec();
        sorted.sort_by(|a, b| a.loss.total_cmp(&b.loss));
        let (good, bad) = sorted.split_at(n_good);

        space
            .iter()
            .map(|(name, domain)| {
                let value = self.sample_parameter(name, domain, good, bad);
                (name.clone(), value)
            })
            .collect()
    }

    fn sample_parameter(
        &mut self,
        name: &str,
        domain: &ParameterDomain,
        good: &[&SearchTrial],
        bad: &[&SearchTrial],
    ) -> ParameterValue {
        let floats = |trials: &[&SearchTrial], log: bool| -> Vec<f64> {
            trials
                .iter()
                .filter_map(|t| t.config.get(name)?.as_float())
                .filter(|v| !log || *v > 0.0)
                .map(|v| if log { v.ln() } else { v })
                .collect()
        };

        match domain {
            ParameterDomain::Uniform { low, high } => {
                let v = self.sample_continuous(&floats(good, false), &floats(bad, false), *low, *high);
                ParameterValue::Float(v.clamp(*low, *high))
            }
            ParameterDomain::LogUniform { low, high } => {
                let v = self.sample_continuous(
                    &floats(good, true),
                    &floats(bad, true),
                    low.ln(),
                    high.ln(),
                );
                ParameterValue::Float(v.exp().clamp(*low, *high))
            }
            ParameterDomain::IntRange { low, high } => {
                let mut counts: BTreeMap<i64, (usize, usize)> = BTreeMap::new();
                let observed = |trials: &[&SearchTrial]| {
                    trials
                        .iter()
                        .filter_map(|t| t.config.get(name)?.as_int())
                        .filter(|v| (*low..=*high).contains(v))
                        .collect::<Vec<_>>()
                };
                for v in observed(good) {
                    counts.entry(v).or_default().0 += 1;
                }
                for v in observed(bad) {
                    counts.entry(v).or_default().1 += 1;
                }
                ParameterValue::Int(self.sample_sparse(&counts, *low, *high))
            }
            ParameterDomain::Choice { options } => {
                let counts = |trials: &[&SearchTrial]| {
                    let mut counts = vec![0usize; options.len()];
                    for value in trials.iter().filter_map(|t| t.config.get(name)) {
                        if let Some(i) = options.iter().position(|o| o == value) {
                            counts[i] += 1;
                        }
                    }
                    counts
                };
                let i = self.sample_ratio(&counts(good), &counts(bad));
                options[i].clone()
            }
        }
    }

    /// Draw candidates from the good-set KDE, keep the best `l/g`.
    fn sample_continuous(&mut self, good: &[f64], bad: &[f64], low: f64, high: f64) -> f64 {
        let bandwidth = self.kde_bandwidth * (high - low) / 10.0;
        if good.is_empty() || bandwidth <= 0.0 {
            return low + self.rng.random::<f64>() * (high - low);
        }

        let mut best_value = low;
        let mut best_ei = f64::NEG_INFINITY;
        for _ in 0..self.n_candidates {
            let base = good[self.rng.random_range(0..good.len())];
            // Box-Muller
            let u1: f64 = self.rng.random::<f64>().max(1e-10);
            let u2: f64 = self.rng.random();
            let noise = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos() * bandwidth;
            let candidate = (base + noise).clamp(low, high);

            let ei = kde_score(candidate, good, bandwidth) / (kde_score(candidate, bad, bandwidth) + 1e-10);
            if ei > best_ei {
                best_ei = ei;
                best_value = candidate;
            }
        }
        best_value
    }

    /// Sample an integer in `[low, high]` with weight `(good + 1) / (bad + 1)`.
    ///
    /// Only observed values are stored; every unobserved value has weight 1.
    fn sample_sparse(&mut self, counts: &BTreeMap<i64, (usize, usize)>, low: i64, high: i64) -> i64 {
        let width = (i128::from(high) - i128::from(low) + 1) as u128;
        let unobserved = width - counts.len() as u128;

        let weights: Vec<f64> = counts
            .values()
            .map(|&(l, g)| (l + 1) as f64 / (g + 1) as f64)
            .collect();
        let observed_total: f64 = weights.iter().sum();
        let total = observed_total + unobserved as f64;

        let r = self.rng.random::<f64>() * total;
        if r < observed_total || unobserved == 0 {
            let mut cumsum = 0.0;
            for (&v, w) in counts.keys().zip(&weights) {
                cumsum += w;
                if r < cumsum {
                    return v;
                }
            }
            if let Some((&v, _)) = counts.last_key_value() {
                return v;
            }
        }

        // k-th unobserved value: step over observed values at or below it.
        let mut v = i128::from(low) + self.rng.random_range(0..unobserved) as i128;
        for &o in counts.keys() {
            if i128::from(o) <= v {
                v += 1;
            }
        }
        v as i64
    }

    /// Sample an index with weight `(good + 1) / (bad + 1)`.
    fn sample_ratio(&mut self, good: &[usize], bad: &[usize]) -> usize {
        let weights: Vec<f64> = good
            .iter()
            .zip(bad)
            .map(|(&l, &g)| (l + 1) as f64 / (g + 1) as f64)
            .collect();
        let total: f64 = weights.iter().sum();

        let r = self.rng.random::<f64>() * total;
        let mut cumsum = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cumsum += w;
            if r < cumsum {
                return i;
            }
        }
        weights.len() - 1
    }
}

impl Default for Tpe {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SearchAlgorithm for Tpe {
    fn suggest(&mut self, space: &SearchSpace, history: &[SearchTrial]) -> Result<ParameterConfig> {
        space.validate()?;
        let completed: Vec<&SearchTrial> = history
            .iter()
            .filter(|t| t.is_completed() && !t.loss.is_nan())
            .collect();

        if completed.len() < self.n_startup.max(2) {
            trace!(completed = completed.len(), "tpe startup sample");
            Ok(space.sample_random(&mut self.rng))
        } else {
            Ok(self.tpe_sample(space, &completed))
        }
    }

    fn name(&self) -> &'static str {
        "tpe"
    }
}

/// Mean Gaussian kernel density; an empty set scores 1.
fn kde_score(x: f64, values: &[f64], bandwidth: f64) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    values
        .iter()
        .map(|&v| (-(x - v).powi(2) / (2.0 * bandwidth.powi(2))).exp())
        .sum::<f64>()
        / values.len() as f64
}
