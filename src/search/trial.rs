//! Search history entries.

use serde::{Deserialize, Serialize};

use super::space::ParameterConfig;

/// A single trial (configuration + loss)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTrial {
    /// Trial ID, in evaluation order
    pub id: usize,
    /// Parameter configuration
    pub config: ParameterConfig,
    /// Objective loss (lower is better)
    pub loss: f64,
    /// Trial status
    pub status: TrialStatus,
}

impl SearchTrial {
    /// Create a new pending trial
    pub fn new(id: usize, config: ParameterConfig) -> Self {
        Self {
            id,
            config,
            loss: f64::INFINITY,
            status: TrialStatus::Pending,
        }
    }

    /// Mark trial as complete with its loss
    pub fn complete(&mut self, loss: f64) {
        self.loss = loss;
        self.status = TrialStatus::Completed;
    }

    /// Whether the trial finished and carries a usable loss.
    pub fn is_completed(&self) -> bool {
        self.status == TrialStatus::Completed
    }
}

/// Trial status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    Pending,
    Completed,
}

/// The completed trial with the lowest loss; NaN losses never win.
pub fn best_trial(trials: &[SearchTrial]) -> Option<&SearchTrial> {
    trials
        .iter()
        .filter(|t| t.is_completed() && !t.loss.is_nan())
        .min_by(|a, b| a.loss.total_cmp(&b.loss))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_ignores_pending_and_nan() {
        let mut a = SearchTrial::new(0, ParameterConfig::new());
        a.complete(0.5);
        let mut b = SearchTrial::new(1, ParameterConfig::new());
        b.complete(f64::NAN);
        let c = SearchTrial::new(2, ParameterConfig::new());
        let mut d = SearchTrial::new(3, ParameterConfig::new());
        d.complete(-1.0);

        let trials = vec![a, b, c, d];
        assert_eq!(best_trial(&trials).map(|t| t.id), Some(3));
        assert!(best_trial(&trials[2..3]).is_none());
    }
}
