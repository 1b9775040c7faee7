//! Search driver: suggest, evaluate, score, record.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::{debug, info};

use crate::cluster::ClusteringResult;
use crate::error::{Error, Result};
use crate::export::{export, Table};
use crate::objective::{CostStrategy, Scorer, TrialLog, TrialRecord};
use crate::params::ParameterSet;
use crate::pipeline::{generate_clusters, DEFAULT_RANDOM_STATE};
use crate::search::{SearchAlgorithm, SearchSpace, SearchTrial};

/// One evaluated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    /// Loss reported to the search algorithm.
    pub loss: f64,
    pub record: TrialRecord,
    pub clusters: ClusteringResult,
}

/// Best configuration found by [`ClusterTrainer::train`] and its clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct BestResult {
    pub best_params: ParameterSet,
    pub best_clusters: ClusteringResult,
}

/// Tunes the reduce-then-cluster pipeline on one labeled embedding set.
///
/// # Example
///
/// ```rust,no_run
/// use clump_tune::{ClusterTrainer, CostStrategy, SearchSpace, Tpe};
///
/// let embeddings = clump_tune::load_embedding("embeddings.npy")?;
/// let labels: Vec<i64> = vec![0; embeddings.len()];
///
/// let mut trainer = ClusterTrainer::new(
///     SearchSpace::default_space(),
///     CostStrategy::default(),
///     embeddings,
///     labels,
/// )?;
/// trainer.train(50, &mut Tpe::new(0))?;
/// println!("{:?}", trainer.best_params());
/// trainer.save_logs_to_csv("trials.csv", Some("embeddings"))?;
/// # Ok::<(), clump_tune::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ClusterTrainer {
    space: SearchSpace,
    scorer: Scorer,
    embeddings: Vec<Vec<f32>>,
    labels: Vec<i64>,
    random_state: u64,
    logs: TrialLog,
    trials: Vec<SearchTrial>,
    best: Option<BestResult>,
}

impl ClusterTrainer {
    /// Create a trainer over `embeddings` with one ground-truth label per row.
    ///
    /// # Errors
    ///
    /// [`Error::LengthMismatch`] if the label count differs from the row
    /// count, [`Error::EmptySpace`] or [`Error::Config`] for an unusable
    /// space, [`Error::SchemaCollision`] if the record columns collide.
    pub fn new(
        space: SearchSpace,
        strategy: CostStrategy,
        embeddings: Vec<Vec<f32>>,
        labels: Vec<i64>,
    ) -> Result<Self> {
        if labels.len() != embeddings.len() {
            return Err(Error::LengthMismatch {
                expected: embeddings.len(),
                found: labels.len(),
            });
        }
        space.validate()?;
        TrialRecord::validate_schema(&strategy)?;

        Ok(Self {
            space,
            scorer: Scorer::new(strategy),
            embeddings,
            labels,
            random_state: DEFAULT_RANDOM_STATE,
            logs: TrialLog::new(),
            trials: Vec::new(),
            best: None,
        })
    }

    /// Seed for the reduction step of every trial.
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn strategy(&self) -> &CostStrategy {
        self.scorer.strategy()
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Every record so far, in evaluation order.
    pub fn logs(&self) -> &TrialLog {
        &self.logs
    }

    /// Search history as seen by the algorithm.
    pub fn trials(&self) -> &[SearchTrial] {
        &self.trials
    }

    pub fn best(&self) -> Option<&BestResult> {
        self.best.as_ref()
    }

    pub fn best_params(&self) -> Option<&ParameterSet> {
        self.best.as_ref().map(|b| &b.best_params)
    }

    pub fn best_clusters(&self) -> Option<&ClusteringResult> {
        self.best.as_ref().map(|b| &b.best_clusters)
    }

    /// Cluster and score one configuration without recording it.
    pub fn objective(&self, params: &ParameterSet) -> Result<TrialOutcome> {
        let clusters = generate_clusters(&self.embeddings, params, self.random_state)?;
        let record = self.scorer.score(&clusters, &self.labels, params)?;
        Ok(TrialOutcome {
            loss: record.score,
            record,
            clusters,
        })
    }

    /// Run `max_evals` sequential trials, then keep the best configuration.
    ///
    /// Trials accumulate across calls. The first failing trial aborts the run
    /// and its error is returned; trials before it stay recorded.
    pub fn train(&mut self, max_evals: usize, algorithm: &mut dyn SearchAlgorithm) -> Result<()> {
        if max_evals == 0 {
            return Err(Error::NoTrials);
        }
        info!(
            max_evals,
            algorithm = algorithm.name(),
            strategy = %self.strategy(),
            n_points = self.embeddings.len(),
            "starting search"
        );

        for _ in 0..max_evals {
            let config = algorithm.suggest(&self.space, &self.trials)?;
            let params = ParameterSet::try_from(&config)?;
            let outcome = self.objective(&params)?;

            let id = self.trials.len();
            info!(
                trial = id,
                score = outcome.loss,
                cluster_size = outcome.record.stats.cluster_size,
                %params,
                "trial complete"
            );

            self.logs.push(outcome.record);
            let mut trial = SearchTrial::new(id, config);
            trial.complete(outcome.loss);
            self.trials.push(trial);
        }

        let (best_index, best_params) = self
            .logs
            .best()
            .map(|(i, record)| (i, record.params))
            .ok_or(Error::NoTrials)?;
        debug!(trial = best_index, "regenerating best clustering");
        let best_clusters = generate_clusters(&self.embeddings, &best_params, self.random_state)?;
        self.best = Some(BestResult {
            best_params,
            best_clusters,
        });

        info!(
            best_trial = best_index,
            best_score = self.logs.records()[best_index].score,
            "finished training"
        );
        Ok(())
    }

    /// Tabulate the log under the trainer's strategy.
    pub fn export(&self, dataset: Option<&str>) -> Result<Table> {
        export(&self.logs, self.strategy(), dataset)
    }

    /// Write the log as CSV to `path` and return the table written.
    pub fn save_logs_to_csv<P: AsRef<Path>>(&self, path: P, dataset: Option<&str>) -> Result<Table> {
        let table = self.export(dataset)?;
        let file = File::create(path.as_ref())?;
        table.write_csv(BufWriter::new(file))?;
        debug!(path = %path.as_ref().display(), rows = table.n_rows(), "saved trial log");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{ParameterDomain, RandomSearch, Tpe};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn blobs() -> (Vec<Vec<f32>>, Vec<i64>) {
        let mut rng = StdRng::seed_from_u64(11);
        let mut data = Vec::new();
        let mut labels = Vec::new();
        for (label, sign) in [(0i64, 1.0f32), (1, -1.0)] {
            for _ in 0..25 {
                data.push((0..6).map(|_| sign * 3.0 + rng.random::<f32>() - 0.5).collect());
                labels.push(label);
            }
        }
        (data, labels)
    }

    fn small_space() -> SearchSpace {
        SearchSpace::default_space()
            .with("n_neighbors", ParameterDomain::IntRange { low: 4, high: 10 })
            .with("min_cluster_size", ParameterDomain::IntRange { low: 4, high: 12 })
    }

    #[test]
    fn rejects_mismatched_labels_and_empty_space() {
        let (data, labels) = blobs();
        assert!(matches!(
            ClusterTrainer::new(small_space(), CostStrategy::default(), data.clone(), labels[1..].to_vec()),
            Err(Error::LengthMismatch { expected: 50, found: 49 })
        ));
        assert!(matches!(
            ClusterTrainer::new(SearchSpace::new(), CostStrategy::default(), data, labels),
            Err(Error::EmptySpace)
        ));
    }

    #[test]
    fn zero_budget_is_an_error() {
        let (data, labels) = blobs();
        let mut trainer = ClusterTrainer::new(small_space(), CostStrategy::default(), data, labels).unwrap();
        assert!(matches!(trainer.train(0, &mut Tpe::new(0)), Err(Error::NoTrials)));
        assert!(trainer.best().is_none());
    }

    #[test]
    fn records_every_trial_and_keeps_the_best() {
        let (data, labels) = blobs();
        let mut trainer =
            ClusterTrainer::new(small_space(), CostStrategy::RandScore, data, labels).unwrap();
        trainer.train(6, &mut RandomSearch::new(3)).unwrap();

        assert_eq!(trainer.logs().len(), 6);
        assert_eq!(trainer.trials().len(), 6);
        let min = trainer.logs().iter().map(|r| r.score).fold(f64::INFINITY, f64::min);
        let best = trainer.best().unwrap();
        let again = trainer.objective(&best.best_params).unwrap();
        assert_eq!(again.loss, min);
        assert_eq!(again.clusters, best.best_clusters);
        assert_eq!(trainer.logs().len(), 6);
    }

    #[test]
    fn failing_trial_aborts() {
        let (data, labels) = blobs();
        let space = small_space().with("n_neighbors", ParameterDomain::IntRange { low: 60, high: 70 });
        let mut trainer = ClusterTrainer::new(space, CostStrategy::default(), data, labels).unwrap();
        assert!(matches!(
            trainer.train(3, &mut RandomSearch::new(0)),
            Err(Error::TooFewPoints { .. })
        ));
        assert!(trainer.logs().is_empty());
    }

    #[test]
    fn csv_file_has_header_and_rows() {
        let (data, labels) = blobs();
        let mut trainer = ClusterTrainer::new(small_space(), CostStrategy::default(), data, labels).unwrap();
        trainer.train(2, &mut RandomSearch::new(1)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.csv");
        let table = trainer.save_logs_to_csv(&path, Some("blobs")).unwrap();
        assert_eq!(table.columns().len(), 25);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().next().unwrap().ends_with(",dataset"));
    }
}
