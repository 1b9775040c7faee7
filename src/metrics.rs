//! External clustering-agreement metrics.
//!
//! All scores compare two labelings of the same points through their
//! contingency table. Labels are opaque integers: the noise label of a
//! clustering is treated as one more class, the way the tuning logs expect it.
//!
//! Argument order follows the usual `(labels_true, labels_pred)` convention.
//! Only the adjusted Rand index and the V-measure are symmetric.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Class-by-cluster co-occurrence counts.
#[derive(Debug, Clone)]
struct Contingency {
    n_samples: usize,
    counts: Vec<Vec<u64>>,
    row_sums: Vec<u64>,
    col_sums: Vec<u64>,
}

impl Contingency {
    fn new(labels_true: &[i64], labels_pred: &[i64]) -> Result<Self> {
        if labels_true.len() != labels_pred.len() {
            return Err(Error::LengthMismatch {
                expected: labels_true.len(),
                found: labels_pred.len(),
            });
        }
        let rows = index_labels(labels_true);
        let cols = index_labels(labels_pred);

        let mut counts = vec![vec![0u64; cols.len()]; rows.len()];
        for (t, p) in labels_true.iter().zip(labels_pred) {
            counts[rows[t]][cols[p]] += 1;
        }
        let row_sums: Vec<u64> = counts.iter().map(|r| r.iter().sum()).collect();
        let col_sums: Vec<u64> = (0..cols.len())
            .map(|j| counts.iter().map(|r| r[j]).sum())
            .collect();

        Ok(Self {
            n_samples: labels_true.len(),
            counts,
            row_sums,
            col_sums,
        })
    }

    fn n_rows(&self) -> usize {
        self.row_sums.len()
    }

    fn n_cols(&self) -> usize {
        self.col_sums.len()
    }

    fn nonzero(&self) -> impl Iterator<Item = (usize, usize, u64)> + '_ {
        self.counts.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &c)| c > 0)
                .map(move |(j, &c)| (i, j, c))
        })
    }

    fn mutual_info(&self) -> f64 {
        if self.n_samples == 0 {
            return 0.0;
        }
        let n = self.n_samples as f64;
        let mi: f64 = self
            .nonzero()
            .map(|(i, j, c)| {
                let c = c as f64;
                let outer = self.row_sums[i] as f64 * self.col_sums[j] as f64;
                (c / n) * ((n * c).ln() - outer.ln())
            })
            .sum();
        mi.max(0.0)
    }
}

fn index_labels(labels: &[i64]) -> BTreeMap<i64, usize> {
    let mut distinct: BTreeMap<i64, usize> = labels.iter().map(|&l| (l, 0)).collect();
    for (idx, slot) in distinct.values_mut().enumerate() {
        *slot = idx;
    }
    distinct
}

fn entropy_of_counts(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 1.0;
    }
    let n = total as f64;
    let h: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum();
    h.max(0.0)
}

/// Shannon entropy (natural log) of a labeling; 1.0 for an empty labeling.
pub fn entropy(labels: &[i64]) -> f64 {
    let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
    for &l in labels {
        *counts.entry(l).or_insert(0) += 1;
    }
    let counts: Vec<u64> = counts.into_values().collect();
    entropy_of_counts(&counts)
}

/// Mutual information between two labelings (natural log).
pub fn mutual_info_score(labels_true: &[i64], labels_pred: &[i64]) -> Result<f64> {
    Ok(Contingency::new(labels_true, labels_pred)?.mutual_info())
}

/// Rand index adjusted for chance, in `[-0.5, 1]`; 1.0 for identical partitions.
pub fn adjusted_rand_score(labels_true: &[i64], labels_pred: &[i64]) -> Result<f64> {
    let table = Contingency::new(labels_true, labels_pred)?;
    let n = table.n_samples as f64;

    let sum_squares: f64 = table.nonzero().map(|(_, _, c)| (c as f64).powi(2)).sum();
    let row_squares: f64 = table.row_sums.iter().map(|&a| (a as f64).powi(2)).sum();
    let col_squares: f64 = table.col_sums.iter().map(|&b| (b as f64).powi(2)).sum();

    // Pair confusion matrix, counted over ordered pairs.
    let tp = sum_squares - n;
    let fp = col_squares - sum_squares;
    let fn_ = row_squares - sum_squares;
    let tn = n * n - fp - fn_ - sum_squares;

    if fn_ == 0.0 && fp == 0.0 {
        return Ok(1.0);
    }
    Ok(2.0 * (tp * tn - fn_ * fp) / ((tp + fn_) * (fn_ + tn) + (tp + fp) * (fp + tn)))
}

/// Homogeneity, completeness, and their harmonic mean (V-measure, beta = 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomogeneityCompletenessVMeasure {
    /// Each cluster contains only members of a single class.
    pub homogeneity: f64,
    /// All members of a class are assigned to the same cluster.
    pub completeness: f64,
    /// Harmonic mean of the two.
    pub v_measure: f64,
}

impl fmt::Display for HomogeneityCompletenessVMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.homogeneity, self.completeness, self.v_measure)
    }
}

/// Homogeneity, completeness, and V-measure in one pass over the contingency table.
pub fn homogeneity_completeness_v_measure(
    labels_true: &[i64],
    labels_pred: &[i64],
) -> Result<HomogeneityCompletenessVMeasure> {
    let table = Contingency::new(labels_true, labels_pred)?;
    if table.n_samples == 0 {
        return Ok(HomogeneityCompletenessVMeasure {
            homogeneity: 1.0,
            completeness: 1.0,
            v_measure: 1.0,
        });
    }

    let entropy_true = entropy_of_counts(&table.row_sums);
    let entropy_pred = entropy_of_counts(&table.col_sums);
    let mi = table.mutual_info();

    let homogeneity = if entropy_true > 0.0 { mi / entropy_true } else { 1.0 };
    let completeness = if entropy_pred > 0.0 { mi / entropy_pred } else { 1.0 };
    let v_measure = if homogeneity + completeness == 0.0 {
        0.0
    } else {
        2.0 * homogeneity * completeness / (homogeneity + completeness)
    };

    Ok(HomogeneityCompletenessVMeasure {
        homogeneity,
        completeness,
        v_measure,
    })
}

/// Homogeneity of `labels_pred` with respect to `labels_true`.
pub fn homogeneity_score(labels_true: &[i64], labels_pred: &[i64]) -> Result<f64> {
    Ok(homogeneity_completeness_v_measure(labels_true, labels_pred)?.homogeneity)
}

/// Completeness of `labels_pred` with respect to `labels_true`.
pub fn completeness_score(labels_true: &[i64], labels_pred: &[i64]) -> Result<f64> {
    Ok(homogeneity_completeness_v_measure(labels_true, labels_pred)?.completeness)
}

/// V-measure (harmonic mean of homogeneity and completeness).
pub fn v_measure_score(labels_true: &[i64], labels_pred: &[i64]) -> Result<f64> {
    Ok(homogeneity_completeness_v_measure(labels_true, labels_pred)?.v_measure)
}

/// Mutual information adjusted for chance, arithmetic-mean normalization.
pub fn adjusted_mutual_info_score(labels_true: &[i64], labels_pred: &[i64]) -> Result<f64> {
    let table = Contingency::new(labels_true, labels_pred)?;
    let (classes, clusters) = (table.n_rows(), table.n_cols());
    if (classes == 1 && clusters == 1) || (classes == 0 && clusters == 0) {
        return Ok(1.0);
    }

    let mi = table.mutual_info();
    let emi = expected_mutual_info(&table);
    let normalizer = (entropy_of_counts(&table.row_sums) + entropy_of_counts(&table.col_sums)) / 2.0;

    let mut denominator = normalizer - emi;
    denominator = if denominator < 0.0 {
        denominator.min(-f64::EPSILON)
    } else {
        denominator.max(f64::EPSILON)
    };
    Ok((mi - emi) / denominator)
}

/// Expected mutual information under the hypergeometric model of randomness.
fn expected_mutual_info(table: &Contingency) -> f64 {
    let n = table.n_samples;
    if n == 0 {
        return 0.0;
    }
    // ln_fact[k] = ln(k!)
    let mut ln_fact = vec![0.0f64; n + 1];
    for k in 1..=n {
        ln_fact[k] = ln_fact[k - 1] + (k as f64).ln();
    }
    let nf = n as f64;

    let mut emi = 0.0;
    for &a in &table.row_sums {
        let a = a as usize;
        for &b in &table.col_sums {
            let b = b as usize;
            let start = (a + b).saturating_sub(n).max(1);
            let end = a.min(b);
            let fixed = ln_fact[a] + ln_fact[b] + ln_fact[n - a] + ln_fact[n - b] - ln_fact[n];
            for nij in start..=end {
                let term1 = nij as f64 / nf;
                let term2 = (nf * nij as f64).ln() - (a as f64).ln() - (b as f64).ln();
                let gln = fixed
                    - ln_fact[nij]
                    - ln_fact[a - nij]
                    - ln_fact[b - nij]
                    - ln_fact[n + nij - a - b];
                emi += term1 * term2 * gln.exp();
            }
        }
    }
    emi
}

/// The agreement scores logged for every trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExternalScores {
    /// Adjusted Rand index.
    pub adjusted_rand_score: f64,
    /// The `(homogeneity, completeness, v_measure)` triple.
    pub homogeneity_completeness_v_measure: HomogeneityCompletenessVMeasure,
    /// Homogeneity.
    pub homogeneity_score: f64,
    /// V-measure.
    pub v_measure_score: f64,
    /// Completeness.
    pub completeness_score: f64,
    /// Adjusted mutual information.
    pub adjusted_mutual_info_score: f64,
}

/// Compute every agreement score for `first` against `second`.
pub fn external_scores(first: &[i64], second: &[i64]) -> Result<ExternalScores> {
    let hcv = homogeneity_completeness_v_measure(first, second)?;
    Ok(ExternalScores {
        adjusted_rand_score: adjusted_rand_score(first, second)?,
        homogeneity_completeness_v_measure: hcv,
        homogeneity_score: hcv.homogeneity,
        v_measure_score: hcv.v_measure,
        completeness_score: hcv.completeness,
        adjusted_mutual_info_score: adjusted_mutual_info_score(first, second)?,
    })
}
