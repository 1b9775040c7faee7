//! Tabular export of a [`TrialLog`].
//!
//! Every record becomes one row of a polars [`DataFrame`]. Columns follow
//! [`CostStrategy::columns`], with an optional trailing constant `dataset`
//! column. The homogeneity/completeness/V-measure triple is kept as one
//! text column rendered `(h, c, v)`.

use std::io::Write;

use polars::prelude::*;
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::objective::{CostStrategy, TrialLog, TrialRecord};
use crate::params::CostFunctionParams;

/// Exported trial log.
#[derive(Debug, Clone, Default)]
pub struct Table {
    frame: DataFrame,
}

impl Table {
    pub fn columns(&self) -> Vec<&str> {
        self.frame.get_column_names().into_iter().map(|c| c.as_str()).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.frame.height()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Value at `row` in the column called `column`.
    pub fn get(&self, row: usize, column: &str) -> Option<AnyValue<'_>> {
        let column = self.frame.column(column).ok()?;
        column.as_materialized_series().get(row).ok()
    }

    /// Write a header line and one line per row.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        let mut frame = self.frame.clone();
        CsvWriter::new(&mut writer).include_header(true).finish(&mut frame)?;
        writer.flush()?;
        Ok(())
    }

    /// Rows as an array of `{column: value}` objects.
    pub fn to_json(&self) -> Value {
        let series: Vec<&Series> = self
            .frame
            .get_columns()
            .iter()
            .map(Column::as_materialized_series)
            .collect();
        let rows = (0..self.n_rows())
            .map(|row| {
                let object: Map<String, Value> = series
                    .iter()
                    .map(|s| {
                        let value = s.get(row).map_or(Value::Null, |v| any_to_json(&v));
                        (s.name().to_string(), value)
                    })
                    .collect();
                Value::Object(object)
            })
            .collect();
        Value::Array(rows)
    }
}

fn any_to_json(value: &AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Float64(v) => json!(v),
        AnyValue::Int64(v) => json!(v),
        AnyValue::String(s) => json!(s),
        other => json!(other.to_string()),
    }
}

fn floats(name: &str, log: &TrialLog, pick: impl Fn(&TrialRecord) -> f64) -> Column {
    Series::new(name.into(), log.iter().map(pick).collect::<Vec<f64>>()).into()
}

fn ints(name: &str, log: &TrialLog, pick: impl Fn(&TrialRecord) -> usize) -> Column {
    Series::new(name.into(), log.iter().map(|r| pick(r) as i64).collect::<Vec<i64>>()).into()
}

fn texts(name: &str, log: &TrialLog, pick: impl Fn(&TrialRecord) -> String) -> Column {
    Series::new(name.into(), log.iter().map(pick).collect::<Vec<String>>()).into()
}

/// Null where a record carries no weights.
fn weights(name: &str, log: &TrialLog, pick: fn(&CostFunctionParams) -> f64) -> Column {
    let values: Vec<Option<f64>> = log.iter().map(|r| r.weights.as_ref().map(pick)).collect();
    Series::new(name.into(), values).into()
}

fn record_column(log: &TrialLog, name: &str) -> Option<Column> {
    let column = match name {
        "adjusted_rand_score" => floats(name, log, |r| r.external.adjusted_rand_score),
        "homogeneity_completeness_v_measure" => texts(name, log, |r| {
            let hcv = r.external.homogeneity_completeness_v_measure;
            format!("({:?}, {:?}, {:?})", hcv.homogeneity, hcv.completeness, hcv.v_measure)
        }),
        "homogeneity_score" => floats(name, log, |r| r.external.homogeneity_score),
        "v_measure_score" => floats(name, log, |r| r.external.v_measure_score),
        "completeness_score" => floats(name, log, |r| r.external.completeness_score),
        "adjusted_mutual_info_score" => floats(name, log, |r| r.external.adjusted_mutual_info_score),
        "relative_validity" => floats(name, log, |r| r.stats.relative_validity),
        "probability" => floats(name, log, |r| r.stats.probability),
        "persistence" => floats(name, log, |r| r.stats.persistence),
        "penalty" => floats(name, log, |r| r.stats.penalty),
        "outlier" => floats(name, log, |r| r.stats.outlier),
        "cluster_size" => ints(name, log, |r| r.stats.cluster_size),
        "score" => floats(name, log, |r| r.score),
        "val_w" => weights(name, log, |w| w.val_w),
        "prob_w" => weights(name, log, |w| w.prob_w),
        "pers_w" => weights(name, log, |w| w.pers_w),
        "penalty_w" => weights(name, log, |w| w.penalty_w),
        "outlier_w" => weights(name, log, |w| w.outlier_w),
        "cluster_selection_epsilon" => floats(name, log, |r| r.params.cluster_selection_epsilon),
        "cluster_selection_method" => texts(name, log, |r| r.params.cluster_selection_method.to_string()),
        "metric" => texts(name, log, |r| r.params.metric.to_string()),
        "min_cluster_size" => ints(name, log, |r| r.params.min_cluster_size),
        "n_components" => ints(name, log, |r| r.params.n_components),
        "n_neighbors" => ints(name, log, |r| r.params.n_neighbors),
        _ => return None,
    };
    Some(column)
}

/// Tabulate `log` with the column schema of `strategy`.
///
/// An empty log yields the full header and no rows.
///
/// # Errors
///
/// [`Error::SchemaCollision`] if the schema repeats a column or names one
/// no record can fill.
pub fn export(log: &TrialLog, strategy: &CostStrategy, dataset: Option<&str>) -> Result<Table> {
    TrialRecord::validate_schema(strategy)?;
    let mut columns = strategy
        .columns()
        .into_iter()
        .map(|name| record_column(log, name).ok_or_else(|| Error::SchemaCollision(name.to_string())))
        .collect::<Result<Vec<Column>>>()?;
    if let Some(name) = dataset {
        columns.push(Series::new("dataset".into(), vec![name; log.len()]).into());
    }

    Ok(Table {
        frame: DataFrame::new(columns)?,
    })
}
