//! Column profiling.
//!
//! Classifies every column as numeric, binary or categorical and computes the
//! base statistics the analyzers build on. Profiling has no side effects and
//! a zero-column dataset yields an explicit empty marker instead of an error.

pub mod statistics;

use crate::error::Result;
use crate::types::{
    CategoricalSummary, ColumnKind, ColumnProfile, DatasetProfile, NumericSummary, ProfileStatus,
    SummaryStats,
};
use crate::utils::{is_numeric_like, missing_mask, numeric_values, ratio, string_values};
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Profiler for dataset columns.
pub struct ColumnProfiler;

impl ColumnProfiler {
    /// Profile every column of the dataset, in column order.
    pub fn profile_dataset(df: &DataFrame) -> Result<DatasetProfile> {
        if df.width() == 0 {
            debug!("Profiling skipped: dataset has no columns");
            return Ok(DatasetProfile::empty(df.height()));
        }

        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            columns.push(Self::profile_series(column.as_materialized_series())?);
        }
        let total_missing = columns.iter().map(|c| c.missing_count).sum();

        Ok(DatasetProfile {
            status: ProfileStatus::Profiled,
            n_rows: df.height(),
            n_columns: df.width(),
            total_missing,
            columns,
        })
    }

    /// Profile a single column.
    pub fn profile_series(series: &Series) -> Result<ColumnProfile> {
        let name = series.name().to_string();
        let n = series.len();
        let missing_count = missing_mask(series)?.into_iter().filter(|m| *m).count();

        let (inferred_kind, cardinality, summary_stats) = if is_numeric_like(series.dtype()) {
            let values: Vec<f64> = numeric_values(series)?.into_iter().flatten().collect();
            let distinct: BTreeSet<u64> = values.iter().map(|v| v.to_bits()).collect();
            let kind = Self::numeric_kind(&values, distinct.len());
            (kind, distinct.len(), Self::numeric_summary(&values))
        } else {
            let values = string_values(series)?;
            let (cardinality, summary) = Self::categorical_summary(&values);
            (ColumnKind::Categorical, cardinality, summary)
        };

        debug!(
            "Profiled '{}': {} ({} missing, {} distinct)",
            name, inferred_kind, missing_count, cardinality
        );

        Ok(ColumnProfile {
            name,
            dtype: format!("{:?}", series.dtype()),
            inferred_kind,
            missing_count,
            missing_ratio: ratio(missing_count, n),
            cardinality,
            summary_stats,
        })
    }

    /// Numeric-typed columns whose observed values are a subset of {0, 1} are
    /// binary. A column with no observed values stays numeric.
    fn numeric_kind(values: &[f64], cardinality: usize) -> ColumnKind {
        if !values.is_empty() && cardinality <= 2 && values.iter().all(|v| *v == 0.0 || *v == 1.0)
        {
            ColumnKind::Binary
        } else {
            ColumnKind::Numeric
        }
    }

    fn numeric_summary(values: &[f64]) -> SummaryStats {
        let sorted = statistics::sorted(values);
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return SummaryStats::Empty;
        };

        SummaryStats::Numeric(NumericSummary {
            mean: statistics::mean(values).unwrap_or(0.0),
            std: statistics::std_dev(values),
            min,
            max,
            median: statistics::quantile_sorted(&sorted, 0.5).unwrap_or(min),
            skewness: statistics::skewness(values),
            p01: statistics::quantile_sorted(&sorted, 0.01).unwrap_or(min),
            p99: statistics::quantile_sorted(&sorted, 0.99).unwrap_or(max),
        })
    }

    fn categorical_summary(values: &[Option<String>]) -> (usize, SummaryStats) {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for value in values.iter().flatten() {
            *counts.entry(value.as_str()).or_insert(0) += 1;
        }
        if counts.is_empty() {
            return (0, SummaryStats::Empty);
        }

        let top_value = crate::utils::string_mode(values);
        let top_count = top_value
            .as_deref()
            .and_then(|v| counts.get(v).copied())
            .unwrap_or(0);

        (
            counts.len(),
            SummaryStats::Categorical(CategoricalSummary {
                top_value,
                top_count,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_inference() {
        let df = df!(
            "age" => &[Some(30.0), None, Some(45.0), Some(52.0)],
            "smoker" => &[Some(1i64), Some(0), None, Some(1)],
            "flag" => &[true, false, true, true],
            "city" => &[Some("Cairo"), Some("Giza"), None, Some("Cairo")]
        )
        .unwrap();

        let profile = ColumnProfiler::profile_dataset(&df).unwrap();
        let kinds: Vec<ColumnKind> = profile.columns.iter().map(|c| c.inferred_kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Numeric,
                ColumnKind::Binary,
                ColumnKind::Binary,
                ColumnKind::Categorical
            ]
        );
        assert_eq!(profile.total_missing, 3);
    }

    #[test]
    fn test_two_valued_non_binary_is_numeric() {
        let df = df!("score" => &[1.0, 2.0, 1.0, 2.0]).unwrap();
        let profile = ColumnProfiler::profile_dataset(&df).unwrap();
        assert_eq!(profile.columns[0].inferred_kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_all_missing_numeric_column() {
        let df = df!("x" => &[None::<f64>, None, None]).unwrap();
        let profile = ColumnProfiler::profile_dataset(&df).unwrap();
        let column = &profile.columns[0];
        assert_eq!(column.inferred_kind, ColumnKind::Numeric);
        assert_eq!(column.missing_ratio, 1.0);
        assert_eq!(column.summary_stats, SummaryStats::Empty);
    }

    #[test]
    fn test_numeric_summary() {
        let df = df!("x" => &[Some(1.0), Some(2.0), None, Some(3.0), Some(f64::NAN)]).unwrap();
        let profile = ColumnProfiler::profile_dataset(&df).unwrap();
        let column = &profile.columns[0];
        assert_eq!(column.missing_count, 2);
        assert_eq!(column.cardinality, 3);

        let summary = column.numeric_summary().unwrap();
        assert_eq!(summary.mean, 2.0);
        assert_eq!(summary.median, 2.0);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 3.0);
    }

    #[test]
    fn test_categorical_summary() {
        let df = df!("city" => &[Some("a"), Some("b"), Some("b"), None]).unwrap();
        let profile = ColumnProfiler::profile_dataset(&df).unwrap();
        assert_eq!(
            profile.columns[0].summary_stats,
            SummaryStats::Categorical(CategoricalSummary {
                top_value: Some("b".to_string()),
                top_count: 2,
            })
        );
    }

    #[test]
    fn test_empty_dataset_marker() {
        let df = DataFrame::empty();
        let profile = ColumnProfiler::profile_dataset(&df).unwrap();
        assert!(profile.is_empty());
        assert!(profile.columns.is_empty());
    }
}
