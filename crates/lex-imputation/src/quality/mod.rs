//! Pre/post imputation quality comparison.
//!
//! The scores are cheap proxies meant as directional signals: how much of
//! the original missingness was resolved, and how far the observed mean,
//! spread and variance moved once imputed values were added.

use crate::error::{ImputationError, Result};
use crate::profiler::statistics::{mean, std_dev, variance};
use crate::types::{ColumnQuality, QualityReport};
use crate::utils::{
    column_series, count_missing, has_column, is_numeric_like, numeric_values, observed, ratio,
    total_missing,
};
use polars::prelude::*;
use tracing::{debug, info};

const EPSILON: f64 = 1e-8;

/// Compares a dataset before and after imputation.
pub struct QualityEvaluator;

impl QualityEvaluator {
    /// Evaluate the given columns. An empty list means every column of
    /// `pre` that had missing values.
    pub fn evaluate(pre: &DataFrame, post: &DataFrame, columns: &[String]) -> Result<QualityReport> {
        if pre.width() == 0 {
            return Err(ImputationError::EmptyDataset(
                "pre-imputation dataset has no columns".to_string(),
            ));
        }

        let targets: Vec<String> = if columns.is_empty() {
            let mut with_missing = Vec::new();
            for column in pre.get_columns() {
                let series = column.as_materialized_series();
                if count_missing(series)? > 0 {
                    with_missing.push(series.name().to_string());
                }
            }
            with_missing
        } else {
            for name in columns {
                column_series(pre, name)?;
            }
            columns.to_vec()
        };

        let mut notes = Vec::new();
        let mut per_column = Vec::with_capacity(targets.len());
        for name in &targets {
            let quality = Self::column_quality(pre, post, name)?;
            if let Some(note) = &quality.note {
                notes.push(format!("{}: {}", name, note));
            }
            per_column.push(quality);
        }

        let original: usize = per_column.iter().map(|c| c.missing_before).sum();
        let remaining: usize = per_column.iter().map(|c| c.missing_after).sum();
        let completeness = if original == 0 {
            1.0
        } else {
            (1.0 - remaining as f64 / original as f64).clamp(0.0, 1.0)
        };

        let completeness_delta = observed_fraction(post)? - observed_fraction(pre)?;

        let distribution = average(per_column.iter().filter_map(|c| c.distribution_preservation));
        let variance = average(per_column.iter().filter_map(|c| c.variance_preservation));
        if distribution.is_none() && !per_column.is_empty() {
            notes.push("no numeric column could be compared; distribution scores omitted".to_string());
        }

        let rows_removed = pre.height().saturating_sub(post.height());
        if rows_removed > 0 {
            notes.push(format!("{} row(s) removed between pre and post", rows_removed));
        }

        let components: Vec<f64> = std::iter::once(completeness)
            .chain(distribution)
            .chain(variance)
            .collect();
        let overall_score = components.iter().sum::<f64>() / components.len() as f64;

        info!(
            "Quality: completeness {:.3}, overall {:.3} over {} column(s)",
            completeness,
            overall_score,
            per_column.len()
        );

        Ok(QualityReport {
            completeness,
            completeness_delta,
            distribution_preservation_score: distribution,
            variance_preservation_score: variance,
            overall_score,
            columns: per_column,
            notes,
        })
    }

    fn column_quality(pre: &DataFrame, post: &DataFrame, name: &str) -> Result<ColumnQuality> {
        let before_series = column_series(pre, name)?;
        let missing_before = count_missing(&before_series)?;

        if !has_column(post, name) {
            debug!("'{}' absent after imputation", name);
            return Ok(ColumnQuality {
                column: name.to_string(),
                missing_before,
                missing_after: 0,
                completeness: 1.0,
                distribution_preservation: None,
                variance_preservation: None,
                note: Some("column was dropped".to_string()),
            });
        }

        let after_series = column_series(post, name)?;
        let missing_after = count_missing(&after_series)?;
        let completeness = if missing_before == 0 {
            1.0
        } else {
            (1.0 - missing_after as f64 / missing_before as f64).clamp(0.0, 1.0)
        };

        let mut quality = ColumnQuality {
            column: name.to_string(),
            missing_before,
            missing_after,
            completeness,
            distribution_preservation: None,
            variance_preservation: None,
            note: None,
        };

        if !is_numeric_like(before_series.dtype()) || !is_numeric_like(after_series.dtype()) {
            return Ok(quality);
        }

        let before = observed(&numeric_values(&before_series)?);
        let after = observed(&numeric_values(&after_series)?);
        if before.len() < 2 || after.len() < 2 {
            quality.note = Some("too few observed values to compare distributions".to_string());
            return Ok(quality);
        }

        quality.distribution_preservation = Some(distribution_preservation(&before, &after));
        quality.variance_preservation = Some(variance_preservation(&before, &after));
        debug!(
            "'{}': distribution {:.3}, variance {:.3}",
            name,
            quality.distribution_preservation.unwrap_or_default(),
            quality.variance_preservation.unwrap_or_default()
        );
        Ok(quality)
    }
}

/// 1 - min(1, mean of the relative mean shift and relative std shift).
pub fn distribution_preservation(before: &[f64], after: &[f64]) -> f64 {
    let (Some(m0), Some(m1)) = (mean(before), mean(after)) else {
        return 0.0;
    };
    let (s0, s1) = (std_dev(before), std_dev(after));
    let mean_shift = (m1 - m0).abs() / (m0.abs() + EPSILON);
    let std_shift = (s1 - s0).abs() / (s0 + EPSILON);
    1.0 - ((mean_shift + std_shift) / 2.0).min(1.0)
}

/// Post/pre variance ratio folded into (0, 1].
pub fn variance_preservation(before: &[f64], after: &[f64]) -> f64 {
    let (v0, v1) = (variance(before), variance(after));
    if v0 <= EPSILON && v1 <= EPSILON {
        return 1.0;
    }
    if v0 <= EPSILON || v1 <= EPSILON {
        return 0.0;
    }
    let r = v1 / v0;
    if r > 1.0 { 1.0 / r } else { r }
}

fn observed_fraction(df: &DataFrame) -> Result<f64> {
    let cells = df.height() * df.width();
    if cells == 0 {
        return Ok(1.0);
    }
    Ok(1.0 - ratio(total_missing(df)?, cells))
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_recovery_scores_complete() {
        let pre = df! { "x" => [Some(1.0), None, Some(3.0), None, Some(5.0)] }.unwrap();
        let post = df! { "x" => [1.0, 3.0, 3.0, 3.0, 5.0] }.unwrap();
        let report = QualityEvaluator::evaluate(&pre, &post, &[]).unwrap();

        assert_eq!(report.completeness, 1.0);
        assert!((report.completeness_delta - 0.4).abs() < 1e-12);
        let column = &report.columns[0];
        assert_eq!(column.missing_before, 2);
        assert_eq!(column.missing_after, 0);

        // Mean is unchanged, spread shrinks.
        let distribution = report.distribution_preservation_score.unwrap();
        assert!(distribution > 0.5 && distribution < 1.0);
        let variance = report.variance_preservation_score.unwrap();
        assert!((variance - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_partial_recovery() {
        let pre = df! { "x" => [Some(1.0), None, None, Some(4.0)] }.unwrap();
        let post = df! { "x" => [Some(1.0), Some(2.0), None, Some(4.0)] }.unwrap();
        let report = QualityEvaluator::evaluate(&pre, &post, &["x".to_string()]).unwrap();
        assert!((report.completeness - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_original_missingness_is_complete() {
        let df = df! { "x" => [1.0, 2.0, 3.0] }.unwrap();
        let report = QualityEvaluator::evaluate(&df, &df, &[]).unwrap();
        assert_eq!(report.completeness, 1.0);
        assert_eq!(report.completeness_delta, 0.0);
        assert!(report.columns.is_empty());
        assert_eq!(report.overall_score, 1.0);
    }

    #[test]
    fn test_dropped_column_is_noted() {
        let pre = df! {
            "x" => [Some(1.0), None],
            "y" => [Some(1.0), Some(2.0)],
        }
        .unwrap();
        let post = df! { "y" => [1.0, 2.0] }.unwrap();
        let report = QualityEvaluator::evaluate(&pre, &post, &[]).unwrap();
        assert_eq!(report.columns[0].note.as_deref(), Some("column was dropped"));
        assert!(report.notes.iter().any(|n| n.starts_with("x:")));
    }

    #[test]
    fn test_categorical_columns_have_no_distribution_score() {
        let pre = df! { "s" => [Some("a"), None, Some("b")] }.unwrap();
        let post = df! { "s" => ["a", "a", "b"] }.unwrap();
        let report = QualityEvaluator::evaluate(&pre, &post, &[]).unwrap();
        assert_eq!(report.distribution_preservation_score, None);
        assert_eq!(report.overall_score, 1.0);
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let df = df! { "x" => [1.0] }.unwrap();
        let err = QualityEvaluator::evaluate(&df, &df, &["nope".to_string()]).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_preservation_scores() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(distribution_preservation(&data, &data), 1.0);
        assert_eq!(variance_preservation(&data, &data), 1.0);
        assert_eq!(variance_preservation(&[2.0, 2.0], &[2.0, 2.0]), 1.0);

        let wider = [0.0, 2.0, 3.0, 5.0];
        let score = variance_preservation(&data, &wider);
        assert!(score > 0.0 && score < 1.0);
    }
}
