//! Shared utilities for the diagnosis and imputation engine.
//!
//! Column extraction, missing masks and write-back helpers used by the
//! profiler, the analyzers and the imputers. A cell counts as missing when it
//! is null, or NaN in a floating-point column.

use crate::error::{ImputationError, Result};
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for missing-data purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Boolean type
    Boolean,
    /// Date or datetime types
    Datetime,
    /// String/categorical text
    String,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType carries numbers the engine can compute with
/// (numeric or boolean).
#[inline]
pub fn is_numeric_like(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype) || matches!(dtype, DataType::Boolean)
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    ) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Column Access
// =============================================================================

/// Check whether the dataset has a column with this name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Fetch a column as a materialized Series, or `ColumnNotFound`.
pub fn column_series(df: &DataFrame, name: &str) -> Result<Series> {
    if !has_column(df, name) {
        return Err(ImputationError::ColumnNotFound(name.to_string()));
    }
    Ok(df.column(name)?.as_materialized_series().clone())
}

/// Names of all columns in dataset order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect()
}

// =============================================================================
// Missingness
// =============================================================================

/// Per-row missing flags for a Series.
pub fn missing_mask(series: &Series) -> PolarsResult<Vec<bool>> {
    if series.dtype().is_float() {
        let cast = series.cast(&DataType::Float64)?;
        Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.is_none_or(|x| x.is_nan()))
            .collect())
    } else {
        Ok(series
            .is_null()
            .into_iter()
            .map(|v| v.unwrap_or(true))
            .collect())
    }
}

/// Number of missing cells in a Series.
pub fn count_missing(series: &Series) -> PolarsResult<usize> {
    Ok(missing_mask(series)?.into_iter().filter(|m| *m).count())
}

/// Total number of missing cells across the dataset.
pub fn total_missing(df: &DataFrame) -> PolarsResult<usize> {
    let mut total = 0;
    for column in df.get_columns() {
        total += count_missing(column.as_materialized_series())?;
    }
    Ok(total)
}

// =============================================================================
// Extraction
// =============================================================================

/// Extract a numeric-like Series as `Option<f64>` values, NaN mapped to `None`.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Extract any Series as `Option<String>` values.
pub fn string_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Observed (non-missing) numeric values.
pub fn observed(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

/// True when at least one value is observed and every observed value is 0 or 1.
pub fn is_binary(values: &[Option<f64>]) -> bool {
    let mut any = false;
    for v in values.iter().flatten() {
        if *v != 0.0 && *v != 1.0 {
            return false;
        }
        any = true;
    }
    any
}

// =============================================================================
// Statistics Helpers
// =============================================================================

/// Most frequent value with first-occurrence tie-break, so results do not
/// depend on hash ordering.
pub fn string_mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, value) in values.iter().enumerate() {
        if let Some(v) = value {
            let entry = counts.entry(v.as_str()).or_insert((0, idx));
            entry.0 += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(_, (ca, ia)), (_, (cb, ib))| ca.cmp(cb).then(ib.cmp(ia)))
        .map(|(val, _)| val.to_string())
}

/// Most frequent numeric value, same tie-break as [`string_mode`].
pub fn numeric_mode(values: &[Option<f64>]) -> Option<f64> {
    let mut counts: HashMap<u64, (usize, usize, f64)> = HashMap::new();
    for (idx, value) in values.iter().enumerate() {
        if let Some(v) = value {
            let entry = counts.entry(v.to_bits()).or_insert((0, idx, *v));
            entry.0 += 1;
        }
    }

    counts
        .into_values()
        .max_by(|(ca, ia, _), (cb, ib, _)| ca.cmp(cb).then(ib.cmp(ia)))
        .map(|(_, _, v)| v)
}

// =============================================================================
// Write-back
// =============================================================================

/// Rebuild a numeric column from filled values.
///
/// Integer and boolean columns keep their dtype when every present value is
/// integral; otherwise the column becomes `Float64`.
pub fn rebuild_numeric_series(
    name: &str,
    values: Vec<Option<f64>>,
    original: &DataType,
) -> PolarsResult<Series> {
    let series = Series::new(name.into(), values.clone());
    let integral = values.iter().flatten().all(|v| v.fract() == 0.0);

    if integral && (is_integer_dtype(original) || matches!(original, DataType::Boolean)) {
        return series.cast(original);
    }
    if matches!(original, DataType::Float32) {
        return series.cast(original);
    }
    Ok(series)
}

/// Rebuild a text column from filled values, restoring the original dtype
/// when the cast is possible.
pub fn rebuild_string_series(
    name: &str,
    values: Vec<Option<String>>,
    original: &DataType,
) -> Series {
    let series = Series::new(name.into(), values);
    if matches!(original, DataType::String) {
        return series;
    }
    series.cast(original).unwrap_or(series)
}

/// Fraction helper that returns 0.0 for an empty denominator.
#[inline]
pub fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
        assert!(is_numeric_like(&DataType::Boolean));
    }

    #[test]
    fn test_dtype_category() {
        assert_eq!(get_dtype_category(&DataType::Int64), DtypeCategory::Numeric);
        assert_eq!(
            get_dtype_category(&DataType::Boolean),
            DtypeCategory::Boolean
        );
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Datetime);
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::String);
    }

    #[test]
    fn test_missing_mask_counts_nan() {
        let series = Series::new("x".into(), &[Some(1.0), None, Some(f64::NAN), Some(4.0)]);
        assert_eq!(
            missing_mask(&series).unwrap(),
            vec![false, true, true, false]
        );
        assert_eq!(count_missing(&series).unwrap(), 2);
    }

    #[test]
    fn test_missing_mask_strings() {
        let series = Series::new("s".into(), &[Some("a"), None, Some("")]);
        assert_eq!(missing_mask(&series).unwrap(), vec![false, true, false]);
    }

    #[test]
    fn test_numeric_values_maps_nan_to_none() {
        let series = Series::new("x".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(
            numeric_values(&series).unwrap(),
            vec![Some(1.0), None, Some(3.0)]
        );
    }

    #[test]
    fn test_string_mode_first_occurrence_wins_ties() {
        let values = vec![
            Some("b".to_string()),
            Some("a".to_string()),
            Some("a".to_string()),
            Some("b".to_string()),
            None,
        ];
        assert_eq!(string_mode(&values), Some("b".to_string()));
        assert_eq!(string_mode(&[None, None]), None);
    }

    #[test]
    fn test_numeric_mode() {
        let values = vec![Some(1.0), Some(0.0), Some(1.0), None];
        assert_eq!(numeric_mode(&values), Some(1.0));
    }

    #[test]
    fn test_rebuild_numeric_keeps_integer_dtype() {
        let series =
            rebuild_numeric_series("n", vec![Some(1.0), Some(2.0)], &DataType::Int64).unwrap();
        assert_eq!(series.dtype(), &DataType::Int64);

        let series =
            rebuild_numeric_series("n", vec![Some(1.5), Some(2.0)], &DataType::Int64).unwrap();
        assert_eq!(series.dtype(), &DataType::Float64);
    }

    #[test]
    fn test_column_series_not_found() {
        let df = df!("a" => &[1, 2]).unwrap();
        let err = column_series(&df, "b").unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(column_series(&df, "a").is_ok());
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(1, 4), 0.25);
        assert_eq!(ratio(3, 0), 0.0);
    }
}
