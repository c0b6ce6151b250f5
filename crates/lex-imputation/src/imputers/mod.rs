//! Numerical imputation procedures.
//!
//! Column-level procedures work on extracted value vectors:
//! - [`StatisticalImputer`]: mean, median, mode and constant fills
//! - [`sequential`]: forward/backward propagation and interpolation
//! - [`LabelEncoder`]: categorical codes for the multivariate imputers
//!
//! Multivariate procedures implement [`MatrixImputer`], a narrow
//! `fit_transform(matrix) -> matrix` interface over a row-major numeric
//! matrix. The engine owns extraction, encoding and write-back, so an
//! imputer never touches a DataFrame.

mod encoding;
mod forest;
mod iterative;
mod knn;
pub mod sequential;
mod statistical;

pub use encoding::LabelEncoder;
pub use forest::ForestImputer;
pub use iterative::IterativeImputer;
pub use knn::KnnImputer;
pub use statistical::StatisticalImputer;

use crate::error::{ImputationError, Result};
use std::time::{Duration, Instant};

/// Row-major matrix with missing cells as `None`.
pub type Matrix = Vec<Vec<Option<f64>>>;

/// Output of a [`MatrixImputer`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixImputation {
    /// Row-major values; every cell is filled.
    pub values: Vec<Vec<f64>>,
    /// Passes performed (1 for single-pass procedures).
    pub iterations: usize,
    /// Whether the procedure stopped on its own convergence criterion.
    pub converged: bool,
    /// Set when an iteration or time cap stopped the procedure early.
    pub cap_reason: Option<String>,
}

impl MatrixImputation {
    fn single_pass(values: Vec<Vec<f64>>) -> Self {
        Self {
            values,
            iterations: 1,
            converged: true,
            cap_reason: None,
        }
    }
}

/// Trait for multivariate imputers.
///
/// Precondition: every column of `matrix` has at least one observed value
/// and all rows have the same width. Implementations return an error
/// otherwise. Observed cells must come back unchanged.
///
/// The engine does not trust the output: a result of the wrong shape sends
/// every target column to the per-column fallback, and non-finite target
/// cells are filled by the fallback with a warning.
pub trait MatrixImputer: Send + Sync {
    fn fit_transform(&self, matrix: &[Vec<Option<f64>>]) -> Result<MatrixImputation>;

    /// Imputer name for ledgers and logging.
    fn name(&self) -> &str;
}

// =============================================================================
// Shared matrix helpers
// =============================================================================

/// Validate shape and return the number of columns.
pub(crate) fn matrix_width(matrix: &[Vec<Option<f64>>]) -> Result<usize> {
    let width = matrix.first().map(Vec::len).unwrap_or(0);
    if matrix.iter().any(|row| row.len() != width) {
        return Err(ImputationError::Internal(
            "matrix rows have different widths".to_string(),
        ));
    }
    Ok(width)
}

/// Mean and population standard deviation of each column's observed values.
pub(crate) fn column_moments(matrix: &[Vec<Option<f64>>], width: usize) -> Result<Vec<(f64, f64)>> {
    (0..width)
        .map(|col| {
            let observed: Vec<f64> = matrix.iter().filter_map(|row| row[col]).collect();
            if observed.is_empty() {
                return Err(ImputationError::ImputationFailed {
                    column: format!("#{}", col),
                    reason: "no observed values".to_string(),
                });
            }
            let n = observed.len() as f64;
            let mean = observed.iter().sum::<f64>() / n;
            let var = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            Ok((mean, var.sqrt()))
        })
        .collect()
}

/// Fill every missing cell with its column mean.
pub(crate) fn mean_filled(matrix: &[Vec<Option<f64>>], moments: &[(f64, f64)]) -> Vec<Vec<f64>> {
    matrix
        .iter()
        .map(|row| {
            row.iter()
                .zip(moments)
                .map(|(v, (mean, _))| v.unwrap_or(*mean))
                .collect()
        })
        .collect()
}

/// Wall-clock cap shared by the iterative imputers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    start: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub(crate) fn new(budget_ms: Option<u64>) -> Self {
        Self {
            start: Instant::now(),
            budget: budget_ms.map(Duration::from_millis),
        }
    }

    pub(crate) fn exceeded(&self) -> bool {
        self.budget.is_some_and(|b| self.start.elapsed() >= b)
    }

    pub(crate) fn budget_ms(&self) -> u64 {
        self.budget.map(|b| b.as_millis() as u64).unwrap_or(0)
    }
}

/// Relative change of the imputed cells between two passes.
pub(crate) fn relative_change(
    previous: &[Vec<f64>],
    current: &[Vec<f64>],
    missing: &[Vec<bool>],
) -> f64 {
    let mut diff = 0.0;
    let mut scale = 0.0;
    for ((prev_row, cur_row), miss_row) in previous.iter().zip(current).zip(missing) {
        for ((p, c), m) in prev_row.iter().zip(cur_row).zip(miss_row) {
            if *m {
                diff += (c - p).abs();
                scale += p.abs();
            }
        }
    }
    diff / (scale + 1e-12)
}

/// Per-cell missing flags.
pub(crate) fn missing_flags(matrix: &[Vec<Option<f64>>]) -> Vec<Vec<bool>> {
    matrix
        .iter()
        .map(|row| row.iter().map(Option::is_none).collect())
        .collect()
}
