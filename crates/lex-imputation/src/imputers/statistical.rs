//! Statistical imputation methods.
//!
//! Provides mean, median, mode and constant fills over extracted column
//! values. Each fill returns how many cells it filled, so the caller can
//! keep its ledger exact.

use crate::profiler::statistics;
use crate::types::ImputationStrategy;
use crate::utils::{numeric_mode, observed, string_mode};

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill value for a numeric column under `mean`, `median` or `mode`.
    ///
    /// `None` when the column has no observed values or the strategy is not
    /// a central-tendency fill.
    pub fn numeric_fill_value(strategy: ImputationStrategy, values: &[Option<f64>]) -> Option<f64> {
        match strategy {
            ImputationStrategy::Mean => statistics::mean(&observed(values)),
            ImputationStrategy::Median => statistics::median(&observed(values)),
            ImputationStrategy::Mode => numeric_mode(values),
            _ => None,
        }
    }

    /// Most frequent text value.
    pub fn text_mode(values: &[Option<String>]) -> Option<String> {
        string_mode(values)
    }

    /// Replace every missing numeric cell with `fill`.
    pub fn fill_numeric(values: &mut [Option<f64>], fill: f64) -> usize {
        let mut filled = 0;
        for value in values.iter_mut().filter(|v| v.is_none()) {
            *value = Some(fill);
            filled += 1;
        }
        filled
    }

    /// Replace every missing text cell with `fill`.
    pub fn fill_text(values: &mut [Option<String>], fill: &str) -> usize {
        let mut filled = 0;
        for value in values.iter_mut().filter(|v| v.is_none()) {
            *value = Some(fill.to_string());
            filled += 1;
        }
        filled
    }
}
