//! Missing-indicator matrix.

use crate::error::Result;
use crate::utils::{column_names, missing_mask};
use polars::prelude::*;

/// Column-major missing flags for a dataset, `true` = missing.
#[derive(Debug, Clone)]
pub struct IndicatorMatrix {
    columns: Vec<String>,
    flags: Vec<Vec<bool>>,
    n_rows: usize,
}

impl IndicatorMatrix {
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let mut flags = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            flags.push(missing_mask(column.as_materialized_series())?);
        }
        Ok(Self {
            columns: column_names(df),
            flags,
            n_rows: df.height(),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Missing flags of one column.
    pub fn column(&self, idx: usize) -> &[bool] {
        &self.flags[idx]
    }

    pub fn column_by_name(&self, name: &str) -> Option<&[bool]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| self.flags[idx].as_slice())
    }

    /// Missing flags of one row, in column order.
    pub fn row_mask(&self, row: usize) -> Vec<bool> {
        self.flags.iter().map(|col| col[row]).collect()
    }

    pub fn missing_count(&self, idx: usize) -> usize {
        self.flags[idx].iter().filter(|m| **m).count()
    }

    /// Missing rate per column.
    pub fn missing_rates(&self) -> Vec<f64> {
        (0..self.n_columns())
            .map(|idx| crate::utils::ratio(self.missing_count(idx), self.n_rows))
            .collect()
    }

    /// Whether any cell is missing.
    pub fn any_missing(&self) -> bool {
        self.flags.iter().any(|col| col.iter().any(|m| *m))
    }

    /// Indices of columns that are neither fully observed nor fully missing.
    pub fn partially_missing(&self) -> Vec<usize> {
        (0..self.n_columns())
            .filter(|&idx| {
                let missing = self.missing_count(idx);
                missing > 0 && missing < self.n_rows
            })
            .collect()
    }
}
