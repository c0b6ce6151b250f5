//! Imputation executor.
//!
//! Executes one [`ImputationConfig`] against a dataset and returns a new
//! DataFrame plus a ledger. Structural problems (unknown column, no valid
//! target) are errors; everything else degrades to a per-column fallback
//! recorded in the ledger.

use crate::config::EngineConfig;
use crate::error::{ImputationError, Result};
use crate::imputers::{
    ForestImputer, IterativeImputer, KnnImputer, LabelEncoder, MatrixImputation, MatrixImputer,
    StatisticalImputer, sequential,
};
use crate::types::{
    EngineWarning, FillSummary, FillValue, ImputationConfig, ImputationLedger,
    ImputationParameters, ImputationStrategy, LedgerEntry,
};
use crate::utils::{
    column_names, column_series, count_missing, is_binary, is_numeric_like, missing_mask,
    numeric_values, rebuild_numeric_series, rebuild_string_series, string_values,
};
use polars::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Injected multivariate imputers, keyed by the strategy they replace.
pub type ImputerOverrides = HashMap<ImputationStrategy, Arc<dyn MatrixImputer>>;

/// Extracted column values in the representation the procedures work on.
enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    fn load(series: &Series) -> Result<Self> {
        if is_numeric_like(series.dtype()) {
            Ok(Self::Numeric(numeric_values(series)?))
        } else {
            Ok(Self::Text(string_values(series)?))
        }
    }

    fn missing(&self) -> usize {
        match self {
            Self::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Text(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    fn into_series(self, name: &str, dtype: &DataType) -> Result<Series> {
        match self {
            Self::Numeric(v) => Ok(rebuild_numeric_series(name, v, dtype)?),
            Self::Text(v) => Ok(rebuild_string_series(name, v, dtype)),
        }
    }
}

/// Executes imputation configurations.
pub struct ImputationEngine<'a> {
    config: &'a EngineConfig,
    overrides: &'a ImputerOverrides,
}

impl<'a> ImputationEngine<'a> {
    pub fn new(config: &'a EngineConfig, overrides: &'a ImputerOverrides) -> Self {
        Self { config, overrides }
    }

    /// Run one configuration. The input is never modified.
    pub fn execute(&self, df: &DataFrame, request: &ImputationConfig) -> Result<(DataFrame, ImputationLedger)> {
        let started = Instant::now();
        let strategy = request.strategy;

        if df.width() == 0 {
            return Err(ImputationError::EmptyDataset(
                "dataset has no columns".to_string(),
            ));
        }
        self.validate_parameters(strategy, &request.parameters)?;

        let mut ledger = ImputationLedger::new(df.height());
        let targets = self.resolve_targets(df, request, &mut ledger)?;

        info!(
            "Imputing {} column(s) with {} ({} rows)",
            targets.len(),
            strategy,
            df.height()
        );

        let mut out = df.clone();
        if !targets.is_empty() {
            match strategy {
                ImputationStrategy::Mean
                | ImputationStrategy::Median
                | ImputationStrategy::Mode
                | ImputationStrategy::Constant => {
                    for name in &targets {
                        self.scalar_column(&mut out, name, strategy, &request.parameters, &mut ledger)?;
                    }
                }
                ImputationStrategy::ForwardFill
                | ImputationStrategy::BackwardFill
                | ImputationStrategy::Interpolation => {
                    for name in &targets {
                        self.sequential_column(&mut out, name, strategy, &request.parameters, &mut ledger)?;
                    }
                }
                ImputationStrategy::Drop => {
                    out = self.drop_rows(&out, &targets, &mut ledger)?;
                }
                ImputationStrategy::DropColumns => {
                    out = self.drop_columns(&out, &targets, &mut ledger)?;
                }
                ImputationStrategy::Knn
                | ImputationStrategy::Iterative
                | ImputationStrategy::TreeIterative => {
                    self.multivariate(&mut out, &targets, strategy, &request.parameters, &mut ledger)?;
                }
            }
        }

        ledger.rows_after = out.height();
        ledger.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "{} filled {} value(s) with {} warning(s) in {} ms",
            strategy,
            ledger.total_filled(),
            ledger.warnings.len(),
            ledger.duration_ms
        );
        Ok((out, ledger))
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn validate_parameters(&self, strategy: ImputationStrategy, params: &ImputationParameters) -> Result<()> {
        if strategy == ImputationStrategy::Constant && params.fill_value.is_none() {
            return Err(ImputationError::InvalidConfig(
                "constant imputation requires a fill_value".to_string(),
            ));
        }
        if params.n_neighbors == Some(0) {
            return Err(ImputationError::InvalidConfig(
                "n_neighbors must be at least 1".to_string(),
            ));
        }
        if params.max_iterations == Some(0) {
            return Err(ImputationError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if params.tolerance.is_some_and(|t| !(t > 0.0)) {
            return Err(ImputationError::InvalidConfig(
                "tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Target columns after existence and dtype checks.
    fn resolve_targets(
        &self,
        df: &DataFrame,
        request: &ImputationConfig,
        ledger: &mut ImputationLedger,
    ) -> Result<Vec<String>> {
        let strategy = request.strategy;
        let mut targets: Vec<String> = Vec::new();

        if request.columns.is_empty() {
            for column in df.get_columns() {
                let series = column.as_materialized_series();
                if strategy == ImputationStrategy::Drop || count_missing(series)? > 0 {
                    targets.push(series.name().to_string());
                }
            }
        } else {
            for name in &request.columns {
                column_series(df, name)?;
                if !targets.contains(name) {
                    targets.push(name.clone());
                }
            }
        }

        if strategy.is_numeric_only() {
            let requested = targets.len();
            let mut kept = Vec::with_capacity(requested);
            for name in targets {
                let series = column_series(df, &name)?;
                if is_numeric_like(series.dtype()) {
                    kept.push(name);
                } else {
                    warn!("'{}' is {} and cannot take {}; skipped", name, series.dtype(), strategy);
                    ledger.warn(EngineWarning::IncompatibleColumn {
                        column: name,
                        strategy,
                        reason: format!("{} requires a numeric column", strategy),
                    });
                }
            }
            if requested > 0 && kept.is_empty() {
                return Err(ImputationError::incompatible(
                    strategy,
                    "none of the target columns is numeric",
                ));
            }
            targets = kept;
        }

        if strategy.is_multivariate() && !targets.is_empty() {
            let has_numeric = df
                .get_columns()
                .iter()
                .any(|c| is_numeric_like(c.dtype()));
            if !has_numeric {
                return Err(ImputationError::incompatible(
                    strategy,
                    "the dataset has no numeric columns to model from",
                ));
            }
        }

        Ok(targets)
    }

    // =========================================================================
    // Scalar fills
    // =========================================================================

    fn scalar_column(
        &self,
        out: &mut DataFrame,
        name: &str,
        strategy: ImputationStrategy,
        params: &ImputationParameters,
        ledger: &mut ImputationLedger,
    ) -> Result<()> {
        let series = column_series(out, name)?;
        let dtype = series.dtype().clone();
        let mut values = ColumnValues::load(&series)?;
        let before = values.missing();

        let preferred = match &values {
            ColumnValues::Numeric(v) => numeric_scalar(strategy, params, v).map(FillValue::Number),
            ColumnValues::Text(v) => text_scalar(strategy, params, v).map(FillValue::Text),
        };

        let (applied, fill, reason) = match preferred {
            Ok(fill) => (strategy, Some(fill), None),
            Err(reason) => {
                let fallback = fallback_strategy(&values);
                let fill = if fallback == strategy {
                    None
                } else {
                    fallback_fill(&values)
                };
                (fallback, fill, Some(reason))
            }
        };

        let Some(fill) = fill else {
            let reason = reason.unwrap_or_else(|| "no fill value available".to_string());
            self.leave_unchanged(name, strategy, before, reason, ledger);
            return Ok(());
        };

        let filled = match (&mut values, &fill) {
            (ColumnValues::Numeric(v), FillValue::Number(x)) => StatisticalImputer::fill_numeric(v, *x),
            (ColumnValues::Text(v), fill) => StatisticalImputer::fill_text(v, &fill.as_text()),
            (ColumnValues::Numeric(v), FillValue::Text(t)) => match t.trim().parse::<f64>() {
                Ok(x) => StatisticalImputer::fill_numeric(v, x),
                Err(_) => 0,
            },
        };
        let remaining = values.missing();
        out.replace(name, values.into_series(name, &dtype)?)?;

        if let Some(reason) = &reason {
            self.warn_fallback(name, strategy, Some(applied), reason, ledger);
        }
        debug!("'{}': {} filled {} value(s) with {}", name, applied, filled, fill);

        ledger.record(LedgerEntry {
            column: name.to_string(),
            requested: strategy,
            applied: Some(applied),
            missing_before: before,
            values_filled: filled,
            remaining_missing: remaining,
            fill_summary: FillSummary::Scalar { value: fill },
            fallback_reason: reason,
        });
        Ok(())
    }

    // =========================================================================
    // Order-dependent fills
    // =========================================================================

    fn sequential_column(
        &self,
        out: &mut DataFrame,
        name: &str,
        strategy: ImputationStrategy,
        params: &ImputationParameters,
        ledger: &mut ImputationLedger,
    ) -> Result<()> {
        let series = column_series(out, name)?;
        let dtype = series.dtype().clone();
        let mut values = ColumnValues::load(&series)?;
        let before = values.missing();

        let method = params.interpolation_method.unwrap_or_default();
        let (filled, summary) = match (&mut values, strategy) {
            (ColumnValues::Numeric(v), ImputationStrategy::ForwardFill) => (
                sequential::forward_fill(v),
                FillSummary::Propagated {
                    direction: "forward".to_string(),
                },
            ),
            (ColumnValues::Text(v), ImputationStrategy::ForwardFill) => (
                sequential::forward_fill(v),
                FillSummary::Propagated {
                    direction: "forward".to_string(),
                },
            ),
            (ColumnValues::Numeric(v), ImputationStrategy::BackwardFill) => (
                sequential::backward_fill(v),
                FillSummary::Propagated {
                    direction: "backward".to_string(),
                },
            ),
            (ColumnValues::Text(v), ImputationStrategy::BackwardFill) => (
                sequential::backward_fill(v),
                FillSummary::Propagated {
                    direction: "backward".to_string(),
                },
            ),
            (ColumnValues::Numeric(v), _) => (
                sequential::interpolate(v, method),
                FillSummary::Interpolated { method },
            ),
            (ColumnValues::Text(_), _) => {
                // Filtered out by target resolution; kept total for safety.
                self.leave_unchanged(
                    name,
                    strategy,
                    before,
                    "interpolation requires a numeric column".to_string(),
                    ledger,
                );
                return Ok(());
            }
        };

        let remaining = values.missing();
        out.replace(name, values.into_series(name, &dtype)?)?;

        if remaining > 0 {
            debug!("'{}': {} edge value(s) without an anchor", name, remaining);
            ledger.warn(EngineWarning::UnresolvedEdges {
                column: name.to_string(),
                remaining,
            });
        }

        ledger.record(LedgerEntry {
            column: name.to_string(),
            requested: strategy,
            applied: Some(strategy),
            missing_before: before,
            values_filled: filled,
            remaining_missing: remaining,
            fill_summary: summary,
            fallback_reason: None,
        });
        Ok(())
    }

    // =========================================================================
    // Removal
    // =========================================================================

    fn drop_rows(&self, df: &DataFrame, targets: &[String], ledger: &mut ImputationLedger) -> Result<DataFrame> {
        let mut keep = vec![true; df.height()];
        let mut before = Vec::with_capacity(targets.len());
        for name in targets {
            let mask = missing_mask(&column_series(df, name)?)?;
            before.push(mask.iter().filter(|m| **m).count());
            for (k, m) in keep.iter_mut().zip(mask) {
                *k &= !m;
            }
        }

        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        let out = df.filter(&mask)?;
        let rows = df.height() - out.height();
        info!("Dropped {} of {} rows", rows, df.height());

        for (name, missing_before) in targets.iter().zip(before) {
            ledger.record(LedgerEntry {
                column: name.clone(),
                requested: ImputationStrategy::Drop,
                applied: Some(ImputationStrategy::Drop),
                missing_before,
                values_filled: 0,
                remaining_missing: 0,
                fill_summary: FillSummary::RowsDropped { rows },
                fallback_reason: None,
            });
        }
        Ok(out)
    }

    fn drop_columns(&self, df: &DataFrame, targets: &[String], ledger: &mut ImputationLedger) -> Result<DataFrame> {
        let mut out = df.clone();
        for name in targets {
            let missing_before = count_missing(&column_series(&out, name)?)?;
            out = out.drop(name)?;
            info!("Dropped column '{}' ({} missing)", name, missing_before);
            ledger.record(LedgerEntry {
                column: name.clone(),
                requested: ImputationStrategy::DropColumns,
                applied: Some(ImputationStrategy::DropColumns),
                missing_before,
                values_filled: 0,
                remaining_missing: 0,
                fill_summary: FillSummary::ColumnDropped,
                fallback_reason: None,
            });
        }
        Ok(out)
    }

    // =========================================================================
    // Multivariate
    // =========================================================================

    fn matrix_imputer(&self, strategy: ImputationStrategy, params: &ImputationParameters) -> Arc<dyn MatrixImputer> {
        if let Some(imputer) = self.overrides.get(&strategy) {
            return Arc::clone(imputer);
        }
        let config = self.config;
        let max_iterations = params.max_iterations.unwrap_or(config.max_iterations);
        let tolerance = params.tolerance.unwrap_or(config.convergence_tolerance);
        let budget = params.time_budget_ms.or(config.time_budget_ms);

        match strategy {
            ImputationStrategy::Iterative => Arc::new(
                IterativeImputer::new(max_iterations, tolerance).with_time_budget(budget),
            ),
            ImputationStrategy::TreeIterative => Arc::new(
                ForestImputer::new(
                    params.n_estimators.unwrap_or(config.forest_trees),
                    params.max_depth.unwrap_or(config.forest_max_depth),
                )
                .with_iterations(max_iterations, tolerance)
                .with_time_budget(budget)
                .with_seed(params.seed.unwrap_or(config.random_seed)),
            ),
            _ => Arc::new(KnnImputer::new(
                params.n_neighbors.unwrap_or(config.knn_neighbors),
            )),
        }
    }

    /// Model all numeric columns plus the label-encoded categorical targets
    /// in one pass, then write back the targets only.
    fn multivariate(
        &self,
        out: &mut DataFrame,
        targets: &[String],
        strategy: ImputationStrategy,
        params: &ImputationParameters,
        ledger: &mut ImputationLedger,
    ) -> Result<()> {
        struct MatrixColumn {
            name: String,
            dtype: DataType,
            values: Vec<Option<f64>>,
            encoder: Option<LabelEncoder>,
            missing_before: usize,
        }

        let mut columns: Vec<MatrixColumn> = Vec::new();
        let mut excluded: Vec<(String, usize)> = Vec::new();

        for name in column_names(out) {
            let series = column_series(out, &name)?;
            let is_target = targets.contains(&name);
            let numeric = is_numeric_like(series.dtype());
            if !numeric && !is_target {
                continue;
            }

            let (values, encoder) = if numeric {
                (numeric_values(&series)?, None)
            } else {
                let text = string_values(&series)?;
                let encoder = LabelEncoder::fit(&text);
                (encoder.encode(&text), Some(encoder))
            };
            let missing_before = values.iter().filter(|v| v.is_none()).count();

            if missing_before == values.len() {
                if is_target {
                    excluded.push((name, missing_before));
                }
                continue;
            }
            columns.push(MatrixColumn {
                name,
                dtype: series.dtype().clone(),
                values,
                encoder,
                missing_before,
            });
        }

        for (name, before) in excluded {
            self.leave_unchanged(&name, strategy, before, "column has no observed values".to_string(), ledger);
        }

        let target_idx: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| targets.contains(&c.name))
            .map(|(i, _)| i)
            .collect();
        if target_idx.is_empty() {
            return Ok(());
        }

        let n_rows = out.height();
        let matrix: Vec<Vec<Option<f64>>> = (0..n_rows)
            .map(|r| columns.iter().map(|c| c.values[r]).collect())
            .collect();

        let imputer = self.matrix_imputer(strategy, params);
        debug!(
            "{}: {} x {} matrix, {} target column(s)",
            imputer.name(),
            n_rows,
            columns.len(),
            target_idx.len()
        );

        let result = match imputer.fit_transform(&matrix) {
            Ok(result) => result,
            Err(e) => {
                let reason = format!("{} failed: {}", imputer.name(), e);
                warn!("{}; falling back per column", reason);
                for &i in &target_idx {
                    let name = columns[i].name.clone();
                    self.fallback_column(out, &name, strategy, reason.clone(), ledger)?;
                }
                return Ok(());
            }
        };

        let MatrixImputation {
            values,
            iterations,
            converged,
            cap_reason,
        } = result;

        let width = columns.len();
        if values.len() != n_rows || values.iter().any(|row| row.len() != width) {
            let reason = format!(
                "{} returned a {} x {} matrix, expected {} x {}",
                imputer.name(),
                values.len(),
                values.first().map_or(0, Vec::len),
                n_rows,
                width
            );
            warn!("{}; falling back per column", reason);
            for &i in &target_idx {
                let name = columns[i].name.clone();
                self.fallback_column(out, &name, strategy, reason.clone(), ledger)?;
            }
            return Ok(());
        }

        if let Some(reason) = cap_reason {
            warn!("{} stopped early: {}", strategy, reason);
            ledger.warn(EngineWarning::IterationCapReached {
                strategy,
                iterations,
                reason,
            });
        }

        for &i in &target_idx {
            let column = &columns[i];
            let imputed: Vec<f64> = values.iter().map(|row| row[i]).collect();

            let (series, leftover, fallback) = match &column.encoder {
                None => {
                    let binary = is_binary(&column.values);
                    let mut merged: Vec<Option<f64>> = column
                        .values
                        .iter()
                        .zip(&imputed)
                        .map(|(orig, new)| match orig {
                            Some(v) => Some(*v),
                            None if new.is_finite() && binary => {
                                Some(if *new >= 0.5 { 1.0 } else { 0.0 })
                            }
                            None if new.is_finite() => Some(*new),
                            None => None,
                        })
                        .collect();

                    let leftover = merged.iter().filter(|v| v.is_none()).count();
                    let mut fallback = None;
                    if leftover > 0 {
                        let substitute = if binary {
                            ImputationStrategy::Mode
                        } else {
                            ImputationStrategy::Mean
                        };
                        if let Some(x) = StatisticalImputer::numeric_fill_value(substitute, &column.values) {
                            StatisticalImputer::fill_numeric(&mut merged, x);
                            fallback = Some(substitute);
                        }
                    }
                    (
                        rebuild_numeric_series(&column.name, merged, &column.dtype)?,
                        leftover,
                        fallback,
                    )
                }
                Some(encoder) => {
                    let original = string_values(&column_series(out, &column.name)?)?;
                    let mode = StatisticalImputer::text_mode(&original);
                    let mut merged: Vec<Option<String>> = original
                        .into_iter()
                        .zip(&imputed)
                        .map(|(orig, code)| orig.or_else(|| encoder.decode(*code).map(str::to_string)))
                        .collect();

                    let leftover = merged.iter().filter(|v| v.is_none()).count();
                    let mut fallback = None;
                    if leftover > 0 {
                        if let Some(mode) = mode {
                            StatisticalImputer::fill_text(&mut merged, &mode);
                            fallback = Some(ImputationStrategy::Mode);
                        }
                    }
                    (
                        rebuild_string_series(&column.name, merged, &column.dtype),
                        leftover,
                        fallback,
                    )
                }
            };
            let remaining = count_missing(&series)?;
            out.replace(&column.name, series)?;

            let fallback_reason = (leftover > 0).then(|| {
                format!("{} left {} cell(s) unresolved", imputer.name(), leftover)
            });
            if let Some(reason) = &fallback_reason {
                self.warn_fallback(&column.name, strategy, fallback, reason, ledger);
            }

            ledger.record(LedgerEntry {
                column: column.name.clone(),
                requested: strategy,
                applied: Some(strategy),
                missing_before: column.missing_before,
                values_filled: column.missing_before - remaining,
                remaining_missing: remaining,
                fill_summary: FillSummary::Model {
                    model: imputer.name().to_string(),
                    iterations,
                    converged,
                },
                fallback_reason,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Fallbacks
    // =========================================================================

    /// Mean for numeric columns, mode for binary and text columns.
    fn fallback_column(
        &self,
        out: &mut DataFrame,
        name: &str,
        requested: ImputationStrategy,
        reason: String,
        ledger: &mut ImputationLedger,
    ) -> Result<()> {
        let series = column_series(out, name)?;
        let dtype = series.dtype().clone();
        let mut values = ColumnValues::load(&series)?;
        let before = values.missing();
        let fallback = fallback_strategy(&values);

        let Some(fill) = fallback_fill(&values) else {
            self.leave_unchanged(name, requested, before, reason, ledger);
            return Ok(());
        };
        let filled = match (&mut values, &fill) {
            (ColumnValues::Numeric(v), FillValue::Number(x)) => StatisticalImputer::fill_numeric(v, *x),
            (ColumnValues::Text(v), fill) => StatisticalImputer::fill_text(v, &fill.as_text()),
            (ColumnValues::Numeric(_), FillValue::Text(_)) => 0,
        };
        let remaining = values.missing();
        out.replace(name, values.into_series(name, &dtype)?)?;

        self.warn_fallback(name, requested, Some(fallback), &reason, ledger);
        ledger.record(LedgerEntry {
            column: name.to_string(),
            requested,
            applied: Some(fallback),
            missing_before: before,
            values_filled: filled,
            remaining_missing: remaining,
            fill_summary: FillSummary::Scalar { value: fill },
            fallback_reason: Some(reason),
        });
        Ok(())
    }

    fn leave_unchanged(
        &self,
        name: &str,
        requested: ImputationStrategy,
        missing: usize,
        reason: String,
        ledger: &mut ImputationLedger,
    ) {
        self.warn_fallback(name, requested, None, &reason, ledger);
        ledger.record(LedgerEntry {
            column: name.to_string(),
            requested,
            applied: None,
            missing_before: missing,
            values_filled: 0,
            remaining_missing: missing,
            fill_summary: FillSummary::Unchanged {
                reason: reason.clone(),
            },
            fallback_reason: Some(reason),
        });
    }

    fn warn_fallback(
        &self,
        name: &str,
        requested: ImputationStrategy,
        applied: Option<ImputationStrategy>,
        reason: &str,
        ledger: &mut ImputationLedger,
    ) {
        match applied {
            Some(applied) => warn!("'{}': {} failed ({}), using {}", name, requested, reason, applied),
            None => warn!("'{}': {} failed ({}), left unchanged", name, requested, reason),
        }
        ledger.warn(EngineWarning::PartialFailure {
            column: name.to_string(),
            requested,
            applied,
            reason: reason.to_string(),
        });
    }
}

fn numeric_scalar(
    strategy: ImputationStrategy,
    params: &ImputationParameters,
    values: &[Option<f64>],
) -> std::result::Result<f64, String> {
    match strategy {
        ImputationStrategy::Constant => {
            let fill = params
                .fill_value
                .as_ref()
                .ok_or_else(|| "no fill value given".to_string())?;
            fill.as_number()
                .ok_or_else(|| format!("fill value {} is not numeric", fill))
        }
        _ => StatisticalImputer::numeric_fill_value(strategy, values)
            .ok_or_else(|| "column has no observed values".to_string()),
    }
}

fn text_scalar(
    strategy: ImputationStrategy,
    params: &ImputationParameters,
    values: &[Option<String>],
) -> std::result::Result<String, String> {
    match strategy {
        ImputationStrategy::Constant => params
            .fill_value
            .as_ref()
            .map(FillValue::as_text)
            .ok_or_else(|| "no fill value given".to_string()),
        ImputationStrategy::Mode => StatisticalImputer::text_mode(values)
            .ok_or_else(|| "column has no observed values".to_string()),
        other => Err(format!("{} does not apply to text columns", other)),
    }
}

/// Mean for numeric columns, mode for binary and text columns.
fn fallback_strategy(values: &ColumnValues) -> ImputationStrategy {
    match values {
        ColumnValues::Numeric(v) if !is_binary(v) => ImputationStrategy::Mean,
        _ => ImputationStrategy::Mode,
    }
}

fn fallback_fill(values: &ColumnValues) -> Option<FillValue> {
    match values {
        ColumnValues::Numeric(v) => {
            StatisticalImputer::numeric_fill_value(fallback_strategy(values), v).map(FillValue::Number)
        }
        ColumnValues::Text(v) => StatisticalImputer::text_mode(v).map(FillValue::Text),
    }
}
