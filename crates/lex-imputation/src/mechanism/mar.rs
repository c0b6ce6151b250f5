//! MAR relationship scan.
//!
//! Correlates each column's missing indicator with the observed values of
//! every other numeric or binary column. A strong link suggests the
//! missingness is explained by observed data.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::patterns::IndicatorMatrix;
use crate::profiler::statistics::pearson;
use crate::types::{DatasetProfile, MarRelationship, MarScan, RelationshipStrength};
use crate::utils::numeric_values;
use polars::prelude::*;
use tracing::debug;

/// Minimum paired observations for a correlation to count.
const MIN_PAIRS: usize = 3;

pub fn mar_scan(
    df: &DataFrame,
    matrix: &IndicatorMatrix,
    profile: &DatasetProfile,
    config: &EngineConfig,
) -> Result<MarScan> {
    let missing_columns = matrix.partially_missing();
    if missing_columns.is_empty() {
        return Ok(MarScan::default());
    }

    // Observed values of every numeric-like column, computed once.
    let mut predictors: Vec<(usize, Vec<Option<f64>>)> = Vec::new();
    for (idx, column) in profile.columns.iter().enumerate() {
        if column.inferred_kind.is_numeric_like() {
            let series = df.column(&column.name)?.as_materialized_series();
            predictors.push((idx, numeric_values(series)?));
        }
    }

    let names = matrix.columns();
    let mut relationships = Vec::new();

    for &target in &missing_columns {
        let indicator = matrix.column(target);
        for (predictor, values) in &predictors {
            if *predictor == target {
                continue;
            }

            let pairs: Vec<(f64, f64)> = indicator
                .iter()
                .zip(values)
                .filter_map(|(missing, value)| {
                    value.map(|v| (f64::from(u8::from(*missing)), v))
                })
                .collect();

            let Some(r) = pearson(&pairs, MIN_PAIRS) else {
                continue;
            };
            if r.abs() <= config.mar_moderate_threshold {
                continue;
            }

            let strength = if r.abs() > config.mar_strong_threshold {
                RelationshipStrength::Strong
            } else {
                RelationshipStrength::Moderate
            };
            debug!(
                "Missingness of '{}' tracks '{}' (r = {:.3}, {:?})",
                names[target], names[*predictor], r, strength
            );
            relationships.push(MarRelationship {
                missing_column: names[target].clone(),
                observed_column: names[*predictor].clone(),
                correlation: r,
                strength,
                n_observations: pairs.len(),
            });
        }
    }

    relationships.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
    let mar_likely = !relationships.is_empty();
    Ok(MarScan {
        relationships,
        mar_likely,
    })
}
