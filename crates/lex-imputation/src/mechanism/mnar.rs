//! MNAR heuristic indicators.
//!
//! None of these prove MNAR; they flag columns where self-censoring is
//! plausible: a large missing share, a name from the sensitivity lexicon,
//! or observed values piled against an edge as if the tail had been cut.

use crate::config::EngineConfig;
use crate::error::{ImputationError, Result};
use crate::profiler::statistics::{quantile_sorted, sorted};
use crate::types::{ColumnKind, DatasetProfile, MnarIndicator, MnarIndicatorKind, MnarScan};
use crate::utils::numeric_values;
use polars::prelude::*;
use regex::Regex;
use tracing::debug;

/// Observed values needed before boundary clustering is assessed.
const MIN_BOUNDARY_OBSERVATIONS: usize = 30;

/// Distinct values needed; low-cardinality scales pile up at their ends
/// naturally.
const MIN_BOUNDARY_CARDINALITY: usize = 10;

/// Build the lexicon matcher. A term matches at the start of a name token,
/// so "age" matches `age` and `patient_age` but not `average`.
pub fn sensitive_name_matcher(terms: &[String]) -> Result<Option<Regex>> {
    if terms.is_empty() {
        return Ok(None);
    }
    let alternation = terms
        .iter()
        .map(|t| regex::escape(t.trim()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)(?:^|[^a-z0-9])(?:{})", alternation))
        .map(Some)
        .map_err(|e| ImputationError::InvalidConfig(format!("sensitive name lexicon: {}", e)))
}

pub fn mnar_scan(df: &DataFrame, profile: &DatasetProfile, config: &EngineConfig) -> Result<MnarScan> {
    let matcher = sensitive_name_matcher(&config.sensitive_name_terms)?;
    let mut indicators = Vec::new();

    for column in profile.columns_with_missing() {
        if column.missing_ratio > config.mnar_missing_ratio_threshold {
            indicators.push(MnarIndicator {
                column: column.name.clone(),
                kind: MnarIndicatorKind::HighMissingRatio,
                detail: format!(
                    "{:.1}% missing exceeds {:.0}%",
                    column.missing_ratio * 100.0,
                    config.mnar_missing_ratio_threshold * 100.0
                ),
                value: Some(column.missing_ratio),
            });
        }

        if let Some(term) = matcher
            .as_ref()
            .and_then(|re| re.find(&column.name))
            .map(|m| m.as_str().trim_start_matches(|c: char| !c.is_alphanumeric()))
        {
            indicators.push(MnarIndicator {
                column: column.name.clone(),
                kind: MnarIndicatorKind::SensitiveName,
                detail: format!("name matches sensitive term '{}'", term.to_lowercase()),
                value: None,
            });
        }

        if column.inferred_kind == ColumnKind::Numeric
            && column.cardinality >= MIN_BOUNDARY_CARDINALITY
        {
            let series = df.column(&column.name)?.as_materialized_series();
            let values: Vec<f64> = numeric_values(series)?.into_iter().flatten().collect();
            if let Some(shares) = edge_shares(&values, config.boundary_tolerance) {
                if let Some((side, share)) = shares.piled_edge(config.boundary_clustering_threshold) {
                    indicators.push(MnarIndicator {
                        column: column.name.clone(),
                        kind: MnarIndicatorKind::BoundaryClustering,
                        detail: format!(
                            "{:.1}% of observed values piled against the {} edge ({:.1}% at the other)",
                            share * 100.0,
                            side,
                            shares.lower.min(shares.upper) * 100.0
                        ),
                        value: Some(share),
                    });
                }
            }
        }
    }

    for indicator in &indicators {
        debug!("MNAR indicator on '{}': {}", indicator.column, indicator.detail);
    }

    let mnar_likely = !indicators.is_empty();
    Ok(MnarScan {
        indicators,
        mnar_likely,
    })
}

/// Share of observed values inside the band just above the minimum and just
/// below the maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeShares {
    pub lower: f64,
    pub upper: f64,
}

impl EdgeShares {
    /// The edge values pile up against, if any.
    ///
    /// A pile-up needs more than `threshold` of the values in one band and at
    /// least [`MIN_EDGE_ASYMMETRY`] times the share of the opposite band. Flat
    /// and symmetric shapes fill both bands alike and are never flagged.
    pub fn piled_edge(&self, threshold: f64) -> Option<(&'static str, f64)> {
        let (side, heavy, light) = if self.upper >= self.lower {
            ("upper", self.upper, self.lower)
        } else {
            ("lower", self.lower, self.upper)
        };
        (heavy > threshold && heavy >= MIN_EDGE_ASYMMETRY * light).then_some((side, heavy))
    }
}

/// Ratio between the heavier and the lighter edge band needed for a pile-up.
pub const MIN_EDGE_ASYMMETRY: f64 = 2.0;

/// Edge band shares. The band width is `tolerance` times the 1st-99th
/// percentile range.
pub fn edge_shares(values: &[f64], tolerance: f64) -> Option<EdgeShares> {
    if values.len() < MIN_BOUNDARY_OBSERVATIONS {
        return None;
    }
    let sorted = sorted(values);
    let p01 = quantile_sorted(&sorted, 0.01)?;
    let p99 = quantile_sorted(&sorted, 0.99)?;
    let spread = p99 - p01;
    if spread <= 0.0 {
        return None;
    }

    let band = tolerance * spread;
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let n = sorted.len() as f64;

    Some(EdgeShares {
        lower: sorted.iter().filter(|v| **v <= min + band).count() as f64 / n,
        upper: sorted.iter().filter(|v| **v >= max - band).count() as f64 / n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::ColumnProfiler;
    use statrs::distribution::{ContinuousCDF, Normal};

    /// Evenly spaced normal quantiles: a noise-free bell curve.
    fn bell(n: usize, mean: f64, std: f64) -> Vec<f64> {
        let normal = Normal::new(mean, std).unwrap();
        (0..n)
            .map(|i| normal.inverse_cdf((i as f64 + 0.5) / n as f64))
            .collect()
    }

    fn scan(df: &DataFrame) -> MnarScan {
        let profile = ColumnProfiler::profile_dataset(df).unwrap();
        mnar_scan(df, &profile, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_sensitive_name_matcher() {
        let re = sensitive_name_matcher(&crate::config::default_sensitive_terms())
            .unwrap()
            .unwrap();
        assert!(re.is_match("age"));
        assert!(re.is_match("patient_age"));
        assert!(re.is_match("Annual Income"));
        assert!(re.is_match("smoker"));
        assert!(!re.is_match("average"));
        assert!(!re.is_match("page_views"));
        assert!(sensitive_name_matcher(&[]).unwrap().is_none());
    }

    #[test]
    fn test_edge_shares_natural_tail() {
        let shares = edge_shares(&bell(1000, 0.0, 1.0), 0.1).unwrap();
        assert!(shares.upper < 0.05, "shares = {:?}", shares);
        assert_eq!(shares.piled_edge(0.05), None);
    }

    #[test]
    fn test_edge_shares_truncated_tail() {
        let mut values = bell(1000, 50_000.0, 15_000.0);
        values.truncate(900);
        let shares = edge_shares(&values, 0.1).unwrap();
        let (side, share) = shares.piled_edge(0.05).unwrap();
        assert_eq!(side, "upper");
        assert!(share > 0.05, "shares = {:?}", shares);
    }

    #[test]
    fn test_edge_shares_uniform_is_not_piled() {
        // Both bands hold about 10% of a flat distribution.
        let values: Vec<f64> = (0..1000).filter(|i| i % 10 != 0).map(|i| i as f64 / 10.0).collect();
        let shares = edge_shares(&values, 0.1).unwrap();
        assert!(shares.lower > 0.05 && shares.upper > 0.05, "shares = {:?}", shares);
        assert_eq!(shares.piled_edge(0.05), None);
    }

    #[test]
    fn test_edge_shares_top_coded() {
        let values: Vec<f64> = (0..900).map(|i| (i as f64 / 10.0).min(70.0)).collect();
        let (side, share) = edge_shares(&values, 0.1).unwrap().piled_edge(0.05).unwrap();
        assert_eq!(side, "upper");
        assert!(share > 0.15, "share = {}", share);
    }

    #[test]
    fn test_edge_shares_needs_observations() {
        assert!(edge_shares(&[1.0, 2.0, 3.0], 0.1).is_none());
        assert!(edge_shares(&[4.0; 50], 0.1).is_none());
    }

    #[test]
    fn test_uniform_column_not_flagged() {
        let score: Vec<Option<f64>> = (0..1000)
            .map(|i| (i % 10 != 0).then_some(i as f64 / 10.0))
            .collect();
        let df = df!("score" => score).unwrap();
        let result = scan(&df);
        assert!(result.flags_for("score").is_empty());
        assert!(!result.mnar_likely);
    }

    #[test]
    fn test_high_ratio_and_name() {
        let df = df!(
            "salary" => &[None, None, Some(1.0), None, Some(2.0)],
            "score" => &[Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)]
        )
        .unwrap();

        let result = scan(&df);
        assert!(result.mnar_likely);
        assert!(result.has_indicator("salary", MnarIndicatorKind::HighMissingRatio));
        assert!(result.has_indicator("salary", MnarIndicatorKind::SensitiveName));
        assert!(result.flags_for("score").is_empty());
    }

    #[test]
    fn test_truncated_column_flagged() {
        let values = bell(1000, 50_000.0, 15_000.0);
        let income: Vec<Option<f64>> = values
            .iter()
            .enumerate()
            .map(|(i, v)| if i >= 900 { None } else { Some(*v) })
            .collect();
        let df = df!("household" => income).unwrap();

        let result = scan(&df);
        assert_eq!(
            result.flags_for("household"),
            vec![MnarIndicatorKind::BoundaryClustering]
        );
    }

    #[test]
    fn test_complete_columns_ignored() {
        let df = df!("income" => &[1.0, 2.0, 3.0]).unwrap();
        let result = scan(&df);
        assert!(!result.mnar_likely);
    }
}
