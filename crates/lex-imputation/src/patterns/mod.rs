//! Missingness pattern analysis.
//!
//! Enumerates distinct row patterns of missing columns, checks whether the
//! patterns are monotone (nested), and measures how strongly the missing
//! indicators of different columns move together.
//!
//! Percentages in [`PatternAnalysis`] are on a 0-100 scale. The listed
//! top-K patterns plus the "other" bucket always cover exactly 100% of rows.

mod indicator;

pub use indicator::IndicatorMatrix;

use crate::config::EngineConfig;
use crate::profiler::statistics::pearson;
use crate::types::{
    CorrelationStrength, MissingnessCorrelation, MissingnessPattern, OtherPatterns,
    PatternAnalysis,
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Analyzer for missingness patterns.
pub struct MissingnessPatternAnalyzer<'a> {
    config: &'a EngineConfig,
}

impl<'a> MissingnessPatternAnalyzer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Analyze the indicator matrix of a dataset.
    pub fn analyze(&self, matrix: &IndicatorMatrix) -> PatternAnalysis {
        let columns = matrix.columns().to_vec();
        let n_rows = matrix.n_rows();

        if !matrix.any_missing() {
            debug!("No missing values: pattern analysis is trivially complete");
            return PatternAnalysis::complete(columns, n_rows);
        }

        let (counts, overflow_rows) = self.enumerate(matrix);
        let enumeration_capped = overflow_rows > 0;

        let mut ranked: Vec<(Vec<bool>, usize)> = counts.into_iter().collect();
        ranked.sort_by(|(mask_a, count_a), (mask_b, count_b)| {
            count_b
                .cmp(count_a)
                .then_with(|| missing_in(mask_a).cmp(&missing_in(mask_b)))
                .then_with(|| mask_a.cmp(mask_b))
        });

        let is_monotone =
            !enumeration_capped && is_monotone(ranked.iter().map(|(mask, _)| mask.as_slice()));

        let top_k = self.config.top_k_patterns;
        let mut cumulative_rows = 0usize;
        let patterns: Vec<MissingnessPattern> = ranked
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(idx, (mask, count))| {
                cumulative_rows += count;
                MissingnessPattern {
                    pattern_id: idx + 1,
                    mask: mask.clone(),
                    missing_columns: columns
                        .iter()
                        .zip(mask)
                        .filter(|(_, missing)| **missing)
                        .map(|(name, _)| name.clone())
                        .collect(),
                    occurrence_count: *count,
                    row_percentage: percent(*count, n_rows),
                    cumulative_percentage: percent(cumulative_rows, n_rows),
                }
            })
            .collect();

        let tail = &ranked[patterns.len()..];
        let other_rows: usize = tail.iter().map(|(_, count)| count).sum::<usize>() + overflow_rows;
        let other = (other_rows > 0).then(|| OtherPatterns {
            distinct_patterns: tail.len() + usize::from(enumeration_capped),
            occurrence_count: other_rows,
            row_percentage: percent(other_rows, n_rows),
        });

        let correlated_pairs = self.correlated_pairs(matrix);

        debug!(
            "Found {} distinct patterns (top {} cover {:.1}%), monotone: {}",
            ranked.len(),
            patterns.len(),
            percent(cumulative_rows, n_rows),
            is_monotone
        );

        PatternAnalysis {
            columns,
            n_rows,
            is_complete: false,
            distinct_patterns: ranked.len(),
            enumeration_capped,
            patterns,
            other,
            coverage: percent(cumulative_rows, n_rows),
            is_monotone,
            correlated_pairs,
        }
    }

    /// Count rows per exact mask. Once `max_distinct_patterns` masks are
    /// tracked, rows with unseen masks are only counted as overflow.
    fn enumerate(&self, matrix: &IndicatorMatrix) -> (HashMap<Vec<bool>, usize>, usize) {
        let cap = self.config.max_distinct_patterns;
        let mut counts: HashMap<Vec<bool>, usize> = HashMap::new();
        let mut overflow = 0;

        for row in 0..matrix.n_rows() {
            let mask = matrix.row_mask(row);
            if let Some(count) = counts.get_mut(&mask) {
                *count += 1;
            } else if counts.len() < cap {
                counts.insert(mask, 1);
            } else {
                overflow += 1;
            }
        }

        (counts, overflow)
    }

    /// Pairwise phi correlation between indicators of partially missing
    /// columns, keeping pairs above the "correlated" threshold.
    fn correlated_pairs(&self, matrix: &IndicatorMatrix) -> Vec<MissingnessCorrelation> {
        let candidates = matrix.partially_missing();
        let names = matrix.columns();
        let mut pairs = Vec::new();

        for (pos, &a) in candidates.iter().enumerate() {
            for &b in &candidates[pos + 1..] {
                let observations: Vec<(f64, f64)> = matrix
                    .column(a)
                    .iter()
                    .zip(matrix.column(b))
                    .map(|(x, y)| (f64::from(u8::from(*x)), f64::from(u8::from(*y))))
                    .collect();

                let Some(r) = pearson(&observations, 2) else {
                    continue;
                };
                if r.abs() <= self.config.correlated_missingness_threshold {
                    continue;
                }

                let strength = if r.abs() > self.config.very_strong_missingness_threshold {
                    CorrelationStrength::VeryStrong
                } else {
                    CorrelationStrength::Correlated
                };
                pairs.push(MissingnessCorrelation {
                    column_a: names[a].clone(),
                    column_b: names[b].clone(),
                    correlation: r,
                    strength,
                });
            }
        }

        pairs.sort_by(|x, y| y.correlation.abs().total_cmp(&x.correlation.abs()));
        pairs
    }
}

fn missing_in(mask: &[bool]) -> usize {
    mask.iter().filter(|m| **m).count()
}

fn percent(count: usize, total: usize) -> f64 {
    crate::utils::ratio(count, total) * 100.0
}

/// Patterns are monotone when sorting rows by missing count never makes a
/// column go from missing back to observed. Rows with equal missing counts
/// must therefore share one mask, and each larger mask must contain the
/// previous one.
pub fn is_monotone<'m>(masks: impl Iterator<Item = &'m [bool]>) -> bool {
    let mut by_count: BTreeMap<usize, &[bool]> = BTreeMap::new();
    for mask in masks {
        match by_count.get(&missing_in(mask)) {
            Some(existing) if *existing != mask => return false,
            Some(_) => {}
            None => {
                by_count.insert(missing_in(mask), mask);
            }
        }
    }

    by_count
        .values()
        .zip(by_count.values().skip(1))
        .all(|(smaller, larger)| smaller.iter().zip(larger.iter()).all(|(s, l)| !*s || *l))
}
