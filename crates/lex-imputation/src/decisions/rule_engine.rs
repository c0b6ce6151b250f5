//! Rule-based strategy recommender.

use super::StrategyRecommender;
use crate::config::EngineConfig;
use crate::types::{
    ColumnDiagnosis, ColumnKind, ColumnRecommendation, Diagnosis, FillValue, ImputationParameters,
    ImputationStrategy, Mechanism, MissingSeverity, MnarIndicatorKind, StrategyCandidate,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Column names that look like time axes.
static TEMPORAL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(^|[^a-z])(date|time|timestamp|datetime|year|month|week|day|hour)|(_at|_on)$|^(created|updated|modified)",
    )
    .expect("Invalid regex: temporal column name")
});

/// Whether a column name suggests rows are ordered in time.
pub fn is_temporal_name(name: &str) -> bool {
    TEMPORAL_NAME.is_match(name)
}

/// Recommender that maps (kind, missing ratio, mechanism) to candidates
/// using fixed thresholds.
///
/// - numeric below 5%: mean and median
/// - numeric 5-20%: KNN and iterative; dropping rows is listed but not recommended
/// - numeric above 20%: tree-ensemble iterative; dropping rows as a fallback
/// - binary: mode, plus KNN from 5%
/// - categorical: mode and the constant "Unknown"
/// - above 30% for binary/categorical: dropping the column, not recommended
/// - temporal names add forward fill and interpolation
///
/// Columns with MNAR indicators (or any column under an MNAR verdict) get a
/// caution. Mean/median lose their recommended status only when the evidence
/// is about the values themselves: boundary clustering, a high missing ratio
/// or an MNAR verdict. A sensitive name alone keeps the low-missing
/// mean/median recommendation and only attaches the caution.
pub struct RuleBasedRecommender {
    low_missing: f64,
    moderate_missing: f64,
    drop_column_ratio: f64,
    knn_neighbors: usize,
}

impl Default for RuleBasedRecommender {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl RuleBasedRecommender {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            low_missing: 0.05,
            moderate_missing: 0.20,
            drop_column_ratio: config.mnar_missing_ratio_threshold,
            knn_neighbors: config.knn_neighbors,
        }
    }

    fn recommend_column(&self, column: &ColumnDiagnosis, diagnosis: &Diagnosis) -> ColumnRecommendation {
        let ratio = column.missing_ratio;
        let pct = ratio * 100.0;
        let caution = self.caution_for(column, diagnosis);
        let demote_central = caution.is_some() && demotes_central_fills(column, diagnosis);
        let mut candidates = Vec::new();

        match column.kind {
            ColumnKind::Numeric => {
                if ratio < self.low_missing {
                    let skewed = diagnosis
                        .profile
                        .column(&column.column)
                        .and_then(|p| p.numeric_summary())
                        .is_some_and(|s| s.skewness.abs() > 1.0);
                    let mean = candidate(
                        column,
                        ImputationStrategy::Mean,
                        format!("{:.1}% missing is low; the mean barely shifts the distribution", pct),
                    );
                    let median = candidate(
                        column,
                        ImputationStrategy::Median,
                        format!("{:.1}% missing is low; the median is robust to outliers", pct),
                    );
                    if skewed {
                        candidates.extend([median, mean]);
                    } else {
                        candidates.extend([mean, median]);
                    }
                    if demote_central {
                        candidates.push(candidate(
                            column,
                            ImputationStrategy::Knn,
                            "Neighbour-based fill avoids pulling censored values to the centre"
                                .to_string(),
                        ));
                    }
                } else if ratio <= self.moderate_missing {
                    candidates.push(self.knn_candidate(column, diagnosis, pct));
                    candidates.push(candidate(
                        column,
                        ImputationStrategy::Iterative,
                        format!(
                            "{:.1}% missing: chained regressions preserve relationships between columns{}",
                            pct,
                            if diagnosis.patterns.is_monotone {
                                "; the pattern is monotone so sequential fitting is well-posed"
                            } else {
                                ""
                            }
                        ),
                    ));
                    candidates.push(not_recommended(
                        column,
                        ImputationStrategy::Drop,
                        format!("Dropping rows would discard {:.1}% of the data and may bias results", pct),
                    ));
                } else {
                    candidates.push(candidate(
                        column,
                        ImputationStrategy::TreeIterative,
                        format!(
                            "{:.1}% missing is high; a tree ensemble captures non-linear structure from the observed columns",
                            pct
                        ),
                    ));
                    candidates.push(not_recommended(
                        column,
                        ImputationStrategy::Drop,
                        format!("Fallback only: dropping rows loses {:.1}% of the data", pct),
                    ));
                }
            }
            ColumnKind::Binary => {
                candidates.push(candidate(
                    column,
                    ImputationStrategy::Mode,
                    "Most frequent class keeps the column binary".to_string(),
                ));
                if ratio >= self.low_missing {
                    candidates.push(self.knn_candidate(column, diagnosis, pct));
                }
                if ratio > self.drop_column_ratio {
                    candidates.push(self.drop_column_candidate(column, pct));
                }
            }
            ColumnKind::Categorical => {
                candidates.push(candidate(
                    column,
                    ImputationStrategy::Mode,
                    "Most frequent category; suitable when missingness is sparse".to_string(),
                ));
                let mut constant = candidate(
                    column,
                    ImputationStrategy::Constant,
                    "Explicit \"Unknown\" category keeps missingness visible to models".to_string(),
                );
                constant.parameters =
                    ImputationParameters::default().with_fill_value(FillValue::Text("Unknown".into()));
                candidates.push(constant);
                if ratio > self.drop_column_ratio {
                    candidates.push(self.drop_column_candidate(column, pct));
                }
            }
        }

        if is_temporal_name(&column.column) {
            candidates.push(candidate(
                column,
                ImputationStrategy::ForwardFill,
                "Time-like column: carry the last observation forward".to_string(),
            ));
            if column.kind.is_numeric_like() {
                let mut interpolation = candidate(
                    column,
                    ImputationStrategy::Interpolation,
                    "Time-like numeric column: interpolate between neighbouring rows".to_string(),
                );
                interpolation.recommended = column.kind == ColumnKind::Numeric;
                candidates.push(interpolation);
            }
        }

        if let Some(reason) = caution.as_ref().filter(|_| demote_central) {
            for c in candidates.iter_mut().filter(|c| {
                matches!(c.strategy, ImputationStrategy::Mean | ImputationStrategy::Median)
            }) {
                c.recommended = false;
                c.rationale = format!("{}. Not recommended: {}", c.rationale, reason);
            }
        }

        // Recommended first; the sort is stable so rule order breaks ties.
        candidates.sort_by_key(|c| !c.recommended);

        debug!(
            "'{}' ({}, {:.1}% missing): {} candidates, best = {:?}",
            column.column,
            column.kind,
            pct,
            candidates.len(),
            candidates.iter().find(|c| c.recommended).map(|c| c.strategy)
        );

        ColumnRecommendation {
            column: column.column.clone(),
            kind: column.kind,
            missing_ratio: ratio,
            severity: MissingSeverity::from_ratio(ratio),
            candidates,
            caution,
        }
    }

    fn knn_candidate(&self, column: &ColumnDiagnosis, diagnosis: &Diagnosis, pct: f64) -> StrategyCandidate {
        let partners = &column.mar_partners;
        let rationale = if partners.is_empty() {
            format!(
                "{:.1}% missing: the {} most similar rows supply plausible values",
                pct, self.knn_neighbors
            )
        } else {
            format!(
                "{:.1}% missing, related to {}: similar rows on those columns supply plausible values",
                pct,
                partners.join(", ")
            )
        };
        let mut knn = candidate(column, ImputationStrategy::Knn, rationale);
        if diagnosis.profile.n_rows <= self.knn_neighbors {
            knn.recommended = false;
            knn.rationale.push_str(". Too few rows for the neighbour count");
        }
        knn
    }

    fn drop_column_candidate(&self, column: &ColumnDiagnosis, pct: f64) -> StrategyCandidate {
        not_recommended(
            column,
            ImputationStrategy::DropColumns,
            format!(
                "{:.1}% missing exceeds {:.0}%: consider removing the column entirely",
                pct,
                self.drop_column_ratio * 100.0
            ),
        )
    }

    fn caution_for(&self, column: &ColumnDiagnosis, diagnosis: &Diagnosis) -> Option<String> {
        if !column.mnar_flags.is_empty() {
            let flags: Vec<String> = column.mnar_flags.iter().map(|f| f.to_string()).collect();
            return Some(format!(
                "possible MNAR ({}); a central-tendency fill would hide systematic missingness",
                flags.join(", ")
            ));
        }
        if diagnosis.verdict.mechanism == Mechanism::Mnar {
            return Some(
                "dataset verdict is MNAR; imputed values may be systematically biased".to_string(),
            );
        }
        None
    }
}

fn demotes_central_fills(column: &ColumnDiagnosis, diagnosis: &Diagnosis) -> bool {
    diagnosis.verdict.mechanism == Mechanism::Mnar
        || column
            .mnar_flags
            .iter()
            .any(|flag| *flag != MnarIndicatorKind::SensitiveName)
}

impl StrategyRecommender for RuleBasedRecommender {
    fn recommend(&self, diagnosis: &Diagnosis) -> Vec<ColumnRecommendation> {
        diagnosis
            .columns
            .iter()
            .map(|column| self.recommend_column(column, diagnosis))
            .collect()
    }
}

fn candidate(column: &ColumnDiagnosis, strategy: ImputationStrategy, rationale: String) -> StrategyCandidate {
    StrategyCandidate {
        strategy,
        target_columns: vec![column.column.clone()],
        parameters: ImputationParameters::default(),
        rationale,
        recommended: true,
    }
}

fn not_recommended(
    column: &ColumnDiagnosis,
    strategy: ImputationStrategy,
    rationale: String,
) -> StrategyCandidate {
    StrategyCandidate {
        recommended: false,
        ..candidate(column, strategy, rationale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MissingDataEngine;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn recommend(df: &DataFrame) -> Vec<ColumnRecommendation> {
        let engine = MissingDataEngine::new();
        let diagnosis = engine.diagnose(df).unwrap();
        engine.recommend(df, &diagnosis).unwrap()
    }

    fn strategies(rec: &ColumnRecommendation) -> Vec<(ImputationStrategy, bool)> {
        rec.candidates
            .iter()
            .map(|c| (c.strategy, c.recommended))
            .collect()
    }

    /// Evenly spaced missing cells over a low-cardinality numeric column, so
    /// no boundary clustering is reported.
    fn numeric_with_missing(n: usize, missing: usize) -> Vec<Option<f64>> {
        let step = n / missing;
        (0..n)
            .map(|i| {
                if i % step == 0 && i / step < missing {
                    None
                } else {
                    Some((i % 7) as f64 * 1.5)
                }
            })
            .collect()
    }

    #[test]
    fn test_temporal_names() {
        assert!(is_temporal_name("date"));
        assert!(is_temporal_name("order_date"));
        assert!(is_temporal_name("created_at"));
        assert!(is_temporal_name("Timestamp"));
        assert!(is_temporal_name("reading_year"));
        assert!(!is_temporal_name("price"));
        assert!(!is_temporal_name("candidate"));
    }

    #[test]
    fn test_low_missing_numeric() {
        let df = df!("score" => numeric_with_missing(100, 2)).unwrap();
        let recs = recommend(&df);
        assert_eq!(
            strategies(&recs[0]),
            vec![
                (ImputationStrategy::Mean, true),
                (ImputationStrategy::Median, true)
            ]
        );
        assert_eq!(recs[0].severity, MissingSeverity::Low);
    }

    #[test]
    fn test_moderate_missing_numeric() {
        let df = df!("score" => numeric_with_missing(100, 10)).unwrap();
        let recs = recommend(&df);
        assert_eq!(
            strategies(&recs[0]),
            vec![
                (ImputationStrategy::Knn, true),
                (ImputationStrategy::Iterative, true),
                (ImputationStrategy::Drop, false)
            ]
        );
    }

    #[test]
    fn test_high_missing_numeric() {
        let df = df!("score" => numeric_with_missing(100, 25)).unwrap();
        let recs = recommend(&df);
        assert_eq!(
            strategies(&recs[0]),
            vec![
                (ImputationStrategy::TreeIterative, true),
                (ImputationStrategy::Drop, false)
            ]
        );
        assert_eq!(recs[0].severity, MissingSeverity::High);
    }

    #[test]
    fn test_categorical_high_missing() {
        let values: Vec<Option<&str>> = (0..10)
            .map(|i| if i < 4 { None } else { Some(["a", "b"][i % 2]) })
            .collect();
        let df = df!("city" => values).unwrap();
        let recs = recommend(&df);
        assert_eq!(
            strategies(&recs[0]),
            vec![
                (ImputationStrategy::Mode, true),
                (ImputationStrategy::Constant, true),
                (ImputationStrategy::DropColumns, false)
            ]
        );
        let constant = recs[0].candidate(ImputationStrategy::Constant).unwrap();
        assert_eq!(
            constant.parameters.fill_value,
            Some(FillValue::Text("Unknown".to_string()))
        );
    }

    #[test]
    fn test_binary_column() {
        let values: Vec<Option<i64>> = (0..20)
            .map(|i| if i < 2 { None } else { Some((i % 2) as i64) })
            .collect();
        let df = df!("churned" => values).unwrap();
        let recs = recommend(&df);
        assert_eq!(recs[0].kind, ColumnKind::Binary);
        assert_eq!(
            strategies(&recs[0]),
            vec![(ImputationStrategy::Mode, true), (ImputationStrategy::Knn, true)]
        );
    }

    #[test]
    fn test_temporal_column_adds_sequential_strategies() {
        let df = df!("reading_date" => numeric_with_missing(100, 2)).unwrap();
        let recs = recommend(&df);
        let found = strategies(&recs[0]);
        assert!(found.contains(&(ImputationStrategy::ForwardFill, true)));
        assert!(found.contains(&(ImputationStrategy::Interpolation, true)));
    }

    #[test]
    fn test_sensitive_name_keeps_central_fills() {
        let df = df!("salary" => numeric_with_missing(100, 2)).unwrap();
        let recs = recommend(&df);
        let rec = &recs[0];
        assert!(rec.caution.as_deref().unwrap().contains("sensitive_name"));
        assert_eq!(
            strategies(rec),
            vec![
                (ImputationStrategy::Mean, true),
                (ImputationStrategy::Median, true)
            ]
        );
    }

    #[test]
    fn test_boundary_clustering_demotes_central_fills() {
        // Low missingness, but observed values are capped at 70.
        let values: Vec<Option<f64>> = (0..100)
            .map(|i| if i == 0 || i == 50 { None } else { Some((i as f64).min(70.0)) })
            .collect();
        let df = df!("score" => values).unwrap();
        let recs = recommend(&df);
        let rec = &recs[0];
        assert_eq!(rec.severity, MissingSeverity::Low);
        assert!(rec.caution.as_deref().unwrap().contains("boundary_clustering"));
        assert!(!rec.candidate(ImputationStrategy::Mean).unwrap().recommended);
        assert!(!rec.candidate(ImputationStrategy::Median).unwrap().recommended);
        assert_eq!(rec.best().unwrap().strategy, ImputationStrategy::Knn);
    }

    #[test]
    fn test_complete_data_has_no_recommendations() {
        let df = df!("a" => &[1.0, 2.0]).unwrap();
        assert!(recommend(&df).is_empty());
    }
}
