//! Integration tests for the missing-data engine.
//!
//! These tests run the public API end to end on synthetic datasets generated
//! with a seeded RNG.

use lex_imputation::utils::{count_missing, string_values, total_missing};
use lex_imputation::{
    CancellationToken, EngineStage, FillValue, ImputationConfig, ImputationPlan,
    ImputationSession, ImputationStrategy, Mechanism, MissingDataEngine, MissingSeverity,
    MnarIndicatorKind, PlanSource, RecommendationAdvisor,
};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

/// Evenly spaced normal quantiles, shuffled.
fn bell(n: usize, mean: f64, std: f64, rng: &mut StdRng) -> Vec<f64> {
    let normal = Normal::new(mean, std).unwrap();
    let mut values: Vec<f64> = (0..n)
        .map(|i| normal.inverse_cdf((i as f64 + 0.5) / n as f64))
        .collect();
    values.shuffle(rng);
    values
}

/// 1000 rows, 20% of `age` removed completely at random.
fn age_dataset() -> DataFrame {
    let mut rng = StdRng::seed_from_u64(7);
    let ages = bell(1000, 40.0, 12.0, &mut rng);

    let mut rows: Vec<usize> = (0..1000).collect();
    rows.shuffle(&mut rng);
    let hidden: HashSet<usize> = rows.into_iter().take(200).collect();

    let age: Vec<Option<f64>> = ages
        .iter()
        .enumerate()
        .map(|(i, v)| (!hidden.contains(&i)).then_some(*v))
        .collect();
    let visits: Vec<f64> = (0..1000).map(|_| rng.gen_range(0.0..10.0)).collect();

    df!("age" => age, "visits" => visits).unwrap()
}

/// 1000 rows, the top 10% of `income` removed.
fn income_dataset() -> DataFrame {
    let mut rng = StdRng::seed_from_u64(11);
    let incomes = bell(1000, 50_000.0, 15_000.0, &mut rng);

    let mut sorted = incomes.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let cutoff = sorted[900];

    let income: Vec<Option<f64>> = incomes
        .iter()
        .map(|v| (*v < cutoff).then_some(*v))
        .collect();
    let household: Vec<i64> = (0..1000).map(|_| rng.gen_range(1..7)).collect();

    df!("income" => income, "household_size" => household).unwrap()
}

/// Two related numeric columns and a categorical derived from the first,
/// with scattered missing values in all three.
fn mixed_dataset(seed: u64, n: usize) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut a = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    let mut s = Vec::with_capacity(n);

    for _ in 0..n {
        let x: f64 = rng.gen_range(0.0..100.0);
        let y = 2.0 * x + rng.gen_range(-5.0..5.0);
        let label = if x < 33.0 {
            "low"
        } else if x < 66.0 {
            "mid"
        } else {
            "high"
        };
        a.push(rng.gen_bool(0.85).then_some(x));
        b.push(rng.gen_bool(0.8).then_some(y));
        s.push(rng.gen_bool(0.9).then(|| label.to_string()));
    }

    df!("a" => a, "b" => b, "s" => s).unwrap()
}

fn column_missing(df: &DataFrame, name: &str) -> usize {
    count_missing(df.column(name).unwrap().as_materialized_series()).unwrap()
}

fn request(strategy: ImputationStrategy) -> ImputationConfig {
    let config = ImputationConfig::new(strategy);
    if strategy == ImputationStrategy::Constant {
        config.fill_value(FillValue::Number(0.0))
    } else {
        config
    }
}

// ============================================================================
// Scenario: MCAR age
// ============================================================================

#[test]
fn test_age_scenario_diagnosis() {
    let df = age_dataset();
    let engine = MissingDataEngine::new();
    let diagnosis = engine.diagnose(&df).unwrap();

    assert!(diagnosis.mcar.mcar_likely);
    assert_eq!(diagnosis.verdict.mechanism, Mechanism::Mcar);

    let age = diagnosis.column("age").unwrap();
    assert_eq!(age.missing_count, 200);
    assert_eq!(age.severity, MissingSeverity::Moderate);
    assert!(!age.mnar_flags.contains(&MnarIndicatorKind::BoundaryClustering));
    assert!(age.mar_partners.is_empty());
}

#[test]
fn test_age_scenario_recommendations() {
    let df = age_dataset();
    let engine = MissingDataEngine::new();
    let diagnosis = engine.diagnose(&df).unwrap();
    let recs = engine.recommend(&df, &diagnosis).unwrap();

    assert_eq!(recs.len(), 1);
    let age = &recs[0];
    assert_eq!(age.best().unwrap().strategy, ImputationStrategy::Knn);
    assert!(age.candidate(ImputationStrategy::Iterative).unwrap().recommended);
    assert!(!age.candidate(ImputationStrategy::Drop).unwrap().recommended);
}

#[test]
fn test_age_scenario_mean_imputation() {
    let df = age_dataset();
    let engine = MissingDataEngine::new();
    let (imputed, ledger) = engine
        .impute(&df, &ImputationConfig::new(ImputationStrategy::Mean).columns(["age"]))
        .unwrap();

    assert_eq!(column_missing(&imputed, "age"), 0);
    assert_eq!(ledger.total_filled(), 200);
    assert!(ledger.warnings.is_empty());

    let report = engine.evaluate(&df, &imputed, &["age".to_string()]).unwrap();
    assert_eq!(report.completeness, 1.0);
    assert!(report.distribution_preservation_score.unwrap() > 0.8);
    assert!(report.variance_preservation_score.unwrap() < 1.0);
}

// ============================================================================
// Scenario: MNAR income
// ============================================================================

#[test]
fn test_income_scenario_boundary_clustering_and_caution() {
    let df = income_dataset();
    let engine = MissingDataEngine::new();
    let diagnosis = engine.diagnose(&df).unwrap();

    let income = diagnosis.column("income").unwrap();
    assert_eq!(income.missing_count, 100);
    assert!(income.mnar_flags.contains(&MnarIndicatorKind::BoundaryClustering));
    assert!(diagnosis.mnar.mnar_likely);

    let recs = engine.recommend(&df, &diagnosis).unwrap();
    let rec = recs.iter().find(|r| r.column == "income").unwrap();
    assert!(rec.caution.as_deref().unwrap().contains("boundary_clustering"));

    let best = rec.best().unwrap().strategy;
    assert_ne!(best, ImputationStrategy::Mean);
    assert_ne!(best, ImputationStrategy::Median);
    assert!(
        rec.candidates
            .iter()
            .filter(|c| matches!(c.strategy, ImputationStrategy::Mean | ImputationStrategy::Median))
            .all(|c| !c.recommended)
    );
}

#[test]
fn test_uniform_column_is_not_treated_as_censored() {
    let score: Vec<Option<f64>> = (0..1000)
        .map(|i| (i % 50 != 0).then_some(i as f64 / 10.0))
        .collect();
    let df = df!("score" => score).unwrap();
    let engine = MissingDataEngine::new();
    let diagnosis = engine.diagnose(&df).unwrap();

    assert!(diagnosis.column("score").unwrap().mnar_flags.is_empty());

    let recs = engine.recommend(&df, &diagnosis).unwrap();
    assert_eq!(recs[0].caution, None);
    assert!(recs[0].candidate(ImputationStrategy::Mean).unwrap().recommended);
    assert!(recs[0].candidate(ImputationStrategy::Median).unwrap().recommended);
}

// ============================================================================
// Testable Properties
// ============================================================================

#[test]
fn test_ledger_consistency_and_monotonic_completeness() {
    let df = mixed_dataset(3, 200);
    let engine = MissingDataEngine::new();

    for strategy in ImputationStrategy::ALL
        .into_iter()
        .filter(|s| !s.is_removal())
    {
        let (imputed, ledger) = engine.impute(&df, &request(strategy)).unwrap();

        let filled: usize = ledger.entries.iter().map(|e| e.values_filled).sum();
        let resolved: usize = ledger
            .entries
            .iter()
            .map(|e| e.missing_before - e.remaining_missing)
            .sum();
        assert_eq!(filled, resolved, "{} ledger inconsistent", strategy);

        let before = total_missing(&df).unwrap();
        let after = total_missing(&imputed).unwrap();
        assert_eq!(before - after, filled, "{} filled count mismatch", strategy);

        for name in ["a", "b", "s"] {
            assert!(
                column_missing(&imputed, name) <= column_missing(&df, name),
                "{} increased missingness in {}",
                strategy,
                name
            );
        }
    }
}

#[test]
fn test_categorical_round_trip_stays_within_observed_categories() {
    let df = mixed_dataset(5, 150);
    let engine = MissingDataEngine::new();
    let observed: HashSet<String> = string_values(df.column("s").unwrap().as_materialized_series())
        .unwrap()
        .into_iter()
        .flatten()
        .collect();

    for strategy in [
        ImputationStrategy::Knn,
        ImputationStrategy::Iterative,
        ImputationStrategy::TreeIterative,
    ] {
        let (imputed, _) = engine.impute(&df, &ImputationConfig::new(strategy)).unwrap();
        let values = string_values(imputed.column("s").unwrap().as_materialized_series()).unwrap();
        assert!(values.iter().all(Option::is_some), "{} left gaps in s", strategy);
        for value in values.into_iter().flatten() {
            assert!(observed.contains(&value), "{} produced unseen '{}'", strategy, value);
        }
    }
}

#[test]
fn test_multivariate_fills_everything_and_keeps_observed_values() {
    let df = mixed_dataset(9, 120);
    let engine = MissingDataEngine::new();
    let (imputed, ledger) = engine
        .impute(&df, &ImputationConfig::new(ImputationStrategy::Iterative))
        .unwrap();

    assert_eq!(total_missing(&imputed).unwrap(), 0);
    assert_eq!(ledger.entries.len(), 3);

    let before = df.column("a").unwrap().f64().unwrap().clone();
    let after = imputed.column("a").unwrap().f64().unwrap().clone();
    for (b, a) in before.into_iter().zip(after.into_iter()) {
        if let Some(b) = b {
            assert_eq!(Some(b), a);
        }
    }
}

#[test]
fn test_tree_iterative_is_reproducible() {
    let df = mixed_dataset(13, 100);
    let engine = MissingDataEngine::new();
    let config = ImputationConfig::new(ImputationStrategy::TreeIterative);

    let (first, _) = engine.impute(&df, &config).unwrap();
    let (second, _) = engine.impute(&df, &config).unwrap();
    assert!(first.equals_missing(&second));
}

#[test]
fn test_pattern_coverage_never_exceeds_total() {
    let df = mixed_dataset(17, 300);
    let diagnosis = MissingDataEngine::new().diagnose(&df).unwrap();
    let patterns = &diagnosis.patterns;

    assert!(patterns.coverage <= 100.0 + 1e-9);
    assert!(patterns.total_percentage() <= 100.0 + 1e-9);
    assert!((patterns.total_percentage() - 100.0).abs() < 1e-6);
    for pair in patterns.patterns.windows(2) {
        assert!(pair[0].occurrence_count >= pair[1].occurrence_count);
    }
}

#[test]
fn test_complete_data_idempotence() {
    let df = df! {
        "a" => [1.0, 2.0, 3.0, 4.0],
        "s" => ["x", "y", "x", "y"],
    }
    .unwrap();
    let engine = MissingDataEngine::new();
    let diagnosis = engine.diagnose(&df).unwrap();

    assert!(diagnosis.patterns.patterns.is_empty());
    assert_eq!(diagnosis.verdict.mechanism, Mechanism::Unknown);

    for strategy in ImputationStrategy::ALL {
        let (imputed, ledger) = engine.impute(&df, &request(strategy)).unwrap();
        assert!(imputed.equals_missing(&df), "{} changed complete data", strategy);
        assert_eq!(ledger.total_filled(), 0);
    }
}

#[test]
fn test_input_is_never_mutated() {
    let df = mixed_dataset(19, 80);
    let snapshot = df.clone();
    let engine = MissingDataEngine::new();

    engine
        .impute(&df, &ImputationConfig::new(ImputationStrategy::Knn))
        .unwrap();
    engine
        .impute(&df, &ImputationConfig::new(ImputationStrategy::Drop))
        .unwrap();
    assert!(df.equals_missing(&snapshot));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_structural_errors() {
    let engine = MissingDataEngine::new();
    let df = mixed_dataset(23, 20);

    let err = engine
        .impute(&df, &ImputationConfig::new(ImputationStrategy::Mean).columns(["missing_col"]))
        .unwrap_err();
    assert!(err.is_invalid_input());
    assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");

    let text_only = df! { "s" => [Some("a"), None, Some("b")] }.unwrap();
    let err = engine
        .impute(&text_only, &ImputationConfig::new(ImputationStrategy::Knn))
        .unwrap_err();
    assert_eq!(err.error_code(), "INCOMPATIBLE_STRATEGY");

    let err = engine.diagnose(&DataFrame::empty()).unwrap_err();
    assert_eq!(err.error_code(), "EMPTY_DATASET");
}

// ============================================================================
// Plans, Advisors and Sessions
// ============================================================================

#[test]
fn test_recommended_plan_end_to_end() {
    let df = mixed_dataset(29, 200);
    let engine = MissingDataEngine::new();
    let diagnosis = engine.diagnose(&df).unwrap();
    let recs = engine.recommend(&df, &diagnosis).unwrap();
    let plan = ImputationPlan::from_recommendations(&recs);

    let (imputed, ledger) = engine.impute_plan(&df, &plan).unwrap();
    let report = engine.evaluate(&df, &imputed, &[]).unwrap();

    assert!(total_missing(&imputed).unwrap() < total_missing(&df).unwrap());
    assert!(report.completeness > 0.0);
    assert!(report.overall_score > 0.0 && report.overall_score <= 1.0);

    let mut session = ImputationSession::new();
    session.record(plan, ledger, Some(report));
    assert_eq!(session.len(), 1);
    assert!(session.total_filled() > 0);
}

#[test]
fn test_advisor_path_executes_through_impute() {
    let df = mixed_dataset(31, 100);
    let engine = MissingDataEngine::new();
    let outcome = engine.impute_with_advisor(&RecommendationAdvisor, &df).unwrap();

    assert!(matches!(outcome.source, PlanSource::Advisor { .. }));
    assert_eq!(outcome.plan.steps.len(), 1);
    assert!(outcome.ledger.total_filled() > 0);
}

// ============================================================================
// Progress & Cancellation
// ============================================================================

#[test]
fn test_progress_and_cancellation() {
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);
    let token = CancellationToken::new();
    let engine = MissingDataEngine::builder()
        .cancellation_token(token.clone())
        .on_progress(move |update| sink.lock().unwrap().push(update.stage))
        .build()
        .unwrap();

    let df = mixed_dataset(37, 50);
    engine.diagnose(&df).unwrap();
    assert_eq!(stages.lock().unwrap().last(), Some(&EngineStage::Complete));

    token.cancel();
    let err = engine.diagnose(&df).unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(stages.lock().unwrap().last(), Some(&EngineStage::Cancelled));

    token.reset();
    assert!(engine.diagnose(&df).is_ok());
}
