//! Simplified chi-square MCAR approximation.
//!
//! Under MCAR with independent columns, the probability of a row pattern is
//! the product of per-column missing rates. Observed frequencies of the
//! top-K patterns are compared against those expectations (rescaled to the
//! same total) and the statistic is referred to a chi-square distribution
//! with K - 1 degrees of freedom.
//!
//! This is not Little's test: it ignores the observed values entirely and,
//! with a single partially missing column, the comparison is saturated
//! (statistic 0, p = 1).

use crate::patterns::IndicatorMatrix;
use crate::types::{McarStatus, McarTest, PatternAnalysis};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::debug;

pub fn mcar_test(patterns: &PatternAnalysis, matrix: &IndicatorMatrix, alpha: f64) -> McarTest {
    if patterns.is_complete {
        return McarTest {
            status: McarStatus::NotApplicable,
            chi_square: None,
            degrees_of_freedom: None,
            p_value: None,
            patterns_used: 0,
            mcar_likely: false,
            note: "no missing values".to_string(),
        };
    }

    let used = &patterns.patterns;
    if used.len() < 2 {
        return McarTest {
            status: McarStatus::InsufficientPatterns,
            chi_square: None,
            degrees_of_freedom: None,
            p_value: None,
            patterns_used: used.len(),
            mcar_likely: false,
            note: format!("{} observed pattern(s), at least 2 required", used.len()),
        };
    }

    let rates = matrix.missing_rates();
    let probabilities: Vec<f64> = used
        .iter()
        .map(|pattern| {
            pattern
                .mask
                .iter()
                .zip(&rates)
                .map(|(missing, rate)| if *missing { *rate } else { 1.0 - rate })
                .product::<f64>()
        })
        .collect();

    let observed_total: usize = used.iter().map(|p| p.occurrence_count).sum();
    let probability_total: f64 = probabilities.iter().sum();

    let chi_square: f64 = used
        .iter()
        .zip(&probabilities)
        .filter(|(_, prob)| **prob > 0.0)
        .map(|(pattern, prob)| {
            let expected = prob / probability_total * observed_total as f64;
            let diff = pattern.occurrence_count as f64 - expected;
            diff * diff / expected
        })
        .sum();

    let dof = used.len() - 1;
    let p_value = ChiSquared::new(dof as f64)
        .map(|dist| (1.0 - dist.cdf(chi_square)).clamp(0.0, 1.0))
        .unwrap_or(0.0);
    let mcar_likely = p_value > alpha;

    debug!(
        "MCAR approximation: chi2 = {:.3}, df = {}, p = {:.4}",
        chi_square, dof, p_value
    );

    McarTest {
        status: McarStatus::Tested,
        chi_square: Some(chi_square),
        degrees_of_freedom: Some(dof),
        p_value: Some(p_value),
        patterns_used: used.len(),
        mcar_likely,
        note: if mcar_likely {
            format!("p = {:.4} > {}: pattern frequencies match independence", p_value, alpha)
        } else {
            format!("p = {:.4} <= {}: patterns deviate from independence", p_value, alpha)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::patterns::MissingnessPatternAnalyzer;
    use polars::prelude::*;

    fn run(df: &DataFrame) -> McarTest {
        let config = EngineConfig::default();
        let matrix = IndicatorMatrix::from_dataframe(df).unwrap();
        let patterns = MissingnessPatternAnalyzer::new(&config).analyze(&matrix);
        mcar_test(&patterns, &matrix, config.mcar_alpha)
    }

    #[test]
    fn test_complete_data_not_applicable() {
        let df = df!("a" => &[1.0, 2.0]).unwrap();
        let test = run(&df);
        assert_eq!(test.status, McarStatus::NotApplicable);
        assert!(!test.mcar_likely);
    }

    #[test]
    fn test_single_pattern_insufficient() {
        let df = df!("a" => &[None::<f64>, None]).unwrap();
        let test = run(&df);
        assert_eq!(test.status, McarStatus::InsufficientPatterns);
        assert!(test.p_value.is_none());
    }

    #[test]
    fn test_single_column_is_saturated() {
        let df = df!("a" => &[Some(1.0), None, Some(3.0), Some(4.0)]).unwrap();
        let test = run(&df);
        assert_eq!(test.status, McarStatus::Tested);
        assert!(test.chi_square.unwrap() < 1e-9);
        assert!((test.p_value.unwrap() - 1.0).abs() < 1e-9);
        assert!(test.mcar_likely);
    }

    #[test]
    fn test_perfectly_coupled_columns_reject_mcar() {
        // a and b are always missing together: independence predicts many
        // single-column patterns that never occur.
        let n = 200;
        let a: Vec<Option<f64>> = (0..n)
            .map(|i| if i % 2 == 0 { None } else { Some(i as f64) })
            .collect();
        let b = a.clone();
        let c: Vec<Option<f64>> = (0..n)
            .map(|i| if i % 4 == 1 { None } else { Some(1.0) })
            .collect();
        let df = df!("a" => a, "b" => b, "c" => c).unwrap();

        let test = run(&df);
        assert_eq!(test.status, McarStatus::Tested);
        assert!(test.p_value.unwrap() < 0.05);
        assert!(!test.mcar_likely);
    }
}
