//! Multi-step imputation plans.

use crate::types::{ColumnRecommendation, ImputationConfig};
use serde::{Deserialize, Serialize};

/// Ordered list of imputation steps executed into one ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationPlan {
    pub steps: Vec<ImputationConfig>,
}

impl ImputationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn step(mut self, config: ImputationConfig) -> Self {
        self.steps.push(config);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Build a plan from the top recommended candidate of every column.
    ///
    /// Columns sharing a strategy and parameters are merged into one step,
    /// so a multivariate imputer sees all of its columns in a single pass.
    /// Multivariate steps run first (on the original observations), then
    /// univariate fills, then removals.
    pub fn from_recommendations(recommendations: &[ColumnRecommendation]) -> Self {
        let mut steps: Vec<ImputationConfig> = Vec::new();

        for rec in recommendations {
            let Some(best) = rec.best() else {
                continue;
            };
            let config = best.to_config();
            match steps
                .iter_mut()
                .find(|s| s.strategy == config.strategy && s.parameters == config.parameters)
            {
                Some(existing) => {
                    for column in config.columns {
                        if !existing.columns.contains(&column) {
                            existing.columns.push(column);
                        }
                    }
                }
                None => steps.push(config),
            }
        }

        steps.sort_by_key(|s| {
            if s.strategy.is_multivariate() {
                0
            } else if s.strategy.is_removal() {
                2
            } else {
                1
            }
        });

        Self { steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ColumnKind, ImputationParameters, ImputationStrategy, MissingSeverity, StrategyCandidate,
    };
    use pretty_assertions::assert_eq;

    fn rec(column: &str, strategies: &[(ImputationStrategy, bool)]) -> ColumnRecommendation {
        ColumnRecommendation {
            column: column.to_string(),
            kind: ColumnKind::Numeric,
            missing_ratio: 0.1,
            severity: MissingSeverity::Moderate,
            candidates: strategies
                .iter()
                .map(|(strategy, recommended)| StrategyCandidate {
                    strategy: *strategy,
                    target_columns: vec![column.to_string()],
                    parameters: ImputationParameters::default(),
                    rationale: String::new(),
                    recommended: *recommended,
                })
                .collect(),
            caution: None,
        }
    }

    #[test]
    fn test_merges_multivariate_columns() {
        let recs = vec![
            rec("a", &[(ImputationStrategy::Mean, true)]),
            rec("b", &[(ImputationStrategy::Knn, true)]),
            rec("c", &[(ImputationStrategy::Knn, true), (ImputationStrategy::Drop, false)]),
        ];
        let plan = ImputationPlan::from_recommendations(&recs);

        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].strategy, ImputationStrategy::Knn);
        assert_eq!(plan.steps[0].columns, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(plan.steps[1].strategy, ImputationStrategy::Mean);
    }

    #[test]
    fn test_skips_columns_without_recommendation() {
        let recs = vec![rec("a", &[(ImputationStrategy::Drop, false)])];
        assert!(ImputationPlan::from_recommendations(&recs).is_empty());
    }

    #[test]
    fn test_plan_builder() {
        let plan = ImputationPlan::new()
            .step(ImputationConfig::new(ImputationStrategy::Median))
            .step(ImputationConfig::new(ImputationStrategy::Mode));
        assert_eq!(plan.steps.len(), 2);
    }
}
