//! Advisory collaborators that propose, but never execute, a strategy.
//!
//! An advisor (for example an LLM-backed service living outside this crate)
//! reads the diagnosis and the rule-based recommendations and may return one
//! [`ImputationConfig`]. The engine validates the proposal and runs it
//! through the normal `impute` path. Advisors never see or produce imputed
//! data.
//!
//! # Implementing an advisor
//!
//! ```rust,ignore
//! use lex_imputation::decisions::StrategyAdvisor;
//!
//! struct RemoteAdvisor { /* client */ }
//!
//! impl StrategyAdvisor for RemoteAdvisor {
//!     fn propose(&self, diagnosis: &Diagnosis, recs: &[ColumnRecommendation])
//!         -> Result<Option<ImputationConfig>> {
//!         // Ask the service, map its answer onto a strategy.
//!         Ok(None)
//!     }
//!
//!     fn name(&self) -> &str { "remote" }
//! }
//! ```

use crate::error::Result;
use crate::types::{ColumnRecommendation, Diagnosis, ImputationConfig, ImputationStrategy};

/// Trait for advisory strategy providers.
///
/// Implementations must be `Send + Sync`. Returning `Ok(None)` declines;
/// returning an error is treated the same way by the engine, which then
/// falls back to the rule-based plan.
pub trait StrategyAdvisor: Send + Sync {
    /// Propose one configuration for the diagnosed dataset.
    fn propose(
        &self,
        diagnosis: &Diagnosis,
        recommendations: &[ColumnRecommendation],
    ) -> Result<Option<ImputationConfig>>;

    /// Advisor name for logging.
    fn name(&self) -> &str;
}

/// Offline advisor that proposes the strategy recommended for the most
/// columns, applied to exactly those columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationAdvisor;

impl StrategyAdvisor for RecommendationAdvisor {
    fn propose(
        &self,
        _diagnosis: &Diagnosis,
        recommendations: &[ColumnRecommendation],
    ) -> Result<Option<ImputationConfig>> {
        let mut tally: Vec<(ImputationStrategy, Vec<String>)> = Vec::new();
        for rec in recommendations {
            let Some(best) = rec.best() else {
                continue;
            };
            match tally.iter_mut().find(|(s, _)| *s == best.strategy) {
                Some((_, columns)) => columns.push(rec.column.clone()),
                None => tally.push((best.strategy, vec![rec.column.clone()])),
            }
        }

        // First strategy to reach the highest count wins.
        let winner = tally
            .into_iter()
            .fold(None::<(ImputationStrategy, Vec<String>)>, |acc, item| match acc {
                Some(current) if current.1.len() >= item.1.len() => Some(current),
                _ => Some(item),
            });

        Ok(winner.map(|(strategy, columns)| {
            let parameters = recommendations
                .iter()
                .find(|r| r.column == columns[0])
                .and_then(|r| r.candidate(strategy))
                .map(|c| c.parameters.clone())
                .unwrap_or_default();
            ImputationConfig::new(strategy)
                .columns(columns)
                .parameters(parameters)
        }))
    }

    fn name(&self) -> &str {
        "recommendation"
    }
}
