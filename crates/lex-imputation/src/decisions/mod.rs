//! Strategy selection.
//!
//! The [`StrategyRecommender`] turns a diagnosis into ranked candidates per
//! affected column. An optional [`StrategyAdvisor`] may propose a concrete
//! configuration, but execution always goes through the imputation engine.

mod advisor;
mod plan;
mod rule_engine;

pub use advisor::{RecommendationAdvisor, StrategyAdvisor};
pub use plan::ImputationPlan;
pub use rule_engine::{RuleBasedRecommender, is_temporal_name};

use crate::types::{ColumnRecommendation, Diagnosis};

/// Trait for recommendation engines.
///
/// Implementations must be pure: the same diagnosis yields the same
/// recommendations.
pub trait StrategyRecommender: Send + Sync {
    /// Ranked candidates for every column with missing values.
    fn recommend(&self, diagnosis: &Diagnosis) -> Vec<ColumnRecommendation>;
}
