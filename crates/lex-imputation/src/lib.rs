//! Missing-Data Diagnosis and Imputation Engine
//!
//! Explains *why* values are missing in a tabular dataset and fills them
//! with a strategy suited to that explanation, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Profiling**: per-column kind (numeric, binary, categorical), missing
//!   counts and summary statistics
//! - **Pattern Analysis**: co-occurring missingness patterns, monotone
//!   detection and correlated missingness between columns
//! - **Mechanism Classification**: MCAR / MAR / MNAR evidence combined into
//!   an auditable verdict with confidence
//! - **Recommendation**: ranked strategy candidates per affected column, with
//!   cautions where imputation may be biased
//! - **Imputation**: twelve strategies from mean/mode to KNN and chained
//!   regression, with per-column fallbacks recorded in a ledger
//! - **Quality Evaluation**: completeness, distribution and variance
//!   preservation proxies
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_imputation::{ImputationConfig, ImputationPlan, ImputationStrategy, MissingDataEngine};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .try_into_reader_with_file_path(Some("data.csv".into()))?
//!     .finish()?;
//!
//! let engine = MissingDataEngine::new();
//! let diagnosis = engine.diagnose(&df)?;
//! println!("Mechanism: {} ({:.0}%)", diagnosis.verdict.mechanism, diagnosis.verdict.confidence * 100.0);
//!
//! // Either follow the recommendations...
//! let recommendations = engine.recommend(&df, &diagnosis)?;
//! let plan = ImputationPlan::from_recommendations(&recommendations);
//! let (imputed, ledger) = engine.impute_plan(&df, &plan)?;
//!
//! // ...or request a strategy directly.
//! let (imputed, ledger) = engine.impute(&df, &ImputationConfig::new(ImputationStrategy::Knn))?;
//!
//! let report = engine.evaluate(&df, &imputed, &[])?;
//! println!("Completeness: {:.2}", report.completeness);
//! ```
//!
//! # Configuration
//!
//! Thresholds and model defaults live in [`EngineConfig`]:
//!
//! ```rust,ignore
//! use lex_imputation::{EngineConfig, MissingDataEngine};
//!
//! let config = EngineConfig::builder()
//!     .mcar_alpha(0.01)
//!     .knn_neighbors(7)
//!     .max_iterations(20)
//!     .time_budget_ms(2_000)
//!     .build()?;
//!
//! let engine = MissingDataEngine::builder().config(config).build()?;
//! ```
//!
//! # Warnings and Errors
//!
//! Structural problems (empty dataset, unknown column, a strategy with no
//! valid target) are returned as [`ImputationError`]. Statistical
//! shortcomings never fail a call: they are reported as [`EngineWarning`]
//! values in the diagnosis or the ledger, next to the fallback that was used.

pub mod config;
pub mod decisions;
pub mod engine;
pub mod error;
pub mod imputers;
pub mod mechanism;
pub mod patterns;
pub mod profiler;
pub mod quality;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{ConfigValidationError, EngineConfig, EngineConfigBuilder, MechanismWeights};
pub use decisions::{
    ImputationPlan, RecommendationAdvisor, RuleBasedRecommender, StrategyAdvisor,
    StrategyRecommender,
};
pub use engine::{
    AdvisedImputation, CancellationToken, ClosureProgressReporter, EngineStage, ImputationEngine,
    ImputationSession, MissingDataEngine, MissingDataEngineBuilder, PlanSource, ProgressReporter,
    ProgressUpdate, RunRecord, SharedSession,
};
pub use error::{ImputationError, Result, ResultExt};
pub use imputers::{
    ForestImputer, IterativeImputer, KnnImputer, LabelEncoder, MatrixImputation, MatrixImputer,
    StatisticalImputer,
};
pub use mechanism::{MechanismAnalysis, MechanismClassifier};
pub use patterns::{IndicatorMatrix, MissingnessPatternAnalyzer};
pub use profiler::ColumnProfiler;
pub use quality::QualityEvaluator;
pub use types::{
    ColumnDiagnosis, ColumnKind, ColumnProfile, ColumnQuality, ColumnRecommendation,
    DatasetProfile, Diagnosis, EngineWarning, FillSummary, FillValue, ImputationConfig,
    ImputationLedger, ImputationParameters, ImputationStrategy, InterpolationMethod, LedgerEntry,
    Mechanism, MechanismVerdict, MissingSeverity, MissingnessPattern, MnarIndicatorKind,
    PatternAnalysis, QualityReport, StrategyCandidate,
};
