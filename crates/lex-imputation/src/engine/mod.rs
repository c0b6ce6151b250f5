//! Engine facade.
//!
//! [`MissingDataEngine`] exposes the five operations (`profile`, `diagnose`,
//! `recommend`, `impute`, `evaluate`) plus plan execution and the advisory
//! path. Every call is synchronous, reads its input by reference and returns
//! new values; the engine keeps no per-dataset state between calls.

mod executor;
pub mod progress;
pub mod session;

pub use executor::{ImputationEngine, ImputerOverrides};
pub use progress::{
    CancellationToken, ClosureProgressReporter, EngineStage, ProgressReporter, ProgressUpdate,
};
pub use session::{ImputationSession, RunRecord, SharedSession};

use crate::config::EngineConfig;
use crate::decisions::{ImputationPlan, RuleBasedRecommender, StrategyAdvisor, StrategyRecommender};
use crate::error::{ImputationError, Result};
use crate::imputers::MatrixImputer;
use crate::mechanism::MechanismClassifier;
use crate::patterns::{IndicatorMatrix, MissingnessPatternAnalyzer};
use crate::profiler::ColumnProfiler;
use crate::quality::QualityEvaluator;
use crate::types::{
    ColumnDiagnosis, ColumnRecommendation, DatasetProfile, Diagnosis, ImputationConfig,
    ImputationLedger, ImputationStrategy, MissingSeverity, QualityReport,
};
use crate::utils::column_names;
use polars::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Where the executed plan came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanSource {
    /// The advisor's proposal was accepted.
    Advisor { name: String },
    /// Rule-based plan built from the recommendations.
    RuleBased {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// Result of [`MissingDataEngine::impute_with_advisor`].
#[derive(Debug, Clone)]
pub struct AdvisedImputation {
    pub data: DataFrame,
    pub ledger: ImputationLedger,
    pub plan: ImputationPlan,
    pub source: PlanSource,
}

/// Missing-data diagnosis and imputation engine.
///
/// # Example
///
/// ```rust,ignore
/// use lex_imputation::{ImputationConfig, ImputationStrategy, MissingDataEngine};
///
/// let engine = MissingDataEngine::new();
/// let diagnosis = engine.diagnose(&df)?;
/// println!("Mechanism: {}", diagnosis.verdict.mechanism);
///
/// let recommendations = engine.recommend(&df, &diagnosis)?;
/// let (imputed, ledger) = engine.impute(&df, &ImputationConfig::new(ImputationStrategy::Knn))?;
/// let report = engine.evaluate(&df, &imputed, &[])?;
/// ```
pub struct MissingDataEngine {
    config: EngineConfig,
    recommender: Arc<dyn StrategyRecommender>,
    overrides: ImputerOverrides,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

static_assertions::assert_impl_all!(MissingDataEngine: Send, Sync);

impl Default for MissingDataEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MissingDataEngine {
    /// Engine with the default configuration.
    pub fn new() -> Self {
        let config = EngineConfig::default();
        Self {
            recommender: Arc::new(RuleBasedRecommender::new(&config)),
            config,
            overrides: ImputerOverrides::new(),
            progress_reporter: None,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn builder() -> MissingDataEngineBuilder {
        MissingDataEngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(ImputationError::Cancelled);
        }
        Ok(())
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    /// Report the outcome of a top-level call.
    fn finish<T>(&self, result: Result<T>, message: &str) -> Result<T> {
        match &result {
            Ok(_) => self.report_progress(ProgressUpdate::complete(message)),
            Err(e) if e.is_cancelled() => self.report_progress(ProgressUpdate::cancelled()),
            Err(e) => {
                error!("Engine error: {}", e);
                self.report_progress(ProgressUpdate::failed(e.to_string()));
            }
        }
        result
    }

    // =========================================================================
    // profile
    // =========================================================================

    /// Per-column statistics. A zero-column dataset yields an empty profile.
    pub fn profile(&self, df: &DataFrame) -> Result<DatasetProfile> {
        let result = self.check_cancelled().and_then(|_| self.profile_stage(df));
        self.finish(result, "Profiling complete")
    }

    fn profile_stage(&self, df: &DataFrame) -> Result<DatasetProfile> {
        self.report_progress(ProgressUpdate::new(
            EngineStage::Profiling,
            0.0,
            "Profiling dataset...",
        ));
        let profile = ColumnProfiler::profile_dataset(df)?;
        debug!(
            "Profiled {} column(s), {} missing cell(s)",
            profile.n_columns, profile.total_missing
        );
        self.report_progress(ProgressUpdate::new(
            EngineStage::Profiling,
            1.0,
            "Profiling complete",
        ));
        Ok(profile)
    }

    // =========================================================================
    // diagnose
    // =========================================================================

    /// Profile, enumerate missingness patterns and classify the mechanism.
    pub fn diagnose(&self, df: &DataFrame) -> Result<Diagnosis> {
        let result = self.diagnose_internal(df);
        self.finish(result, "Diagnosis complete")
    }

    fn diagnose_internal(&self, df: &DataFrame) -> Result<Diagnosis> {
        let start = Instant::now();
        if df.width() == 0 {
            return Err(ImputationError::EmptyDataset(
                "cannot diagnose a dataset with no columns".to_string(),
            ));
        }
        info!("Diagnosing dataset ({} rows x {} columns)", df.height(), df.width());

        self.check_cancelled()?;
        let profile = self.profile_stage(df)?;

        self.check_cancelled()?;
        self.report_progress(ProgressUpdate::new(
            EngineStage::PatternAnalysis,
            0.0,
            "Enumerating missingness patterns...",
        ));
        let matrix = IndicatorMatrix::from_dataframe(df)?;
        let patterns = MissingnessPatternAnalyzer::new(&self.config).analyze(&matrix);
        debug!(
            "{} distinct pattern(s), monotone: {}",
            patterns.distinct_patterns, patterns.is_monotone
        );

        self.check_cancelled()?;
        self.report_progress(ProgressUpdate::new(
            EngineStage::MechanismClassification,
            0.0,
            "Classifying missingness mechanism...",
        ));
        let analysis = MechanismClassifier::new(&self.config).classify(df, &profile, &matrix, &patterns)?;

        let columns: Vec<ColumnDiagnosis> = profile
            .columns_with_missing()
            .map(|column| ColumnDiagnosis {
                column: column.name.clone(),
                kind: column.inferred_kind,
                missing_count: column.missing_count,
                missing_ratio: column.missing_ratio,
                severity: MissingSeverity::from_ratio(column.missing_ratio),
                mnar_flags: analysis.mnar.flags_for(&column.name),
                mar_partners: analysis.mar.partners_of(&column.name),
            })
            .collect();

        info!(
            "Diagnosis: {} affected column(s), verdict {} in {} ms",
            columns.len(),
            analysis.verdict.mechanism,
            start.elapsed().as_millis()
        );

        Ok(Diagnosis {
            profile,
            patterns,
            mcar: analysis.mcar,
            mar: analysis.mar,
            mnar: analysis.mnar,
            columns,
            verdict: analysis.verdict,
            warnings: analysis.warnings,
        })
    }

    // =========================================================================
    // recommend
    // =========================================================================

    /// Ranked strategy candidates per affected column.
    ///
    /// The diagnosis must describe `df`: same columns in the same order and
    /// the same row count.
    pub fn recommend(&self, df: &DataFrame, diagnosis: &Diagnosis) -> Result<Vec<ColumnRecommendation>> {
        let result = self.recommend_internal(df, diagnosis);
        self.finish(result, "Recommendations ready")
    }

    fn recommend_internal(&self, df: &DataFrame, diagnosis: &Diagnosis) -> Result<Vec<ColumnRecommendation>> {
        self.check_cancelled()?;
        Self::check_diagnosis(df, diagnosis)?;

        self.report_progress(ProgressUpdate::new(
            EngineStage::Recommendation,
            0.0,
            "Recommending strategies...",
        ));
        let recommendations = self.recommender.recommend(diagnosis);
        for rec in &recommendations {
            debug!(
                "'{}': best {:?}{}",
                rec.column,
                rec.best().map(|c| c.strategy.as_str()),
                if rec.caution.is_some() { " (caution)" } else { "" }
            );
        }
        Ok(recommendations)
    }

    fn check_diagnosis(df: &DataFrame, diagnosis: &Diagnosis) -> Result<()> {
        let profile = &diagnosis.profile;
        if profile.n_rows != df.height() {
            return Err(ImputationError::DiagnosisMismatch(format!(
                "diagnosis covers {} rows, dataset has {}",
                profile.n_rows,
                df.height()
            )));
        }
        let diagnosed: Vec<&str> = profile.columns.iter().map(|c| c.name.as_str()).collect();
        let actual = column_names(df);
        if diagnosed != actual.iter().map(String::as_str).collect::<Vec<_>>() {
            return Err(ImputationError::DiagnosisMismatch(format!(
                "diagnosis columns {:?} differ from dataset columns {:?}",
                diagnosed, actual
            )));
        }
        Ok(())
    }

    // =========================================================================
    // impute
    // =========================================================================

    /// Apply one strategy. Returns a new dataset and the run's ledger.
    pub fn impute(&self, df: &DataFrame, config: &ImputationConfig) -> Result<(DataFrame, ImputationLedger)> {
        let result = self.check_cancelled().and_then(|_| {
            self.report_progress(ProgressUpdate::with_items(
                EngineStage::Imputation,
                format!("Step: {}", config.strategy),
                0,
                1,
                format!("Imputing with {}...", config.strategy),
            ));
            ImputationEngine::new(&self.config, &self.overrides).execute(df, config)
        });
        self.finish(result, "Imputation complete")
    }

    /// Execute every step of a plan in order into one ledger.
    pub fn impute_plan(&self, df: &DataFrame, plan: &ImputationPlan) -> Result<(DataFrame, ImputationLedger)> {
        let result = self.impute_plan_internal(df, plan);
        self.finish(result, "Imputation plan complete")
    }

    fn impute_plan_internal(&self, df: &DataFrame, plan: &ImputationPlan) -> Result<(DataFrame, ImputationLedger)> {
        let start = Instant::now();
        let engine = ImputationEngine::new(&self.config, &self.overrides);
        let mut ledger = ImputationLedger::new(df.height());
        let mut current = df.clone();
        let total = plan.steps.len();
        info!("Executing imputation plan with {} step(s)", total);

        for (idx, step) in plan.steps.iter().enumerate() {
            self.check_cancelled()?;
            self.report_progress(ProgressUpdate::with_items(
                EngineStage::Imputation,
                format!("Step: {}", step.strategy),
                idx,
                total,
                format!("Imputing {} column(s) with {}", step.columns.len(), step.strategy),
            ));
            let (next, step_ledger) = engine.execute(&current, step)?;
            ledger.absorb(step_ledger);
            current = next;
        }

        ledger.rows_after = current.height();
        ledger.duration_ms = start.elapsed().as_millis() as u64;
        Ok((current, ledger))
    }

    /// Run the advisory path: diagnose, recommend, ask the advisor, then
    /// execute through `impute`. The rule-based plan is used when the advisor
    /// declines, fails, or proposes something that cannot run.
    pub fn impute_with_advisor(&self, advisor: &dyn StrategyAdvisor, df: &DataFrame) -> Result<AdvisedImputation> {
        let result = self.advised_internal(advisor, df);
        self.finish(result, "Advised imputation complete")
    }

    fn advised_internal(&self, advisor: &dyn StrategyAdvisor, df: &DataFrame) -> Result<AdvisedImputation> {
        let diagnosis = self.diagnose_internal(df)?;
        let recommendations = self.recommend_internal(df, &diagnosis)?;

        let fallback_reason = match advisor.propose(&diagnosis, &recommendations) {
            Ok(Some(proposal)) => {
                info!("Advisor '{}' proposed {}", advisor.name(), proposal.strategy);
                let plan = ImputationPlan::new().step(proposal);
                match self.impute_plan_internal(df, &plan) {
                    Ok((data, ledger)) => {
                        return Ok(AdvisedImputation {
                            data,
                            ledger,
                            plan,
                            source: PlanSource::Advisor {
                                name: advisor.name().to_string(),
                            },
                        });
                    }
                    Err(e) if e.is_invalid_input() => {
                        warn!("Advisor '{}' proposal rejected: {}", advisor.name(), e);
                        format!("proposal rejected: {}", e)
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(None) => {
                info!("Advisor '{}' declined; using rule-based plan", advisor.name());
                "advisor declined".to_string()
            }
            Err(e) => {
                warn!("Advisor '{}' failed: {}; using rule-based plan", advisor.name(), e);
                format!("advisor failed: {}", e)
            }
        };

        let plan = ImputationPlan::from_recommendations(&recommendations);
        let (data, ledger) = self.impute_plan_internal(df, &plan)?;
        Ok(AdvisedImputation {
            data,
            ledger,
            plan,
            source: PlanSource::RuleBased {
                reason: Some(fallback_reason),
            },
        })
    }

    // =========================================================================
    // evaluate
    // =========================================================================

    /// Compare a dataset before and after imputation.
    pub fn evaluate(&self, pre: &DataFrame, post: &DataFrame, columns: &[String]) -> Result<QualityReport> {
        let result = self.check_cancelled().and_then(|_| {
            self.report_progress(ProgressUpdate::new(
                EngineStage::Evaluation,
                0.0,
                "Evaluating imputation quality...",
            ));
            QualityEvaluator::evaluate(pre, post, columns)
        });
        self.finish(result, "Evaluation complete")
    }
}

/// Builder for [`MissingDataEngine`].
#[derive(Default)]
pub struct MissingDataEngineBuilder {
    config: Option<EngineConfig>,
    recommender: Option<Arc<dyn StrategyRecommender>>,
    overrides: ImputerOverrides,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(MissingDataEngineBuilder: Send);

impl MissingDataEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the rule-based recommender.
    pub fn recommender(mut self, recommender: Arc<dyn StrategyRecommender>) -> Self {
        self.recommender = Some(recommender);
        self
    }

    /// Use `imputer` whenever `strategy` runs.
    ///
    /// Only multivariate strategies consult overrides; registering one for
    /// any other strategy is rejected by [`build`](Self::build).
    pub fn matrix_imputer(mut self, strategy: ImputationStrategy, imputer: Arc<dyn MatrixImputer>) -> Self {
        self.overrides.insert(strategy, imputer);
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn build(self) -> Result<MissingDataEngine> {
        let config = self.config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| ImputationError::InvalidConfig(e.to_string()))?;

        if let Some(strategy) = self.overrides.keys().find(|s| !s.is_multivariate()) {
            return Err(ImputationError::InvalidConfig(format!(
                "'{}' is not a multivariate strategy and cannot take a matrix imputer",
                strategy
            )));
        }

        Ok(MissingDataEngine {
            recommender: self
                .recommender
                .unwrap_or_else(|| Arc::new(RuleBasedRecommender::new(&config))),
            config,
            overrides: self.overrides,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}
