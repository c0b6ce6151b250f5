//! Progress reporting and cancellation for engine runs.
//!
//! The engine reports each stage to an optional [`ProgressReporter`] and
//! checks a [`CancellationToken`] between stages and between imputation
//! steps, so a UI thread can stop a long multivariate run.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_imputation::{CancellationToken, MissingDataEngine};
//!
//! let token = CancellationToken::new();
//! let engine = MissingDataEngine::builder()
//!     .cancellation_token(token.clone())
//!     .on_progress(|update| println!("[{:.0}%] {}", update.progress * 100.0, update.message))
//!     .build()?;
//!
//! // From another thread: token.cancel();
//! let diagnosis = engine.diagnose(&df)?;
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of an engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStage {
    /// Per-column statistics and kind inference
    Profiling,
    /// Missingness pattern enumeration
    PatternAnalysis,
    /// MCAR / MAR / MNAR sub-analyses and verdict
    MechanismClassification,
    /// Strategy recommendation
    Recommendation,
    /// Executing imputation steps
    Imputation,
    /// Pre/post quality comparison
    Evaluation,
    /// Run completed successfully
    Complete,
    /// Run was cancelled
    Cancelled,
    /// Run failed with an error
    Failed,
}

impl EngineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Profiling => "Profiling Dataset",
            Self::PatternAnalysis => "Analyzing Patterns",
            Self::MechanismClassification => "Classifying Mechanism",
            Self::Recommendation => "Recommending Strategies",
            Self::Imputation => "Imputing Values",
            Self::Evaluation => "Evaluating Quality",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of a full run spent in this stage. The working stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Profiling => 0.10,
            Self::PatternAnalysis => 0.10,
            Self::MechanismClassification => 0.15,
            Self::Recommendation => 0.05,
            Self::Imputation => 0.45,
            Self::Evaluation => 0.15,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Profiling => 0.0,
            Self::PatternAnalysis => 0.10,
            Self::MechanismClassification => 0.20,
            Self::Recommendation => 0.35,
            Self::Imputation => 0.40,
            Self::Evaluation => 0.85,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }
}

/// One progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: EngineStage,

    /// Optional sub-stage description (e.g. "Column: income")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    pub fn new(stage: EngineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Progress update with item counts, e.g. imputation step 2 of 3.
    pub fn with_items(
        stage: EngineStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            sub_stage: Some(sub_stage.into()),
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(EngineStage::Complete, 1.0, message)
    }

    pub fn cancelled() -> Self {
        Self::new(EngineStage::Cancelled, 0.0, "Run cancelled by user")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(EngineStage::Failed, 0.0, message)
    }
}

/// Trait for receiving progress updates.
///
/// Implementations must be `Send + Sync`; the engine may run on a worker
/// thread while the reporter forwards events to a UI.
pub trait ProgressReporter: Send + Sync {
    /// Called once per stage and once per imputation step. Keep it cheap.
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running engine call.
///
/// Clones share one atomic flag. The engine returns
/// [`ImputationError::Cancelled`](crate::ImputationError::Cancelled) at the
/// next check after [`cancel()`](Self::cancel).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_cancellation_token_clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();
        assert!(!token2.is_cancelled());

        token1.cancel();
        assert!(token2.is_cancelled());

        token2.reset();
        assert!(!token1.is_cancelled());
    }

    #[test]
    fn test_progress_update_with_items() {
        let update = ProgressUpdate::with_items(
            EngineStage::Imputation,
            "Step: knn",
            1,
            2,
            "Imputing with knn",
        );
        assert_eq!(update.stage, EngineStage::Imputation);
        assert_eq!(update.sub_stage, Some("Step: knn".to_string()));
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - 0.625).abs() < 1e-6);
        assert_eq!(update.items_total, Some(2));
    }

    #[test]
    fn test_progress_update_complete() {
        let update = ProgressUpdate::complete("Done");
        assert_eq!(update.stage, EngineStage::Complete);
        assert_eq!(update.progress, 1.0);
    }

    #[test]
    fn test_stage_weights_sum() {
        let stages = [
            EngineStage::Profiling,
            EngineStage::PatternAnalysis,
            EngineStage::MechanismClassification,
            EngineStage::Recommendation,
            EngineStage::Imputation,
            EngineStage::Evaluation,
        ];
        let total: f32 = stages.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 0.01, "Weights should sum to ~1.0");

        for pair in stages.windows(2) {
            let end = pair[0].base_progress() + pair[0].weight();
            assert!((end - pair[1].base_progress()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stage_json_values() {
        let json = serde_json::to_string(&EngineStage::MechanismClassification).unwrap();
        assert_eq!(json, "\"mechanism_classification\"");
    }

    #[test]
    fn test_closure_progress_reporter() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        reporter.report(ProgressUpdate::new(EngineStage::Profiling, 0.5, "Test"));
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }
}
