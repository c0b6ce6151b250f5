//! Error types for the diagnosis and imputation engine.
//!
//! Structural problems (empty dataset, unknown column, a strategy with no
//! valid target) are raised as [`ImputationError`]. Statistical shortcomings
//! are not errors: they surface as [`EngineWarning`](crate::types::EngineWarning)
//! values inside diagnoses and ledgers.
//!
//! Errors are serializable as `{code, message}` so they can be handed to a
//! frontend or written as JSON by the CLI.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the engine.
#[derive(Error, Debug)]
pub enum ImputationError {
    /// The run was cancelled through a [`CancellationToken`](crate::CancellationToken).
    #[error("Run cancelled")]
    Cancelled,

    /// The dataset has no columns or no rows where some are required.
    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A strategy was requested that has no valid target.
    #[error("Strategy '{strategy}' cannot be applied: {reason}")]
    IncompatibleStrategy { strategy: String, reason: String },

    /// Invalid configuration or parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A diagnosis was passed that does not describe the given dataset.
    #[error("Diagnosis does not match dataset: {0}")]
    DiagnosisMismatch(String),

    /// A numeric routine could not produce a result.
    #[error("Failed to impute column '{column}': {reason}")]
    ImputationFailed { column: String, reason: String },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ImputationError>,
    },
}

impl ImputationError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ImputationError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for [`ImputationError::IncompatibleStrategy`].
    pub fn incompatible(strategy: impl ToString, reason: impl Into<String>) -> Self {
        ImputationError::IncompatibleStrategy {
            strategy: strategy.to_string(),
            reason: reason.into(),
        }
    }

    /// Get a stable error code for callers that branch on error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::EmptyDataset(_) => "EMPTY_DATASET",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::IncompatibleStrategy { .. } => "INCOMPATIBLE_STRATEGY",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::DiagnosisMismatch(_) => "DIAGNOSIS_MISMATCH",
            Self::ImputationFailed { .. } => "IMPUTATION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::WithContext { source, .. } => source.is_cancelled(),
            other => matches!(other, Self::Cancelled),
        }
    }

    /// Check if this error was caused by the caller's input rather than by
    /// the engine itself.
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Self::EmptyDataset(_)
            | Self::ColumnNotFound(_)
            | Self::IncompatibleStrategy { .. }
            | Self::InvalidConfig(_)
            | Self::DiagnosisMismatch(_) => true,
            Self::WithContext { source, .. } => source.is_invalid_input(),
            _ => false,
        }
    }
}

impl Serialize for ImputationError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ImputationError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ImputationError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ImputationError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(ImputationError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(
            ImputationError::ColumnNotFound("age".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            ImputationError::incompatible("knn", "no numeric columns").error_code(),
            "INCOMPATIBLE_STRATEGY"
        );
    }

    #[test]
    fn test_invalid_input_family() {
        assert!(ImputationError::EmptyDataset("no columns".into()).is_invalid_input());
        assert!(ImputationError::ColumnNotFound("x".into()).is_invalid_input());
        assert!(ImputationError::incompatible("mean", "categorical").is_invalid_input());
        assert!(!ImputationError::Cancelled.is_invalid_input());
        assert!(!ImputationError::Internal("boom".into()).is_invalid_input());
    }

    #[test]
    fn test_with_context_keeps_code() {
        let err = ImputationError::ColumnNotFound("income".to_string())
            .with_context("While validating config");
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("While validating config"));
        assert!(err.to_string().contains("income"));
    }

    #[test]
    fn test_cancelled_through_context() {
        let err = ImputationError::Cancelled.with_context("during imputation");
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_error_serialization() {
        let err = ImputationError::ColumnNotFound("age".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"code\":\"COLUMN_NOT_FOUND\""));
        assert!(json.contains("\"message\":\"Column 'age' not found in dataset\""));
    }
}
