//! Configuration for the diagnosis and imputation engine.
//!
//! Every threshold the analyzers and the recommender use lives here, so a
//! verdict can always be traced back to an explicit, serializable setting.
//! Use [`EngineConfig::builder()`] for a validated configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Weights applied to each sub-analysis that fires when scoring a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MechanismWeights {
    pub mcar: f64,
    pub mar: f64,
    pub mnar: f64,
}

impl Default for MechanismWeights {
    fn default() -> Self {
        Self {
            mcar: 1.0,
            mar: 0.8,
            mnar: 0.9,
        }
    }
}

/// Default column-name lexicon for the sensitivity heuristic.
pub fn default_sensitive_terms() -> Vec<String> {
    [
        "income", "salary", "wage", "earning", "age", "weight", "bmi", "debt", "loan",
        "credit", "wealth", "revenue", "tax", "health", "disease", "diagnosis", "drug",
        "alcohol", "smok", "religion", "ethnic", "race", "gender", "sexual",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Configuration for [`MissingDataEngine`](crate::MissingDataEngine).
///
/// # Example
///
/// ```rust,ignore
/// use lex_imputation::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .top_k_patterns(5)
///     .mcar_alpha(0.01)
///     .knn_neighbors(3)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of patterns reported individually; the rest become "other".
    /// Default: 10
    pub top_k_patterns: usize,

    /// Distinct patterns tracked during enumeration before rows are folded
    /// into "other" directly.
    /// Default: 10_000
    pub max_distinct_patterns: usize,

    /// |r| between missing indicators above which a pair is "correlated".
    /// Default: 0.5
    pub correlated_missingness_threshold: f64,

    /// |r| above which a correlated pair is "very strong".
    /// Default: 0.8
    pub very_strong_missingness_threshold: f64,

    /// Significance level of the MCAR approximation. p above it means
    /// "MCAR likely".
    /// Default: 0.05
    pub mcar_alpha: f64,

    /// |r| for a moderate MAR relationship.
    /// Default: 0.3
    pub mar_moderate_threshold: f64,

    /// |r| for a strong MAR relationship.
    /// Default: 0.5
    pub mar_strong_threshold: f64,

    /// Missing ratio above which a column is flagged as possibly MNAR.
    /// Default: 0.3
    pub mnar_missing_ratio_threshold: f64,

    /// Share of observed values piled against the observed minimum or maximum
    /// above which boundary clustering is flagged.
    /// Default: 0.05
    pub boundary_clustering_threshold: f64,

    /// Width of the edge band, as a share of the 1st-99th percentile range.
    /// Default: 0.1
    pub boundary_tolerance: f64,

    /// Column-name fragments that suggest self-censoring.
    pub sensitive_name_terms: Vec<String>,

    pub mechanism_weights: MechanismWeights,

    /// Neighbours for KNN imputation.
    /// Default: 5
    pub knn_neighbors: usize,

    /// Iteration bound for iterative strategies.
    /// Default: 10
    pub max_iterations: usize,

    /// Convergence tolerance (normalized mean change between iterations).
    /// Default: 1e-3
    pub convergence_tolerance: f64,

    /// Wall-clock cap for iterative strategies. None = unbounded.
    /// Default: None
    pub time_budget_ms: Option<u64>,

    /// Trees per column in the tree-ensemble imputer.
    /// Default: 10
    pub forest_trees: usize,

    /// Maximum depth of each tree.
    /// Default: 4
    pub forest_max_depth: usize,

    /// Seed for every randomized routine.
    /// Default: 42
    pub random_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k_patterns: 10,
            max_distinct_patterns: 10_000,
            correlated_missingness_threshold: 0.5,
            very_strong_missingness_threshold: 0.8,
            mcar_alpha: 0.05,
            mar_moderate_threshold: 0.3,
            mar_strong_threshold: 0.5,
            mnar_missing_ratio_threshold: 0.3,
            boundary_clustering_threshold: 0.05,
            boundary_tolerance: 0.1,
            sensitive_name_terms: default_sensitive_terms(),
            mechanism_weights: MechanismWeights::default(),
            knn_neighbors: 5,
            max_iterations: 10,
            convergence_tolerance: 1e-3,
            time_budget_ms: None,
            forest_trees: 10,
            forest_max_depth: 4,
            random_seed: 42,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Load and validate a configuration from a JSON file. Missing fields
    /// take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config
            .validate()
            .map_err(|e| crate::ImputationError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let unit_fields = [
            (
                "correlated_missingness_threshold",
                self.correlated_missingness_threshold,
            ),
            (
                "very_strong_missingness_threshold",
                self.very_strong_missingness_threshold,
            ),
            ("mcar_alpha", self.mcar_alpha),
            ("mar_moderate_threshold", self.mar_moderate_threshold),
            ("mar_strong_threshold", self.mar_strong_threshold),
            (
                "mnar_missing_ratio_threshold",
                self.mnar_missing_ratio_threshold,
            ),
            (
                "boundary_clustering_threshold",
                self.boundary_clustering_threshold,
            ),
            ("boundary_tolerance", self.boundary_tolerance),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.very_strong_missingness_threshold < self.correlated_missingness_threshold {
            return Err(ConfigValidationError::InvertedThresholds {
                lower: "correlated_missingness_threshold".to_string(),
                upper: "very_strong_missingness_threshold".to_string(),
            });
        }
        if self.mar_strong_threshold < self.mar_moderate_threshold {
            return Err(ConfigValidationError::InvertedThresholds {
                lower: "mar_moderate_threshold".to_string(),
                upper: "mar_strong_threshold".to_string(),
            });
        }

        let weights = self.mechanism_weights;
        for (field, value) in [
            ("mechanism_weights.mcar", weights.mcar),
            ("mechanism_weights.mar", weights.mar),
            ("mechanism_weights.mnar", weights.mnar),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigValidationError::InvalidWeight {
                    field: field.to_string(),
                    value,
                });
            }
        }

        for (field, value) in [
            ("top_k_patterns", self.top_k_patterns),
            ("max_distinct_patterns", self.max_distinct_patterns),
            ("knn_neighbors", self.knn_neighbors),
            ("max_iterations", self.max_iterations),
            ("forest_trees", self.forest_trees),
            ("forest_max_depth", self.forest_max_depth),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::MustBePositive(field.to_string()));
            }
        }

        if !(self.convergence_tolerance > 0.0) {
            return Err(ConfigValidationError::InvalidTolerance(
                self.convergence_tolerance,
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("'{lower}' must not exceed '{upper}'")]
    InvertedThresholds { lower: String, upper: String },

    #[error("Invalid weight for '{field}': {value} (must be a non-negative number)")]
    InvalidWeight { field: String, value: f64 },

    #[error("'{0}' must be at least 1")]
    MustBePositive(String),

    #[error("Invalid convergence tolerance: {0} (must be positive)")]
    InvalidTolerance(f64),
}

/// Builder for [`EngineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    top_k_patterns: Option<usize>,
    max_distinct_patterns: Option<usize>,
    correlated_missingness_threshold: Option<f64>,
    very_strong_missingness_threshold: Option<f64>,
    mcar_alpha: Option<f64>,
    mar_moderate_threshold: Option<f64>,
    mar_strong_threshold: Option<f64>,
    mnar_missing_ratio_threshold: Option<f64>,
    boundary_clustering_threshold: Option<f64>,
    boundary_tolerance: Option<f64>,
    sensitive_name_terms: Option<Vec<String>>,
    mechanism_weights: Option<MechanismWeights>,
    knn_neighbors: Option<usize>,
    max_iterations: Option<usize>,
    convergence_tolerance: Option<f64>,
    time_budget_ms: Option<u64>,
    forest_trees: Option<usize>,
    forest_max_depth: Option<usize>,
    random_seed: Option<u64>,
}

impl EngineConfigBuilder {
    /// Set how many patterns are reported individually.
    pub fn top_k_patterns(mut self, k: usize) -> Self {
        self.top_k_patterns = Some(k);
        self
    }

    /// Set the distinct-pattern cap used during enumeration.
    pub fn max_distinct_patterns(mut self, cap: usize) -> Self {
        self.max_distinct_patterns = Some(cap);
        self
    }

    /// Set the "correlated" and "very strong" missing-indicator thresholds.
    pub fn missingness_correlation_thresholds(mut self, correlated: f64, very_strong: f64) -> Self {
        self.correlated_missingness_threshold = Some(correlated);
        self.very_strong_missingness_threshold = Some(very_strong);
        self
    }

    /// Set the significance level of the MCAR approximation.
    pub fn mcar_alpha(mut self, alpha: f64) -> Self {
        self.mcar_alpha = Some(alpha);
        self
    }

    /// Set the moderate and strong MAR correlation thresholds.
    pub fn mar_thresholds(mut self, moderate: f64, strong: f64) -> Self {
        self.mar_moderate_threshold = Some(moderate);
        self.mar_strong_threshold = Some(strong);
        self
    }

    /// Set the missing ratio that flags a column as possibly MNAR.
    pub fn mnar_missing_ratio_threshold(mut self, threshold: f64) -> Self {
        self.mnar_missing_ratio_threshold = Some(threshold);
        self
    }

    /// Set the boundary clustering share and band tolerance.
    pub fn boundary_clustering(mut self, threshold: f64, tolerance: f64) -> Self {
        self.boundary_clustering_threshold = Some(threshold);
        self.boundary_tolerance = Some(tolerance);
        self
    }

    /// Replace the sensitive column-name lexicon.
    pub fn sensitive_name_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sensitive_name_terms = Some(terms.into_iter().map(Into::into).collect());
        self
    }

    /// Set the verdict weights.
    pub fn mechanism_weights(mut self, weights: MechanismWeights) -> Self {
        self.mechanism_weights = Some(weights);
        self
    }

    /// Set the number of neighbors for KNN imputation.
    pub fn knn_neighbors(mut self, k: usize) -> Self {
        self.knn_neighbors = Some(k);
        self
    }

    /// Set the iteration bound for iterative strategies.
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Set the convergence tolerance for iterative strategies.
    pub fn convergence_tolerance(mut self, tol: f64) -> Self {
        self.convergence_tolerance = Some(tol);
        self
    }

    /// Set a wall-clock cap for iterative strategies.
    pub fn time_budget_ms(mut self, ms: u64) -> Self {
        self.time_budget_ms = Some(ms);
        self
    }

    /// Set trees per column and maximum depth for the tree-ensemble imputer.
    pub fn forest(mut self, trees: usize, max_depth: usize) -> Self {
        self.forest_trees = Some(trees);
        self.forest_max_depth = Some(max_depth);
        self
    }

    /// Set the seed for randomized routines.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EngineConfig` or an error if validation fails.
    pub fn build(self) -> Result<EngineConfig, ConfigValidationError> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            top_k_patterns: self.top_k_patterns.unwrap_or(defaults.top_k_patterns),
            max_distinct_patterns: self
                .max_distinct_patterns
                .unwrap_or(defaults.max_distinct_patterns),
            correlated_missingness_threshold: self
                .correlated_missingness_threshold
                .unwrap_or(defaults.correlated_missingness_threshold),
            very_strong_missingness_threshold: self
                .very_strong_missingness_threshold
                .unwrap_or(defaults.very_strong_missingness_threshold),
            mcar_alpha: self.mcar_alpha.unwrap_or(defaults.mcar_alpha),
            mar_moderate_threshold: self
                .mar_moderate_threshold
                .unwrap_or(defaults.mar_moderate_threshold),
            mar_strong_threshold: self
                .mar_strong_threshold
                .unwrap_or(defaults.mar_strong_threshold),
            mnar_missing_ratio_threshold: self
                .mnar_missing_ratio_threshold
                .unwrap_or(defaults.mnar_missing_ratio_threshold),
            boundary_clustering_threshold: self
                .boundary_clustering_threshold
                .unwrap_or(defaults.boundary_clustering_threshold),
            boundary_tolerance: self
                .boundary_tolerance
                .unwrap_or(defaults.boundary_tolerance),
            sensitive_name_terms: self
                .sensitive_name_terms
                .unwrap_or(defaults.sensitive_name_terms),
            mechanism_weights: self
                .mechanism_weights
                .unwrap_or(defaults.mechanism_weights),
            knn_neighbors: self.knn_neighbors.unwrap_or(defaults.knn_neighbors),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            convergence_tolerance: self
                .convergence_tolerance
                .unwrap_or(defaults.convergence_tolerance),
            time_budget_ms: self.time_budget_ms.or(defaults.time_budget_ms),
            forest_trees: self.forest_trees.unwrap_or(defaults.forest_trees),
            forest_max_depth: self.forest_max_depth.unwrap_or(defaults.forest_max_depth),
            random_seed: self.random_seed.unwrap_or(defaults.random_seed),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.top_k_patterns, 10);
        assert_eq!(config.mcar_alpha, 0.05);
        assert_eq!(config.mar_moderate_threshold, 0.3);
        assert_eq!(config.mar_strong_threshold, 0.5);
        assert_eq!(config.mnar_missing_ratio_threshold, 0.3);
        assert_eq!(config.mechanism_weights, MechanismWeights::default());
        assert_eq!(config.knn_neighbors, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_defaults() {
        let config = EngineConfig::builder().build().unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = EngineConfig::builder()
            .top_k_patterns(5)
            .mcar_alpha(0.01)
            .knn_neighbors(3)
            .forest(20, 6)
            .time_budget_ms(250)
            .sensitive_name_terms(["income"])
            .build()
            .unwrap();

        assert_eq!(config.top_k_patterns, 5);
        assert_eq!(config.mcar_alpha, 0.01);
        assert_eq!(config.knn_neighbors, 3);
        assert_eq!(config.forest_trees, 20);
        assert_eq!(config.forest_max_depth, 6);
        assert_eq!(config.time_budget_ms, Some(250));
        assert_eq!(config.sensitive_name_terms, vec!["income".to_string()]);
    }

    #[test]
    fn test_validation_invalid_threshold() {
        let result = EngineConfig::builder().mcar_alpha(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_inverted_thresholds() {
        let result = EngineConfig::builder().mar_thresholds(0.6, 0.4).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvertedThresholds { .. }
        ));
    }

    #[test]
    fn test_validation_zero_neighbors() {
        let result = EngineConfig::builder().knn_neighbors(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::MustBePositive(field) if field == "knn_neighbors"
        ));
    }

    #[test]
    fn test_validation_negative_weight() {
        let result = EngineConfig::builder()
            .mechanism_weights(MechanismWeights {
                mcar: 1.0,
                mar: -0.1,
                mnar: 0.9,
            })
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidWeight { .. }
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "top_k_patterns": 4,
            "mechanism_weights": { "mcar": 1.0, "mar": 0.5, "mnar": 0.5 },
            "time_budget_ms": 1000
        }"#;

        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.top_k_patterns, 4);
        assert_eq!(config.mechanism_weights.mar, 0.5);
        assert_eq!(config.time_budget_ms, Some(1000));
        assert_eq!(config.knn_neighbors, 5);
        assert!(!config.sensitive_name_terms.is_empty());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
