use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Profiling Types
// ============================================================================

/// Inferred kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Binary,
    Categorical,
}

impl ColumnKind {
    /// Numeric and binary columns carry numbers the engine can compute with.
    pub fn is_numeric_like(&self) -> bool {
        matches!(self, Self::Numeric | Self::Binary)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Numeric => "numeric",
            Self::Binary => "binary",
            Self::Categorical => "categorical",
        };
        f.write_str(s)
    }
}

/// Distribution moments of a numeric or binary column's observed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub skewness: f64,
    /// 1st percentile of observed values.
    pub p01: f64,
    /// 99th percentile of observed values.
    pub p99: f64,
}

/// Frequency summary of a categorical column's observed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_value: Option<String>,
    pub top_count: usize,
}

/// Summary statistics attached to a [`ColumnProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SummaryStats {
    Numeric(NumericSummary),
    Categorical(CategoricalSummary),
    /// The column has no observed values.
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub inferred_kind: ColumnKind,
    pub missing_count: usize,
    pub missing_ratio: f64,
    /// Number of distinct non-missing values.
    pub cardinality: usize,
    pub summary_stats: SummaryStats,
}

impl ColumnProfile {
    pub fn has_missing(&self) -> bool {
        self.missing_count > 0
    }

    /// Numeric summary, when the column has one.
    pub fn numeric_summary(&self) -> Option<&NumericSummary> {
        match &self.summary_stats {
            SummaryStats::Numeric(summary) => Some(summary),
            _ => None,
        }
    }
}

/// Outcome marker for profiling a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Profiled,
    /// The dataset has zero columns. Not an error.
    EmptyDataset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub status: ProfileStatus,
    pub n_rows: usize,
    pub n_columns: usize,
    pub total_missing: usize,
    pub columns: Vec<ColumnProfile>,
}

impl DatasetProfile {
    /// Profile marker for a zero-column dataset.
    pub fn empty(n_rows: usize) -> Self {
        Self {
            status: ProfileStatus::EmptyDataset,
            n_rows,
            n_columns: 0,
            total_missing: 0,
            columns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status == ProfileStatus::EmptyDataset
    }

    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns with at least one missing value.
    pub fn columns_with_missing(&self) -> impl Iterator<Item = &ColumnProfile> {
        self.columns.iter().filter(|c| c.has_missing())
    }

    /// Fraction of all cells that are missing.
    pub fn missing_fraction(&self) -> f64 {
        let cells = self.n_rows * self.n_columns;
        if cells == 0 {
            0.0
        } else {
            self.total_missing as f64 / cells as f64
        }
    }
}

// ============================================================================
// Pattern Types
// ============================================================================

/// One distinct combination of columns missing together in a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingnessPattern {
    pub pattern_id: usize,
    /// One flag per analyzed column, `true` = missing.
    pub mask: Vec<bool>,
    pub missing_columns: Vec<String>,
    pub occurrence_count: usize,
    pub row_percentage: f64,
    /// Share of rows covered by this and all more frequent patterns.
    pub cumulative_percentage: f64,
}

impl MissingnessPattern {
    pub fn missing_count(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }

    pub fn is_complete_row(&self) -> bool {
        self.missing_count() == 0
    }
}

/// Patterns outside the top-K, aggregated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherPatterns {
    pub distinct_patterns: usize,
    pub occurrence_count: usize,
    pub row_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Correlated,
    VeryStrong,
}

/// Correlation between the missing indicators of two columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingnessCorrelation {
    pub column_a: String,
    pub column_b: String,
    pub correlation: f64,
    pub strength: CorrelationStrength,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub columns: Vec<String>,
    pub n_rows: usize,
    /// No missing values anywhere.
    pub is_complete: bool,
    pub distinct_patterns: usize,
    /// Set when rows were folded into "other" after hitting the distinct
    /// pattern cap during enumeration.
    pub enumeration_capped: bool,
    pub patterns: Vec<MissingnessPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other: Option<OtherPatterns>,
    /// Row share covered by the listed patterns.
    pub coverage: f64,
    pub is_monotone: bool,
    pub correlated_pairs: Vec<MissingnessCorrelation>,
}

impl PatternAnalysis {
    /// Analysis of a dataset without missing values.
    pub fn complete(columns: Vec<String>, n_rows: usize) -> Self {
        Self {
            columns,
            n_rows,
            is_complete: true,
            distinct_patterns: 0,
            enumeration_capped: false,
            patterns: Vec::new(),
            other: None,
            coverage: 0.0,
            is_monotone: true,
            correlated_pairs: Vec::new(),
        }
    }

    /// Row share covered by the listed patterns plus "other".
    pub fn total_percentage(&self) -> f64 {
        self.coverage + self.other.as_ref().map_or(0.0, |o| o.row_percentage)
    }
}

// ============================================================================
// Mechanism Types
// ============================================================================

/// Missingness mechanism label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mechanism {
    Mcar,
    Mar,
    Mnar,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mcar => "MCAR",
            Self::Mar => "MAR",
            Self::Mnar => "MNAR",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McarStatus {
    Tested,
    InsufficientPatterns,
    /// No missing values, nothing to test.
    NotApplicable,
}

/// Result of the simplified chi-square MCAR approximation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McarTest {
    pub status: McarStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chi_square: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degrees_of_freedom: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    pub patterns_used: usize,
    pub mcar_likely: bool,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStrength {
    Moderate,
    Strong,
}

/// A missing indicator that tracks another column's observed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarRelationship {
    pub missing_column: String,
    pub observed_column: String,
    pub correlation: f64,
    pub strength: RelationshipStrength,
    pub n_observations: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarScan {
    pub relationships: Vec<MarRelationship>,
    pub mar_likely: bool,
}

impl MarScan {
    /// Observed columns that explain `column`'s missingness.
    pub fn partners_of(&self, column: &str) -> Vec<String> {
        self.relationships
            .iter()
            .filter(|r| r.missing_column == column)
            .map(|r| r.observed_column.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MnarIndicatorKind {
    HighMissingRatio,
    SensitiveName,
    BoundaryClustering,
}

impl fmt::Display for MnarIndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HighMissingRatio => "high_missing_ratio",
            Self::SensitiveName => "sensitive_name",
            Self::BoundaryClustering => "boundary_clustering",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnarIndicator {
    pub column: String,
    pub kind: MnarIndicatorKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MnarScan {
    pub indicators: Vec<MnarIndicator>,
    pub mnar_likely: bool,
}

impl MnarScan {
    pub fn flags_for(&self, column: &str) -> Vec<MnarIndicatorKind> {
        self.indicators
            .iter()
            .filter(|i| i.column == column)
            .map(|i| i.kind)
            .collect()
    }

    pub fn has_indicator(&self, column: &str, kind: MnarIndicatorKind) -> bool {
        self.indicators
            .iter()
            .any(|i| i.column == column && i.kind == kind)
    }
}

/// Weighted score per mechanism.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MechanismScores {
    pub mcar: f64,
    pub mar: f64,
    pub mnar: f64,
}

impl MechanismScores {
    pub fn total(&self) -> f64 {
        self.mcar + self.mar + self.mnar
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MechanismVerdict {
    pub mechanism: Mechanism,
    pub confidence: f64,
    pub scores: MechanismScores,
    pub supporting_evidence: Vec<String>,
}

impl MechanismVerdict {
    pub fn unknown(evidence: Vec<String>) -> Self {
        Self {
            mechanism: Mechanism::Unknown,
            confidence: 0.0,
            scores: MechanismScores::default(),
            supporting_evidence: evidence,
        }
    }
}

/// Per-column missing severity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSeverity {
    Low,
    Moderate,
    High,
    Severe,
}

impl MissingSeverity {
    /// Band for a missing ratio: < 5% low, 5-20% moderate, up to 50% high.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.05 {
            Self::Low
        } else if ratio <= 0.20 {
            Self::Moderate
        } else if ratio <= 0.50 {
            Self::High
        } else {
            Self::Severe
        }
    }
}

impl fmt::Display for MissingSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Severe => "severe",
        };
        f.write_str(s)
    }
}

/// Diagnosis details for one column with missing values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDiagnosis {
    pub column: String,
    pub kind: ColumnKind,
    pub missing_count: usize,
    pub missing_ratio: f64,
    pub severity: MissingSeverity,
    pub mnar_flags: Vec<MnarIndicatorKind>,
    pub mar_partners: Vec<String>,
}

/// Full result of `diagnose`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub profile: DatasetProfile,
    pub patterns: PatternAnalysis,
    pub mcar: McarTest,
    pub mar: MarScan,
    pub mnar: MnarScan,
    pub columns: Vec<ColumnDiagnosis>,
    pub verdict: MechanismVerdict,
    pub warnings: Vec<EngineWarning>,
}

impl Diagnosis {
    pub fn column(&self, name: &str) -> Option<&ColumnDiagnosis> {
        self.columns.iter().find(|c| c.column == name)
    }
}

// ============================================================================
// Strategy Types
// ============================================================================

/// Closed set of imputation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    Mean,
    Median,
    Mode,
    ForwardFill,
    BackwardFill,
    Interpolation,
    Constant,
    Drop,
    DropColumns,
    Knn,
    Iterative,
    TreeIterative,
}

impl ImputationStrategy {
    pub const ALL: [ImputationStrategy; 12] = [
        Self::Mean,
        Self::Median,
        Self::Mode,
        Self::ForwardFill,
        Self::BackwardFill,
        Self::Interpolation,
        Self::Constant,
        Self::Drop,
        Self::DropColumns,
        Self::Knn,
        Self::Iterative,
        Self::TreeIterative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Mode => "mode",
            Self::ForwardFill => "forward_fill",
            Self::BackwardFill => "backward_fill",
            Self::Interpolation => "interpolation",
            Self::Constant => "constant",
            Self::Drop => "drop",
            Self::DropColumns => "drop_columns",
            Self::Knn => "knn",
            Self::Iterative => "iterative",
            Self::TreeIterative => "tree_iterative",
        }
    }

    /// Strategies that model all selected columns in one pass.
    pub fn is_multivariate(&self) -> bool {
        matches!(self, Self::Knn | Self::Iterative | Self::TreeIterative)
    }

    /// Strategies that only apply to numeric columns.
    pub fn is_numeric_only(&self) -> bool {
        matches!(self, Self::Mean | Self::Median | Self::Interpolation)
    }

    /// Strategies that remove data instead of filling it.
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::Drop | Self::DropColumns)
    }
}

impl fmt::Display for ImputationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImputationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.as_str() == normalized)
            .or(match normalized.as_str() {
                "ffill" => Some(Self::ForwardFill),
                "bfill" => Some(Self::BackwardFill),
                "mice" => Some(Self::Iterative),
                "forest" | "random_forest" => Some(Self::TreeIterative),
                _ => None,
            })
            .ok_or_else(|| format!("unknown imputation strategy '{}'", s))
    }
}

/// Caller-supplied literal for `constant`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

impl FillValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for FillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{:.4}", n),
            Self::Text(s) => write!(f, "'{}'", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    #[default]
    Linear,
    Nearest,
}

/// Per-call strategy parameters. Unset values inherit from
/// [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputationParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_value: Option<FillValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpolation_method: Option<InterpolationMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_neighbors: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_budget_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_estimators: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ImputationParameters {
    pub fn with_fill_value(mut self, value: FillValue) -> Self {
        self.fill_value = Some(value);
        self
    }
}

/// What to run: one strategy over a set of columns.
///
/// An empty `columns` list means "every column with missing values"
/// (or every column for `drop`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationConfig {
    pub strategy: ImputationStrategy,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub parameters: ImputationParameters,
}

impl ImputationConfig {
    pub fn new(strategy: ImputationStrategy) -> Self {
        Self {
            strategy,
            columns: Vec::new(),
            parameters: ImputationParameters::default(),
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn parameters(mut self, parameters: ImputationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn fill_value(mut self, value: FillValue) -> Self {
        self.parameters.fill_value = Some(value);
        self
    }
}

/// One candidate strategy for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyCandidate {
    pub strategy: ImputationStrategy,
    pub target_columns: Vec<String>,
    pub parameters: ImputationParameters,
    pub rationale: String,
    pub recommended: bool,
}

impl StrategyCandidate {
    pub fn to_config(&self) -> ImputationConfig {
        ImputationConfig {
            strategy: self.strategy,
            columns: self.target_columns.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

/// Ranked candidates for one affected column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRecommendation {
    pub column: String,
    pub kind: ColumnKind,
    pub missing_ratio: f64,
    pub severity: MissingSeverity,
    /// Recommended candidates first, otherwise in rule order.
    pub candidates: Vec<StrategyCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caution: Option<String>,
}

impl ColumnRecommendation {
    /// Top-ranked recommended candidate.
    pub fn best(&self) -> Option<&StrategyCandidate> {
        self.candidates.iter().find(|c| c.recommended)
    }

    pub fn candidate(&self, strategy: ImputationStrategy) -> Option<&StrategyCandidate> {
        self.candidates.iter().find(|c| c.strategy == strategy)
    }
}

// ============================================================================
// Ledger Types
// ============================================================================

/// How a column's values were produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FillSummary {
    Scalar { value: FillValue },
    Propagated { direction: String },
    Interpolated { method: InterpolationMethod },
    Model {
        model: String,
        iterations: usize,
        converged: bool,
    },
    RowsDropped { rows: usize },
    ColumnDropped,
    Unchanged { reason: String },
}

impl fmt::Display for FillSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar { value } => write!(f, "filled with {}", value),
            Self::Propagated { direction } => write!(f, "{} propagation", direction),
            Self::Interpolated { method } => write!(f, "{:?} interpolation", method),
            Self::Model {
                model,
                iterations,
                converged,
            } => write!(
                f,
                "{} ({} iterations, {})",
                model,
                iterations,
                if *converged { "converged" } else { "not converged" }
            ),
            Self::RowsDropped { rows } => write!(f, "{} rows dropped", rows),
            Self::ColumnDropped => f.write_str("column dropped"),
            Self::Unchanged { reason } => write!(f, "unchanged: {}", reason),
        }
    }
}

/// One column's record in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub column: String,
    pub requested: ImputationStrategy,
    /// Strategy actually applied; `None` when the column was left unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<ImputationStrategy>,
    pub missing_before: usize,
    pub values_filled: usize,
    pub remaining_missing: usize,
    pub fill_summary: FillSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl LedgerEntry {
    pub fn used_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Non-fatal condition attached to a diagnosis or ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineWarning {
    /// The preferred strategy failed for a column and something else was used.
    PartialFailure {
        column: String,
        requested: ImputationStrategy,
        #[serde(skip_serializing_if = "Option::is_none")]
        applied: Option<ImputationStrategy>,
        reason: String,
    },
    /// No confident mechanism verdict.
    InsufficientEvidence { reason: String },
    /// A target column was skipped because the strategy does not apply to it.
    IncompatibleColumn {
        column: String,
        strategy: ImputationStrategy,
        reason: String,
    },
    /// An iterative strategy stopped on its iteration or time cap.
    IterationCapReached {
        strategy: ImputationStrategy,
        iterations: usize,
        reason: String,
    },
    /// Leading/trailing gaps with no anchor were left missing.
    UnresolvedEdges { column: String, remaining: usize },
}

impl fmt::Display for EngineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartialFailure {
                column,
                requested,
                applied,
                reason,
            } => match applied {
                Some(applied) => write!(
                    f,
                    "'{}': {} failed ({}), fell back to {}",
                    column, requested, reason, applied
                ),
                None => write!(
                    f,
                    "'{}': {} failed ({}), column left unchanged",
                    column, requested, reason
                ),
            },
            Self::InsufficientEvidence { reason } => {
                write!(f, "insufficient evidence: {}", reason)
            }
            Self::IncompatibleColumn {
                column,
                strategy,
                reason,
            } => write!(f, "'{}' skipped for {}: {}", column, strategy, reason),
            Self::IterationCapReached {
                strategy,
                iterations,
                reason,
            } => write!(
                f,
                "{} stopped after {} iterations: {}",
                strategy, iterations, reason
            ),
            Self::UnresolvedEdges { column, remaining } => write!(
                f,
                "'{}': {} edge values without an anchor left missing",
                column, remaining
            ),
        }
    }
}

/// Append-only record of one imputation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationLedger {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub rows_before: usize,
    pub rows_after: usize,
    pub entries: Vec<LedgerEntry>,
    pub warnings: Vec<EngineWarning>,
}

impl ImputationLedger {
    pub fn new(rows_before: usize) -> Self {
        Self {
            started_at: Utc::now(),
            duration_ms: 0,
            rows_before,
            rows_after: rows_before,
            entries: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    pub fn warn(&mut self, warning: EngineWarning) {
        self.warnings.push(warning);
    }

    /// Append another run's entries and warnings (used by plans).
    pub fn absorb(&mut self, other: ImputationLedger) {
        self.rows_after = other.rows_after;
        self.entries.extend(other.entries);
        self.warnings.extend(other.warnings);
    }

    pub fn entry(&self, column: &str) -> Option<&LedgerEntry> {
        self.entries.iter().rev().find(|e| e.column == column)
    }

    pub fn total_filled(&self) -> usize {
        self.entries.iter().map(|e| e.values_filled).sum()
    }

    pub fn rows_dropped(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    pub fn has_fallbacks(&self) -> bool {
        self.entries.iter().any(LedgerEntry::used_fallback)
    }
}

// ============================================================================
// Quality Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnQuality {
    pub column: String,
    pub missing_before: usize,
    pub missing_after: usize,
    pub completeness: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_preservation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_preservation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Pre/post comparison for one run. Always recomputed, never stored state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// 1 - remaining/original missing, over the evaluated columns.
    pub completeness: f64,
    /// Change in the share of non-missing cells.
    pub completeness_delta: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_preservation_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_preservation_score: Option<f64>,
    /// Mean of the available components.
    pub overall_score: f64,
    pub columns: Vec<ColumnQuality>,
    pub notes: Vec<String>,
}

// ============================================================================
// Tests
// ============================================================================
