//! CLI entry point for the missing-data engine.

use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use lex_imputation::{
    ColumnRecommendation, DatasetProfile, Diagnosis, EngineConfig, FillValue, ImputationConfig,
    ImputationLedger, ImputationParameters, ImputationPlan, ImputationStrategy, MissingDataEngine,
    QualityReport,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Missing-data diagnosis and imputation",
    long_about = "Diagnoses why values are missing in a CSV dataset (MCAR / MAR / MNAR) \
                  and imputes them with a suitable strategy.\n\n\
                  EXAMPLES:\n  \
                  # Mechanism verdict and patterns\n  \
                  lex-imputation diagnose -i data.csv\n\n  \
                  # Ranked strategies per column as JSON\n  \
                  lex-imputation recommend -i data.csv --json\n\n  \
                  # Explicit strategy\n  \
                  lex-imputation impute -i data.csv --strategy knn --neighbors 7 -o imputed.csv\n\n  \
                  # Follow the recommendations\n  \
                  lex-imputation impute -i data.csv --auto -o imputed.csv"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Per-column statistics and missing counts
    Profile(CommonArgs),
    /// Missingness patterns and mechanism verdict
    Diagnose(CommonArgs),
    /// Ranked imputation strategies per affected column
    Recommend(CommonArgs),
    /// Impute missing values and report quality
    Impute(ImputeArgs),
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// Path to the CSV file to analyze
    #[arg(short, long)]
    input: PathBuf,

    /// JSON file with engine configuration overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON to stdout instead of human-readable text
    ///
    /// Disables all logs so stdout only carries JSON.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(ClapArgs, Debug)]
struct ImputeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Strategy to apply (mean, median, mode, forward_fill, backward_fill,
    /// interpolation, constant, drop, drop_columns, knn, iterative, tree_iterative)
    #[arg(short, long, required_unless_present = "auto", conflicts_with = "auto")]
    strategy: Option<ImputationStrategy>,

    /// Comma-separated target columns (default: every column with missing values)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Literal for the constant strategy
    #[arg(long)]
    fill_value: Option<String>,

    /// Number of neighbors for KNN
    #[arg(long)]
    neighbors: Option<usize>,

    /// Iteration cap for iterative strategies
    #[arg(long)]
    max_iter: Option<usize>,

    /// Diagnose, then execute the recommended plan
    #[arg(long)]
    auto: bool,

    /// Where to write the imputed CSV
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Command {
    fn common(&self) -> &CommonArgs {
        match self {
            Self::Profile(args) | Self::Diagnose(args) | Self::Recommend(args) => args,
            Self::Impute(args) => &args.common,
        }
    }
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled so that stdout
/// only carries JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = cli.command.common();
    init_logging(&common.log_level, common.quiet, common.json);

    if !common.input.exists() {
        return Err(anyhow!("Input file not found: {}", common.input.display()));
    }

    let engine = build_engine(common)?;

    info!("Loading dataset from: {}", common.input.display());
    let data = load_csv(&common.input)?;
    info!("Dataset loaded: {:?}", data.shape());

    let result = match &cli.command {
        Command::Profile(args) => run_profile(&engine, &data, args),
        Command::Diagnose(args) => run_diagnose(&engine, &data, args),
        Command::Recommend(args) => run_recommend(&engine, &data, args),
        Command::Impute(args) => run_impute(&engine, &data, args),
    };
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

fn build_engine(args: &CommonArgs) -> Result<MissingDataEngine> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let mut builder = MissingDataEngine::builder().config(config);
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            debug!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    Ok(builder.build()?)
}

// =============================================================================
// Subcommands
// =============================================================================

fn run_profile(engine: &MissingDataEngine, data: &DataFrame, args: &CommonArgs) -> Result<()> {
    let profile = engine.profile(data)?;
    if args.json {
        return print_json(&profile);
    }
    print_profile(&profile);
    Ok(())
}

fn run_diagnose(engine: &MissingDataEngine, data: &DataFrame, args: &CommonArgs) -> Result<()> {
    let diagnosis = engine.diagnose(data)?;
    if args.json {
        return print_json(&diagnosis);
    }
    print_diagnosis(&diagnosis);
    Ok(())
}

fn run_recommend(engine: &MissingDataEngine, data: &DataFrame, args: &CommonArgs) -> Result<()> {
    let diagnosis = engine.diagnose(data)?;
    let recommendations = engine.recommend(data, &diagnosis)?;
    if args.json {
        return print_json(&recommendations);
    }
    print_recommendations(&recommendations);
    Ok(())
}

#[derive(Serialize)]
struct ImputeOutput<'a> {
    plan: &'a ImputationPlan,
    ledger: &'a ImputationLedger,
    quality: &'a QualityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_file: Option<String>,
}

fn run_impute(engine: &MissingDataEngine, data: &DataFrame, args: &ImputeArgs) -> Result<()> {
    let plan = if args.auto {
        let diagnosis = engine.diagnose(data)?;
        let recommendations = engine.recommend(data, &diagnosis)?;
        ImputationPlan::from_recommendations(&recommendations)
    } else {
        let strategy = args
            .strategy
            .ok_or_else(|| anyhow!("--strategy is required unless --auto is given"))?;
        ImputationPlan::new().step(
            ImputationConfig::new(strategy)
                .columns(args.columns.iter().cloned())
                .parameters(cli_parameters(args)),
        )
    };

    if plan.is_empty() {
        info!("Nothing to impute");
    }

    let (mut imputed, ledger) = engine.impute_plan(data, &plan)?;
    let quality = engine.evaluate(data, &imputed, &[])?;

    if let Some(path) = &args.output {
        write_csv(&mut imputed, path)?;
        info!("Imputed dataset written to: {}", path.display());
    }

    if args.common.json {
        return print_json(&ImputeOutput {
            plan: &plan,
            ledger: &ledger,
            quality: &quality,
            output_file: args.output.as_ref().map(|p| p.display().to_string()),
        });
    }
    print_ledger(&ledger, &quality);
    Ok(())
}

fn cli_parameters(args: &ImputeArgs) -> ImputationParameters {
    ImputationParameters {
        fill_value: args.fill_value.as_deref().map(parse_fill_value),
        n_neighbors: args.neighbors,
        max_iterations: args.max_iter,
        ..ImputationParameters::default()
    }
}

/// Numeric literals become numbers, anything else stays text.
fn parse_fill_value(raw: &str) -> FillValue {
    raw.trim()
        .parse::<f64>()
        .map(FillValue::Number)
        .unwrap_or_else(|_| FillValue::Text(raw.to_string()))
}

// =============================================================================
// Output
// =============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn print_profile(profile: &DatasetProfile) {
    println!("\n{}", "=".repeat(80));
    println!("COLUMN PROFILES ({} rows x {} columns)", profile.n_rows, profile.n_columns);
    println!("{}", "=".repeat(80));
    println!(
        "{:<24} {:<12} {:<12} {:<10} {:<10}",
        "Column", "Dtype", "Kind", "Missing", "Missing %"
    );
    println!("{}", "-".repeat(70));
    for col in &profile.columns {
        println!(
            "{:<24} {:<12} {:<12} {:<10} {:<10.1}",
            truncate_str(&col.name, 23),
            truncate_str(&col.dtype, 11),
            col.inferred_kind,
            col.missing_count,
            col.missing_ratio * 100.0
        );
    }
    println!("\nTotal missing cells: {}", profile.total_missing);
}

fn print_diagnosis(diagnosis: &Diagnosis) {
    let verdict = &diagnosis.verdict;
    println!("\n{}", "=".repeat(80));
    println!(
        "MECHANISM: {} (confidence {:.0}%)",
        verdict.mechanism,
        verdict.confidence * 100.0
    );
    println!("{}", "=".repeat(80));
    for evidence in &verdict.supporting_evidence {
        println!("  - {}", evidence);
    }

    println!("\nMCAR test: {}", diagnosis.mcar.note);
    if let Some(p) = diagnosis.mcar.p_value {
        println!("  p-value: {:.4}", p);
    }

    let patterns = &diagnosis.patterns;
    println!(
        "\nPATTERNS ({} distinct, monotone: {}, coverage {:.1}%)",
        patterns.distinct_patterns,
        patterns.is_monotone,
        patterns.coverage
    );
    println!("{}", "-".repeat(40));
    for pattern in &patterns.patterns {
        let label = if pattern.missing_columns.is_empty() {
            "(complete rows)".to_string()
        } else {
            pattern.missing_columns.join(", ")
        };
        println!(
            "  #{:<3} {:>6} rows {:>6.1}%  {}",
            pattern.pattern_id, pattern.occurrence_count, pattern.row_percentage, label
        );
    }

    if !diagnosis.columns.is_empty() {
        println!("\nAFFECTED COLUMNS");
        println!("{}", "-".repeat(40));
        for column in &diagnosis.columns {
            let mut line = format!(
                "  {:<24} {:>6.1}% {:<9} {}",
                truncate_str(&column.column, 23),
                column.missing_ratio * 100.0,
                column.severity,
                column.kind
            );
            if !column.mnar_flags.is_empty() {
                let flags: Vec<String> = column.mnar_flags.iter().map(|f| f.to_string()).collect();
                line.push_str(&format!("  MNAR: {}", flags.join(", ")));
            }
            if !column.mar_partners.is_empty() {
                line.push_str(&format!("  MAR with: {}", column.mar_partners.join(", ")));
            }
            println!("{}", line);
        }
    }

    print_warnings(diagnosis.warnings.iter().map(|w| w.to_string()));
}

fn print_recommendations(recommendations: &[ColumnRecommendation]) {
    println!("\n{}", "=".repeat(80));
    println!("RECOMMENDATIONS");
    println!("{}", "=".repeat(80));
    if recommendations.is_empty() {
        println!("  No missing values; nothing to recommend");
        return;
    }
    for rec in recommendations {
        println!(
            "\n{} ({}, {:.1}% missing, {})",
            rec.column,
            rec.kind,
            rec.missing_ratio * 100.0,
            rec.severity
        );
        if let Some(caution) = &rec.caution {
            println!("  ! {}", caution);
        }
        for candidate in &rec.candidates {
            let marker = if candidate.recommended { "+" } else { "-" };
            println!("  {} {:<15} {}", marker, candidate.strategy, candidate.rationale);
        }
    }
}

fn print_ledger(ledger: &ImputationLedger, quality: &QualityReport) {
    println!("\n{}", "=".repeat(80));
    println!("IMPUTATION COMPLETE");
    println!("{}", "=".repeat(80));
    println!(
        "Rows: {} -> {}  Filled: {}  Duration: {}ms",
        ledger.rows_before,
        ledger.rows_after,
        ledger.total_filled(),
        ledger.duration_ms
    );

    println!("\nLEDGER");
    println!("{}", "-".repeat(40));
    for entry in &ledger.entries {
        let applied = entry
            .applied
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        println!(
            "  {:<24} {:<15} -> {:<15} {:>5} filled, {:>5} left  ({})",
            truncate_str(&entry.column, 23),
            entry.requested,
            applied,
            entry.values_filled,
            entry.remaining_missing,
            entry.fill_summary
        );
    }

    println!("\nQUALITY");
    println!("{}", "-".repeat(40));
    println!("  Completeness: {:.3}", quality.completeness);
    if let Some(score) = quality.distribution_preservation_score {
        println!("  Distribution preservation: {:.3}", score);
    }
    if let Some(score) = quality.variance_preservation_score {
        println!("  Variance preservation: {:.3}", score);
    }
    println!("  Overall: {:.3}", quality.overall_score);
    for note in &quality.notes {
        println!("  note: {}", note);
    }

    print_warnings(ledger.warnings.iter().map(|w| w.to_string()));
    println!("\nUse --json for machine-readable output");
}

fn print_warnings(warnings: impl Iterator<Item = String>) {
    let warnings: Vec<String> = warnings.collect();
    if warnings.is_empty() {
        return;
    }
    println!("\nWarnings:");
    for warning in warnings {
        println!("  ! {}", warning);
    }
}

// =============================================================================
// CSV I/O
// =============================================================================

/// Load a CSV, retrying without quote handling when the first parse fails.
fn load_csv(path: &Path) -> Result<DataFrame> {
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("Failed to parse CSV {}", path.display()))
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}
