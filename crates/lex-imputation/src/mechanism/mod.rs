//! Missingness mechanism classification.
//!
//! Three independent sub-analyses feed one verdict:
//!
//! - [`mcar`]: a chi-square approximation over pattern frequencies
//! - [`mar`]: missing indicators against observed numeric columns
//! - [`mnar`]: heuristic indicators (missing share, name lexicon, boundary
//!   clustering)
//!
//! [`verdict::score_verdict`] turns the fired sub-analyses into a label with
//! confidence. It is an auditable heuristic, not a causal test.

pub mod mar;
pub mod mcar;
pub mod mnar;
pub mod verdict;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::patterns::IndicatorMatrix;
use crate::types::{
    DatasetProfile, EngineWarning, MarScan, Mechanism, MechanismVerdict, McarTest, MnarScan,
    PatternAnalysis,
};
use polars::prelude::*;
use tracing::{info, warn};

/// Output of the classifier: every sub-analysis plus the verdict.
#[derive(Debug, Clone)]
pub struct MechanismAnalysis {
    pub mcar: McarTest,
    pub mar: MarScan,
    pub mnar: MnarScan,
    pub verdict: MechanismVerdict,
    pub warnings: Vec<EngineWarning>,
}

pub struct MechanismClassifier<'a> {
    config: &'a EngineConfig,
}

impl<'a> MechanismClassifier<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn classify(
        &self,
        df: &DataFrame,
        profile: &DatasetProfile,
        matrix: &IndicatorMatrix,
        patterns: &PatternAnalysis,
    ) -> Result<MechanismAnalysis> {
        let mcar = mcar::mcar_test(patterns, matrix, self.config.mcar_alpha);
        let mar = mar::mar_scan(df, matrix, profile, self.config)?;
        let mnar = mnar::mnar_scan(df, profile, self.config)?;
        let verdict = verdict::score_verdict(&mcar, &mar, &mnar, &self.config.mechanism_weights);

        let mut warnings = Vec::new();
        if verdict.mechanism == Mechanism::Unknown {
            let reason = if patterns.is_complete {
                "dataset has no missing values".to_string()
            } else {
                "no sub-analysis produced supporting evidence".to_string()
            };
            warn!("Mechanism verdict is Unknown: {}", reason);
            warnings.push(EngineWarning::InsufficientEvidence { reason });
        } else {
            info!(
                "Mechanism verdict: {} (confidence {:.2})",
                verdict.mechanism, verdict.confidence
            );
        }

        Ok(MechanismAnalysis {
            mcar,
            mar,
            mnar,
            verdict,
            warnings,
        })
    }
}
