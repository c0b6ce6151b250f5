//! Evidence to verdict scoring.
//!
//! Each sub-analysis that fires contributes its fixed weight to its
//! mechanism. The highest score wins (ties resolve MCAR, MAR, MNAR in that
//! order) and confidence is the winner's share of all fired weight. With no
//! fired analysis the verdict is `Unknown`.

use crate::config::MechanismWeights;
use crate::types::{
    Mechanism, MechanismScores, MechanismVerdict, MarScan, McarStatus, McarTest, MnarScan,
};

pub fn score_verdict(
    mcar: &McarTest,
    mar: &MarScan,
    mnar: &MnarScan,
    weights: &MechanismWeights,
) -> MechanismVerdict {
    let mut evidence = Vec::new();

    match mcar.status {
        McarStatus::Tested => evidence.push(format!("MCAR approximation: {}", mcar.note)),
        McarStatus::InsufficientPatterns => {
            evidence.push(format!("MCAR approximation skipped: {}", mcar.note))
        }
        McarStatus::NotApplicable => evidence.push("no missing values".to_string()),
    }
    for rel in &mar.relationships {
        evidence.push(format!(
            "missingness of '{}' correlates with '{}' (r = {:.3}, {:?})",
            rel.missing_column, rel.observed_column, rel.correlation, rel.strength
        ));
    }
    for indicator in &mnar.indicators {
        evidence.push(format!(
            "'{}' {}: {}",
            indicator.column, indicator.kind, indicator.detail
        ));
    }

    let scores = MechanismScores {
        mcar: if mcar.mcar_likely { weights.mcar } else { 0.0 },
        mar: if mar.mar_likely { weights.mar } else { 0.0 },
        mnar: if mnar.mnar_likely { weights.mnar } else { 0.0 },
    };

    let total = scores.total();
    if total <= 0.0 {
        let mut verdict = MechanismVerdict::unknown(evidence);
        verdict.scores = scores;
        return verdict;
    }

    let ranked = [
        (Mechanism::Mcar, scores.mcar),
        (Mechanism::Mar, scores.mar),
        (Mechanism::Mnar, scores.mnar),
    ];
    let (mechanism, best) = ranked
        .iter()
        .copied()
        .fold((Mechanism::Unknown, 0.0), |(m, s), (candidate, score)| {
            if score > s { (candidate, score) } else { (m, s) }
        });

    MechanismVerdict {
        mechanism,
        confidence: best / total,
        scores,
        supporting_evidence: evidence,
    }
}
