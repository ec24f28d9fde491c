//! Confidence decomposition.
//!
//! Combines the decision's base confidence with the per-source
//! confidences retained under `sources` into summary statistics and a
//! discrete interpretation band.

use verdict_types::{ConfidenceAnalysis, ConfidenceBand, Decision};

/// Decompose confidence across the decision and its sources.
pub fn analyze_confidence(decision: &Decision) -> ConfidenceAnalysis {
    let mut values = vec![decision.confidence];
    if let Some(rec) = decision.sources.ensemble.as_ref() {
        values.push(rec.confidence);
    }
    if let Some(rec) = decision.sources.policy.as_ref() {
        values.push(rec.confidence);
    }

    let min = values.iter().copied().fold(f64::MAX, f64::min);
    let max = values.iter().copied().fold(f64::MIN, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    let std_deviation = variance.sqrt();

    ConfidenceAnalysis {
        base: decision.confidence,
        min,
        max,
        avg,
        std_deviation,
        consensus: (1.0 - std_deviation).clamp(0.0, 1.0),
        interpretation: ConfidenceBand::from_confidence(decision.confidence),
    }
}
