//! Narrative generation.
//!
//! The explanation text is produced by the text service from a prompt
//! tailored to the audience and detail level. When generation fails the
//! narrative degrades to a deterministic template, tagged so callers can
//! distinguish it from generated text.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use verdict_types::{
    AudienceType, ConfidenceAnalysis, Counterfactual, CounterfactualAnalysis, Decision,
    DecisionFactor, DetailLevel, FactorAnalysis, FactorDirection, NarrativeSource,
};

use crate::textgen::{retry_with_backoff, TextGenerator};

/// Generate the audience-tailored narrative, degrading to a template on
/// failure.
pub async fn generate_narrative(
    textgen: &Arc<dyn TextGenerator>,
    decision: &Decision,
    factors: &FactorAnalysis,
    confidence: &ConfidenceAnalysis,
    audience: AudienceType,
    detail_level: DetailLevel,
    max_tokens: u32,
    retry_attempts: u32,
    retry_base_delay: Duration,
) -> (String, NarrativeSource) {
    let prompt = narrative_prompt(decision, factors, confidence, audience, detail_level);

    match retry_with_backoff(retry_attempts, retry_base_delay, || {
        textgen.generate(&prompt, max_tokens)
    })
    .await
    {
        Ok(text) if !text.trim().is_empty() => (text, NarrativeSource::Generated),
        Ok(_) => {
            debug!("text service returned empty narrative, using template");
            (
                fallback_text(decision, confidence, detail_level),
                NarrativeSource::Fallback,
            )
        }
        Err(err) => {
            debug!(error = %err, "narrative generation failed, using template");
            (
                fallback_text(decision, confidence, detail_level),
                NarrativeSource::Fallback,
            )
        }
    }
}

/// Audience-specific tone instructions. A closed match, so adding an
/// audience is a compile-time event.
fn audience_instructions(audience: AudienceType) -> &'static str {
    match audience {
        AudienceType::Technical => {
            "Write for engineers: precise terminology, reference the confidence statistics \
             and factor weights directly."
        }
        AudienceType::Business => {
            "Write for business stakeholders: focus on outcomes and trade-offs, light on \
             internals, no statistical jargon."
        }
        AudienceType::Executive => {
            "Write for executives: one clear takeaway first, then the minimum supporting \
             context. Short sentences."
        }
        AudienceType::Regulatory => {
            "Write for a regulator: neutral tone, traceable reasoning, name every factor \
             that influenced the decision and its direction."
        }
        AudienceType::Customer => {
            "Write for the affected customer: plain language, no internal terminology, \
             explain what was decided and why it is reasonable."
        }
    }
}

fn detail_instructions(detail_level: DetailLevel) -> &'static str {
    match detail_level.get() {
        1 => "Answer in exactly one sentence.",
        2 => "Answer in two or three sentences.",
        3 => "Answer in one short paragraph.",
        4 => "Answer in two paragraphs covering factors and confidence.",
        _ => "Answer comprehensively in multiple paragraphs covering factors, confidence, \
              and alternatives considered.",
    }
}

fn narrative_prompt(
    decision: &Decision,
    factors: &FactorAnalysis,
    confidence: &ConfidenceAnalysis,
    audience: AudienceType,
    detail_level: DetailLevel,
) -> String {
    let factor_lines = factors
        .factors
        .iter()
        .map(|f| {
            format!(
                "- {} ({}, weight {:.2}): {}",
                f.name,
                match f.direction {
                    FactorDirection::Positive => "supporting",
                    FactorDirection::Negative => "opposing",
                },
                f.importance,
                f.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Explain the following decision.\n{}\n{}\n\
         Decision type: {}\nCommitted action: {}\n\
         Confidence: {:.2} ({}), consensus {:.2}\nFactors:\n{}",
        audience_instructions(audience),
        detail_instructions(detail_level),
        decision.decision_type,
        decision.action,
        confidence.base,
        confidence.interpretation.label(),
        confidence.consensus,
        factor_lines,
    )
}

/// Deterministic templated narrative for the degraded path.
pub fn fallback_text(
    decision: &Decision,
    confidence: &ConfidenceAnalysis,
    detail_level: DetailLevel,
) -> String {
    let summary = format!(
        "The action \"{}\" was committed for this {} decision with {} confidence ({:.0}%).",
        decision.action,
        decision.decision_type,
        confidence.interpretation.label().to_lowercase(),
        confidence.base * 100.0
    );

    if detail_level.get() <= 2 {
        return summary;
    }

    let mut text = summary;
    if !decision.reasoning.is_empty() {
        text.push_str(&format!(" Recorded reasoning: {}", decision.reasoning));
    }
    if !decision.alternative_actions.is_empty() {
        text.push_str(&format!(
            " Alternatives considered: {}.",
            decision.alternative_actions.join(", ")
        ));
    }
    text
}

/// Describe which input changes would flip the decision to each
/// alternative action. Deterministic: derived from the retained factors,
/// not from the text service.
pub fn build_counterfactuals(
    decision: &Decision,
    factors: &FactorAnalysis,
) -> CounterfactualAnalysis {
    let top_factors: Vec<&DecisionFactor> = factors.factors.iter().take(3).collect();

    let scenarios = decision
        .alternative_actions
        .iter()
        .take(3)
        .map(|alternative| {
            let required_changes = if top_factors.is_empty() {
                vec!["A materially different request context".to_string()]
            } else {
                top_factors
                    .iter()
                    .map(|f| match f.direction {
                        FactorDirection::Positive => {
                            format!("{} would need to weaken substantially", f.name)
                        }
                        FactorDirection::Negative => {
                            format!("{} would need to dominate the decision", f.name)
                        }
                    })
                    .collect()
            };

            Counterfactual {
                alternative_action: alternative.clone(),
                description: format!(
                    "\"{}\" would have been committed instead of \"{}\" if the leading \
                     factors had pointed the other way.",
                    alternative, decision.action
                ),
                required_changes,
            }
        })
        .collect();

    CounterfactualAnalysis { scenarios }
}
