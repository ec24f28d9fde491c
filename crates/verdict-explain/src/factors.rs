//! Factor analysis.
//!
//! Factors are extracted from the decision's recorded reasoning through
//! the text service, which is asked for a JSON list. Output goes through a
//! strict parse, then a deterministic repair pass, and finally a synthetic
//! fallback derived from the decision itself. Synthetic factors are tagged
//! so callers can tell evidence from inference.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use verdict_types::{
    CollaborationRecord, Decision, DecisionFactor, DetailLevel, FactorAnalysis, FactorDirection,
    FactorSource,
};

use crate::textgen::{retry_with_backoff, TextGenerator};

/// Extract or synthesize weighted factors for a decision. Never fails:
/// extraction problems degrade to synthetic factors.
pub async fn analyze_factors(
    textgen: &Arc<dyn TextGenerator>,
    decision: &Decision,
    collaboration: Option<&CollaborationRecord>,
    detail_level: DetailLevel,
    max_tokens: u32,
    retry_attempts: u32,
    retry_base_delay: Duration,
) -> FactorAnalysis {
    let prompt = extraction_prompt(decision, collaboration);

    let extracted = match retry_with_backoff(retry_attempts, retry_base_delay, || {
        textgen.generate(&prompt, max_tokens)
    })
    .await
    {
        Ok(raw) => parse_factors(&raw).or_else(|| repair_and_parse(&raw)),
        Err(err) => {
            debug!(error = %err, "factor extraction failed, synthesizing");
            None
        }
    };

    match extracted {
        Some(factors) if !factors.is_empty() => FactorAnalysis {
            factors: normalize(factors, detail_level),
            source: FactorSource::Evidence,
        },
        _ => FactorAnalysis {
            factors: normalize(synthetic_factors(decision), detail_level),
            source: FactorSource::Synthetic,
        },
    }
}

fn extraction_prompt(decision: &Decision, collaboration: Option<&CollaborationRecord>) -> String {
    let mut reasoning = vec![decision.reasoning.clone()];
    if let Some(rec) = decision.sources.ensemble.as_ref() {
        reasoning.push(rec.reasoning.clone());
    }
    if let Some(rec) = decision.sources.policy.as_ref() {
        reasoning.push(rec.reasoning.clone());
    }
    if let Some(collab) = collaboration {
        for contribution in &collab.contributions {
            reasoning.push(contribution.reasoning.clone());
        }
    }

    format!(
        "Extract the weighted factors behind this decision as a JSON array of objects \
         with fields name, importance (0-1), direction (positive|negative), description.\n\
         Decision type: {}\nCommitted action: {}\nReasoning:\n{}",
        decision.decision_type,
        decision.action,
        reasoning.join("\n"),
    )
}

#[derive(Debug, Deserialize, Serialize)]
struct FactorEnvelope {
    name: String,
    importance: f64,
    direction: String,
    #[serde(default)]
    description: String,
}

fn envelope_to_factor(envelope: FactorEnvelope) -> DecisionFactor {
    let direction = if envelope.direction.eq_ignore_ascii_case("negative") {
        FactorDirection::Negative
    } else {
        FactorDirection::Positive
    };
    DecisionFactor {
        name: envelope.name,
        importance: envelope.importance.clamp(0.0, 1.0),
        direction,
        description: envelope.description,
    }
}

fn parse_factors(raw: &str) -> Option<Vec<DecisionFactor>> {
    let parsed: Vec<FactorEnvelope> = serde_json::from_str(raw).ok()?;
    Some(parsed.into_iter().map(envelope_to_factor).collect())
}

/// Deterministic repair for common model quoting mistakes before giving
/// up on the output.
fn repair_and_parse(raw: &str) -> Option<Vec<DecisionFactor>> {
    let mut candidates = Vec::new();

    if let Some(extracted) = extract_first_json_array(raw) {
        candidates.push(extracted.clone());
        candidates.push(extracted.replace('\'', "\""));
    }
    candidates.push(raw.replace('\'', "\""));

    for candidate in candidates {
        if let Ok(parsed) = serde_json::from_str::<Vec<FactorEnvelope>>(&candidate) {
            debug!("factor extraction parsed after repair");
            return Some(parsed.into_iter().map(envelope_to_factor).collect());
        }
    }

    None
}

fn extract_first_json_array(raw: &str) -> Option<String> {
    let start = raw.find('[')?;
    let mut depth = 0i32;
    let mut end = None;

    for (idx, ch) in raw[start..].char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + idx + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    end.map(|end_idx| raw[start..end_idx].to_string())
}

/// Plausible factors derived from the decision record alone, used when
/// extraction produced nothing.
fn synthetic_factors(decision: &Decision) -> Vec<DecisionFactor> {
    let mut factors = vec![
        DecisionFactor {
            name: format!("{} fit", decision.decision_type.to_lowercase()),
            importance: 1.0,
            direction: FactorDirection::Positive,
            description: format!(
                "The committed action {} matched the {} request",
                decision.action, decision.decision_type
            ),
        },
        DecisionFactor {
            name: "source confidence".to_string(),
            importance: decision.confidence.clamp(0.1, 1.0),
            direction: if decision.confidence >= 0.5 {
                FactorDirection::Positive
            } else {
                FactorDirection::Negative
            },
            description: format!(
                "The selected source reported {:.0}% confidence",
                decision.confidence * 100.0
            ),
        },
    ];

    // Numeric and boolean context values read as weak supporting signals.
    for (key, value) in decision.context.iter().take(4) {
        let weight = match value {
            Value::Number(_) => 0.5,
            Value::Bool(_) => 0.4,
            _ => continue,
        };
        factors.push(DecisionFactor {
            name: key.clone(),
            importance: weight,
            direction: FactorDirection::Positive,
            description: format!("Context field {} informed the decision", key),
        });
    }

    factors
}

/// Normalize importances to max = 1, sort descending, and cap the count
/// at `3 x detail_level`.
fn normalize(mut factors: Vec<DecisionFactor>, detail_level: DetailLevel) -> Vec<DecisionFactor> {
    factors.retain(|f| f.importance > 0.0);
    if factors.is_empty() {
        return factors;
    }

    let max = factors
        .iter()
        .map(|f| f.importance)
        .fold(f64::MIN, f64::max);
    if max > 0.0 {
        for factor in &mut factors {
            factor.importance /= max;
        }
    }

    factors.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    factors.truncate(detail_level.max_factors());
    factors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FailingTextGenerator, StaticTextGenerator};
    use serde_json::json;
    use verdict_types::{ContextMap, DecisionId, RecommendationSources, SelectedSource};

    fn decision() -> Decision {
        let mut context = ContextMap::new();
        context.insert("lead_score".into(), json!(82));
        Decision {
            id: DecisionId::generate(),
            decision_type: "LEAD_QUALIFICATION".into(),
            action: "qualify_lead".into(),
            confidence: 0.85,
            reasoning: "Score above threshold and recent engagement".into(),
            alternative_actions: vec!["disqualify_lead".into()],
            sources: RecommendationSources::default(),
            selected: SelectedSource::Ensemble,
            timestamp: chrono::Utc::now(),
            is_error_response: false,
            explanation_id: None,
            context,
        }
    }

    async fn analyze(textgen: Arc<dyn TextGenerator>, detail: u8) -> FactorAnalysis {
        analyze_factors(
            &textgen,
            &decision(),
            None,
            DetailLevel::new(detail),
            400,
            1,
            Duration::from_millis(1),
        )
        .await
    }

    #[tokio::test]
    async fn strict_json_is_extracted_as_evidence() {
        let raw = r#"[
            {"name": "lead score", "importance": 0.8, "direction": "positive", "description": "score 82"},
            {"name": "budget risk", "importance": 0.4, "direction": "negative"}
        ]"#;
        let analysis = analyze(Arc::new(StaticTextGenerator::new(raw)), 3).await;

        assert_eq!(analysis.source, FactorSource::Evidence);
        assert_eq!(analysis.factors.len(), 2);
        // Normalized: the top factor is exactly 1.0.
        assert_eq!(analysis.factors[0].importance, 1.0);
        assert_eq!(analysis.factors[0].name, "lead score");
        assert_eq!(analysis.factors[1].direction, FactorDirection::Negative);
        assert!((analysis.factors[1].importance - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn single_quoted_output_is_repaired() {
        let raw = "model says: [{'name': 'engagement', 'importance': 0.9, 'direction': 'positive'}] done";
        let analysis = analyze(Arc::new(StaticTextGenerator::new(raw)), 3).await;

        assert_eq!(analysis.source, FactorSource::Evidence);
        assert_eq!(analysis.factors.len(), 1);
        assert_eq!(analysis.factors[0].name, "engagement");
    }

    #[tokio::test]
    async fn unparsable_output_degrades_to_synthetic() {
        let analysis = analyze(Arc::new(StaticTextGenerator::new("<<<broken>>>")), 3).await;
        assert_eq!(analysis.source, FactorSource::Synthetic);
        assert!(!analysis.factors.is_empty());
        assert_eq!(analysis.factors[0].importance, 1.0);
    }

    #[tokio::test]
    async fn service_failure_degrades_to_synthetic() {
        let analysis = analyze(Arc::new(FailingTextGenerator::new()), 3).await;
        assert_eq!(analysis.source, FactorSource::Synthetic);
        assert!(!analysis.factors.is_empty());
    }

    #[tokio::test]
    async fn factor_count_is_capped_by_detail_level() {
        let mut entries = Vec::new();
        for i in 0..10 {
            entries.push(format!(
                r#"{{"name": "factor {}", "importance": 0.{}, "direction": "positive"}}"#,
                i,
                9 - i.min(8),
            ));
        }
        let raw = format!("[{}]", entries.join(","));
        let analysis = analyze(Arc::new(StaticTextGenerator::new(raw)), 1).await;

        assert_eq!(analysis.factors.len(), 3);
        // Sorted descending.
        assert!(analysis.factors[0].importance >= analysis.factors[1].importance);
        assert!(analysis.factors[1].importance >= analysis.factors[2].importance);
    }

    #[test]
    fn normalize_drops_zero_importance() {
        let factors = vec![
            DecisionFactor {
                name: "kept".into(),
                importance: 0.5,
                direction: FactorDirection::Positive,
                description: String::new(),
            },
            DecisionFactor {
                name: "dropped".into(),
                importance: 0.0,
                direction: FactorDirection::Positive,
                description: String::new(),
            },
        ];
        let normalized = normalize(factors, DetailLevel::default());
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].name, "kept");
        assert_eq!(normalized[0].importance, 1.0);
    }
}
