//! Decision trace reconstruction.
//!
//! Traces replay how a decision came to be, from the stored decision and
//! optional collaboration metadata. Steps without recorded timing get
//! linear estimates from a start anchor plus a fixed per-step offset.
//! Estimated times are ordering aids, not measured latency.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use verdict_types::{
    CollaborationRecord, Decision, DecisionTrace, DetailLevel, TraceStep, TraceStepKind,
};

/// Fixed spacing for estimated step timestamps.
const STEP_OFFSET_MS: i64 = 150;

/// Reconstruct the trace for a decision.
pub fn build_trace(
    decision: &Decision,
    collaboration: Option<&CollaborationRecord>,
    include_intermediate_steps: bool,
    detail_level: DetailLevel,
) -> DecisionTrace {
    let start = collaboration
        .map(|c| c.started_at)
        .unwrap_or_else(|| decision.timestamp - Duration::milliseconds(4 * STEP_OFFSET_MS));
    let detailed = detail_level.get() >= 3;

    let mut steps = Vec::new();
    let mut estimator = StepEstimator::new(start);

    steps.push(TraceStep {
        id: format!("{}-init", decision.id),
        kind: TraceStepKind::Initialization,
        description: format!("Received {} decision request", decision.decision_type),
        timestamp: estimator.next(None),
        details: None,
    });

    steps.push(TraceStep {
        id: format!("{}-context", decision.id),
        kind: TraceStepKind::ContextProcessing,
        description: format!(
            "Processed request context with {} fields",
            decision.context.len()
        ),
        timestamp: estimator.next(None),
        details: detailed.then(|| json!({ "context_fields": decision.context.len() })),
    });

    if include_intermediate_steps {
        if let Some(collab) = collaboration {
            let mut intermediate: Vec<TraceStep> = Vec::new();

            for (idx, contribution) in collab.contributions.iter().enumerate() {
                intermediate.push(TraceStep {
                    id: format!("{}-agent-{}", decision.id, idx),
                    kind: TraceStepKind::AgentContribution,
                    description: format!(
                        "Agent {} recommended {} at {:.0}% confidence",
                        contribution.agent_id,
                        contribution.action,
                        contribution.confidence * 100.0
                    ),
                    timestamp: estimator.next(contribution.at),
                    details: detailed.then(|| {
                        json!({
                            "agent_id": contribution.agent_id,
                            "action": contribution.action,
                            "confidence": contribution.confidence,
                            "reasoning": contribution.reasoning,
                        })
                    }),
                });
            }

            for (idx, conflict) in collab.conflicts.iter().enumerate() {
                intermediate.push(TraceStep {
                    id: format!("{}-conflict-{}", decision.id, idx),
                    kind: TraceStepKind::ConflictResolution,
                    description: conflict.description.clone(),
                    timestamp: estimator.next(conflict.at),
                    details: detailed.then(|| json!({ "resolution": conflict.resolution })),
                });
            }

            intermediate.sort_by_key(|step| step.timestamp);
            steps.extend(intermediate);
        }
    }

    steps.push(TraceStep {
        id: format!("{}-final", decision.id),
        kind: TraceStepKind::FinalDecision,
        description: format!(
            "Committed action {} at {:.0}% confidence",
            decision.action,
            decision.confidence * 100.0
        ),
        timestamp: decision.timestamp.max(estimator.next(None)),
        details: detailed.then(|| {
            json!({
                "action": decision.action,
                "confidence": decision.confidence,
                "selected": decision.selected,
                "is_error_response": decision.is_error_response,
            })
        }),
    });

    DecisionTrace {
        decision_id: decision.id.clone(),
        steps,
        generated_at: Utc::now(),
    }
}

/// Hands out real timestamps when available, linear estimates otherwise.
struct StepEstimator {
    cursor: DateTime<Utc>,
}

impl StepEstimator {
    fn new(start: DateTime<Utc>) -> Self {
        Self { cursor: start }
    }

    fn next(&mut self, real: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let at = real.unwrap_or(self.cursor);
        self.cursor = at + Duration::milliseconds(STEP_OFFSET_MS);
        at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_types::{
        AgentContribution, ConflictRecord, ContextMap, DecisionId, RecommendationSources,
        SelectedSource,
    };

    fn decision() -> Decision {
        Decision {
            id: DecisionId::generate(),
            decision_type: "LEAD_QUALIFICATION".into(),
            action: "qualify_lead".into(),
            confidence: 0.85,
            reasoning: "r".into(),
            alternative_actions: vec![],
            sources: RecommendationSources::default(),
            selected: SelectedSource::Ensemble,
            timestamp: Utc::now(),
            is_error_response: false,
            explanation_id: None,
            context: ContextMap::new(),
        }
    }

    fn collaboration(decision_id: DecisionId, with_times: bool) -> CollaborationRecord {
        let base = Utc::now() - Duration::seconds(2);
        CollaborationRecord {
            decision_id,
            started_at: base,
            contributions: vec![
                AgentContribution {
                    agent_id: "scorer".into(),
                    action: "qualify_lead".into(),
                    confidence: 0.9,
                    reasoning: "high score".into(),
                    at: with_times.then(|| base + Duration::milliseconds(300)),
                },
                AgentContribution {
                    agent_id: "router".into(),
                    action: "disqualify_lead".into(),
                    confidence: 0.4,
                    reasoning: "routing mismatch".into(),
                    at: with_times.then(|| base + Duration::milliseconds(600)),
                },
            ],
            conflicts: vec![ConflictRecord {
                description: "scorer and router disagreed on action".into(),
                resolution: "weighted vote favored scorer".into(),
                at: with_times.then(|| base + Duration::milliseconds(900)),
            }],
        }
    }

    #[test]
    fn minimal_trace_has_required_steps() {
        let d = decision();
        let trace = build_trace(&d, None, false, DetailLevel::default());

        let kinds: Vec<TraceStepKind> = trace.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TraceStepKind::Initialization,
                TraceStepKind::ContextProcessing,
                TraceStepKind::FinalDecision,
            ]
        );
    }

    #[test]
    fn intermediate_steps_require_flag_and_metadata() {
        let d = decision();
        let collab = collaboration(d.id.clone(), true);

        let without_flag = build_trace(&d, Some(&collab), false, DetailLevel::default());
        assert!(without_flag
            .steps_of(TraceStepKind::AgentContribution)
            .is_empty());

        let with_flag = build_trace(&d, Some(&collab), true, DetailLevel::default());
        assert_eq!(with_flag.steps_of(TraceStepKind::AgentContribution).len(), 2);
        assert_eq!(
            with_flag.steps_of(TraceStepKind::ConflictResolution).len(),
            1
        );
        assert_eq!(
            with_flag.steps.last().unwrap().kind,
            TraceStepKind::FinalDecision
        );
    }

    #[test]
    fn steps_are_chronological() {
        let d = decision();
        let collab = collaboration(d.id.clone(), true);
        let trace = build_trace(&d, Some(&collab), true, DetailLevel::default());

        for pair in trace.steps.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn missing_timing_is_estimated() {
        let d = decision();
        let collab = collaboration(d.id.clone(), false);
        let trace = build_trace(&d, Some(&collab), true, DetailLevel::default());

        // Still strictly ordered despite no recorded timing.
        for pair in trace.steps.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        assert_eq!(trace.steps_of(TraceStepKind::AgentContribution).len(), 2);
    }

    #[test]
    fn detail_level_gates_step_details() {
        let d = decision();
        let collab = collaboration(d.id.clone(), true);

        let terse = build_trace(&d, Some(&collab), true, DetailLevel::new(1));
        assert!(terse
            .steps_of(TraceStepKind::AgentContribution)
            .iter()
            .all(|s| s.details.is_none()));

        let detailed = build_trace(&d, Some(&collab), true, DetailLevel::new(4));
        assert!(detailed
            .steps_of(TraceStepKind::AgentContribution)
            .iter()
            .all(|s| s.details.is_some()));
    }
}
