//! The decision arbiter.
//!
//! Runs both recommendation branches concurrently under a per-branch
//! timeout, then commits one action. When the policy engine is confident
//! enough it wins; otherwise the ensemble does. Both raw recommendations
//! are retained on the decision for audit regardless of which was chosen.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use verdict_types::{
    AgentRecommendation, Decision, DecisionId, DecisionRequest, EngineError, EngineResult,
    RecommendationSources, SelectedSource,
};

use crate::provider::{CollaborationOutcome, EnsembleCoordinator, EnsembleOutput, PolicyEngine};

/// Arbitration configuration.
///
/// The policy confidence threshold is deployment policy, not a constant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArbitrationConfig {
    /// Policy recommendations at or above this confidence win arbitration.
    pub policy_confidence_threshold: f64,
    /// Per-branch timeout; an elapsed branch counts as that branch failing.
    pub recommendation_timeout_ms: u64,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            policy_confidence_threshold: 0.8,
            recommendation_timeout_ms: 5_000,
        }
    }
}

/// A committed decision plus any collaboration metadata the ensemble
/// produced while reaching it.
#[derive(Clone, Debug)]
pub struct ArbitratedDecision {
    pub decision: Decision,
    pub collaboration: Option<CollaborationOutcome>,
}

/// Combines ensemble and policy recommendations into one decision.
pub struct DecisionArbiter {
    ensemble: Arc<dyn EnsembleCoordinator>,
    policy: Arc<dyn PolicyEngine>,
    config: ArbitrationConfig,
}

impl DecisionArbiter {
    pub fn new(
        ensemble: Arc<dyn EnsembleCoordinator>,
        policy: Arc<dyn PolicyEngine>,
        config: ArbitrationConfig,
    ) -> Self {
        Self {
            ensemble,
            policy,
            config,
        }
    }

    pub fn config(&self) -> &ArbitrationConfig {
        &self.config
    }

    /// Gather both recommendations concurrently and arbitrate.
    ///
    /// The only error surface is request validation; any upstream failure
    /// (error or timeout on either branch) degrades to the deterministic
    /// fallback decision.
    pub async fn decide(&self, request: &DecisionRequest) -> EngineResult<ArbitratedDecision> {
        if request.actions.is_empty() {
            return Err(EngineError::Validation(
                "decision request must offer at least one action".to_string(),
            ));
        }

        let timeout = Duration::from_millis(self.config.recommendation_timeout_ms);
        let (ensemble_branch, policy_branch) = tokio::join!(
            tokio::time::timeout(timeout, self.ensemble.recommend(request)),
            tokio::time::timeout(timeout, self.policy.recommend(request)),
        );

        let ensemble = flatten_branch(ensemble_branch, "ensemble");
        let policy = flatten_branch(policy_branch, "policy");

        match (ensemble, policy) {
            (Ok(ensemble_out), Ok(policy_rec)) => {
                Ok(self.combine(request, ensemble_out, policy_rec))
            }
            (ensemble, policy) => {
                // Availability over precision: commit the fallback action
                // and retain whatever did arrive for audit.
                let sources = RecommendationSources {
                    ensemble: ensemble.ok().map(|out| out.recommendation),
                    policy: policy.ok(),
                };
                Ok(ArbitratedDecision {
                    decision: self.fallback_decision(request, sources),
                    collaboration: None,
                })
            }
        }
    }

    /// Apply the confidence-threshold rule to two healthy recommendations.
    pub fn combine(
        &self,
        request: &DecisionRequest,
        ensemble: EnsembleOutput,
        policy: AgentRecommendation,
    ) -> ArbitratedDecision {
        let selected = if policy.confidence >= self.config.policy_confidence_threshold {
            SelectedSource::Policy
        } else {
            SelectedSource::Ensemble
        };

        let winner = match selected {
            SelectedSource::Policy => &policy,
            _ => &ensemble.recommendation,
        };

        debug!(
            decision_type = %request.decision_type,
            selected = ?selected,
            policy_confidence = policy.confidence,
            ensemble_confidence = ensemble.recommendation.confidence,
            "arbitrated recommendation sources"
        );

        let decision = Decision {
            id: DecisionId::generate(),
            decision_type: request.decision_type.clone(),
            action: winner.action.clone(),
            confidence: winner.confidence,
            reasoning: winner.reasoning.clone(),
            alternative_actions: winner.alternative_actions.clone(),
            sources: RecommendationSources {
                ensemble: Some(ensemble.recommendation.clone()),
                policy: Some(policy),
            },
            selected,
            timestamp: chrono::Utc::now(),
            is_error_response: false,
            explanation_id: None,
            context: request.context.clone(),
        };

        info!(
            decision = %decision.id,
            action = %decision.action,
            confidence = decision.confidence,
            "decision committed"
        );

        ArbitratedDecision {
            decision,
            collaboration: ensemble.collaboration,
        }
    }

    /// Deterministic degraded decision: the request's first action at 0.5
    /// confidence, flagged as an error response.
    fn fallback_decision(
        &self,
        request: &DecisionRequest,
        sources: RecommendationSources,
    ) -> Decision {
        warn!(
            decision_type = %request.decision_type,
            "recommendation sources unavailable, committing fallback decision"
        );

        let fallback_action = &request.actions[0];
        let alternatives = request
            .actions
            .iter()
            .skip(1)
            .map(|a| a.action.clone())
            .collect();

        Decision {
            id: DecisionId::generate(),
            decision_type: request.decision_type.clone(),
            action: fallback_action.action.clone(),
            confidence: 0.5,
            reasoning: "Recommendation sources were unavailable; committed the first requested \
                        action as a conservative default."
                .to_string(),
            alternative_actions: alternatives,
            sources,
            selected: SelectedSource::Fallback,
            timestamp: chrono::Utc::now(),
            is_error_response: true,
            explanation_id: None,
            context: request.context.clone(),
        }
    }
}

/// Collapse a timed-out or errored branch into a single error, logging
/// which source failed.
fn flatten_branch<T>(
    branch: Result<EngineResult<T>, tokio::time::error::Elapsed>,
    source: &str,
) -> EngineResult<T> {
    match branch {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            warn!(source, error = %err, "recommendation branch failed");
            Err(err)
        }
        Err(_) => {
            warn!(source, "recommendation branch timed out");
            Err(EngineError::Processing(format!(
                "{} recommendation timed out",
                source
            )))
        }
    }
}
