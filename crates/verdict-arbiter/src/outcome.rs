//! Outcome processing: reward computation and policy updates.
//!
//! Observing an outcome never mutates the original decision. The reward is
//! computed first, then forwarded to the policy engine in one step; a
//! failure anywhere surfaces as a structured report, never a raw error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use verdict_store::DecisionStore;
use verdict_types::{Decision, EngineError, EngineResult, Outcome};

use crate::provider::PolicyEngine;

/// Result of applying an outcome to the policy engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub success: bool,
    pub message: String,
    pub reward: Option<f64>,
}

/// Pluggable reward computation.
///
/// The formula is deployment policy. The shipped default only reads
/// explicit outcome fields; anything richer belongs to the deployment.
pub trait RewardStrategy: Send + Sync {
    fn compute(&self, decision: &Decision, outcome: &Outcome) -> EngineResult<f64>;
}

/// Default strategy over explicit `success` and `value` outcome fields.
///
/// `reward = (+/- success_weight) + value * value_weight`, with `success`
/// required and `value` optional.
#[derive(Clone, Debug)]
pub struct WeightedOutcomeReward {
    pub success_weight: f64,
    pub value_weight: f64,
}

impl Default for WeightedOutcomeReward {
    fn default() -> Self {
        Self {
            success_weight: 1.0,
            value_weight: 0.0,
        }
    }
}

impl RewardStrategy for WeightedOutcomeReward {
    fn compute(&self, _decision: &Decision, outcome: &Outcome) -> EngineResult<f64> {
        let success = outcome
            .observed
            .get("success")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| {
                EngineError::Validation(
                    "outcome must record a boolean success field".to_string(),
                )
            })?;

        let value = outcome
            .observed
            .get("value")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        let base = if success {
            self.success_weight
        } else {
            -self.success_weight
        };
        Ok(base + value * self.value_weight)
    }
}

/// Applies observed outcomes: load decision, compute reward, update policy.
pub struct OutcomeProcessor {
    decisions: Arc<dyn DecisionStore>,
    policy: Arc<dyn PolicyEngine>,
    reward: Arc<dyn RewardStrategy>,
}

impl OutcomeProcessor {
    pub fn new(
        decisions: Arc<dyn DecisionStore>,
        policy: Arc<dyn PolicyEngine>,
        reward: Arc<dyn RewardStrategy>,
    ) -> Self {
        Self {
            decisions,
            policy,
            reward,
        }
    }

    /// Apply one outcome. Failures are reported, not thrown.
    pub async fn apply(&self, outcome: &Outcome) -> OutcomeReport {
        match self.try_apply(outcome).await {
            Ok(reward) => {
                info!(
                    decision = %outcome.decision_id,
                    reward,
                    "policy updated from outcome"
                );
                OutcomeReport {
                    success: true,
                    message: "policy updated".to_string(),
                    reward: Some(reward),
                }
            }
            Err(err) => {
                warn!(
                    decision = %outcome.decision_id,
                    error = %err,
                    "policy update from outcome failed"
                );
                OutcomeReport {
                    success: false,
                    message: err.to_string(),
                    reward: None,
                }
            }
        }
    }

    /// Compute-then-write: the reward exists before the policy engine is
    /// touched, and no partial state is left behind on failure.
    async fn try_apply(&self, outcome: &Outcome) -> EngineResult<f64> {
        let decision = self
            .decisions
            .get_decision(&outcome.decision_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("decision {} not found", outcome.decision_id))
            })?;

        let reward = self.reward.compute(&decision, outcome)?;
        self.policy.apply_reward(&decision, reward).await?;
        Ok(reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockPolicyEngine;
    use serde_json::json;
    use verdict_types::{
        AgentRecommendation, ContextMap, DecisionId, RecommendationSources, SelectedSource,
    };
    use verdict_store::InMemoryStore;

    fn stored_decision(store: &InMemoryStore) -> Decision {
        Decision {
            id: DecisionId::generate(),
            decision_type: "LEAD_QUALIFICATION".into(),
            action: "qualify_lead".into(),
            confidence: 0.9,
            reasoning: "strong signals".into(),
            alternative_actions: vec![],
            sources: RecommendationSources {
                ensemble: Some(AgentRecommendation::new("qualify_lead", 0.9, "e")),
                policy: Some(AgentRecommendation::new("qualify_lead", 0.85, "p")),
            },
            selected: SelectedSource::Ensemble,
            timestamp: chrono::Utc::now(),
            is_error_response: false,
            explanation_id: None,
            context: ContextMap::new(),
        }
    }

    #[tokio::test]
    async fn outcome_updates_policy_with_reward() {
        let store = Arc::new(InMemoryStore::new());
        let decision = stored_decision(&store);
        store.put_decision(decision.clone()).await.unwrap();

        let policy = Arc::new(MockPolicyEngine::fixed(AgentRecommendation::new(
            "x", 0.5, "r",
        )));
        let processor = OutcomeProcessor::new(
            store,
            policy.clone(),
            Arc::new(WeightedOutcomeReward::default()),
        );

        let outcome = Outcome::new(decision.id.clone()).with_value("success", json!(true));
        let report = processor.apply(&outcome).await;

        assert!(report.success);
        assert_eq!(report.reward, Some(1.0));
        assert_eq!(policy.rewards(), vec![1.0]);
    }

    #[tokio::test]
    async fn value_weight_shapes_reward() {
        let store = Arc::new(InMemoryStore::new());
        let decision = stored_decision(&store);
        store.put_decision(decision.clone()).await.unwrap();

        let processor = OutcomeProcessor::new(
            store,
            Arc::new(MockPolicyEngine::fixed(AgentRecommendation::new(
                "x", 0.5, "r",
            ))),
            Arc::new(WeightedOutcomeReward {
                success_weight: 1.0,
                value_weight: 0.1,
            }),
        );

        let outcome = Outcome::new(decision.id.clone())
            .with_value("success", json!(false))
            .with_value("value", json!(20.0));
        let report = processor.apply(&outcome).await;
        assert!(report.success);
        assert_eq!(report.reward, Some(1.0));
    }

    #[tokio::test]
    async fn missing_decision_reports_failure() {
        let store = Arc::new(InMemoryStore::new());
        let processor = OutcomeProcessor::new(
            store,
            Arc::new(MockPolicyEngine::fixed(AgentRecommendation::new(
                "x", 0.5, "r",
            ))),
            Arc::new(WeightedOutcomeReward::default()),
        );

        let outcome =
            Outcome::new(DecisionId::generate()).with_value("success", json!(true));
        let report = processor.apply(&outcome).await;
        assert!(!report.success);
        assert!(report.reward.is_none());
        assert!(report.message.contains("not found"));
    }

    #[tokio::test]
    async fn policy_update_failure_is_reported_not_thrown() {
        let store = Arc::new(InMemoryStore::new());
        let decision = stored_decision(&store);
        store.put_decision(decision.clone()).await.unwrap();

        let processor = OutcomeProcessor::new(
            store,
            Arc::new(MockPolicyEngine::failing()),
            Arc::new(WeightedOutcomeReward::default()),
        );

        let outcome = Outcome::new(decision.id.clone()).with_value("success", json!(true));
        let report = processor.apply(&outcome).await;
        assert!(!report.success);
    }

    #[tokio::test]
    async fn malformed_outcome_is_reported() {
        let store = Arc::new(InMemoryStore::new());
        let decision = stored_decision(&store);
        store.put_decision(decision.clone()).await.unwrap();

        let processor = OutcomeProcessor::new(
            store,
            Arc::new(MockPolicyEngine::fixed(AgentRecommendation::new(
                "x", 0.5, "r",
            ))),
            Arc::new(WeightedOutcomeReward::default()),
        );

        let report = processor.apply(&Outcome::new(decision.id.clone())).await;
        assert!(!report.success);
        assert!(report.message.contains("success"));
    }
}
