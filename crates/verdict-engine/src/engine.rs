//! The decision engine.
//!
//! Entry point for every external interface: decisions, outcomes, traces,
//! and boundary administration. Business failures never surface as raw
//! errors from the decision path; the caller always receives a decision,
//! possibly a blocked or fallback one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use verdict_arbiter::{
    DecisionArbiter, EnsembleCoordinator, OutcomeProcessor, OutcomeReport, PolicyEngine,
    RewardStrategy,
};
use verdict_explain::{ExplainabilityEngine, ExplanationRequest, TextGenerator, TraceRequest};
use verdict_safety::{
    BoundaryDecision, BoundaryEvaluator, EthicsProvider, ModerationProvider,
    SafetyBoundaryManager,
};
use verdict_store::{DecisionStore, VerdictStore, ViolationFilter};
use verdict_types::{
    Boundary, BoundaryId, CollaborationRecord, ContextMap, Decision, DecisionId, DecisionRequest,
    DecisionTrace, EngineError, EngineResult, Explanation, Outcome, RecommendationSources,
    SelectedSource, Violation,
};

use crate::config::EngineConfig;

/// Everything a decision call returns: the committed decision, the
/// boundary check that gated it, and the explanation when requested.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub decision: Decision,
    pub boundary: BoundaryDecision,
    pub explanation: Option<Explanation>,
}

/// The engine facade. Constructed once at process startup with injected
/// collaborators and passed by reference.
pub struct DecisionEngine {
    decisions: Arc<dyn DecisionStore>,
    safety: SafetyBoundaryManager,
    arbiter: DecisionArbiter,
    explainer: ExplainabilityEngine,
    outcomes: OutcomeProcessor,
}

impl DecisionEngine {
    pub fn new<S>(
        store: Arc<S>,
        ensemble: Arc<dyn EnsembleCoordinator>,
        policy: Arc<dyn PolicyEngine>,
        moderation: Arc<dyn ModerationProvider>,
        ethics: Arc<dyn EthicsProvider>,
        textgen: Arc<dyn TextGenerator>,
        reward: Arc<dyn RewardStrategy>,
        config: EngineConfig,
    ) -> Self
    where
        S: VerdictStore + 'static,
    {
        let evaluator =
            BoundaryEvaluator::new(store.clone(), store.clone(), moderation, ethics);
        let safety = SafetyBoundaryManager::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            evaluator,
            config.safety.clone(),
        );
        let arbiter = DecisionArbiter::new(ensemble, policy.clone(), config.arbitration.clone());
        let explainer = ExplainabilityEngine::new(
            store.clone(),
            store.clone(),
            textgen,
            config.explanation.clone(),
        );
        let outcomes = OutcomeProcessor::new(store.clone(), policy, reward);

        Self {
            decisions: store,
            safety,
            arbiter,
            explainer,
            outcomes,
        }
    }

    /// Load boundary configuration and start the change-feed apply task.
    pub async fn initialize(&self) -> EngineResult<()> {
        self.safety.initialize().await
    }

    /// Generate one committed decision.
    ///
    /// Errors only for invalid requests. Boundary denials and upstream
    /// recommendation failures still return a decision.
    pub async fn generate_decision(
        &self,
        request: DecisionRequest,
    ) -> EngineResult<DecisionResponse> {
        if request.decision_type.trim().is_empty() {
            return Err(EngineError::Validation(
                "decision request requires a decision_type".to_string(),
            ));
        }
        if request.actions.is_empty() {
            return Err(EngineError::Validation(
                "decision request must offer at least one action".to_string(),
            ));
        }

        let boundary = self
            .safety
            .check_boundaries(&request.decision_type, &request.context)
            .await;

        if !boundary.allowed {
            let decision = self.blocked_decision(&request, &boundary.violations);
            if let Err(err) = self.decisions.put_decision(decision.clone()).await {
                warn!(error = %err, "failed to persist blocked decision");
            }
            info!(
                decision = %decision.id,
                decision_type = %request.decision_type,
                violations = boundary.violations.len(),
                "decision blocked by safety boundaries"
            );
            return Ok(DecisionResponse {
                decision,
                boundary,
                explanation: None,
            });
        }

        // Count the operation for rate accounting now that it proceeds.
        if let Err(err) = self.safety.record_operation(&request.decision_type).await {
            warn!(error = %err, "failed to record operation for rate accounting");
        }

        let arbitrated = self.arbiter.decide(&request).await?;
        let decision = arbitrated.decision;

        let persisted = match self.decisions.put_decision(decision.clone()).await {
            Ok(()) => true,
            Err(err) => {
                warn!(decision = %decision.id, error = %err, "failed to persist decision");
                false
            }
        };

        if let Some(collaboration) = arbitrated.collaboration {
            let record = CollaborationRecord {
                decision_id: decision.id.clone(),
                started_at: collaboration.started_at,
                contributions: collaboration.contributions,
                conflicts: collaboration.conflicts,
            };
            if let Err(err) = self.decisions.put_collaboration(record).await {
                warn!(decision = %decision.id, error = %err, "failed to persist collaboration metadata");
            }
        }

        // Explanation is best-effort and needs the stored decision.
        let explanation = if request.explainable && persisted {
            let explain_request = ExplanationRequest::new(decision.id.clone())
                .audience(request.audience)
                .counterfactuals(request.include_counterfactuals);
            match self.explainer.explain(&explain_request).await {
                Ok(explanation) => Some(explanation),
                Err(err) => {
                    warn!(decision = %decision.id, error = %err, "explanation generation failed");
                    None
                }
            }
        } else {
            None
        };

        Ok(DecisionResponse {
            decision,
            boundary,
            explanation,
        })
    }

    /// Feed an observed outcome back into the policy engine.
    pub async fn update_policy_from_outcome(&self, outcome: &Outcome) -> OutcomeReport {
        self.outcomes.apply(outcome).await
    }

    /// Generate an explanation for an existing decision.
    pub async fn explain_decision(
        &self,
        request: &ExplanationRequest,
    ) -> EngineResult<Explanation> {
        self.explainer.explain(request).await
    }

    /// Reconstruct the trace for an existing decision.
    pub async fn generate_decision_trace(
        &self,
        decision_id: DecisionId,
        include_intermediate_steps: bool,
        detail_level: u8,
    ) -> EngineResult<DecisionTrace> {
        self.explainer
            .trace(
                &TraceRequest::new(decision_id)
                    .intermediate_steps(include_intermediate_steps)
                    .detail_level(detail_level),
            )
            .await
    }

    /// Check an operation against the configured boundaries without
    /// generating a decision.
    pub async fn check_boundaries(
        &self,
        operation_type: &str,
        context: &ContextMap,
    ) -> BoundaryDecision {
        self.safety.check_boundaries(operation_type, context).await
    }

    pub async fn create_boundary(
        &self,
        boundary: Boundary,
        actor: &str,
    ) -> EngineResult<Boundary> {
        self.safety.create_boundary(boundary, actor).await
    }

    pub async fn update_boundary(
        &self,
        boundary: Boundary,
        actor: &str,
    ) -> EngineResult<Boundary> {
        self.safety.update_boundary(boundary, actor).await
    }

    pub async fn delete_boundary(&self, id: &BoundaryId, actor: &str) -> EngineResult<()> {
        self.safety.delete_boundary(id, actor).await
    }

    pub async fn recent_violations(
        &self,
        filter: &ViolationFilter,
        limit: usize,
    ) -> EngineResult<Vec<Violation>> {
        self.safety.recent_violations(filter, limit).await
    }

    /// The safety manager, for metrics and cached-violation inspection.
    pub fn safety(&self) -> &SafetyBoundaryManager {
        &self.safety
    }

    /// Denied operations still produce a first-class decision record.
    fn blocked_decision(&self, request: &DecisionRequest, violations: &[Violation]) -> Decision {
        let messages = violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        Decision {
            id: DecisionId::generate(),
            decision_type: request.decision_type.clone(),
            action: "blocked".to_string(),
            confidence: 1.0,
            reasoning: format!("Operation blocked by safety boundaries: {}", messages),
            alternative_actions: request.actions.iter().map(|a| a.action.clone()).collect(),
            sources: RecommendationSources::default(),
            selected: SelectedSource::Fallback,
            timestamp: chrono::Utc::now(),
            is_error_response: true,
            explanation_id: None,
            context: request.context.clone(),
        }
    }
}
