//! Explainability engine.
//!
//! Orchestrates the full explanation pipeline: cache lookup, decision
//! load, factor analysis, confidence decomposition, narrative generation,
//! optional counterfactuals, visual descriptors, then cache + persist +
//! link. Also reconstructs decision traces.
//!
//! Cache entries live for the process lifetime; there is no TTL. Writes
//! are idempotent (one key maps to one value), so concurrent callers can
//! race without harm. A policy update after the fact does not invalidate
//! an already-generated explanation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use verdict_types::{
    AudienceType, ConfidenceAnalysis, Decision, DecisionId, DecisionTrace, DetailLevel,
    EngineError, EngineResult, Explanation, ExplanationFormat, ExplanationId, ExplanationKey,
    FactorAnalysis, VisualElement, VisualElementKind,
};
use verdict_store::{DecisionStore, ExplanationStore};

use crate::confidence::analyze_confidence;
use crate::factors::analyze_factors;
use crate::narrative::{build_counterfactuals, generate_narrative};
use crate::textgen::{retry_with_backoff, TextGenerator};
use crate::trace::build_trace;

/// Explanation generation configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExplanationConfig {
    pub max_tokens: u32,
    /// Bounded retry for text-service and store reads.
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 800,
            retry_attempts: 3,
            retry_base_delay_ms: 50,
        }
    }
}

/// Parameters for one explanation request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExplanationRequest {
    pub decision_id: DecisionId,
    pub audience: AudienceType,
    pub include_counterfactuals: bool,
    pub detail_level: DetailLevel,
    pub format: ExplanationFormat,
}

impl ExplanationRequest {
    pub fn new(decision_id: DecisionId) -> Self {
        Self {
            decision_id,
            audience: AudienceType::default(),
            include_counterfactuals: false,
            detail_level: DetailLevel::default(),
            format: ExplanationFormat::default(),
        }
    }

    pub fn audience(mut self, audience: AudienceType) -> Self {
        self.audience = audience;
        self
    }

    pub fn counterfactuals(mut self, include: bool) -> Self {
        self.include_counterfactuals = include;
        self
    }

    pub fn detail_level(mut self, level: u8) -> Self {
        self.detail_level = DetailLevel::new(level);
        self
    }

    fn key(&self) -> ExplanationKey {
        ExplanationKey {
            decision_id: self.decision_id.clone(),
            audience: self.audience,
            include_counterfactuals: self.include_counterfactuals,
            detail_level: self.detail_level,
            format: self.format,
        }
    }
}

/// Parameters for one trace request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceRequest {
    pub decision_id: DecisionId,
    pub include_intermediate_steps: bool,
    pub detail_level: DetailLevel,
}

impl TraceRequest {
    pub fn new(decision_id: DecisionId) -> Self {
        Self {
            decision_id,
            include_intermediate_steps: false,
            detail_level: DetailLevel::default(),
        }
    }

    pub fn intermediate_steps(mut self, include: bool) -> Self {
        self.include_intermediate_steps = include;
        self
    }

    pub fn detail_level(mut self, level: u8) -> Self {
        self.detail_level = DetailLevel::new(level);
        self
    }
}

/// Generates explanations and traces for committed decisions.
pub struct ExplainabilityEngine {
    decisions: Arc<dyn DecisionStore>,
    explanations: Arc<dyn ExplanationStore>,
    textgen: Arc<dyn TextGenerator>,
    cache: RwLock<HashMap<ExplanationKey, Explanation>>,
    config: ExplanationConfig,
}

impl ExplainabilityEngine {
    pub fn new(
        decisions: Arc<dyn DecisionStore>,
        explanations: Arc<dyn ExplanationStore>,
        textgen: Arc<dyn TextGenerator>,
        config: ExplanationConfig,
    ) -> Self {
        Self {
            decisions,
            explanations,
            textgen,
            cache: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Generate (or return the cached) explanation for a decision.
    ///
    /// Fails only for bad input or a missing decision; degraded analysis
    /// steps fall back instead of erroring.
    pub async fn explain(&self, request: &ExplanationRequest) -> EngineResult<Explanation> {
        let key = request.key();

        if let Some(cached) = self.cache_get(&key) {
            debug!(decision = %request.decision_id, "explanation cache hit");
            return Ok(cached);
        }
        if let Some(stored) = self.explanations.get_explanation(&key).await? {
            self.cache_put(key, stored.clone());
            return Ok(stored);
        }

        let retry_delay = Duration::from_millis(self.config.retry_base_delay_ms);
        let decision = retry_with_backoff(self.config.retry_attempts, retry_delay, || async move {
            Ok(self.decisions.get_decision(&request.decision_id).await?)
        })
        .await?
        .ok_or_else(|| {
            EngineError::NotFound(format!("decision {} not found", request.decision_id))
        })?;

        // Collaboration metadata is an enrichment; its absence or a read
        // failure never blocks the explanation.
        let collaboration = self
            .decisions
            .get_collaboration(&request.decision_id)
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "collaboration metadata unavailable");
                None
            });

        let factor_analysis = analyze_factors(
            &self.textgen,
            &decision,
            collaboration.as_ref(),
            request.detail_level,
            self.config.max_tokens,
            self.config.retry_attempts,
            retry_delay,
        )
        .await;

        let confidence_analysis = analyze_confidence(&decision);

        let (text, text_source) = generate_narrative(
            &self.textgen,
            &decision,
            &factor_analysis,
            &confidence_analysis,
            request.audience,
            request.detail_level,
            self.config.max_tokens,
            self.config.retry_attempts,
            retry_delay,
        )
        .await;

        let counterfactuals = request
            .include_counterfactuals
            .then(|| build_counterfactuals(&decision, &factor_analysis));

        let visuals = build_visuals(
            &decision,
            &factor_analysis,
            &confidence_analysis,
            request.detail_level,
        );

        let explanation = Explanation {
            id: ExplanationId::generate(),
            decision_id: decision.id.clone(),
            audience: request.audience,
            detail_level: request.detail_level,
            factor_analysis,
            confidence_analysis,
            text,
            text_source,
            counterfactuals,
            visuals,
            generated_at: chrono::Utc::now(),
        };

        self.cache_put(key.clone(), explanation.clone());

        // Persist and link, best effort: a storage hiccup here should not
        // cost the caller an explanation that already exists.
        if let Err(err) = self
            .explanations
            .put_explanation(key, explanation.clone())
            .await
        {
            warn!(error = %err, "failed to persist explanation");
        }
        if let Err(err) = self
            .decisions
            .link_explanation(&decision.id, explanation.id.clone())
            .await
        {
            warn!(error = %err, "failed to link explanation to decision");
        }

        info!(
            decision = %decision.id,
            explanation = %explanation.id,
            audience = request.audience.as_str(),
            "explanation generated"
        );
        Ok(explanation)
    }

    /// Reconstruct the decision trace.
    pub async fn trace(&self, request: &TraceRequest) -> EngineResult<DecisionTrace> {
        let decision = self
            .decisions
            .get_decision(&request.decision_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("decision {} not found", request.decision_id))
            })?;

        let collaboration = self
            .decisions
            .get_collaboration(&request.decision_id)
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "collaboration metadata unavailable");
                None
            });

        Ok(build_trace(
            &decision,
            collaboration.as_ref(),
            request.include_intermediate_steps,
            request.detail_level,
        ))
    }

    fn cache_get(&self, key: &ExplanationKey) -> Option<Explanation> {
        self.cache.read().ok()?.get(key).cloned()
    }

    fn cache_put(&self, key: ExplanationKey, explanation: Explanation) {
        if let Ok(mut guard) = self.cache.write() {
            // Idempotent: first writer wins, concurrent writers would have
            // produced the same value for the same key anyway.
            guard.entry(key).or_insert(explanation);
        }
    }
}

/// Structured visual descriptors; renderers decide what to draw.
fn build_visuals(
    decision: &Decision,
    factors: &FactorAnalysis,
    confidence: &ConfidenceAnalysis,
    detail_level: DetailLevel,
) -> Vec<VisualElement> {
    let mut visuals = vec![
        VisualElement {
            kind: VisualElementKind::FactorChart,
            title: "Factor importance".to_string(),
            data: json!({
                "factors": factors
                    .factors
                    .iter()
                    .map(|f| json!({
                        "name": f.name,
                        "importance": f.importance,
                        "direction": f.direction,
                    }))
                    .collect::<Vec<_>>(),
                "source": factors.source,
            }),
        },
        VisualElement {
            kind: VisualElementKind::ConfidenceGauge,
            title: "Decision confidence".to_string(),
            data: json!({
                "value": confidence.base,
                "min": confidence.min,
                "max": confidence.max,
                "consensus": confidence.consensus,
                "interpretation": confidence.interpretation,
            }),
        },
    ];

    if detail_level.get() >= 4 {
        visuals.push(VisualElement {
            kind: VisualElementKind::DecisionTree,
            title: "Considered actions".to_string(),
            data: json!({
                "committed": decision.action,
                "alternatives": decision.alternative_actions,
            }),
        });
    }

    visuals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{FailingTextGenerator, ScriptedTextGenerator, StaticTextGenerator};
    use verdict_types::{
        AgentRecommendation, ContextMap, FactorSource, NarrativeSource, RecommendationSources,
        SelectedSource,
    };
    use verdict_store::InMemoryStore;

    fn decision() -> Decision {
        Decision {
            id: DecisionId::generate(),
            decision_type: "LEAD_QUALIFICATION".into(),
            action: "qualify_lead".into(),
            confidence: 0.85,
            reasoning: "score above threshold".into(),
            alternative_actions: vec!["disqualify_lead".into()],
            sources: RecommendationSources {
                ensemble: Some(AgentRecommendation::new("qualify_lead", 0.85, "strong fit")),
                policy: Some(AgentRecommendation::new("qualify_lead", 0.7, "historical")),
            },
            selected: SelectedSource::Ensemble,
            timestamp: chrono::Utc::now(),
            is_error_response: false,
            explanation_id: None,
            context: ContextMap::new(),
        }
    }

    async fn engine_with(
        store: Arc<InMemoryStore>,
        textgen: Arc<dyn TextGenerator>,
    ) -> ExplainabilityEngine {
        ExplainabilityEngine::new(
            store.clone(),
            store,
            textgen,
            ExplanationConfig {
                retry_base_delay_ms: 1,
                ..ExplanationConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn missing_decision_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine_with(store, Arc::new(StaticTextGenerator::new("text"))).await;

        let result = engine
            .explain(&ExplanationRequest::new(DecisionId::generate()))
            .await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn repeated_requests_return_identical_cached_output() {
        let store = Arc::new(InMemoryStore::new());
        let d = decision();
        store.put_decision(d.clone()).await.unwrap();

        // The script changes its answer between calls; a second generation
        // would visibly differ from the first.
        let textgen = Arc::new(ScriptedTextGenerator::new(vec![
            "not json",
            "First narrative.",
            "not json",
            "Second narrative.",
        ]));
        let engine = engine_with(store, textgen).await;

        let request = ExplanationRequest::new(d.id.clone());
        let first = engine.explain(&request).await.unwrap();
        let second = engine.explain(&request).await.unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(second.text, "First narrative.");
    }

    #[tokio::test]
    async fn different_parameters_generate_fresh_explanations() {
        let store = Arc::new(InMemoryStore::new());
        let d = decision();
        store.put_decision(d.clone()).await.unwrap();

        let engine = engine_with(store, Arc::new(StaticTextGenerator::new("narrative"))).await;

        let business = engine
            .explain(&ExplanationRequest::new(d.id.clone()))
            .await
            .unwrap();
        let executive = engine
            .explain(&ExplanationRequest::new(d.id.clone()).audience(AudienceType::Executive))
            .await
            .unwrap();

        assert_ne!(business.id, executive.id);
        assert_eq!(executive.audience, AudienceType::Executive);
    }

    #[tokio::test]
    async fn explanation_is_linked_and_persisted() {
        let store = Arc::new(InMemoryStore::new());
        let d = decision();
        store.put_decision(d.clone()).await.unwrap();

        let engine =
            engine_with(store.clone(), Arc::new(StaticTextGenerator::new("narrative"))).await;
        let explanation = engine
            .explain(&ExplanationRequest::new(d.id.clone()))
            .await
            .unwrap();

        let loaded = store.get_decision(&d.id).await.unwrap().unwrap();
        assert_eq!(loaded.explanation_id, Some(explanation.id.clone()));
    }

    #[tokio::test]
    async fn failed_text_service_degrades_everything_gracefully() {
        let store = Arc::new(InMemoryStore::new());
        let d = decision();
        store.put_decision(d.clone()).await.unwrap();

        let engine = engine_with(store, Arc::new(FailingTextGenerator::new())).await;
        let explanation = engine
            .explain(&ExplanationRequest::new(d.id.clone()))
            .await
            .unwrap();

        assert_eq!(explanation.factor_analysis.source, FactorSource::Synthetic);
        assert_eq!(explanation.text_source, NarrativeSource::Fallback);
        assert!(!explanation.text.is_empty());
    }

    #[tokio::test]
    async fn counterfactuals_follow_the_request_flag() {
        let store = Arc::new(InMemoryStore::new());
        let d = decision();
        store.put_decision(d.clone()).await.unwrap();

        let engine = engine_with(store, Arc::new(StaticTextGenerator::new("narrative"))).await;

        let without = engine
            .explain(&ExplanationRequest::new(d.id.clone()))
            .await
            .unwrap();
        assert!(without.counterfactuals.is_none());

        let with = engine
            .explain(&ExplanationRequest::new(d.id.clone()).counterfactuals(true))
            .await
            .unwrap();
        let scenarios = with.counterfactuals.unwrap().scenarios;
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].alternative_action, "disqualify_lead");
    }

    #[tokio::test]
    async fn visuals_include_tree_only_at_high_detail() {
        let store = Arc::new(InMemoryStore::new());
        let d = decision();
        store.put_decision(d.clone()).await.unwrap();

        let engine = engine_with(store, Arc::new(StaticTextGenerator::new("narrative"))).await;

        let standard = engine
            .explain(&ExplanationRequest::new(d.id.clone()))
            .await
            .unwrap();
        assert_eq!(standard.visuals.len(), 2);

        let deep = engine
            .explain(&ExplanationRequest::new(d.id.clone()).detail_level(5))
            .await
            .unwrap();
        assert_eq!(deep.visuals.len(), 3);
        assert!(deep
            .visuals
            .iter()
            .any(|v| v.kind == VisualElementKind::DecisionTree));
    }

    #[tokio::test]
    async fn trace_for_missing_decision_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine_with(store, Arc::new(StaticTextGenerator::new("text"))).await;

        let result = engine
            .trace(&TraceRequest::new(DecisionId::generate()))
            .await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn trace_reconstructs_from_stored_records() {
        let store = Arc::new(InMemoryStore::new());
        let d = decision();
        store.put_decision(d.clone()).await.unwrap();

        let engine = engine_with(store, Arc::new(StaticTextGenerator::new("text"))).await;
        let trace = engine
            .trace(&TraceRequest::new(d.id.clone()).intermediate_steps(true))
            .await
            .unwrap();

        assert_eq!(trace.decision_id, d.id);
        assert_eq!(trace.steps.len(), 3);
    }
}
