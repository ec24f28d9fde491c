//! Decision requests, recommendations, and committed decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::explanation::AudienceType;
use crate::ids::{DecisionId, ExplanationId};

/// Opaque context attached to requests, decisions, and violations.
pub type ContextMap = serde_json::Map<String, Value>;

/// One candidate action a decision may commit to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionCandidate {
    pub action: String,
    /// Action-specific parameters, opaque to the engine.
    #[serde(default)]
    pub params: ContextMap,
}

impl ActionCandidate {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: ContextMap::new(),
        }
    }
}

/// A request for one committed decision. Immutable once submitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Operation class, e.g. `LEAD_QUALIFICATION`. Doubles as the
    /// operation type for boundary checks.
    pub decision_type: String,
    #[serde(default)]
    pub context: ContextMap,
    /// Candidate actions, best-first. The first entry is the fallback
    /// action when recommendation sources fail.
    pub actions: Vec<ActionCandidate>,
    #[serde(default)]
    pub constraints: ContextMap,
    /// Whether to attach an explanation to the response.
    #[serde(default = "default_explainable")]
    pub explainable: bool,
    #[serde(default)]
    pub audience: AudienceType,
    #[serde(default)]
    pub include_counterfactuals: bool,
}

fn default_explainable() -> bool {
    true
}

impl DecisionRequest {
    pub fn builder(decision_type: impl Into<String>) -> DecisionRequestBuilder {
        DecisionRequestBuilder::new(decision_type)
    }
}

/// Builder for [`DecisionRequest`].
pub struct DecisionRequestBuilder {
    request: DecisionRequest,
}

impl DecisionRequestBuilder {
    pub fn new(decision_type: impl Into<String>) -> Self {
        Self {
            request: DecisionRequest {
                decision_type: decision_type.into(),
                context: ContextMap::new(),
                actions: Vec::new(),
                constraints: ContextMap::new(),
                explainable: true,
                audience: AudienceType::default(),
                include_counterfactuals: false,
            },
        }
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.request.actions.push(ActionCandidate::new(action));
        self
    }

    pub fn context_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.request.context.insert(key.into(), value);
        self
    }

    pub fn constraint(mut self, key: impl Into<String>, value: Value) -> Self {
        self.request.constraints.insert(key.into(), value);
        self
    }

    pub fn explainable(mut self, explainable: bool) -> Self {
        self.request.explainable = explainable;
        self
    }

    pub fn audience(mut self, audience: AudienceType) -> Self {
        self.request.audience = audience;
        self
    }

    pub fn counterfactuals(mut self, include: bool) -> Self {
        self.request.include_counterfactuals = include;
        self
    }

    pub fn build(self) -> DecisionRequest {
        self.request
    }
}

/// A candidate produced independently by one recommendation source.
/// Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentRecommendation {
    pub action: String,
    /// Confidence in [0, 1]. Constructors clamp out-of-range values.
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub alternative_actions: Vec<String>,
}

impl AgentRecommendation {
    pub fn new(action: impl Into<String>, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            alternative_actions: Vec::new(),
        }
    }

    pub fn with_alternatives(mut self, alternatives: Vec<String>) -> Self {
        self.alternative_actions = alternatives;
        self
    }
}

/// Which source the arbiter committed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectedSource {
    Ensemble,
    Policy,
    /// Neither source produced a usable recommendation.
    Fallback,
}

/// Both raw recommendations, retained for audit even when discarded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSources {
    pub ensemble: Option<AgentRecommendation>,
    pub policy: Option<AgentRecommendation>,
}

/// One committed decision. Immutable; referenced by id from explanations
/// and outcome updates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub decision_type: String,
    pub action: String,
    /// Always equals the selected source's confidence, or 0.5 on the
    /// fallback path.
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub alternative_actions: Vec<String>,
    pub sources: RecommendationSources,
    pub selected: SelectedSource,
    pub timestamp: DateTime<Utc>,
    /// Set when the decision is a deterministic fallback rather than an
    /// arbitrated result.
    #[serde(default)]
    pub is_error_response: bool,
    /// Linked after an explanation is generated for this decision.
    #[serde(default)]
    pub explanation_id: Option<ExplanationId>,
    /// Request context snapshot used for synthetic factor derivation.
    #[serde(default)]
    pub context: ContextMap,
}

/// An observed result for a prior decision, supplied later by the caller.
/// Triggers reward computation and a policy update; never mutates the
/// original decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Outcome {
    pub decision_id: DecisionId,
    pub observed: ContextMap,
}

impl Outcome {
    pub fn new(decision_id: DecisionId) -> Self {
        Self {
            decision_id,
            observed: ContextMap::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.observed.insert(key.into(), value);
        self
    }
}
