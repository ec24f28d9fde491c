//! Shared domain types for the Verdict decision engine.
//!
//! Everything stored, logged, or exchanged between Verdict crates lives
//! here: decisions and their provenance, safety boundaries and violations,
//! explanations, traces, and the error taxonomy.

#![deny(unsafe_code)]

pub mod boundary;
pub mod decision;
pub mod error;
pub mod explanation;
pub mod ids;
pub mod trace;
pub mod violation;

pub use boundary::{Boundary, BoundaryKind, EnforcementAction, EthicsGuideline, Severity};
pub use decision::{
    ActionCandidate, AgentRecommendation, ContextMap, Decision, DecisionRequest,
    DecisionRequestBuilder, Outcome, RecommendationSources, SelectedSource,
};
pub use error::{EngineError, EngineResult};
pub use explanation::{
    AudienceType, ConfidenceAnalysis, ConfidenceBand, Counterfactual, CounterfactualAnalysis,
    DecisionFactor, DetailLevel, Explanation, ExplanationFormat, ExplanationKey, FactorAnalysis,
    FactorDirection, FactorSource, NarrativeSource, VisualElement, VisualElementKind,
};
pub use ids::{BoundaryId, DecisionId, ExplanationId};
pub use trace::{
    AgentContribution, CollaborationRecord, ConflictRecord, DecisionTrace, TraceStep,
    TraceStepKind,
};
pub use violation::Violation;
