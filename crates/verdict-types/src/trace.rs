//! Decision trace reconstruction types.
//!
//! A trace is an ordered replay of how a decision came to be: context
//! processing, per-agent contributions, conflict resolution, and the final
//! commit. Traces are reconstructed from the stored decision plus optional
//! ensemble collaboration metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::DecisionId;

/// Kind of step in a decision trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStepKind {
    Initialization,
    ContextProcessing,
    AgentContribution,
    ConflictResolution,
    FinalDecision,
}

/// One step in a decision trace.
///
/// Timestamps are real when the underlying records carried them, otherwise
/// linearly estimated from the decision's start anchor. Estimated times are
/// ordering aids, not measured latency.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceStep {
    pub id: String,
    pub kind: TraceStepKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Ordered reconstruction of the steps that produced a decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub decision_id: DecisionId,
    pub steps: Vec<TraceStep>,
    pub generated_at: DateTime<Utc>,
}

impl DecisionTrace {
    /// Steps of a given kind, in order.
    pub fn steps_of(&self, kind: TraceStepKind) -> Vec<&TraceStep> {
        self.steps.iter().filter(|s| s.kind == kind).collect()
    }
}

/// One agent's contribution during ensemble collaboration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentContribution {
    pub agent_id: String,
    pub action: String,
    pub confidence: f64,
    pub reasoning: String,
    /// Present when the ensemble recorded real timing.
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

/// A conflict observed between agents and how it was resolved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub description: String,
    pub resolution: String,
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

/// Ensemble collaboration metadata recorded alongside a decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollaborationRecord {
    pub decision_id: DecisionId,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub contributions: Vec<AgentContribution>,
    #[serde(default)]
    pub conflicts: Vec<ConflictRecord>,
}
