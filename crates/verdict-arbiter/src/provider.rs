//! Recommendation source ports.
//!
//! The ensemble coordinator and the policy engine are external
//! collaborators; only their call contracts live here. Each produces a
//! candidate action with confidence and reasoning, independently of the
//! other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use verdict_types::{
    AgentContribution, AgentRecommendation, ConflictRecord, Decision, DecisionRequest,
    EngineResult,
};

/// Collaboration metadata captured while the ensemble deliberated.
///
/// Becomes a stored `CollaborationRecord` once the decision id exists.
#[derive(Clone, Debug)]
pub struct CollaborationOutcome {
    pub started_at: DateTime<Utc>,
    pub contributions: Vec<AgentContribution>,
    pub conflicts: Vec<ConflictRecord>,
}

/// What the ensemble returns for one decision request.
#[derive(Clone, Debug)]
pub struct EnsembleOutput {
    pub recommendation: AgentRecommendation,
    /// Present when the ensemble recorded its deliberation.
    pub collaboration: Option<CollaborationOutcome>,
}

/// Multi-agent ensemble collaborator.
#[async_trait]
pub trait EnsembleCoordinator: Send + Sync {
    async fn recommend(&self, request: &DecisionRequest) -> EngineResult<EnsembleOutput>;
}

/// Policy/RL engine collaborator.
///
/// Also receives reward updates when decision outcomes are observed.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    async fn recommend(&self, request: &DecisionRequest) -> EngineResult<AgentRecommendation>;

    /// Apply a computed reward for a prior decision.
    async fn apply_reward(&self, decision: &Decision, reward: f64) -> EngineResult<()>;
}
