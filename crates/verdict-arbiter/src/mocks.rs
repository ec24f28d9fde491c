//! Mock recommendation sources for testing.
//!
//! Can be configured to answer, fail, or stall, so arbitration timeouts
//! and fallbacks are testable without real collaborators.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use verdict_types::{
    AgentContribution, AgentRecommendation, Decision, DecisionRequest, EngineError, EngineResult,
};

use crate::provider::{CollaborationOutcome, EnsembleCoordinator, EnsembleOutput, PolicyEngine};

enum MockBehavior {
    Respond(AgentRecommendation),
    Fail,
    Slow(AgentRecommendation, Duration),
}

/// Mock ensemble coordinator.
pub struct MockEnsemble {
    behavior: MockBehavior,
    collaborating_agents: Vec<String>,
}

impl MockEnsemble {
    /// Always returns the given recommendation.
    pub fn fixed(recommendation: AgentRecommendation) -> Self {
        Self {
            behavior: MockBehavior::Respond(recommendation),
            collaborating_agents: Vec::new(),
        }
    }

    /// Errors on every call.
    pub fn failing() -> Self {
        Self {
            behavior: MockBehavior::Fail,
            collaborating_agents: Vec::new(),
        }
    }

    /// Sleeps before answering, for timeout tests.
    pub fn slow(recommendation: AgentRecommendation, delay: Duration) -> Self {
        Self {
            behavior: MockBehavior::Slow(recommendation, delay),
            collaborating_agents: Vec::new(),
        }
    }

    /// Attach collaboration metadata naming the contributing agents.
    pub fn with_collaboration(mut self, agents: Vec<&str>) -> Self {
        self.collaborating_agents = agents.into_iter().map(String::from).collect();
        self
    }

    fn collaboration_for(&self, recommendation: &AgentRecommendation) -> Option<CollaborationOutcome> {
        if self.collaborating_agents.is_empty() {
            return None;
        }
        Some(CollaborationOutcome {
            started_at: Utc::now(),
            contributions: self
                .collaborating_agents
                .iter()
                .map(|agent| AgentContribution {
                    agent_id: agent.clone(),
                    action: recommendation.action.clone(),
                    confidence: recommendation.confidence,
                    reasoning: format!("{} assessment", agent),
                    at: Some(Utc::now()),
                })
                .collect(),
            conflicts: Vec::new(),
        })
    }
}

#[async_trait]
impl EnsembleCoordinator for MockEnsemble {
    async fn recommend(&self, _request: &DecisionRequest) -> EngineResult<EnsembleOutput> {
        match &self.behavior {
            MockBehavior::Respond(rec) => Ok(EnsembleOutput {
                recommendation: rec.clone(),
                collaboration: self.collaboration_for(rec),
            }),
            MockBehavior::Fail => Err(EngineError::Processing(
                "mock ensemble unavailable".to_string(),
            )),
            MockBehavior::Slow(rec, delay) => {
                tokio::time::sleep(*delay).await;
                Ok(EnsembleOutput {
                    recommendation: rec.clone(),
                    collaboration: self.collaboration_for(rec),
                })
            }
        }
    }
}

/// Mock policy engine recording every applied reward.
pub struct MockPolicyEngine {
    behavior: MockBehavior,
    fail_updates: bool,
    rewards: RwLock<Vec<f64>>,
}

impl MockPolicyEngine {
    /// Always returns the given recommendation; accepts reward updates.
    pub fn fixed(recommendation: AgentRecommendation) -> Self {
        Self {
            behavior: MockBehavior::Respond(recommendation),
            fail_updates: false,
            rewards: RwLock::new(Vec::new()),
        }
    }

    /// Errors on recommendations and reward updates alike.
    pub fn failing() -> Self {
        Self {
            behavior: MockBehavior::Fail,
            fail_updates: true,
            rewards: RwLock::new(Vec::new()),
        }
    }

    /// Sleeps before answering, for timeout tests.
    pub fn slow(recommendation: AgentRecommendation, delay: Duration) -> Self {
        Self {
            behavior: MockBehavior::Slow(recommendation, delay),
            fail_updates: false,
            rewards: RwLock::new(Vec::new()),
        }
    }

    /// Rewards applied so far, in order.
    pub fn rewards(&self) -> Vec<f64> {
        self.rewards.read().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PolicyEngine for MockPolicyEngine {
    async fn recommend(&self, _request: &DecisionRequest) -> EngineResult<AgentRecommendation> {
        match &self.behavior {
            MockBehavior::Respond(rec) => Ok(rec.clone()),
            MockBehavior::Fail => Err(EngineError::Processing(
                "mock policy engine unavailable".to_string(),
            )),
            MockBehavior::Slow(rec, delay) => {
                tokio::time::sleep(*delay).await;
                Ok(rec.clone())
            }
        }
    }

    async fn apply_reward(&self, _decision: &Decision, reward: f64) -> EngineResult<()> {
        if self.fail_updates {
            return Err(EngineError::Processing(
                "mock policy engine rejected update".to_string(),
            ));
        }
        self.rewards
            .write()
            .map_err(|_| EngineError::Processing("reward lock poisoned".to_string()))?
            .push(reward);
        Ok(())
    }
}
