//! Mock collaborators for testing boundary evaluation.
//!
//! Tests inject these instead of branching on any runtime "test mode".

use async_trait::async_trait;
use verdict_types::{ContextMap, EngineError};

use crate::evaluator::{EthicsProvider, ModerationProvider, ModerationVerdict};

/// Mock moderation provider with a fixed verdict.
pub struct MockModerationProvider {
    verdict: MockVerdict,
}

enum MockVerdict {
    Approve,
    Reject(String),
    Fail,
}

impl MockModerationProvider {
    /// Approves all content.
    pub fn approve_all() -> Self {
        Self {
            verdict: MockVerdict::Approve,
        }
    }

    /// Rejects all content with the given reason.
    pub fn reject_all(reason: impl Into<String>) -> Self {
        Self {
            verdict: MockVerdict::Reject(reason.into()),
        }
    }

    /// Errors on every call, for fail-closed tests.
    pub fn failing() -> Self {
        Self {
            verdict: MockVerdict::Fail,
        }
    }
}

#[async_trait]
impl ModerationProvider for MockModerationProvider {
    async fn review_content(&self, _content: &str) -> Result<ModerationVerdict, EngineError> {
        match &self.verdict {
            MockVerdict::Approve => Ok(ModerationVerdict::Approved),
            MockVerdict::Reject(reason) => Ok(ModerationVerdict::Rejected {
                reason: reason.clone(),
            }),
            MockVerdict::Fail => Err(EngineError::AiService(
                "mock moderation unavailable".to_string(),
            )),
        }
    }
}

/// Mock ethics provider with a fixed outcome.
pub struct MockEthicsProvider {
    outcome: MockEthicsOutcome,
}

enum MockEthicsOutcome {
    Pass,
    Fail,
    Error,
}

impl MockEthicsProvider {
    /// Every deeper review passes.
    pub fn pass_all() -> Self {
        Self {
            outcome: MockEthicsOutcome::Pass,
        }
    }

    /// Every deeper review finds a problem.
    pub fn fail_all() -> Self {
        Self {
            outcome: MockEthicsOutcome::Fail,
        }
    }

    /// Errors on every call, for fail-closed tests.
    pub fn erroring() -> Self {
        Self {
            outcome: MockEthicsOutcome::Error,
        }
    }
}

#[async_trait]
impl EthicsProvider for MockEthicsProvider {
    async fn review(
        &self,
        _operation_type: &str,
        _context: &ContextMap,
    ) -> Result<bool, EngineError> {
        match self.outcome {
            MockEthicsOutcome::Pass => Ok(true),
            MockEthicsOutcome::Fail => Ok(false),
            MockEthicsOutcome::Error => Err(EngineError::AiService(
                "mock ethics review unavailable".to_string(),
            )),
        }
    }
}
