//! Async storage ports consumed by the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use verdict_types::{
    Boundary, BoundaryId, CollaborationRecord, Decision, DecisionId, Explanation, ExplanationId,
    ExplanationKey, Violation,
};

use crate::error::StorageResult;
use crate::model::{AdminAuditEvent, BoundaryEvent, ViolationFilter};

/// Storage for committed decisions and their collaboration metadata.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Insert a newly committed decision. Decisions are immutable; writing
    /// an existing id is a conflict.
    async fn put_decision(&self, decision: Decision) -> StorageResult<()>;

    async fn get_decision(&self, id: &DecisionId) -> StorageResult<Option<Decision>>;

    /// Link a generated explanation back onto the decision record. The
    /// decision itself is otherwise untouched.
    async fn link_explanation(
        &self,
        id: &DecisionId,
        explanation_id: ExplanationId,
    ) -> StorageResult<()>;

    async fn put_collaboration(&self, record: CollaborationRecord) -> StorageResult<()>;

    async fn get_collaboration(
        &self,
        id: &DecisionId,
    ) -> StorageResult<Option<CollaborationRecord>>;
}

/// Storage and change feed for boundary configuration.
#[async_trait]
pub trait BoundaryStore: Send + Sync {
    async fn upsert_boundary(&self, boundary: Boundary) -> StorageResult<()>;

    async fn get_boundary(&self, id: &BoundaryId) -> StorageResult<Option<Boundary>>;

    async fn delete_boundary(&self, id: &BoundaryId) -> StorageResult<()>;

    async fn list_boundaries(&self) -> StorageResult<Vec<Boundary>>;

    /// Subscribe to boundary collection changes. Events arrive after the
    /// corresponding write is durable; one receiver per subscriber.
    async fn subscribe_boundaries(&self) -> StorageResult<mpsc::Receiver<BoundaryEvent>>;
}

/// Append-only storage for boundary violations.
#[async_trait]
pub trait ViolationStore: Send + Sync {
    async fn append_violation(&self, violation: Violation) -> StorageResult<()>;

    /// Read violations newest-first, capped at `limit` (0 = no cap).
    async fn list_violations(
        &self,
        filter: &ViolationFilter,
        limit: usize,
    ) -> StorageResult<Vec<Violation>>;
}

/// Operation history used by rate boundaries.
///
/// Rate correctness depends on this store's query consistency, not on
/// in-process locks.
#[async_trait]
pub trait OperationStore: Send + Sync {
    async fn record_operation(&self, operation_type: &str, at: DateTime<Utc>)
        -> StorageResult<()>;

    async fn count_operations_since(
        &self,
        operation_type: &str,
        since: DateTime<Utc>,
    ) -> StorageResult<u64>;
}

/// Budget spend lookups used by budget boundaries.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Current spend for a budget. `None` when the budget record does not
    /// exist; the evaluator treats that as non-compliant.
    async fn current_spend(&self, budget_id: &str) -> StorageResult<Option<f64>>;
}

/// Storage for generated explanations, keyed by their full parameter set.
#[async_trait]
pub trait ExplanationStore: Send + Sync {
    /// Writes are idempotent: the same key always carries the same value,
    /// so concurrent writers are safe.
    async fn put_explanation(
        &self,
        key: ExplanationKey,
        explanation: Explanation,
    ) -> StorageResult<()>;

    async fn get_explanation(&self, key: &ExplanationKey) -> StorageResult<Option<Explanation>>;
}

/// Append-only storage for boundary administration audit events.
#[async_trait]
pub trait AuditEventStore: Send + Sync {
    async fn append_admin_event(&self, event: AdminAuditEvent) -> StorageResult<()>;

    async fn list_admin_events(&self, limit: usize) -> StorageResult<Vec<AdminAuditEvent>>;
}

/// Unified storage bundle consumed by the engine facade.
pub trait VerdictStore:
    DecisionStore
    + BoundaryStore
    + ViolationStore
    + OperationStore
    + BudgetStore
    + ExplanationStore
    + AuditEventStore
    + Send
    + Sync
{
}

impl<T> VerdictStore for T where
    T: DecisionStore
        + BoundaryStore
        + ViolationStore
        + OperationStore
        + BudgetStore
        + ExplanationStore
        + AuditEventStore
        + Send
        + Sync
{
}
