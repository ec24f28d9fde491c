//! In-memory reference implementation of the Verdict storage ports.
//!
//! Deterministic and test-friendly. Production deployments should adapt a
//! durable document backend for source-of-truth data.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;
use verdict_types::{
    Boundary, BoundaryId, CollaborationRecord, Decision, DecisionId, Explanation, ExplanationId,
    ExplanationKey, Violation,
};

use crate::error::{StorageError, StorageResult};
use crate::model::{AdminAuditEvent, BoundaryEvent, ViolationFilter};
use crate::traits::{
    AuditEventStore, BoundaryStore, BudgetStore, DecisionStore, ExplanationStore, OperationStore,
    ViolationStore,
};

const CHANGE_FEED_BUFFER: usize = 64;

/// In-memory Verdict storage adapter.
#[derive(Default)]
pub struct InMemoryStore {
    decisions: RwLock<HashMap<DecisionId, Decision>>,
    collaborations: RwLock<HashMap<DecisionId, CollaborationRecord>>,
    boundaries: RwLock<HashMap<BoundaryId, Boundary>>,
    violations: RwLock<Vec<Violation>>,
    operations: RwLock<Vec<(String, DateTime<Utc>)>>,
    budgets: RwLock<HashMap<String, f64>>,
    explanations: RwLock<HashMap<ExplanationKey, Explanation>>,
    admin_events: RwLock<Vec<AdminAuditEvent>>,
    subscribers: RwLock<Vec<mpsc::Sender<BoundaryEvent>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a budget's current spend. Test and demo helper;
    /// real deployments track spend in their billing system.
    pub fn set_spend(&self, budget_id: impl Into<String>, spend: f64) {
        if let Ok(mut guard) = self.budgets.write() {
            guard.insert(budget_id.into(), spend);
        }
    }

    /// Deliver a boundary event to every live subscriber, pruning closed
    /// receivers.
    async fn notify(&self, event: BoundaryEvent) -> StorageResult<()> {
        let senders = {
            let guard = self
                .subscribers
                .read()
                .map_err(|_| StorageError::Backend("subscriber lock poisoned".to_string()))?;
            guard.clone()
        };

        let mut dead = Vec::new();
        for (idx, sender) in senders.iter().enumerate() {
            if sender.send(event.clone()).await.is_err() {
                dead.push(idx);
            }
        }

        if !dead.is_empty() {
            let mut guard = self
                .subscribers
                .write()
                .map_err(|_| StorageError::Backend("subscriber lock poisoned".to_string()))?;
            guard.retain(|sender| !sender.is_closed());
            debug!(pruned = dead.len(), "pruned closed boundary subscribers");
        }

        Ok(())
    }
}

#[async_trait]
impl DecisionStore for InMemoryStore {
    async fn put_decision(&self, decision: Decision) -> StorageResult<()> {
        let mut guard = self
            .decisions
            .write()
            .map_err(|_| StorageError::Backend("decision lock poisoned".to_string()))?;

        if guard.contains_key(&decision.id) {
            return Err(StorageError::Conflict(format!(
                "decision {} already exists",
                decision.id
            )));
        }

        guard.insert(decision.id.clone(), decision);
        Ok(())
    }

    async fn get_decision(&self, id: &DecisionId) -> StorageResult<Option<Decision>> {
        let guard = self
            .decisions
            .read()
            .map_err(|_| StorageError::Backend("decision lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn link_explanation(
        &self,
        id: &DecisionId,
        explanation_id: ExplanationId,
    ) -> StorageResult<()> {
        let mut guard = self
            .decisions
            .write()
            .map_err(|_| StorageError::Backend("decision lock poisoned".to_string()))?;
        let decision = guard
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("decision {} not found", id)))?;
        decision.explanation_id = Some(explanation_id);
        Ok(())
    }

    async fn put_collaboration(&self, record: CollaborationRecord) -> StorageResult<()> {
        let mut guard = self
            .collaborations
            .write()
            .map_err(|_| StorageError::Backend("collaboration lock poisoned".to_string()))?;
        guard.insert(record.decision_id.clone(), record);
        Ok(())
    }

    async fn get_collaboration(
        &self,
        id: &DecisionId,
    ) -> StorageResult<Option<CollaborationRecord>> {
        let guard = self
            .collaborations
            .read()
            .map_err(|_| StorageError::Backend("collaboration lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }
}

#[async_trait]
impl BoundaryStore for InMemoryStore {
    async fn upsert_boundary(&self, boundary: Boundary) -> StorageResult<()> {
        {
            let mut guard = self
                .boundaries
                .write()
                .map_err(|_| StorageError::Backend("boundary lock poisoned".to_string()))?;
            guard.insert(boundary.id.clone(), boundary.clone());
        }
        self.notify(BoundaryEvent::Upserted(boundary)).await
    }

    async fn get_boundary(&self, id: &BoundaryId) -> StorageResult<Option<Boundary>> {
        let guard = self
            .boundaries
            .read()
            .map_err(|_| StorageError::Backend("boundary lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn delete_boundary(&self, id: &BoundaryId) -> StorageResult<()> {
        {
            let mut guard = self
                .boundaries
                .write()
                .map_err(|_| StorageError::Backend("boundary lock poisoned".to_string()))?;
            if guard.remove(id).is_none() {
                return Err(StorageError::NotFound(format!(
                    "boundary {} not found",
                    id
                )));
            }
        }
        self.notify(BoundaryEvent::Removed(id.clone())).await
    }

    async fn list_boundaries(&self) -> StorageResult<Vec<Boundary>> {
        let guard = self
            .boundaries
            .read()
            .map_err(|_| StorageError::Backend("boundary lock poisoned".to_string()))?;
        let mut values = guard.values().cloned().collect::<Vec<_>>();
        values.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(values)
    }

    async fn subscribe_boundaries(&self) -> StorageResult<mpsc::Receiver<BoundaryEvent>> {
        let (tx, rx) = mpsc::channel(CHANGE_FEED_BUFFER);
        let mut guard = self
            .subscribers
            .write()
            .map_err(|_| StorageError::Backend("subscriber lock poisoned".to_string()))?;
        guard.push(tx);
        Ok(rx)
    }
}

#[async_trait]
impl ViolationStore for InMemoryStore {
    async fn append_violation(&self, violation: Violation) -> StorageResult<()> {
        let mut guard = self
            .violations
            .write()
            .map_err(|_| StorageError::Backend("violation lock poisoned".to_string()))?;
        guard.push(violation);
        Ok(())
    }

    async fn list_violations(
        &self,
        filter: &ViolationFilter,
        limit: usize,
    ) -> StorageResult<Vec<Violation>> {
        let guard = self
            .violations
            .read()
            .map_err(|_| StorageError::Backend("violation lock poisoned".to_string()))?;
        let iter = guard.iter().rev().filter(|v| filter.matches(v)).cloned();
        Ok(if limit == 0 {
            iter.collect()
        } else {
            iter.take(limit).collect()
        })
    }
}

#[async_trait]
impl OperationStore for InMemoryStore {
    async fn record_operation(
        &self,
        operation_type: &str,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let mut guard = self
            .operations
            .write()
            .map_err(|_| StorageError::Backend("operation lock poisoned".to_string()))?;
        guard.push((operation_type.to_string(), at));
        Ok(())
    }

    async fn count_operations_since(
        &self,
        operation_type: &str,
        since: DateTime<Utc>,
    ) -> StorageResult<u64> {
        let guard = self
            .operations
            .read()
            .map_err(|_| StorageError::Backend("operation lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|(op, at)| op == operation_type && *at >= since)
            .count() as u64)
    }
}

#[async_trait]
impl BudgetStore for InMemoryStore {
    async fn current_spend(&self, budget_id: &str) -> StorageResult<Option<f64>> {
        let guard = self
            .budgets
            .read()
            .map_err(|_| StorageError::Backend("budget lock poisoned".to_string()))?;
        Ok(guard.get(budget_id).copied())
    }
}

#[async_trait]
impl ExplanationStore for InMemoryStore {
    async fn put_explanation(
        &self,
        key: ExplanationKey,
        explanation: Explanation,
    ) -> StorageResult<()> {
        let mut guard = self
            .explanations
            .write()
            .map_err(|_| StorageError::Backend("explanation lock poisoned".to_string()))?;
        guard.insert(key, explanation);
        Ok(())
    }

    async fn get_explanation(&self, key: &ExplanationKey) -> StorageResult<Option<Explanation>> {
        let guard = self
            .explanations
            .read()
            .map_err(|_| StorageError::Backend("explanation lock poisoned".to_string()))?;
        Ok(guard.get(key).cloned())
    }
}

#[async_trait]
impl AuditEventStore for InMemoryStore {
    async fn append_admin_event(&self, event: AdminAuditEvent) -> StorageResult<()> {
        let mut guard = self
            .admin_events
            .write()
            .map_err(|_| StorageError::Backend("admin audit lock poisoned".to_string()))?;
        guard.push(event);
        Ok(())
    }

    async fn list_admin_events(&self, limit: usize) -> StorageResult<Vec<AdminAuditEvent>> {
        let guard = self
            .admin_events
            .read()
            .map_err(|_| StorageError::Backend("admin audit lock poisoned".to_string()))?;
        let iter = guard.iter().rev().cloned();
        Ok(if limit == 0 {
            iter.collect()
        } else {
            iter.take(limit).collect()
        })
    }
}
