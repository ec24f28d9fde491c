//! Safety boundary manager.
//!
//! Holds the boundary configuration cache, fans operations out across the
//! applicable evaluators, aggregates violations, and owns boundary
//! administration. The cache is an immutable-swap snapshot: readers clone
//! an `Arc` and keep a consistent view for the whole check while the
//! change-feed task swaps in fresh snapshots.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use verdict_types::{
    Boundary, BoundaryId, BoundaryKind, ContextMap, EngineError, EngineResult, EnforcementAction,
    Severity, Violation,
};
use verdict_store::{
    AdminAction, AdminAuditEvent, AuditEventStore, BoundaryEvent, BoundaryStore, OperationStore,
    ViolationFilter, ViolationStore,
};

use crate::audit::{sanitize_context, ViolationLog};
use crate::evaluator::{BoundaryCheck, BoundaryEvaluator};
use crate::metrics::SafetyMetrics;

/// Manager configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Per-evaluator timeout; an elapsed timeout is a blocking violation.
    pub evaluator_timeout_ms: u64,
    /// Ring buffer capacity for recent violations.
    pub violation_buffer: usize,
    pub metrics_enabled: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            evaluator_timeout_ms: 2_000,
            violation_buffer: 256,
            metrics_enabled: true,
        }
    }
}

/// Aggregate result of checking one operation against all applicable
/// boundaries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoundaryDecision {
    pub allowed: bool,
    pub violations: Vec<Violation>,
    /// Deduplicated union of the triggered enforcement ladders.
    pub enforcement_actions: Vec<EnforcementAction>,
}

impl BoundaryDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            violations: Vec::new(),
            enforcement_actions: Vec::new(),
        }
    }
}

type BoundarySnapshot = Arc<HashMap<BoundaryId, Boundary>>;

/// Loads and caches boundary configuration, evaluates operations against
/// it, and records every violation before answering.
pub struct SafetyBoundaryManager {
    store: Arc<dyn BoundaryStore>,
    operations: Arc<dyn OperationStore>,
    admin_audit: Arc<dyn AuditEventStore>,
    evaluator: BoundaryEvaluator,
    cache: Arc<RwLock<BoundarySnapshot>>,
    log: ViolationLog,
    metrics: SafetyMetrics,
    config: SafetyConfig,
    initialized: AtomicBool,
}

impl SafetyBoundaryManager {
    pub fn new(
        store: Arc<dyn BoundaryStore>,
        violations: Arc<dyn ViolationStore>,
        admin_audit: Arc<dyn AuditEventStore>,
        operations: Arc<dyn OperationStore>,
        evaluator: BoundaryEvaluator,
        config: SafetyConfig,
    ) -> Self {
        Self {
            store,
            operations,
            admin_audit,
            evaluator,
            cache: Arc::new(RwLock::new(Arc::new(HashMap::new()))),
            log: ViolationLog::new(violations, config.violation_buffer),
            metrics: SafetyMetrics::new(config.metrics_enabled),
            config,
            initialized: AtomicBool::new(false),
        }
    }

    /// Bulk-load boundary configuration and start the change-feed apply
    /// task. Idempotent; later calls are no-ops.
    pub async fn initialize(&self) -> EngineResult<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("safety boundary manager already initialized");
            return Ok(());
        }

        let loaded = match self.store.list_boundaries().await {
            Ok(loaded) => loaded,
            Err(err) => {
                // Allow a retry after a failed bulk load.
                self.initialized.store(false, Ordering::SeqCst);
                return Err(err.into());
            }
        };

        let count = loaded.len();
        let map: HashMap<BoundaryId, Boundary> =
            loaded.into_iter().map(|b| (b.id.clone(), b)).collect();
        self.replace_snapshot(Arc::new(map))?;

        let rx = match self.store.subscribe_boundaries().await {
            Ok(rx) => rx,
            Err(err) => {
                self.initialized.store(false, Ordering::SeqCst);
                return Err(err.into());
            }
        };
        tokio::spawn(apply_boundary_events(rx, self.cache.clone()));

        info!(boundaries = count, "safety boundary manager initialized");
        Ok(())
    }

    /// Check one operation against every applicable boundary.
    ///
    /// Never errors: any internal failure produces a denied decision with
    /// a synthetic system violation. An operation this manager failed to
    /// evaluate is never allowed.
    pub async fn check_boundaries(
        &self,
        operation_type: &str,
        context: &ContextMap,
    ) -> BoundaryDecision {
        match self.try_check(operation_type, context).await {
            Ok(decision) => {
                self.metrics.check_completed(decision.allowed);
                decision
            }
            Err(err) => {
                error!(
                    operation = operation_type,
                    error = %err,
                    "boundary check failed, denying operation"
                );
                self.metrics.fail_closed();
                self.metrics.check_completed(false);

                let mut violation = Violation::new(
                    BoundaryId("system".into()),
                    "system",
                    Severity::Severe,
                    format!("boundary check failed: {}", err),
                    operation_type,
                    sanitize_context(context),
                );
                // Best effort: the store may be the thing that failed.
                if let Ok(recorded) = self.log.record(violation.clone()).await {
                    violation = recorded;
                }

                BoundaryDecision {
                    allowed: false,
                    violations: vec![violation],
                    enforcement_actions: Severity::Severe.enforcement_actions(),
                }
            }
        }
    }

    async fn try_check(
        &self,
        operation_type: &str,
        context: &ContextMap,
    ) -> EngineResult<BoundaryDecision> {
        let snapshot = self.snapshot()?;
        let applicable: Vec<&Boundary> = snapshot
            .values()
            .filter(|b| b.applies_to(operation_type))
            .collect();

        if applicable.is_empty() {
            return Ok(BoundaryDecision::allow());
        }

        let timeout = Duration::from_millis(self.config.evaluator_timeout_ms);
        let checks: Vec<BoundaryCheck> = join_all(applicable.iter().map(|&boundary| async move {
            match tokio::time::timeout(
                timeout,
                self.evaluator.evaluate(boundary, operation_type, context),
            )
            .await
            {
                Ok(check) => check,
                Err(_) => BoundaryCheck::fail_closed(
                    boundary,
                    format!("evaluation of {} timed out", boundary.name),
                ),
            }
        }))
        .await;

        let mut allowed = true;
        let mut violations = Vec::new();
        let mut actions = BTreeSet::new();

        for (boundary, check) in applicable.iter().zip(checks) {
            if check.compliant {
                continue;
            }

            if check.blocking {
                allowed = false;
            }
            actions.extend(check.enforcement_actions.iter().copied());

            let violation = Violation::new(
                boundary.id.clone(),
                boundary.kind.name(),
                check.severity,
                check.message.clone(),
                operation_type,
                context.clone(),
            );
            // Persisted before the decision is returned.
            let recorded = self.log.record(violation).await?;
            self.metrics.violation_recorded(recorded.severity);
            violations.push(recorded);
        }

        Ok(BoundaryDecision {
            allowed,
            violations,
            enforcement_actions: actions.into_iter().collect(),
        })
    }

    /// Record an executed operation for rate accounting.
    pub async fn record_operation(&self, operation_type: &str) -> EngineResult<()> {
        self.operations
            .record_operation(operation_type, chrono::Utc::now())
            .await?;
        Ok(())
    }

    /// Validate and create a boundary, writing through store and cache.
    pub async fn create_boundary(
        &self,
        boundary: Boundary,
        actor: &str,
    ) -> EngineResult<Boundary> {
        validate_boundary(&boundary)?;

        self.store.upsert_boundary(boundary.clone()).await?;
        self.apply_upsert(boundary.clone())?;
        self.admin_audit
            .append_admin_event(AdminAuditEvent::new(
                actor,
                AdminAction::Created,
                boundary.id.clone(),
                format!("created boundary {}", boundary.name),
            ))
            .await?;

        info!(boundary = %boundary.id, name = %boundary.name, "boundary created");
        Ok(boundary)
    }

    /// Validate and update an existing boundary.
    pub async fn update_boundary(
        &self,
        boundary: Boundary,
        actor: &str,
    ) -> EngineResult<Boundary> {
        validate_boundary(&boundary)?;

        if self.store.get_boundary(&boundary.id).await?.is_none() {
            return Err(EngineError::NotFound(format!(
                "boundary {} not found",
                boundary.id
            )));
        }

        self.store.upsert_boundary(boundary.clone()).await?;
        self.apply_upsert(boundary.clone())?;
        self.admin_audit
            .append_admin_event(AdminAuditEvent::new(
                actor,
                AdminAction::Updated,
                boundary.id.clone(),
                format!("updated boundary {}", boundary.name),
            ))
            .await?;

        info!(boundary = %boundary.id, "boundary updated");
        Ok(boundary)
    }

    /// Delete a boundary and append an administration audit entry.
    pub async fn delete_boundary(&self, id: &BoundaryId, actor: &str) -> EngineResult<()> {
        self.store.delete_boundary(id).await?;
        self.apply_remove(id)?;
        self.admin_audit
            .append_admin_event(AdminAuditEvent::new(
                actor,
                AdminAction::Deleted,
                id.clone(),
                "deleted boundary",
            ))
            .await?;

        info!(boundary = %id, "boundary deleted");
        Ok(())
    }

    /// Query persisted violations, newest first.
    pub async fn recent_violations(
        &self,
        filter: &ViolationFilter,
        limit: usize,
    ) -> EngineResult<Vec<Violation>> {
        self.log.query(filter, limit).await
    }

    /// Most recent violations from the in-memory ring buffer.
    pub fn recent_cached_violations(&self, limit: usize) -> Vec<Violation> {
        self.log.recent_cached(limit)
    }

    /// Number of boundaries currently cached.
    pub fn boundary_count(&self) -> usize {
        self.snapshot().map(|s| s.len()).unwrap_or(0)
    }

    pub fn metrics(&self) -> &SafetyMetrics {
        &self.metrics
    }

    fn snapshot(&self) -> EngineResult<BoundarySnapshot> {
        self.cache
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| EngineError::Processing("boundary cache lock poisoned".to_string()))
    }

    fn replace_snapshot(&self, snapshot: BoundarySnapshot) -> EngineResult<()> {
        let mut guard = self
            .cache
            .write()
            .map_err(|_| EngineError::Processing("boundary cache lock poisoned".to_string()))?;
        *guard = snapshot;
        Ok(())
    }

    fn apply_upsert(&self, boundary: Boundary) -> EngineResult<()> {
        let mut guard = self
            .cache
            .write()
            .map_err(|_| EngineError::Processing("boundary cache lock poisoned".to_string()))?;
        let mut map = guard.as_ref().clone();
        map.insert(boundary.id.clone(), boundary);
        *guard = Arc::new(map);
        Ok(())
    }

    fn apply_remove(&self, id: &BoundaryId) -> EngineResult<()> {
        let mut guard = self
            .cache
            .write()
            .map_err(|_| EngineError::Processing("boundary cache lock poisoned".to_string()))?;
        let mut map = guard.as_ref().clone();
        map.remove(id);
        *guard = Arc::new(map);
        Ok(())
    }
}

/// Apply change-feed events to the cache until the feed closes.
async fn apply_boundary_events(
    mut rx: mpsc::Receiver<BoundaryEvent>,
    cache: Arc<RwLock<BoundarySnapshot>>,
) {
    while let Some(event) = rx.recv().await {
        let Ok(mut guard) = cache.write() else {
            warn!("boundary cache lock poisoned, stopping change-feed apply task");
            return;
        };
        let mut map = guard.as_ref().clone();
        match event {
            BoundaryEvent::Upserted(boundary) => {
                debug!(boundary = %boundary.id, "applying boundary upsert from change feed");
                map.insert(boundary.id.clone(), boundary);
            }
            BoundaryEvent::Removed(id) => {
                debug!(boundary = %id, "applying boundary removal from change feed");
                map.remove(&id);
            }
        }
        *guard = Arc::new(map);
    }
    debug!("boundary change feed closed");
}

/// Shape validation applied before any store write.
fn validate_boundary(boundary: &Boundary) -> EngineResult<()> {
    if boundary.name.trim().is_empty() {
        return Err(EngineError::Validation(
            "boundary name must not be empty".to_string(),
        ));
    }
    if boundary.operation_types.is_empty() {
        return Err(EngineError::Validation(
            "boundary must name at least one operation type".to_string(),
        ));
    }

    match &boundary.kind {
        BoundaryKind::Budget { budget_id, limit } => {
            if budget_id.trim().is_empty() {
                return Err(EngineError::Validation(
                    "budget boundary requires a budget_id".to_string(),
                ));
            }
            if !limit.is_finite() || *limit <= 0.0 {
                return Err(EngineError::Validation(
                    "budget boundary requires a positive numeric limit".to_string(),
                ));
            }
        }
        BoundaryKind::Rate {
            limit,
            window_minutes,
        } => {
            if *limit == 0 {
                return Err(EngineError::Validation(
                    "rate boundary requires a positive limit".to_string(),
                ));
            }
            if *window_minutes == 0 {
                return Err(EngineError::Validation(
                    "rate boundary requires a positive window_minutes".to_string(),
                ));
            }
        }
        BoundaryKind::Time {
            allowed_days,
            start_hour,
            end_hour,
            ..
        } => {
            if allowed_days.is_empty() || allowed_days.iter().any(|d| *d > 6) {
                return Err(EngineError::Validation(
                    "time boundary requires allowed_days in 0..=6".to_string(),
                ));
            }
            if *start_hour > 23 || *end_hour > 23 {
                return Err(EngineError::Validation(
                    "time boundary hours must be in 0..=23".to_string(),
                ));
            }
        }
        BoundaryKind::Content {
            content_field,
            moderation,
            ..
        } => {
            if *moderation && content_field.trim().is_empty() {
                return Err(EngineError::Validation(
                    "content boundary with moderation requires a content_field".to_string(),
                ));
            }
        }
        BoundaryKind::Scope {
            allowed_domains,
            allowed_actions,
        } => {
            if allowed_domains.is_none() && allowed_actions.is_none() {
                return Err(EngineError::Validation(
                    "scope boundary must restrict domains or actions".to_string(),
                ));
            }
        }
        BoundaryKind::Compliance { .. } | BoundaryKind::Ethics { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockEthicsProvider, MockModerationProvider};
    use async_trait::async_trait;
    use serde_json::json;
    use verdict_store::{InMemoryStore, StorageError, StorageResult};

    fn evaluator(store: Arc<InMemoryStore>) -> BoundaryEvaluator {
        BoundaryEvaluator::new(
            store.clone(),
            store,
            Arc::new(MockModerationProvider::approve_all()),
            Arc::new(MockEthicsProvider::pass_all()),
        )
    }

    fn manager(store: Arc<InMemoryStore>) -> SafetyBoundaryManager {
        SafetyBoundaryManager::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            evaluator(store),
            SafetyConfig::default(),
        )
    }

    fn context(pairs: &[(&str, serde_json::Value)]) -> ContextMap {
        let mut map = ContextMap::new();
        for (key, value) in pairs {
            map.insert((*key).to_string(), value.clone());
        }
        map
    }

    fn scope_boundary(severity: Severity) -> Boundary {
        Boundary::new(
            "sales scope",
            BoundaryKind::Scope {
                allowed_domains: Some(vec!["sales".into()]),
                allowed_actions: None,
            },
            vec!["outreach".into()],
            severity,
        )
    }

    #[tokio::test]
    async fn initialize_is_idempotent_and_loads_existing() {
        let store = Arc::new(InMemoryStore::new());
        store
            .upsert_boundary(scope_boundary(Severity::Severe))
            .await
            .unwrap();

        let mgr = manager(store);
        mgr.initialize().await.unwrap();
        mgr.initialize().await.unwrap();
        assert_eq!(mgr.boundary_count(), 1);
    }

    #[tokio::test]
    async fn change_feed_converges_cache() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(store.clone());
        mgr.initialize().await.unwrap();
        assert_eq!(mgr.boundary_count(), 0);

        // Written directly to the store, not through the manager.
        let boundary = scope_boundary(Severity::Severe);
        let id = boundary.id.clone();
        store.upsert_boundary(boundary).await.unwrap();

        let mut converged = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if mgr.boundary_count() == 1 {
                converged = true;
                break;
            }
        }
        assert!(converged, "cache did not pick up the change feed upsert");

        store.delete_boundary(&id).await.unwrap();
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if mgr.boundary_count() == 0 {
                return;
            }
        }
        panic!("cache did not pick up the change feed removal");
    }

    #[tokio::test]
    async fn no_applicable_boundaries_allows() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(store);
        mgr.initialize().await.unwrap();

        let decision = mgr.check_boundaries("outreach", &ContextMap::new()).await;
        assert!(decision.allowed);
        assert!(decision.violations.is_empty());
    }

    #[tokio::test]
    async fn blocking_violation_denies_and_persists() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(store.clone());
        mgr.initialize().await.unwrap();
        mgr.create_boundary(scope_boundary(Severity::Severe), "tester")
            .await
            .unwrap();

        let decision = mgr
            .check_boundaries("outreach", &context(&[("domain", json!("hr"))]))
            .await;
        assert!(!decision.allowed);
        assert_eq!(decision.violations.len(), 1);

        // Persisted before the call returned.
        let stored = mgr
            .recent_violations(&ViolationFilter::new().with_boundary_type("scope"), 0)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn advisory_violation_records_but_allows() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(store);
        mgr.initialize().await.unwrap();
        mgr.create_boundary(scope_boundary(Severity::Warning), "tester")
            .await
            .unwrap();

        let decision = mgr
            .check_boundaries("outreach", &context(&[("domain", json!("hr"))]))
            .await;
        assert!(decision.allowed, "warning severity must not block");
        assert_eq!(decision.violations.len(), 1);
        assert_eq!(
            decision.enforcement_actions,
            vec![EnforcementAction::Log, EnforcementAction::Notify]
        );
    }

    #[tokio::test]
    async fn critical_violation_triggers_full_ladder() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(store);
        mgr.initialize().await.unwrap();
        mgr.create_boundary(scope_boundary(Severity::Critical), "tester")
            .await
            .unwrap();

        let decision = mgr
            .check_boundaries("outreach", &context(&[("domain", json!("hr"))]))
            .await;
        assert!(!decision.allowed);
        for action in [
            EnforcementAction::Log,
            EnforcementAction::Notify,
            EnforcementAction::Block,
            EnforcementAction::Shutdown,
        ] {
            assert!(decision.enforcement_actions.contains(&action));
        }
    }

    #[tokio::test]
    async fn enforcement_actions_are_deduplicated() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(store);
        mgr.initialize().await.unwrap();
        mgr.create_boundary(scope_boundary(Severity::Severe), "tester")
            .await
            .unwrap();
        let mut second = scope_boundary(Severity::Severe);
        second.name = "second scope".into();
        mgr.create_boundary(second, "tester").await.unwrap();

        let decision = mgr
            .check_boundaries("outreach", &context(&[("domain", json!("hr"))]))
            .await;
        assert_eq!(decision.violations.len(), 2);
        assert_eq!(
            decision.enforcement_actions,
            vec![
                EnforcementAction::Log,
                EnforcementAction::Notify,
                EnforcementAction::Block
            ]
        );
    }

    struct FailingViolationStore;

    #[async_trait]
    impl ViolationStore for FailingViolationStore {
        async fn append_violation(&self, _violation: Violation) -> StorageResult<()> {
            Err(StorageError::Backend("violation store offline".to_string()))
        }

        async fn list_violations(
            &self,
            _filter: &ViolationFilter,
            _limit: usize,
        ) -> StorageResult<Vec<Violation>> {
            Err(StorageError::Backend("violation store offline".to_string()))
        }
    }

    #[tokio::test]
    async fn internal_failure_fails_closed() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = SafetyBoundaryManager::new(
            store.clone(),
            Arc::new(FailingViolationStore),
            store.clone(),
            store.clone(),
            evaluator(store),
            SafetyConfig::default(),
        );
        mgr.initialize().await.unwrap();
        mgr.create_boundary(scope_boundary(Severity::Severe), "tester")
            .await
            .unwrap();

        // The violation store failure surfaces as a denial, never as an
        // allow-by-default.
        let decision = mgr
            .check_boundaries("outreach", &context(&[("domain", json!("hr"))]))
            .await;
        assert!(!decision.allowed);
        assert_eq!(decision.violations.len(), 1);
        assert_eq!(decision.violations[0].boundary_type, "system");
        assert!(decision.violations[0].severity >= Severity::Severe);
    }

    struct SlowModeration;

    #[async_trait]
    impl crate::evaluator::ModerationProvider for SlowModeration {
        async fn review_content(
            &self,
            _content: &str,
        ) -> Result<crate::evaluator::ModerationVerdict, EngineError> {
            tokio::time::sleep(Duration::from_millis(250)).await;
            Ok(crate::evaluator::ModerationVerdict::Approved)
        }
    }

    #[tokio::test]
    async fn evaluator_timeout_fails_closed() {
        let store = Arc::new(InMemoryStore::new());
        let eval = BoundaryEvaluator::new(
            store.clone(),
            store.clone(),
            Arc::new(SlowModeration),
            Arc::new(MockEthicsProvider::pass_all()),
        );
        let mgr = SafetyBoundaryManager::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            eval,
            SafetyConfig {
                evaluator_timeout_ms: 20,
                ..SafetyConfig::default()
            },
        );
        mgr.initialize().await.unwrap();
        mgr.create_boundary(
            Boundary::new(
                "moderated content",
                BoundaryKind::Content {
                    content_field: "body".into(),
                    prohibited_terms: vec![],
                    moderation: true,
                },
                vec!["outreach".into()],
                Severity::Warning,
            ),
            "tester",
        )
        .await
        .unwrap();

        let decision = mgr
            .check_boundaries("outreach", &context(&[("body", json!("hello"))]))
            .await;
        assert!(!decision.allowed);
        assert!(decision.violations[0].message.contains("timed out"));
    }

    #[tokio::test]
    async fn rate_boundary_without_window_is_rejected_before_write() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(store.clone());
        mgr.initialize().await.unwrap();

        let invalid = Boundary::new(
            "rate cap",
            BoundaryKind::Rate {
                limit: 5,
                window_minutes: 0,
            },
            vec!["outreach".into()],
            Severity::Severe,
        );
        let result = mgr.create_boundary(invalid, "tester").await;
        assert!(matches!(result, Err(EngineError::Validation(_))));

        // Nothing reached the store.
        assert!(store.list_boundaries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn crud_writes_admin_audit_entries() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(store.clone());
        mgr.initialize().await.unwrap();

        let mut boundary = mgr
            .create_boundary(scope_boundary(Severity::Severe), "ops")
            .await
            .unwrap();
        boundary.name = "renamed scope".into();
        mgr.update_boundary(boundary.clone(), "ops").await.unwrap();
        mgr.delete_boundary(&boundary.id, "ops").await.unwrap();

        let events = store.list_admin_events(0).await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].action, AdminAction::Deleted);
        assert_eq!(events[1].action, AdminAction::Updated);
        assert_eq!(events[2].action, AdminAction::Created);
        assert_eq!(mgr.boundary_count(), 0);
    }

    #[tokio::test]
    async fn update_missing_boundary_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(store);
        mgr.initialize().await.unwrap();

        let result = mgr
            .update_boundary(scope_boundary(Severity::Severe), "ops")
            .await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn validation_covers_type_specific_shapes() {
        let ok = scope_boundary(Severity::Info);
        assert!(validate_boundary(&ok).is_ok());

        let bad_budget = Boundary::new(
            "budget",
            BoundaryKind::Budget {
                budget_id: "b".into(),
                limit: -1.0,
            },
            vec!["op".into()],
            Severity::Severe,
        );
        assert!(validate_boundary(&bad_budget).is_err());

        let bad_hours = Boundary::new(
            "time",
            BoundaryKind::Time {
                allowed_days: vec![0],
                start_hour: 24,
                end_hour: 6,
                utc_offset_minutes: 0,
            },
            vec!["op".into()],
            Severity::Severe,
        );
        assert!(validate_boundary(&bad_hours).is_err());

        let bad_content = Boundary::new(
            "content",
            BoundaryKind::Content {
                content_field: "".into(),
                prohibited_terms: vec![],
                moderation: true,
            },
            vec!["op".into()],
            Severity::Severe,
        );
        assert!(validate_boundary(&bad_content).is_err());

        let no_ops = Boundary::new(
            "empty ops",
            BoundaryKind::Compliance {
                required_fields: vec![],
                require_consent: false,
            },
            vec![],
            Severity::Severe,
        );
        assert!(validate_boundary(&no_ops).is_err());
    }
}
