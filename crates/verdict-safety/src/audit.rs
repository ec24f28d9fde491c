//! Violation audit log.
//!
//! Violations are append-only: persisted through the violation store and
//! mirrored into a bounded in-memory ring buffer for fast inspection.
//! Context snapshots are sanitized before they reach storage or logs.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::warn;
use verdict_types::{ContextMap, EngineError, EngineResult, Violation};
use verdict_store::{ViolationFilter, ViolationStore};

/// Field names that never reach storage or logs, matched
/// case-insensitively as substrings of the key.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "secret",
    "token",
    "api_key",
    "apikey",
    "authorization",
    "credential",
    "ssn",
    "credit_card",
];

const REDACTED: &str = "[redacted]";

/// Redact sensitive fields from a context snapshot, recursing into nested
/// objects.
pub fn sanitize_context(context: &ContextMap) -> ContextMap {
    let mut sanitized = ContextMap::new();
    for (key, value) in context {
        let lowered = key.to_lowercase();
        if SENSITIVE_KEYS.iter().any(|s| lowered.contains(s)) {
            sanitized.insert(key.clone(), Value::String(REDACTED.to_string()));
        } else if let Value::Object(nested) = value {
            sanitized.insert(key.clone(), Value::Object(sanitize_context(nested)));
        } else {
            sanitized.insert(key.clone(), value.clone());
        }
    }
    sanitized
}

/// Append-only violation log with a most-recent-N ring buffer.
pub struct ViolationLog {
    store: Arc<dyn ViolationStore>,
    ring: RwLock<VecDeque<Violation>>,
    capacity: usize,
}

impl ViolationLog {
    pub fn new(store: Arc<dyn ViolationStore>, capacity: usize) -> Self {
        Self {
            store,
            ring: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// Sanitize, log, buffer, and persist one violation.
    ///
    /// Persistence failures propagate so the caller can fail closed; the
    /// ring buffer entry is kept either way, since losing the in-memory
    /// trace helps no one.
    pub async fn record(&self, mut violation: Violation) -> EngineResult<Violation> {
        violation.context = sanitize_context(&violation.context);

        warn!(
            boundary = %violation.boundary_id,
            boundary_type = %violation.boundary_type,
            severity = violation.severity.as_str(),
            operation = %violation.operation_type,
            message = %violation.message,
            "boundary violation recorded"
        );

        {
            let mut ring = self
                .ring
                .write()
                .map_err(|_| EngineError::Processing("violation ring lock poisoned".to_string()))?;
            if ring.len() == self.capacity {
                ring.pop_front();
            }
            ring.push_back(violation.clone());
        }

        self.store.append_violation(violation.clone()).await?;
        Ok(violation)
    }

    /// Most recent buffered violations, newest first.
    pub fn recent_cached(&self, limit: usize) -> Vec<Violation> {
        match self.ring.read() {
            Ok(ring) => {
                let iter = ring.iter().rev().cloned();
                if limit == 0 {
                    iter.collect()
                } else {
                    iter.take(limit).collect()
                }
            }
            Err(_) => Vec::new(),
        }
    }

    /// Query persisted violations, newest first.
    pub async fn query(
        &self,
        filter: &ViolationFilter,
        limit: usize,
    ) -> EngineResult<Vec<Violation>> {
        Ok(self.store.list_violations(filter, limit).await?)
    }
}
