//! In-process safety counters.
//!
//! Uses `RwLock` for thread-safe interior mutability so the manager can be
//! shared across async tasks. Counters are cheap enough to keep on by
//! default; a disabled collector is a no-op.

use std::collections::HashMap;
use std::sync::RwLock;

use verdict_types::Severity;

/// Counter collector for boundary enforcement.
pub struct SafetyMetrics {
    enabled: bool,
    counters: RwLock<HashMap<String, u64>>,
}

impl SafetyMetrics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            counters: RwLock::new(HashMap::new()),
        }
    }

    /// Record a completed boundary check.
    pub fn check_completed(&self, allowed: bool) {
        if !self.enabled {
            return;
        }
        self.increment("checks_total");
        if !allowed {
            self.increment("checks_denied");
        }
    }

    /// Record a recorded violation.
    pub fn violation_recorded(&self, severity: Severity) {
        if !self.enabled {
            return;
        }
        self.increment("violations_total");
        self.increment(&format!("violations_{}", severity.as_str()));
    }

    /// Record a fail-closed denial caused by an internal error.
    pub fn fail_closed(&self) {
        if !self.enabled {
            return;
        }
        self.increment("fail_closed_total");
    }

    /// Current counter values.
    pub fn snapshot(&self) -> HashMap<String, u64> {
        match self.counters.read() {
            Ok(guard) => guard.clone(),
            Err(_) => HashMap::new(),
        }
    }

    fn increment(&self, counter: &str) {
        if let Ok(mut guard) = self.counters.write() {
            *guard.entry(counter.to_string()).or_insert(0) += 1;
        }
    }
}
