//! Storage-level records and query filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verdict_types::{Boundary, BoundaryId, Severity, Violation};

/// Change-feed event for the boundary collection.
///
/// Delivered to subscribers whenever a boundary document is written or
/// removed, so in-memory caches converge on the stored configuration.
#[derive(Clone, Debug)]
pub enum BoundaryEvent {
    Upserted(Boundary),
    Removed(BoundaryId),
}

/// Administrative action on the boundary collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Created,
    Updated,
    Deleted,
}

/// Audit record for boundary administration, distinct from violation
/// logging. Append-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminAuditEvent {
    pub actor: String,
    pub action: AdminAction,
    pub boundary_id: BoundaryId,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl AdminAuditEvent {
    pub fn new(
        actor: impl Into<String>,
        action: AdminAction,
        boundary_id: BoundaryId,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action,
            boundary_id,
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Filter for querying recorded violations.
#[derive(Clone, Debug, Default)]
pub struct ViolationFilter {
    pub boundary_type: Option<String>,
    pub severity: Option<Severity>,
    pub operation_type: Option<String>,
}

impl ViolationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boundary_type(mut self, boundary_type: impl Into<String>) -> Self {
        self.boundary_type = Some(boundary_type.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_operation_type(mut self, operation_type: impl Into<String>) -> Self {
        self.operation_type = Some(operation_type.into());
        self
    }

    /// Check if a violation matches this filter.
    pub fn matches(&self, violation: &Violation) -> bool {
        if let Some(ref boundary_type) = self.boundary_type {
            if violation.boundary_type != *boundary_type {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if violation.severity != severity {
                return false;
            }
        }
        if let Some(ref operation_type) = self.operation_type {
            if violation.operation_type != *operation_type {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_types::ContextMap;

    fn violation(boundary_type: &str, severity: Severity, op: &str) -> Violation {
        Violation::new(
            BoundaryId::generate(),
            boundary_type,
            severity,
            "test",
            op,
            ContextMap::new(),
        )
    }

    #[test]
    fn filter_matches_on_all_axes() {
        let v = violation("rate", Severity::Severe, "outreach");

        assert!(ViolationFilter::new().matches(&v));
        assert!(ViolationFilter::new().with_boundary_type("rate").matches(&v));
        assert!(!ViolationFilter::new().with_boundary_type("budget").matches(&v));
        assert!(ViolationFilter::new().with_severity(Severity::Severe).matches(&v));
        assert!(!ViolationFilter::new().with_severity(Severity::Info).matches(&v));
        assert!(!ViolationFilter::new()
            .with_operation_type("billing")
            .matches(&v));
        assert!(ViolationFilter::new()
            .with_boundary_type("rate")
            .with_severity(Severity::Severe)
            .with_operation_type("outreach")
            .matches(&v));
    }
}
