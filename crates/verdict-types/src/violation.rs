//! Boundary violation records. Append-only; never edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::boundary::Severity;
use crate::decision::ContextMap;
use crate::ids::BoundaryId;

/// A recorded boundary violation.
///
/// The context snapshot is sanitized before construction; sensitive keys
/// never reach storage or logs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Violation {
    pub boundary_id: BoundaryId,
    /// Stable boundary type name (`budget`, `rate`, ...). `system` for
    /// violations synthesized from internal failures.
    pub boundary_type: String,
    pub severity: Severity,
    pub message: String,
    pub operation_type: String,
    pub context: ContextMap,
    pub timestamp: DateTime<Utc>,
}

impl Violation {
    pub fn new(
        boundary_id: BoundaryId,
        boundary_type: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        operation_type: impl Into<String>,
        context: ContextMap,
    ) -> Self {
        Self {
            boundary_id,
            boundary_type: boundary_type.into(),
            severity,
            message: message.into(),
            operation_type: operation_type.into(),
            context,
            timestamp: Utc::now(),
        }
    }

    /// Whether this violation blocks the operation that produced it.
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_follows_severity() {
        let violation = Violation::new(
            BoundaryId::generate(),
            "rate",
            Severity::Severe,
            "rate limit exceeded",
            "outreach",
            ContextMap::new(),
        );
        assert!(violation.is_blocking());

        let advisory = Violation::new(
            BoundaryId::generate(),
            "scope",
            Severity::Warning,
            "domain outside scope",
            "outreach",
            ContextMap::new(),
        );
        assert!(!advisory.is_blocking());
    }
}
