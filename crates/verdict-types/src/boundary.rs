//! Safety boundary configuration types.
//!
//! A boundary is a configured constraint applied to a class of operations:
//! budget ceilings, rate limits, scope and time restrictions, content and
//! compliance rules, ethics guidelines. Boundaries are stored as documents,
//! cached in memory, and evaluated per operation.

use serde::{Deserialize, Serialize};

use crate::ids::BoundaryId;

/// How serious a violation of a boundary is.
///
/// Ordering matters: enforcement escalates monotonically with severity.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Moderate,
    Severe,
    Critical,
}

impl Severity {
    /// The enforcement ladder for this severity.
    ///
    /// Each step includes everything the previous step triggers:
    /// Info logs, Warning notifies, Moderate throttles, Severe blocks,
    /// Critical additionally requests shutdown.
    pub fn enforcement_actions(&self) -> Vec<EnforcementAction> {
        use EnforcementAction::*;
        match self {
            Severity::Info => vec![Log],
            Severity::Warning => vec![Log, Notify],
            Severity::Moderate => vec![Log, Notify, Throttle],
            Severity::Severe => vec![Log, Notify, Block],
            Severity::Critical => vec![Log, Notify, Block, Shutdown],
        }
    }

    /// Only Severe and Critical violations block the operation.
    pub fn is_blocking(&self) -> bool {
        *self >= Severity::Severe
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Critical => "critical",
        }
    }
}

/// Effect triggered when a boundary is violated.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementAction {
    Log,
    Notify,
    Throttle,
    Block,
    Shutdown,
}

/// A single ethics guideline checked against operation descriptions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthicsGuideline {
    /// Short name for audit messages.
    pub name: String,
    /// Term that flags the guideline when present in a description.
    pub trigger: String,
}

/// Type-specific boundary parameters.
///
/// A closed tagged union: adding a boundary type is a compile-time event,
/// and every evaluator match is exhaustive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "boundary_type", rename_all = "snake_case")]
pub enum BoundaryKind {
    /// Spend ceiling against a tracked budget.
    Budget { budget_id: String, limit: f64 },
    /// Operation count ceiling within a trailing window.
    Rate { limit: u64, window_minutes: u64 },
    /// Domain / action allow-lists.
    Scope {
        #[serde(default)]
        allowed_domains: Option<Vec<String>>,
        #[serde(default)]
        allowed_actions: Option<Vec<String>>,
    },
    /// Allowed days and a daily hour window, which may wrap midnight.
    Time {
        /// Allowed weekdays, `Mon`..`Sun` as chrono weekday numbers (0 = Monday).
        allowed_days: Vec<u8>,
        /// Window start hour, inclusive, 0..=23.
        start_hour: u8,
        /// Window end hour, exclusive, 0..=23. `start > end` wraps midnight.
        end_hour: u8,
        /// Fixed offset from UTC applied before the day/hour check.
        #[serde(default)]
        utc_offset_minutes: i32,
    },
    /// Prohibited-term scan plus optional moderation of a context field.
    Content {
        content_field: String,
        prohibited_terms: Vec<String>,
        #[serde(default)]
        moderation: bool,
    },
    /// Required context fields and consent.
    Compliance {
        required_fields: Vec<String>,
        #[serde(default)]
        require_consent: bool,
    },
    /// Guideline trigger scan plus optional deeper review.
    Ethics {
        guidelines: Vec<EthicsGuideline>,
        #[serde(default)]
        deep_check: bool,
    },
}

impl BoundaryKind {
    /// Stable name used in violations and audit records.
    pub fn name(&self) -> &'static str {
        match self {
            BoundaryKind::Budget { .. } => "budget",
            BoundaryKind::Rate { .. } => "rate",
            BoundaryKind::Scope { .. } => "scope",
            BoundaryKind::Time { .. } => "time",
            BoundaryKind::Content { .. } => "content",
            BoundaryKind::Compliance { .. } => "compliance",
            BoundaryKind::Ethics { .. } => "ethics",
        }
    }
}

/// A configured safety boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub id: BoundaryId,
    pub name: String,
    #[serde(flatten)]
    pub kind: BoundaryKind,
    /// Operation types this boundary applies to.
    pub operation_types: Vec<String>,
    pub severity: Severity,
    pub active: bool,
}

impl Boundary {
    pub fn new(
        name: impl Into<String>,
        kind: BoundaryKind,
        operation_types: Vec<String>,
        severity: Severity,
    ) -> Self {
        Self {
            id: BoundaryId::generate(),
            name: name.into(),
            kind,
            operation_types,
            severity,
            active: true,
        }
    }

    /// Whether this boundary governs the given operation type.
    pub fn applies_to(&self, operation_type: &str) -> bool {
        self.active
            && self
                .operation_types
                .iter()
                .any(|op| op == operation_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enforcement_ladder_is_monotonic() {
        let severities = [
            Severity::Info,
            Severity::Warning,
            Severity::Moderate,
            Severity::Severe,
            Severity::Critical,
        ];

        for pair in severities.windows(2) {
            let lower = pair[0].enforcement_actions();
            let higher = pair[1].enforcement_actions();
            // Every action at the lower severity survives escalation,
            // except Throttle which Block supersedes.
            for action in &lower {
                if *action == EnforcementAction::Throttle {
                    continue;
                }
                assert!(higher.contains(action), "{:?} lost {:?}", pair[1], action);
            }
            assert!(higher.len() >= lower.len());
        }
    }

    #[test]
    fn only_severe_and_critical_block() {
        assert!(!Severity::Info.is_blocking());
        assert!(!Severity::Warning.is_blocking());
        assert!(!Severity::Moderate.is_blocking());
        assert!(Severity::Severe.is_blocking());
        assert!(Severity::Critical.is_blocking());
    }

    #[test]
    fn critical_ladder_includes_shutdown() {
        let actions = Severity::Critical.enforcement_actions();
        for expected in [
            EnforcementAction::Log,
            EnforcementAction::Notify,
            EnforcementAction::Block,
            EnforcementAction::Shutdown,
        ] {
            assert!(actions.contains(&expected));
        }
    }

    #[test]
    fn applies_to_respects_active_flag() {
        let mut boundary = Boundary::new(
            "weekday spend cap",
            BoundaryKind::Budget {
                budget_id: "marketing".into(),
                limit: 500.0,
            },
            vec!["content_generation".into()],
            Severity::Severe,
        );

        assert!(boundary.applies_to("content_generation"));
        assert!(!boundary.applies_to("lead_scoring"));

        boundary.active = false;
        assert!(!boundary.applies_to("content_generation"));
    }

    #[test]
    fn boundary_kind_serde_tag_roundtrip() {
        let boundary = Boundary::new(
            "off-hours freeze",
            BoundaryKind::Time {
                allowed_days: vec![0, 1, 2, 3, 4],
                start_hour: 9,
                end_hour: 17,
                utc_offset_minutes: -300,
            },
            vec!["outreach".into()],
            Severity::Moderate,
        );

        let json = serde_json::to_string(&boundary).unwrap();
        assert!(json.contains("\"boundary_type\":\"time\""));
        let restored: Boundary = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, boundary);
    }
}
