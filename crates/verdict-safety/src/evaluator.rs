//! Per-boundary evaluation.
//!
//! The evaluator dispatches on the boundary kind and answers one question:
//! does this operation comply? Evaluation of a single boundary is a pure
//! function of the boundary, the operation context, and the collaborator
//! lookups it needs (budget spend, operation counts, moderation, ethics).
//! Any internal failure escalates to a blocking violation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Utc};
use tracing::{debug, warn};
use verdict_types::{
    Boundary, BoundaryKind, ContextMap, EngineError, EnforcementAction, EthicsGuideline, Severity,
};
use verdict_store::{retry_with_backoff, BudgetStore, OperationStore};

/// Bounded retry for collaborator reads before failing closed.
const READ_RETRY_ATTEMPTS: u32 = 3;
const READ_RETRY_BASE_DELAY_MS: u64 = 25;

/// Moderation collaborator for content boundaries.
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    async fn review_content(&self, content: &str) -> Result<ModerationVerdict, EngineError>;
}

/// Outcome of a moderation review.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModerationVerdict {
    Approved,
    Rejected { reason: String },
}

/// Deeper-review collaborator for ethics boundaries.
#[async_trait]
pub trait EthicsProvider: Send + Sync {
    /// `Ok(true)` means the operation passes the deeper check.
    async fn review(&self, operation_type: &str, context: &ContextMap)
        -> Result<bool, EngineError>;
}

/// Result of evaluating one boundary against one operation.
#[derive(Clone, Debug)]
pub struct BoundaryCheck {
    pub compliant: bool,
    pub message: String,
    /// Severity the violation carries; escalated to at least Severe when
    /// the evaluation itself failed.
    pub severity: Severity,
    pub blocking: bool,
    pub enforcement_actions: Vec<EnforcementAction>,
}

impl BoundaryCheck {
    fn pass(boundary: &Boundary) -> Self {
        Self {
            compliant: true,
            message: format!("{} within bounds", boundary.name),
            severity: boundary.severity,
            blocking: false,
            enforcement_actions: Vec::new(),
        }
    }

    fn violation(boundary: &Boundary, message: String) -> Self {
        Self {
            compliant: false,
            message,
            severity: boundary.severity,
            blocking: boundary.severity.is_blocking(),
            enforcement_actions: boundary.severity.enforcement_actions(),
        }
    }

    /// Fail-closed result for an evaluation that errored or timed out.
    /// Severity is escalated to at least Severe so the operation blocks.
    pub fn fail_closed(boundary: &Boundary, message: String) -> Self {
        let severity = boundary.severity.max(Severity::Severe);
        Self {
            compliant: false,
            message,
            severity,
            blocking: true,
            enforcement_actions: severity.enforcement_actions(),
        }
    }
}

/// Evaluates configured boundaries against operation contexts.
pub struct BoundaryEvaluator {
    budgets: Arc<dyn BudgetStore>,
    operations: Arc<dyn OperationStore>,
    moderation: Arc<dyn ModerationProvider>,
    ethics: Arc<dyn EthicsProvider>,
}

impl BoundaryEvaluator {
    pub fn new(
        budgets: Arc<dyn BudgetStore>,
        operations: Arc<dyn OperationStore>,
        moderation: Arc<dyn ModerationProvider>,
        ethics: Arc<dyn EthicsProvider>,
    ) -> Self {
        Self {
            budgets,
            operations,
            moderation,
            ethics,
        }
    }

    /// Evaluate one boundary. Never returns an error: internal failures
    /// are retried while transient, then become blocking, escalated
    /// violations.
    pub async fn evaluate(
        &self,
        boundary: &Boundary,
        operation_type: &str,
        context: &ContextMap,
    ) -> BoundaryCheck {
        let attempt = retry_with_backoff(
            READ_RETRY_ATTEMPTS,
            std::time::Duration::from_millis(READ_RETRY_BASE_DELAY_MS),
            || self.try_evaluate(boundary, operation_type, context),
        )
        .await;

        match attempt {
            Ok(None) => {
                debug!(boundary = %boundary.id, "boundary compliant");
                BoundaryCheck::pass(boundary)
            }
            Ok(Some(message)) => {
                warn!(
                    boundary = %boundary.id,
                    severity = boundary.severity.as_str(),
                    %message,
                    "boundary violated"
                );
                BoundaryCheck::violation(boundary, message)
            }
            Err(err) => {
                warn!(
                    boundary = %boundary.id,
                    error = %err,
                    "boundary evaluation failed, treating as violation"
                );
                BoundaryCheck::fail_closed(
                    boundary,
                    format!("evaluation of {} failed: {}", boundary.name, err),
                )
            }
        }
    }

    /// `Ok(None)` means compliant, `Ok(Some(message))` a violation, and
    /// `Err` an internal failure the caller must fail closed on.
    async fn try_evaluate(
        &self,
        boundary: &Boundary,
        operation_type: &str,
        context: &ContextMap,
    ) -> Result<Option<String>, EngineError> {
        match &boundary.kind {
            BoundaryKind::Budget { budget_id, limit } => {
                self.check_budget(budget_id, *limit, context).await
            }
            BoundaryKind::Rate {
                limit,
                window_minutes,
            } => {
                self.check_rate(operation_type, *limit, *window_minutes)
                    .await
            }
            BoundaryKind::Scope {
                allowed_domains,
                allowed_actions,
            } => Ok(check_scope(
                allowed_domains.as_deref(),
                allowed_actions.as_deref(),
                context,
            )),
            BoundaryKind::Time {
                allowed_days,
                start_hour,
                end_hour,
                utc_offset_minutes,
            } => Ok(check_time_at(
                Utc::now(),
                allowed_days,
                *start_hour,
                *end_hour,
                *utc_offset_minutes,
            )),
            BoundaryKind::Content {
                content_field,
                prohibited_terms,
                moderation,
            } => {
                self.check_content(content_field, prohibited_terms, *moderation, context)
                    .await
            }
            BoundaryKind::Compliance {
                required_fields,
                require_consent,
            } => Ok(check_compliance(required_fields, *require_consent, context)),
            BoundaryKind::Ethics {
                guidelines,
                deep_check,
            } => {
                self.check_ethics(guidelines, *deep_check, operation_type, context)
                    .await
            }
        }
    }

    async fn check_budget(
        &self,
        budget_id: &str,
        limit: f64,
        context: &ContextMap,
    ) -> Result<Option<String>, EngineError> {
        let cost = context
            .get("cost")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        // A missing budget record never grants headroom.
        let Some(spend) = self.budgets.current_spend(budget_id).await? else {
            return Ok(Some(format!(
                "budget {} has no spend record, denying by default",
                budget_id
            )));
        };

        if spend + cost > limit {
            Ok(Some(format!(
                "budget {} exceeded: spend {:.2} + cost {:.2} over limit {:.2}",
                budget_id, spend, cost, limit
            )))
        } else {
            Ok(None)
        }
    }

    async fn check_rate(
        &self,
        operation_type: &str,
        limit: u64,
        window_minutes: u64,
    ) -> Result<Option<String>, EngineError> {
        let since = Utc::now() - Duration::minutes(window_minutes as i64);
        let count = self
            .operations
            .count_operations_since(operation_type, since)
            .await?;

        if count >= limit {
            Ok(Some(format!(
                "rate limit reached for {}: {} operations in the last {} minutes (limit {})",
                operation_type, count, window_minutes, limit
            )))
        } else {
            Ok(None)
        }
    }

    async fn check_content(
        &self,
        content_field: &str,
        prohibited_terms: &[String],
        moderation: bool,
        context: &ContextMap,
    ) -> Result<Option<String>, EngineError> {
        let content = context
            .get(content_field)
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let lowered = content.to_lowercase();

        for term in prohibited_terms {
            if lowered.contains(&term.to_lowercase()) {
                return Ok(Some(format!(
                    "prohibited term \"{}\" found in {}",
                    term, content_field
                )));
            }
        }

        if moderation {
            match self.moderation.review_content(content).await? {
                ModerationVerdict::Approved => {}
                ModerationVerdict::Rejected { reason } => {
                    return Ok(Some(format!("moderation rejected content: {}", reason)));
                }
            }
        }

        Ok(None)
    }

    async fn check_ethics(
        &self,
        guidelines: &[EthicsGuideline],
        deep_check: bool,
        operation_type: &str,
        context: &ContextMap,
    ) -> Result<Option<String>, EngineError> {
        let description = context
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_lowercase();

        for guideline in guidelines {
            if description.contains(&guideline.trigger.to_lowercase()) {
                return Ok(Some(format!(
                    "ethics guideline \"{}\" triggered by \"{}\"",
                    guideline.name, guideline.trigger
                )));
            }
        }

        if deep_check && !self.ethics.review(operation_type, context).await? {
            return Ok(Some("deeper ethics review did not pass".to_string()));
        }

        Ok(None)
    }
}

fn check_scope(
    allowed_domains: Option<&[String]>,
    allowed_actions: Option<&[String]>,
    context: &ContextMap,
) -> Option<String> {
    if let Some(domains) = allowed_domains {
        let domain = context.get("domain").and_then(|v| v.as_str());
        if !domain.is_some_and(|d| domains.iter().any(|allowed| allowed == d)) {
            return Some(format!(
                "domain {:?} is outside the allowed scope",
                domain.unwrap_or("<missing>")
            ));
        }
    }

    if let Some(actions) = allowed_actions {
        let action = context.get("action").and_then(|v| v.as_str());
        if !action.is_some_and(|a| actions.iter().any(|allowed| allowed == a)) {
            return Some(format!(
                "action {:?} is outside the allowed scope",
                action.unwrap_or("<missing>")
            ));
        }
    }

    None
}

/// Whether `hour` falls inside `[start, end)`, wrapping midnight when
/// `start > end` (the window is then `[start, 24)` plus `[0, end)`).
fn hour_in_window(hour: u8, start: u8, end: u8) -> bool {
    if start == end {
        // Degenerate window covers the whole day.
        true
    } else if start < end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// Time check against an explicit instant, so tests can pin the clock.
fn check_time_at(
    now: DateTime<Utc>,
    allowed_days: &[u8],
    start_hour: u8,
    end_hour: u8,
    utc_offset_minutes: i32,
) -> Option<String> {
    let offset =
        FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    let local = now.with_timezone(&offset);
    let day = local.weekday().num_days_from_monday() as u8;
    let hour = local.hour() as u8;

    if !allowed_days.contains(&day) {
        return Some(format!("operations are not allowed on weekday {}", day));
    }

    if !hour_in_window(hour, start_hour, end_hour) {
        return Some(format!(
            "hour {} is outside the allowed window [{}, {})",
            hour, start_hour, end_hour
        ));
    }

    None
}

fn check_compliance(
    required_fields: &[String],
    require_consent: bool,
    context: &ContextMap,
) -> Option<String> {
    for field in required_fields {
        if !context.contains_key(field) {
            return Some(format!("required field {} is missing", field));
        }
    }

    if require_consent {
        let consented = context
            .get("has_consent")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !consented {
            return Some("operation requires consent and none was recorded".to_string());
        }
    }

    None
}
