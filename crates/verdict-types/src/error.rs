use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error taxonomy shared across Verdict crates.
///
/// Validation and not-found errors propagate to callers as typed failures.
/// Database and AI-service errors are retryable on read paths before the
/// caller degrades to a safe fallback. Arbitration and policy-update
/// failures never surface as raw errors; they become structured
/// error-response results instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("ai service error: {0}")]
    AiService(String),

    #[error("processing error: {0}")]
    Processing(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl EngineError {
    /// Whether a bounded retry is worth attempting.
    ///
    /// Only transient collaborator failures qualify; bad input and missing
    /// records will not heal on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Database(_) | EngineError::AiService(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(EngineError::Database("io".into()).is_retryable());
        assert!(EngineError::AiService("timeout".into()).is_retryable());
        assert!(!EngineError::Validation("bad".into()).is_retryable());
        assert!(!EngineError::NotFound("gone".into()).is_retryable());
        assert!(!EngineError::Processing("bug".into()).is_retryable());
    }

    #[test]
    fn error_display_includes_detail() {
        let err = EngineError::AiService("generation failed".into());
        assert!(err.to_string().contains("generation failed"));
    }
}
