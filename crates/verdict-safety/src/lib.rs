//! Safety boundary enforcement for the Verdict decision engine.
//!
//! Every operation is checked against the configured boundaries before any
//! recommendation work starts. The discipline throughout is fail-closed:
//! an evaluator error, a timeout, or a storage failure is treated as a
//! blocking violation, never as permission.

#![deny(unsafe_code)]

pub mod audit;
pub mod evaluator;
pub mod manager;
pub mod metrics;
pub mod mocks;

pub use audit::{sanitize_context, ViolationLog};
pub use evaluator::{
    BoundaryCheck, BoundaryEvaluator, EthicsProvider, ModerationProvider, ModerationVerdict,
};
pub use manager::{BoundaryDecision, SafetyBoundaryManager, SafetyConfig};
pub use metrics::SafetyMetrics;
