//! Explainability engine for Verdict decisions.
//!
//! Given a committed decision, produces weighted factors, a confidence
//! decomposition, an audience-tailored narrative, optional counterfactuals,
//! and a reconstructed decision trace. Generation is best-effort: every
//! step that leans on the text service degrades to a deterministic,
//! clearly tagged fallback instead of failing the call.

#![deny(unsafe_code)]

pub mod confidence;
pub mod engine;
pub mod factors;
pub mod mocks;
pub mod narrative;
pub mod textgen;
pub mod trace;

pub use engine::{ExplainabilityEngine, ExplanationConfig, ExplanationRequest, TraceRequest};
pub use textgen::{retry_with_backoff, TextGenerator};
