//! Verdict engine facade.
//!
//! One decision flows: safety pre-check, concurrent ensemble and policy
//! recommendations, arbitration, persistence, optional explanation. A
//! second flow feeds observed outcomes back into the policy engine. The
//! facade holds every collaborator by injected reference; there is no
//! process-global state.

#![deny(unsafe_code)]

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::{DecisionEngine, DecisionResponse};
