//! Engine configuration.
//!
//! One struct per concern, each with sensible defaults, composed into a
//! single `EngineConfig` handed to the facade at construction.

use serde::{Deserialize, Serialize};
use verdict_arbiter::ArbitrationConfig;
use verdict_explain::ExplanationConfig;
use verdict_safety::SafetyConfig;

/// Complete engine configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub arbitration: ArbitrationConfig,
    pub safety: SafetyConfig,
    pub explanation: ExplanationConfig,
}
