//! Text-generation port.
//!
//! The generative text service is an external collaborator used only for
//! factor extraction and narrative synthesis. It may be slow, error, or
//! return unparsable output; callers retry transient failures and then
//! degrade rather than propagate.

use async_trait::async_trait;
use verdict_types::EngineResult;

pub use verdict_store::retry_with_backoff;

/// Generative text collaborator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> EngineResult<String>;
}
