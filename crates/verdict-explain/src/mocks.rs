//! Mock text generators for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use verdict_types::{EngineError, EngineResult};

use crate::textgen::TextGenerator;

/// Returns the same text for every prompt.
pub struct StaticTextGenerator {
    output: String,
    calls: AtomicU32,
}

impl StaticTextGenerator {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for StaticTextGenerator {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> EngineResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

/// Returns scripted outputs in sequence, then repeats the last one.
pub struct ScriptedTextGenerator {
    outputs: RwLock<Vec<String>>,
    cursor: AtomicU32,
}

impl ScriptedTextGenerator {
    pub fn new(outputs: Vec<&str>) -> Self {
        Self {
            outputs: RwLock::new(outputs.into_iter().map(String::from).collect()),
            cursor: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedTextGenerator {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> EngineResult<String> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) as usize;
        let outputs = self
            .outputs
            .read()
            .map_err(|_| EngineError::Processing("script lock poisoned".to_string()))?;
        outputs
            .get(index.min(outputs.len().saturating_sub(1)))
            .cloned()
            .ok_or_else(|| EngineError::AiService("script exhausted".to_string()))
    }
}

/// Errors on every call.
pub struct FailingTextGenerator {
    calls: AtomicU32,
}

impl FailingTextGenerator {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FailingTextGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for FailingTextGenerator {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> EngineResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EngineError::AiService(
            "mock text service unavailable".to_string(),
        ))
    }
}

/// Fails a fixed number of times, then succeeds.
pub struct FlakyTextGenerator {
    fail_times: u32,
    output: String,
    calls: AtomicU32,
}

impl FlakyTextGenerator {
    pub fn new(fail_times: u32, output: impl Into<String>) -> Self {
        Self {
            fail_times,
            output: output.into(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FlakyTextGenerator {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> EngineResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_times {
            Err(EngineError::AiService("mock transient failure".to_string()))
        } else {
            Ok(self.output.clone())
        }
    }
}
