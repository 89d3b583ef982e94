//! External collaborator contracts
//!
//! The core hands verified model bytes to an inference engine and token ids
//! to a tokenizer; it performs no inference, sampling, or tokenization
//! itself. Any conforming implementation can be substituted at these seams.

pub mod stub;

use crate::error::Result;
use async_trait::async_trait;

pub use stub::StubEngine;

/// Outcome of an adapter application attempt.
///
/// Adapter support is a capability that varies per engine, not a guarantee:
/// an engine that cannot patch weights reports `Unsupported` instead of
/// erroring, keeping the orchestrator interface stable across engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterApply {
    Applied,
    /// No adapter requested; base model only
    Skipped,
    Unsupported,
}

/// Unified interface for inference engines
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    type Session: Send;

    /// Construct a session from verified model bytes
    async fn create_session(&self, model: &[u8]) -> Result<Self::Session>;

    /// Attempt to apply adapter bytes to a session
    async fn apply_adapter(
        &self,
        session: &mut Self::Session,
        adapter: &[u8],
    ) -> Result<AdapterApply>;

    /// Run one step over token ids
    async fn run(&self, session: &mut Self::Session, inputs: &[u32]) -> Result<Vec<u32>>;

    /// Engine name for logging/debugging
    fn engine_name(&self) -> &str;
}

/// Unified interface for tokenizers
#[async_trait]
pub trait Tokenizer: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<u32>>;
    async fn decode(&self, ids: &[u32]) -> Result<String>;
}
