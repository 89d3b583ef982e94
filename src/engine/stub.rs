use crate::engine::{AdapterApply, InferenceEngine};
use crate::error::{LoadoutError, Result};
use async_trait::async_trait;

/// Placeholder engine used until a real runtime is wired in.
///
/// Proves the fetch-verify-hand-off pipeline works end to end: sessions
/// record the model size, `run` echoes its input, and adapters are reported
/// [`AdapterApply::Unsupported`].
#[derive(Debug, Default)]
pub struct StubEngine;

/// Session handle produced by [`StubEngine`]
#[derive(Debug)]
pub struct StubSession {
    pub model_bytes: usize,
}

#[async_trait]
impl InferenceEngine for StubEngine {
    type Session = StubSession;

    async fn create_session(&self, model: &[u8]) -> Result<StubSession> {
        if model.is_empty() {
            return Err(LoadoutError::Engine(
                "Cannot create a session from an empty model blob".to_string(),
            ));
        }

        tracing::debug!(bytes = model.len(), "stub session created");
        Ok(StubSession {
            model_bytes: model.len(),
        })
    }

    async fn apply_adapter(
        &self,
        _session: &mut StubSession,
        _adapter: &[u8],
    ) -> Result<AdapterApply> {
        Ok(AdapterApply::Unsupported)
    }

    async fn run(&self, _session: &mut StubSession, inputs: &[u32]) -> Result<Vec<u32>> {
        Ok(inputs.to_vec())
    }

    fn engine_name(&self) -> &str {
        "stub"
    }
}
