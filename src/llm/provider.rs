use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::LlmError;

/// Seam to the model runtime. Implementations map every transport or backend
/// failure into an [`LlmError`]; raw errors never cross this boundary.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> Result<bool, LlmError>;

    /// Chat completion (non-streaming).
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, LlmError>;

    /// Generate one embedding per input text.
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, LlmError>;
}
