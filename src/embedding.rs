use std::sync::Arc;

use crate::core::errors::LlmError;
use crate::llm::LlmProvider;

/// Task prefix the index was built with. Query and document sides must stay
/// in lockstep or similarity scores are meaningless.
const TASK_PREFIX: &str = "title: none | text: ";

pub fn prefixed(text: &str) -> String {
    format!("{}{}", TASK_PREFIX, text)
}

/// Embedding function over the inference provider's embedding endpoint.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn LlmProvider>,
    model_id: String,
}

impl Embedder {
    pub fn new(provider: Arc<dyn LlmProvider>, model_id: String) -> Self {
        Self { provider, model_id }
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let embeddings = self
            .provider
            .embed(&[prefixed(text)], &self.model_id)
            .await?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Malformed("embedding backend returned no vectors".to_string()))
    }
}
