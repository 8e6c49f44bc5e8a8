use std::sync::Arc;

use crate::core::config::{AppPaths, Settings};
use crate::core::errors::InitializationError;
use crate::core::security::{init_api_token, ApiToken};
use crate::embedding::Embedder;
use crate::engine::ChatEngine;
use crate::index::ChunkStore;
use crate::llm::{LlmProvider, OllamaProvider};
use crate::retrieval::Retriever;

/// Global application state shared across all routes.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Arc<Settings>,
    pub api_token: ApiToken,
    pub engine: ChatEngine,
}

impl AppState {
    /// Initializes configuration, the chunk index, the inference provider,
    /// and the chat engine. Failures here are fatal; per-request failures
    /// are handled downstream.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let settings = Arc::new(Settings::load(&paths)?);
        let api_token = init_api_token(settings.server.api_token.as_deref(), &paths);

        let index_path = settings.index_path(&paths);
        let store = ChunkStore::open(&index_path).await?;
        match store.count_chunks().await {
            Ok(0) => tracing::warn!(
                "Chunk index at {} is empty; answers will not be grounded",
                index_path.display()
            ),
            Ok(count) => tracing::info!("Loaded chunk index with {} chunks", count),
            Err(err) => tracing::warn!("Failed to count chunks: {}", err),
        }

        let provider: Arc<dyn LlmProvider> =
            Arc::new(OllamaProvider::new(settings.ollama.base_url.clone()));
        if let Ok(false) = provider.health_check().await {
            tracing::warn!(
                "Inference backend at {} is not reachable yet",
                settings.ollama.base_url
            );
        }

        let embedder = Embedder::new(provider.clone(), settings.models.embedding.clone());
        let retriever = Retriever::new(store, embedder, settings.retrieval.top_k);
        let engine = ChatEngine::new(provider, retriever, &settings);

        Ok(Arc::new(AppState {
            paths,
            settings,
            api_token,
            engine,
        }))
    }
}
