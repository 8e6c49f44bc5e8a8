use std::cmp::Ordering;

use crate::embedding::Embedder;
use crate::index::{Chunk, ChunkStore};

/// A chunk selected for a query, with its similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

pub struct Retriever {
    store: ChunkStore,
    embedder: Embedder,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: ChunkStore, embedder: Embedder, top_k: usize) -> Self {
        Self {
            store,
            embedder,
            top_k,
        }
    }

    /// Top-K chunks by cosine similarity, descending. Degrades to an empty
    /// result when the index or the embedding backend is unavailable; the
    /// prompt template handles the no-context case.
    pub async fn retrieve(&self, query: &str) -> Vec<RetrievedChunk> {
        let query_embedding = match self.embedder.embed_query(query).await {
            Ok(embedding) => embedding,
            Err(err) => {
                tracing::warn!("Query embedding failed, continuing without context: {}", err);
                return Vec::new();
            }
        };

        let chunks = match self.store.all_chunks().await {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::warn!("Chunk index unavailable, continuing without context: {}", err);
                return Vec::new();
            }
        };

        rank(&query_embedding, chunks, self.top_k)
    }
}

/// Descending similarity; insertion order breaks ties.
fn rank(query: &[f32], chunks: Vec<Chunk>, top_k: usize) -> Vec<RetrievedChunk> {
    let mut scored: Vec<RetrievedChunk> = chunks
        .into_iter()
        .map(|chunk| {
            let score = cosine_similarity(query, &chunk.embedding);
            RetrievedChunk { chunk, score }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    scored.truncate(top_k);
    scored
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}
