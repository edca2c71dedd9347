// src/memory/recall/vector_search.rs
// Vector search arm (§4.3 step 2): cosine similarity against the query
// embedding, thresholded.

use anyhow::Result;

use super::fusion::SourceHit;
use crate::llm::EmbeddingProvider;
use crate::memory::vector::VectorStore;

pub async fn search(
    vector_store: &VectorStore,
    embeddings: &dyn EmbeddingProvider,
    user_id: &str,
    query: &str,
    limit: usize,
    similarity_threshold: f32,
) -> Result<Vec<SourceHit>> {
    let query_embedding = embeddings.embed(query).await?;
    let hits = vector_store.search(user_id, &query_embedding, limit).await?;

    Ok(hits
        .into_iter()
        .filter(|h| h.score >= similarity_threshold)
        .map(|h| SourceHit {
            memory_id: h.memory_id,
            relevance: h.score,
        })
        .collect())
}
