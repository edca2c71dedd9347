// src/memory/recall/engine.rs
// Hybrid recall engine orchestrator (§4.3).

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::RecallConfig;
use crate::llm::EmbeddingProvider;
use crate::memory::store::MemoryStore;
use crate::memory::types::Memory;
use crate::memory::vector::VectorStore;
use crate::utils::deadline::with_soft_deadline;

use super::fusion::{fuse, FusedCandidate, SourceHit};
use super::query_preprocess::preprocess;
use super::rank::{dedupe_pattern_collisions, rank, truncate};
use super::{fts_search, keyword_search, vector_search};

pub struct RecallEngine {
    store: MemoryStore,
    vector_store: Option<Arc<VectorStore>>,
    embeddings: Option<Arc<dyn EmbeddingProvider>>,
    config: RecallConfig,
}

pub struct RecallRequest<'a> {
    pub user_id: &'a str,
    pub thread_id: &'a str,
    pub query: &'a str,
    pub max_items: Option<usize>,
    pub deadline_ms: Option<u64>,
}

impl RecallEngine {
    pub fn new(
        store: MemoryStore,
        vector_store: Option<Arc<VectorStore>>,
        embeddings: Option<Arc<dyn EmbeddingProvider>>,
        config: RecallConfig,
    ) -> Self {
        Self {
            store,
            vector_store,
            embeddings,
            config,
        }
    }

    /// Returns the most relevant live memories for a turn, never failing —
    /// degrading to an empty vector if the deadline is missed (§4.3 final
    /// paragraph).
    pub async fn recall(&self, request: RecallRequest<'_>) -> Vec<Memory> {
        let max_items = request.max_items.unwrap_or(self.config.max_items);
        let deadline_ms = request.deadline_ms.unwrap_or(self.config.deadline_ms);

        let preprocessed = preprocess(request.query);

        let work = self.gather(request.user_id, &preprocessed.normalized, &preprocessed.terms, max_items);

        let Some((fts_hits, vector_hits, keyword_hits, by_id)) = with_soft_deadline(deadline_ms, work).await else {
            debug!(user_id = request.user_id, "recall missed soft deadline, returning empty");
            return Vec::new();
        };

        let fused = fuse(&fts_hits, &vector_hits, &keyword_hits, &by_id, &self.config);
        let ranked = rank(fused, request.thread_id);
        let deduped = dedupe_pattern_collisions(ranked, 0.8);
        truncate(deduped, max_items)
            .into_iter()
            .map(|c: FusedCandidate| c.memory)
            .collect()
    }

    async fn gather(
        &self,
        user_id: &str,
        normalized_query: &str,
        query_terms: &[String],
        max_items: usize,
    ) -> (Vec<SourceHit>, Vec<SourceHit>, Vec<SourceHit>, HashMap<String, Memory>) {
        let fetch_limit = (max_items * 4).max(20) as i64;

        let candidates = self
            .store
            .live_memories_for_user(user_id, fetch_limit)
            .await
            .unwrap_or_default();

        let fts_hits = fts_search::search(&self.store, user_id, normalized_query, fetch_limit)
            .await
            .unwrap_or_default();

        let vector_hits = if let (Some(vector_store), Some(embeddings)) = (&self.vector_store, &self.embeddings) {
            vector_search::search(
                vector_store,
                embeddings.as_ref(),
                user_id,
                normalized_query,
                fetch_limit as usize,
                self.config.vector_similarity_threshold,
            )
            .await
            .unwrap_or_default()
        } else {
            Vec::new()
        };

        let keyword_hits = keyword_search::search(query_terms, &candidates);

        let mut by_id: HashMap<String, Memory> =
            candidates.into_iter().map(|m| (m.memory_id.clone(), m)).collect();

        // FTS/vector search their own indexes independently of the recency
        // window above; backfill any hit whose memory wasn't already loaded.
        let missing_ids: Vec<String> = fts_hits
            .iter()
            .chain(vector_hits.iter())
            .map(|hit| hit.memory_id.clone())
            .filter(|id| !by_id.contains_key(id))
            .collect();

        for id in missing_ids {
            if let Ok(Some(memory)) = self.store.memory_by_id(&id).await {
                by_id.insert(id, memory);
            }
        }

        (fts_hits, vector_hits, keyword_hits, by_id)
    }
}
