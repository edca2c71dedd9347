// src/memory/recall/fts_search.rs
// Full-text search arm (§4.3 step 2): delegates to the FTS5 index, scoring
// by rank position since SQLite's `rank` column isn't directly comparable
// across query shapes.

use anyhow::Result;

use super::fusion::SourceHit;
use crate::memory::store::MemoryStore;

pub async fn search(store: &MemoryStore, user_id: &str, query: &str, limit: i64) -> Result<Vec<SourceHit>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let hits = store.fts_search_memories(user_id, query, limit).await?;
    let total = hits.len().max(1);

    Ok(hits
        .into_iter()
        .enumerate()
        .map(|(idx, memory)| SourceHit {
            memory_id: memory.memory_id,
            relevance: 1.0 - (idx as f32 / total as f32) * 0.5,
        })
        .collect())
}
