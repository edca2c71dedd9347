// src/gateway/ingestion.rs
// Ingestion context collaborator (§1, §4.5/§4.7 "ingestion chunks"). A
// fixed external interface, same treatment as `LlmProvider` — the document
// store and its retrieval ranking live outside this crate's core scope.

use async_trait::async_trait;

/// One retrieved chunk of a previously ingested document.
#[derive(Debug, Clone)]
pub struct IngestionChunk {
    pub document_title: String,
    pub excerpt: String,
}

#[async_trait]
pub trait IngestionProvider: Send + Sync {
    /// Returns the top ingested chunks relevant to `query` for this user,
    /// most relevant first. Empty when the user has no ingested documents
    /// or nothing matches.
    async fn relevant_chunks(&self, user_id: &str, query: &str, limit: usize) -> anyhow::Result<Vec<IngestionChunk>>;
}
