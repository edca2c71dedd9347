// src/unlimited_recall/loader.rs
// Loader strategy selection and context assembly (§4.4 Loader strategies).

use std::sync::Arc;

use crate::config::UnlimitedRecallConfig;
use crate::llm::EmbeddingProvider;
use crate::utils::text::{cosine_similarity, jaccard_similarity};

use super::store::UnlimitedRecallStore;
use super::types::{CapturedMessage, LoaderStrategy, RecallContext, TriggerDetection, TriggerKind};

/// How far back to search for the semantic anchor message — bounds the
/// number of on-the-fly embedding calls for very long threads.
const ANCHOR_SEARCH_WINDOW: usize = 200;

/// Picks the strategy for a normal (non-triggered) continuation of the
/// current thread, based purely on its accumulated token count.
pub fn choose_strategy(total_tokens: i64, config: &UnlimitedRecallConfig) -> LoaderStrategy {
    if total_tokens <= config.full_load_token_ceiling {
        LoaderStrategy::Full
    } else if total_tokens <= config.hierarchical_token_ceiling {
        LoaderStrategy::Hierarchical
    } else {
        LoaderStrategy::Compressed
    }
}

/// Assembles the recall context for `thread_id` per the chosen strategy
/// (§4.4 Loader strategies table). `trigger` is `Some` when this load was
/// driven by a resume/historical/semantic match — `snippet` only applies
/// then.
#[allow(clippy::too_many_arguments)]
pub async fn load(
    store: &UnlimitedRecallStore,
    thread_id: &str,
    total_tokens: i64,
    summary: Option<&str>,
    trigger: Option<&TriggerDetection>,
    query: &str,
    embeddings: Option<&Arc<dyn EmbeddingProvider>>,
    config: &UnlimitedRecallConfig,
) -> anyhow::Result<RecallContext> {
    if let Some(trigger) = trigger {
        if matches!(trigger.kind, TriggerKind::Historical | TriggerKind::Semantic) {
            return load_snippet(store, thread_id, trigger, query, embeddings, summary, config).await;
        }
    }

    match choose_strategy(total_tokens, config) {
        LoaderStrategy::Full => load_full(store, thread_id, summary).await,
        LoaderStrategy::Hierarchical => load_hierarchical(store, thread_id, summary, config).await,
        LoaderStrategy::Compressed => Ok(RecallContext {
            strategy: LoaderStrategy::Compressed,
            thread_id: thread_id.to_string(),
            messages: Vec::new(),
            summary: summary.map(str::to_string),
            skipped_span_note: Some("full transcript omitted".to_string()),
        }),
        LoaderStrategy::Snippet => unreachable!("snippet only selected via an active trigger"),
    }
}

async fn load_full(store: &UnlimitedRecallStore, thread_id: &str, summary: Option<&str>) -> anyhow::Result<RecallContext> {
    let messages = store.messages_for_thread(thread_id, 100_000, 0).await?;
    Ok(RecallContext {
        strategy: LoaderStrategy::Full,
        thread_id: thread_id.to_string(),
        messages,
        summary: summary.map(str::to_string),
        skipped_span_note: None,
    })
}

async fn load_hierarchical(
    store: &UnlimitedRecallStore,
    thread_id: &str,
    summary: Option<&str>,
    config: &UnlimitedRecallConfig,
) -> anyhow::Result<RecallContext> {
    let edge = config.hierarchical_edge_messages;
    let total = store.message_count(thread_id).await?;
    let head = store.messages_for_thread(thread_id, edge as i64, 0).await?;

    let tail_offset = (total - edge as i64).max(edge as i64);
    let tail = store.messages_for_thread(thread_id, edge as i64, tail_offset).await?;

    let middle_candidates = if total > (edge as i64) * 2 {
        store
            .messages_for_thread(thread_id, (total - edge as i64 * 2).max(0), edge as i64)
            .await?
    } else {
        Vec::new()
    };
    let important_middle = select_important(&middle_candidates, edge);

    let mut messages = head;
    messages.extend(important_middle);
    messages.extend(tail);
    messages.sort_by_key(|m| m.created_at);
    messages.dedup_by_key(|m| m.message_id.clone());

    let skipped = (total - messages.len() as i64).max(0);

    Ok(RecallContext {
        strategy: LoaderStrategy::Hierarchical,
        thread_id: thread_id.to_string(),
        messages,
        summary: summary.map(str::to_string),
        skipped_span_note: (skipped > 0).then(|| format!("{skipped} messages summarized, not shown in full")),
    })
}

/// Heuristic importance: longer messages and ones containing a code fence
/// are more likely to matter than short chit-chat (§4.4 Hierarchical row).
fn select_important(candidates: &[CapturedMessage], limit: usize) -> Vec<CapturedMessage> {
    let mut scored: Vec<(&CapturedMessage, f32)> = candidates
        .iter()
        .map(|m| {
            let mut score = (m.content.len() as f32 / 200.0).min(3.0);
            if m.content.contains("```") {
                score += 2.0;
            }
            (m, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(limit).map(|(m, _)| m.clone()).collect()
}

#[allow(clippy::too_many_arguments)]
async fn load_snippet(
    store: &UnlimitedRecallStore,
    thread_id: &str,
    trigger: &TriggerDetection,
    query: &str,
    embeddings: Option<&Arc<dyn EmbeddingProvider>>,
    summary: Option<&str>,
    config: &UnlimitedRecallConfig,
) -> anyhow::Result<RecallContext> {
    let all = store.messages_for_thread(thread_id, 100_000, 0).await?;

    let anchor_idx = match trigger.timeframe {
        Some((from, to)) => all.iter().position(|m| m.created_at >= from && m.created_at <= to),
        None => top_similarity_anchor(&all, query, embeddings).await,
    };

    let Some(anchor_idx) = anchor_idx else {
        return Ok(RecallContext {
            strategy: LoaderStrategy::Snippet,
            thread_id: thread_id.to_string(),
            messages: Vec::new(),
            summary: summary.map(str::to_string),
            skipped_span_note: Some("no anchor message found in timeframe".to_string()),
        });
    };

    let window = config.snippet_window;
    let start = anchor_idx.saturating_sub(window);
    let end = (anchor_idx + window + 1).min(all.len());

    Ok(RecallContext {
        strategy: LoaderStrategy::Snippet,
        thread_id: thread_id.to_string(),
        messages: all[start..end].to_vec(),
        summary: summary.map(str::to_string),
        skipped_span_note: None,
    })
}

/// Finds the top-1 cosine-similarity message against `query` within the
/// last `ANCHOR_SEARCH_WINDOW` messages (§4.4 snippet row: "find anchor
/// message by timeframe or top-1 cosine similarity"). Falls back to lexical
/// overlap when no embedding provider is configured.
async fn top_similarity_anchor(messages: &[CapturedMessage], query: &str, embeddings: Option<&Arc<dyn EmbeddingProvider>>) -> Option<usize> {
    if messages.is_empty() {
        return None;
    }
    let window_start = messages.len().saturating_sub(ANCHOR_SEARCH_WINDOW);
    let window = &messages[window_start..];

    if let Some(embeddings) = embeddings {
        if let Ok(query_embedding) = embeddings.embed(query).await {
            let contents: Vec<String> = window.iter().map(|m| m.content.clone()).collect();
            if let Ok(message_embeddings) = embeddings.embed_batch(&contents).await {
                let best = message_embeddings
                    .iter()
                    .enumerate()
                    .map(|(idx, embedding)| (idx, cosine_similarity(&query_embedding, embedding)))
                    .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
                if let Some((idx, _)) = best {
                    return Some(window_start + idx);
                }
            }
        }
    }

    window
        .iter()
        .enumerate()
        .map(|(idx, m)| (idx, jaccard_similarity(query, &m.content)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(idx, _)| window_start + idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;

    fn config() -> UnlimitedRecallConfig {
        UnlimitedRecallConfig::from_env()
    }

    #[test]
    fn chooses_full_under_ceiling() {
        assert_eq!(choose_strategy(1000, &config()), LoaderStrategy::Full);
    }

    #[test]
    fn chooses_hierarchical_between_ceilings() {
        assert_eq!(choose_strategy(150_000, &config()), LoaderStrategy::Hierarchical);
    }

    #[test]
    fn chooses_compressed_over_ceiling() {
        assert_eq!(choose_strategy(300_000, &config()), LoaderStrategy::Compressed);
    }

    async fn store_with_messages(thread_id: &str, n: usize) -> UnlimitedRecallStore {
        let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap();
        let store = UnlimitedRecallStore::new(pool);
        store.migrate().await.unwrap();
        for i in 0..n {
            let msg = CapturedMessage {
                message_id: format!("m{i}"),
                thread_id: thread_id.to_string(),
                user_id: "u1".to_string(),
                role: "user".to_string(),
                content: format!("message {i}"),
                tokens: 5,
                created_at: Utc::now() + chrono::Duration::seconds(i as i64),
            };
            store.capture_message(&msg).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn full_load_returns_all_messages() {
        let store = store_with_messages("t1", 10).await;
        let ctx = load_full(&store, "t1", None).await.unwrap();
        assert_eq!(ctx.messages.len(), 10);
    }

    #[tokio::test]
    async fn hierarchical_load_caps_total_under_full() {
        let store = store_with_messages("t1", 200).await;
        let config = config();
        let ctx = load_hierarchical(&store, "t1", None, &config).await.unwrap();
        assert!(ctx.messages.len() <= 200);
        assert!(ctx.skipped_span_note.is_some());
    }

    #[tokio::test]
    async fn semantic_snippet_anchors_on_closest_matching_message_not_the_last() {
        let store = UnlimitedRecallStore::new(SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap());
        store.migrate().await.unwrap();

        let contents = ["talked about pizza toppings", "discussed database migrations at length", "said goodnight"];
        for (i, content) in contents.iter().enumerate() {
            let msg = CapturedMessage {
                message_id: format!("m{i}"),
                thread_id: "t1".to_string(),
                user_id: "u1".to_string(),
                role: "user".to_string(),
                content: content.to_string(),
                tokens: 5,
                created_at: Utc::now() + chrono::Duration::seconds(i as i64),
            };
            store.capture_message(&msg).await.unwrap();
        }

        let trigger = TriggerDetection { kind: TriggerKind::Semantic, confidence: 0.6, timeframe: None };
        let ctx = load_snippet(&store, "t1", &trigger, "how did we decide on the database migration approach", None, None, &config())
            .await
            .unwrap();

        assert!(ctx.messages.iter().any(|m| m.content.contains("database migrations")));
    }
}
