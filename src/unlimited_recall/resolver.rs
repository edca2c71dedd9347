// src/unlimited_recall/resolver.rs
// Resolves which past conversation a resume/historical/semantic trigger
// refers to (§4.4 Trigger detection + Loader strategies "snippet" row): a
// trigger firing in a fresh thread always points at a *different* thread,
// never the one it fired in.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::llm::EmbeddingProvider;
use crate::utils::text::cosine_similarity;

use super::store::UnlimitedRecallStore;
use super::types::{ConversationPackage, TriggerDetection, TriggerKind};

const CANDIDATE_LIMIT: i64 = 100;

pub struct ResolvedThread {
    pub thread_id: String,
    pub relevance_score: f32,
}

/// Picks the target thread for a trigger fired in `current_thread_id`.
///
/// - `resume` → the user's most recently active other conversation.
/// - `historical` → the candidate whose activity sits closest to the
///   trigger's `[t-w, t+w]` timeframe center.
/// - `semantic` → the candidate with the highest combined-embedding cosine
///   similarity to the triggering query.
pub async fn resolve(
    store: &UnlimitedRecallStore,
    user_id: &str,
    current_thread_id: &str,
    trigger: &TriggerDetection,
    query: &str,
    embeddings: Option<&Arc<dyn EmbeddingProvider>>,
) -> anyhow::Result<Option<ResolvedThread>> {
    let candidates: Vec<ConversationPackage> = store
        .packages_for_user(user_id, CANDIDATE_LIMIT)
        .await?
        .into_iter()
        .filter(|p| p.thread_id != current_thread_id)
        .collect();

    if candidates.is_empty() {
        return Ok(None);
    }

    match trigger.kind {
        TriggerKind::Resume => Ok(resolve_resume(candidates)),
        TriggerKind::Historical => Ok(resolve_historical(candidates, trigger)),
        TriggerKind::Semantic => resolve_semantic(store, user_id, &candidates, query, embeddings).await,
    }
}

fn resolve_resume(candidates: Vec<ConversationPackage>) -> Option<ResolvedThread> {
    candidates
        .into_iter()
        .max_by_key(|p| p.last_message_at)
        .map(|p| ResolvedThread { thread_id: p.thread_id, relevance_score: 1.0 })
}

fn resolve_historical(candidates: Vec<ConversationPackage>, trigger: &TriggerDetection) -> Option<ResolvedThread> {
    let (from, to) = trigger.timeframe?;
    let center = from + (to - from) / 2;
    let half_width_secs = (to - from).num_seconds().max(1) as f64 / 2.0;

    let mut best: Option<(ConversationPackage, f64)> = None;
    for package in candidates {
        let distance = distance_seconds(package.last_message_at, center);
        let replace = match &best {
            Some((_, best_distance)) => distance < *best_distance,
            None => true,
        };
        if replace {
            best = Some((package, distance));
        }
    }

    best.map(|(package, distance)| {
        let relevance_score = (1.0 - (distance / half_width_secs).min(1.0)) as f32;
        ResolvedThread { thread_id: package.thread_id, relevance_score: relevance_score.max(0.0) }
    })
}

async fn resolve_semantic(
    store: &UnlimitedRecallStore,
    user_id: &str,
    candidates: &[ConversationPackage],
    query: &str,
    embeddings: Option<&Arc<dyn EmbeddingProvider>>,
) -> anyhow::Result<Option<ResolvedThread>> {
    let Some(embeddings) = embeddings else { return Ok(None) };

    let query_embedding = embeddings.embed(query).await?;
    let thread_embeddings = store.conversation_embeddings_for_user(user_id).await?;
    let candidate_ids: std::collections::HashSet<&str> = candidates.iter().map(|p| p.thread_id.as_str()).collect();

    let best = thread_embeddings
        .into_iter()
        .filter(|(thread_id, _)| candidate_ids.contains(thread_id.as_str()))
        .map(|(thread_id, embedding)| {
            let score = cosine_similarity(&query_embedding, &embedding);
            (thread_id, score)
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(best.map(|(thread_id, relevance_score)| ResolvedThread { thread_id, relevance_score }))
}

fn distance_seconds(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    (a - b).num_seconds().unsigned_abs() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unlimited_recall::types::TriggerKind;
    use chrono::Duration;

    fn package(thread_id: &str, last_message_at: DateTime<Utc>) -> ConversationPackage {
        ConversationPackage {
            thread_id: thread_id.to_string(),
            user_id: "u1".to_string(),
            message_count: 10,
            total_tokens: 500,
            last_message_at,
            label: None,
            summary: None,
            summary_updated_at: None,
            created_at: last_message_at,
        }
    }

    #[test]
    fn resume_picks_most_recently_active_thread() {
        let now = Utc::now();
        let candidates = vec![package("old", now - Duration::days(2)), package("recent", now - Duration::minutes(5))];
        let resolved = resolve_resume(candidates).unwrap();
        assert_eq!(resolved.thread_id, "recent");
        assert_eq!(resolved.relevance_score, 1.0);
    }

    #[test]
    fn historical_picks_package_closest_to_timeframe_center() {
        let now = Utc::now();
        let trigger = TriggerDetection {
            kind: TriggerKind::Historical,
            confidence: 0.85,
            timeframe: Some((now - Duration::minutes(10), now)),
        };
        let candidates = vec![package("far", now - Duration::days(1)), package("close", now - Duration::minutes(4))];
        let resolved = resolve_historical(candidates, &trigger).unwrap();
        assert_eq!(resolved.thread_id, "close");
        assert!(resolved.relevance_score >= 0.5);
    }
}
