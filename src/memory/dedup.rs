// src/memory/dedup.rs
// Deduplication / supersession policy (§4.2.2).

use crate::config::DedupConfig;
use crate::utils::text::{cosine_similarity, jaccard_similarity, normalize_content};

use super::types::Memory;

#[derive(Debug, Clone, PartialEq)]
pub enum DedupDecision {
    /// No sufficiently similar memory found; insert as new.
    Insert,
    /// A duplicate exists; re-mention it, optionally adopting the new content.
    Supersede { existing_memory_id: String, adopt_new_content: bool },
}

/// Scans `candidates` (the caller's recent memories, §4.2.2's 20-item
/// window) for one that is the same memory as `new_content`, under the
/// combined keyword/content/embedding similarity thresholds.
pub fn decide(
    new_content: &str,
    new_embedding: Option<&[f32]>,
    candidates: &[Memory],
    config: &DedupConfig,
) -> DedupDecision {
    let new_normalized = normalize_content(new_content);

    for candidate in candidates {
        if candidate.is_deleted() {
            continue;
        }

        let keyword_sim = jaccard_similarity(&new_normalized, &candidate.content);
        let content_sim = content_similarity(&new_normalized, &normalize_content(&candidate.content));

        let textual_match =
            keyword_sim > config.keyword_jaccard_threshold && content_sim > config.content_similarity_threshold;

        let embedding_match = match (new_embedding, candidate.embedding.as_deref()) {
            (Some(a), Some(b)) => cosine_similarity(a, b) > config.embedding_cosine_threshold,
            _ => false,
        };

        if textual_match || embedding_match {
            let adopt_new_content = is_clearer(&new_normalized, &candidate.content);
            return DedupDecision::Supersede {
                existing_memory_id: candidate.memory_id.clone(),
                adopt_new_content,
            };
        }
    }

    DedupDecision::Insert
}

/// Character-level similarity ratio via longest-common-substring-free
/// overlap proxy: the shared-token fraction of the longer text. Cheap and
/// stable; Jaccard alone over-counts short overlapping fragments.
fn content_similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if longer.is_empty() {
        return 1.0;
    }
    let shared = shorter.split_whitespace().filter(|w| longer.contains(w)).count();
    let total = longer.split_whitespace().count().max(1);
    (shared as f32 / total as f32).min(1.0)
}

/// §4.2.2: replace content only if "semantically equivalent but clearer" —
/// approximated as longer and containing strictly more distinct keywords.
fn is_clearer(new_normalized: &str, existing_content: &str) -> bool {
    let existing_normalized = normalize_content(existing_content);
    let new_words: std::collections::HashSet<&str> = new_normalized.split_whitespace().collect();
    let existing_words: std::collections::HashSet<&str> = existing_normalized.split_whitespace().collect();

    new_normalized.len() > existing_normalized.len() && new_words.len() > existing_words.len()
}

/// Applies a dedup decision to the matched memory in place: increments
/// `repeats`, records the new thread, bumps priority by a capped delta.
pub fn apply_supersede(memory: &mut Memory, new_thread_id: &str, new_content: Option<&str>, config: &DedupConfig) {
    memory.record_remention(new_thread_id);
    memory.priority = (memory.priority + config.priority_bump).min(1.0);
    if let Some(content) = new_content {
        memory.content = content.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tier;

    fn config() -> DedupConfig {
        DedupConfig {
            keyword_jaccard_threshold: 0.7,
            content_similarity_threshold: 0.85,
            embedding_cosine_threshold: 0.85,
            priority_bump: 0.05,
        }
    }

    fn memory(content: &str) -> Memory {
        Memory::new("u1".into(), "t1".into(), content.into(), Tier::T3, 0.5, 0.9)
    }

    #[test]
    fn identical_content_is_superseded() {
        let existing = vec![memory("I prefer dark mode in every editor")];
        let decision = decide("I prefer dark mode in every editor", None, &existing, &config());
        assert!(matches!(decision, DedupDecision::Supersede { .. }));
    }

    #[test]
    fn unrelated_content_is_inserted() {
        let existing = vec![memory("I prefer dark mode in every editor")];
        let decision = decide("my favorite food is ramen noodles", None, &existing, &config());
        assert_eq!(decision, DedupDecision::Insert);
    }

    #[test]
    fn deleted_candidates_are_skipped() {
        let mut deleted = memory("I prefer dark mode in every editor");
        deleted.deleted_at = Some(chrono::Utc::now());
        let decision = decide("I prefer dark mode in every editor", None, &[deleted], &config());
        assert_eq!(decision, DedupDecision::Insert);
    }

    #[test]
    fn embedding_similarity_alone_can_trigger_supersede() {
        let mut existing = memory("likes rust programming");
        existing.embedding = Some(vec![1.0, 0.0, 0.0]);
        let decision = decide(
            "totally different words here",
            Some(&[1.0, 0.0, 0.0]),
            &[existing],
            &config(),
        );
        assert!(matches!(decision, DedupDecision::Supersede { .. }));
    }

    #[test]
    fn longer_clearer_restatement_is_adopted() {
        let existing = memory("likes rust");
        let decision = decide(
            "likes rust programming language for systems work",
            None,
            &[existing],
            &DedupConfig {
                keyword_jaccard_threshold: 0.1,
                content_similarity_threshold: 0.1,
                embedding_cosine_threshold: 0.85,
                priority_bump: 0.05,
            },
        );
        match decision {
            DedupDecision::Supersede { adopt_new_content, .. } => assert!(adopt_new_content),
            other => panic!("expected supersede, got {other:?}"),
        }
    }
}
