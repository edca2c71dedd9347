// src/memory/recall/rank.rs
// Composite ranking (§4.3 step 4) and pattern-attribute dedup (step 5).

use chrono::Utc;
use std::cmp::Ordering;

use crate::utils::text::jaccard_similarity;

use super::fusion::FusedCandidate;

/// Orders candidates by: same-thread first, recency bucket (updated <24h
/// first), tier (T1 > T2 > T3), updatedAt desc, priority desc.
pub fn rank(mut candidates: Vec<FusedCandidate>, current_thread_id: &str) -> Vec<FusedCandidate> {
    let now = Utc::now();

    candidates.sort_by(|a, b| {
        let same_thread_a = a.memory.thread_id == current_thread_id;
        let same_thread_b = b.memory.thread_id == current_thread_id;
        if same_thread_a != same_thread_b {
            return same_thread_b.cmp(&same_thread_a);
        }

        let recent_a = (now - a.memory.updated_at).num_hours() < 24;
        let recent_b = (now - b.memory.updated_at).num_hours() < 24;
        if recent_a != recent_b {
            return recent_b.cmp(&recent_a);
        }

        let tier_cmp = a.memory.tier.rank().cmp(&b.memory.tier.rank());
        if tier_cmp != Ordering::Equal {
            return tier_cmp;
        }

        match b.memory.updated_at.cmp(&a.memory.updated_at) {
            Ordering::Equal => b
                .memory
                .priority
                .partial_cmp(&a.memory.priority)
                .unwrap_or(Ordering::Equal),
            other => other,
        }
    });

    candidates
}

/// Drops near-duplicate "pattern attribute" memories (e.g. two competing
/// "my favorite color is …" facts), keeping the newest survivor of each
/// cluster. Assumes `candidates` is already ranked newest-relevant-first.
pub fn dedupe_pattern_collisions(candidates: Vec<FusedCandidate>, similarity_threshold: f32) -> Vec<FusedCandidate> {
    let mut kept: Vec<FusedCandidate> = Vec::with_capacity(candidates.len());

    'outer: for candidate in candidates {
        for existing in &kept {
            if jaccard_similarity(&candidate.memory.content, &existing.memory.content) > similarity_threshold {
                continue 'outer;
            }
        }
        kept.push(candidate);
    }

    kept
}

pub fn truncate(mut candidates: Vec<FusedCandidate>, max_items: usize) -> Vec<FusedCandidate> {
    candidates.truncate(max_items);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tier;
    use crate::memory::types::Memory;

    fn memory_with(tier: Tier, thread_id: &str, updated_hours_ago: i64, priority: f32) -> FusedCandidate {
        let mut m = Memory::new("u1".into(), thread_id.into(), "x".into(), tier, priority, 0.9);
        m.updated_at = Utc::now() - chrono::Duration::hours(updated_hours_ago);
        FusedCandidate {
            memory: m,
            fused_score: 0.5,
        }
    }

    #[test]
    fn same_thread_wins_over_other_thread() {
        let a = memory_with(Tier::T3, "other", 1, 0.9);
        let b = memory_with(Tier::T3, "current", 1, 0.1);
        let ranked = rank(vec![a, b], "current");
        assert_eq!(ranked[0].memory.thread_id, "current");
    }

    #[test]
    fn tier_breaks_ties_within_same_recency_bucket() {
        let t1 = memory_with(Tier::T1, "other", 1, 0.1);
        let t3 = memory_with(Tier::T3, "other", 1, 0.9);
        let ranked = rank(vec![t3, t1], "current");
        assert_eq!(ranked[0].memory.tier, Tier::T1);
    }

    #[test]
    fn dedupe_keeps_first_of_similar_cluster() {
        let mut a = memory_with(Tier::T3, "t1", 1, 0.5);
        a.memory.content = "my favorite color is blue".into();
        let mut b = memory_with(Tier::T3, "t1", 2, 0.5);
        b.memory.content = "my favorite color is blue actually".into();
        let deduped = dedupe_pattern_collisions(vec![a, b], 0.6);
        assert_eq!(deduped.len(), 1);
    }
}
