// src/memory/recall/fusion.rs
// Per-source scored hits and rank fusion (§4.3 steps 2-3).

use std::collections::HashMap;

use crate::config::RecallConfig;
use crate::memory::types::Memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Fts,
    Vector,
    Keyword,
}

#[derive(Debug, Clone)]
pub struct SourceHit {
    pub memory_id: String,
    /// Already normalized to `[0, 1]` by the arm that produced it.
    pub relevance: f32,
}

#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub memory: Memory,
    pub fused_score: f32,
}

/// Combines per-arm hit lists with availability-dependent weights (§4.3
/// step 3): FTS+vector+keyword when all ran, vector+keyword when FTS
/// didn't, keyword-only when neither did.
pub fn fuse(
    fts_hits: &[SourceHit],
    vector_hits: &[SourceHit],
    keyword_hits: &[SourceHit],
    memories_by_id: &HashMap<String, Memory>,
    config: &RecallConfig,
) -> Vec<FusedCandidate> {
    let has_fts = !fts_hits.is_empty();
    let has_vector = !vector_hits.is_empty();

    let (fts_w, vector_w, keyword_w) = match (has_fts, has_vector) {
        (true, true) => (config.fts_weight, config.vector_weight, config.keyword_weight),
        (false, true) => (0.0, config.vector_only_weight, config.keyword_with_vector_weight),
        _ => (0.0, 0.0, 1.0),
    };

    let mut scores: HashMap<String, f32> = HashMap::new();
    accumulate(&mut scores, fts_hits, fts_w);
    accumulate(&mut scores, vector_hits, vector_w);
    accumulate(&mut scores, keyword_hits, keyword_w);

    scores
        .into_iter()
        .filter_map(|(id, score)| {
            memories_by_id.get(&id).map(|memory| FusedCandidate {
                memory: memory.clone(),
                fused_score: score,
            })
        })
        .collect()
}

fn accumulate(scores: &mut HashMap<String, f32>, hits: &[SourceHit], weight: f32) {
    if weight == 0.0 {
        return;
    }
    for hit in hits {
        *scores.entry(hit.memory_id.clone()).or_insert(0.0) += hit.relevance * weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tier;

    fn config() -> RecallConfig {
        RecallConfig {
            deadline_ms: 300,
            max_items: 5,
            fts_weight: 0.4,
            vector_weight: 0.4,
            keyword_weight: 0.2,
            vector_only_weight: 0.6,
            keyword_with_vector_weight: 0.4,
            vector_similarity_threshold: 0.5,
            dedup_window: 20,
        }
    }

    fn memory(id: &str) -> Memory {
        let mut m = Memory::new("u1".into(), "t1".into(), "x".into(), Tier::T3, 0.5, 0.9);
        m.memory_id = id.to_string();
        m
    }

    #[test]
    fn falls_back_to_keyword_only_weighting_when_nothing_else_hit() {
        let by_id = HashMap::from([("m1".to_string(), memory("m1"))]);
        let hits = vec![SourceHit {
            memory_id: "m1".into(),
            relevance: 0.5,
        }];
        let fused = fuse(&[], &[], &hits, &by_id, &config());
        assert_eq!(fused.len(), 1);
        assert!((fused[0].fused_score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn combines_weighted_scores_across_sources() {
        let by_id = HashMap::from([("m1".to_string(), memory("m1"))]);
        let fts = vec![SourceHit {
            memory_id: "m1".into(),
            relevance: 1.0,
        }];
        let vector = vec![SourceHit {
            memory_id: "m1".into(),
            relevance: 1.0,
        }];
        let fused = fuse(&fts, &vector, &[], &by_id, &config());
        assert!((fused[0].fused_score - 0.8).abs() < 1e-6);
    }
}
