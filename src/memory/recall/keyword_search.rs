// src/memory/recall/keyword_search.rs
// Keyword fallback arm (§4.3 step 2): token-contains match, relevance =
// count of matched query tokens normalized to [0, 1].

use super::fusion::SourceHit;
use crate::memory::types::Memory;

pub fn search(query_terms: &[String], candidates: &[Memory]) -> Vec<SourceHit> {
    if query_terms.is_empty() {
        return Vec::new();
    }

    candidates
        .iter()
        .filter_map(|memory| {
            let content_lower = memory.content.to_lowercase();
            let matched = query_terms.iter().filter(|t| content_lower.contains(t.as_str())).count();
            if matched == 0 {
                None
            } else {
                Some(SourceHit {
                    memory_id: memory.memory_id.clone(),
                    relevance: matched as f32 / query_terms.len() as f32,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tier;

    #[test]
    fn scores_by_fraction_of_matched_terms() {
        let memory = Memory::new("u1".into(), "t1".into(), "likes dark mode editors".into(), Tier::T3, 0.5, 0.9);
        let hits = search(&["dark".into(), "mode".into(), "missing".into()], &[memory]);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].relevance - (2.0 / 3.0)).abs() < 1e-6);
    }

    #[test]
    fn no_match_yields_no_hit() {
        let memory = Memory::new("u1".into(), "t1".into(), "likes ramen".into(), Tier::T3, 0.5, 0.9);
        let hits = search(&["rust".into()], &[memory]);
        assert!(hits.is_empty());
    }
}
