// src/gateway/strategy.rs
// Strategy planner (§4.5): decides which context-gathering layers to fan
// out to for a turn, based on the query analyzer's intent.

use crate::llm::router::Intent;

/// Which layers should run for this turn. Unselected layers return
/// immediately rather than firing a sub-task (§4.5 final paragraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerPlan {
    pub memory: MemoryDepth,
    pub vector: bool,
    pub web: bool,
    /// Unlimited-recall only runs when a trigger independently fires —
    /// this flag means "attempt trigger detection", not "always load".
    pub unlimited_trigger_only: bool,
    pub ingestion: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryDepth {
    None,
    /// A light pass: smaller `maxItems`, no query expansion.
    Light,
    Full,
}

/// §4.5 decision table. `query_expansion_hint` is true when the analyzer
/// flagged the query as vague (e.g. very short, no clear keywords) — the
/// "vague" row applies query expansion before memory recall.
pub fn plan(intent: Intent, is_vague: bool, ingestion_available: bool) -> LayerPlan {
    if is_vague {
        return LayerPlan {
            memory: MemoryDepth::Full,
            vector: true,
            web: false,
            unlimited_trigger_only: false,
            ingestion: false,
        };
    }

    match intent {
        Intent::MemoryList => LayerPlan {
            memory: MemoryDepth::Full,
            vector: true,
            web: false,
            unlimited_trigger_only: true,
            ingestion: false,
        },
        Intent::NeedsWebSearch => LayerPlan {
            memory: MemoryDepth::Light,
            vector: false,
            web: true,
            unlimited_trigger_only: false,
            ingestion: ingestion_available,
        },
        Intent::Explanatory => LayerPlan {
            memory: MemoryDepth::Full,
            vector: true,
            web: false,
            unlimited_trigger_only: false,
            ingestion: true,
        },
        Intent::Discussion | Intent::Action => LayerPlan {
            memory: MemoryDepth::Full,
            vector: true,
            web: true,
            unlimited_trigger_only: true,
            ingestion: true,
        },
        Intent::Factual | Intent::MemorySave | Intent::ConversationalFollowup => LayerPlan {
            memory: MemoryDepth::Full,
            vector: true,
            web: false,
            unlimited_trigger_only: true,
            ingestion: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personal_historical_intent_skips_web() {
        let plan = plan(Intent::MemoryList, false, true);
        assert!(!plan.web);
        assert!(plan.unlimited_trigger_only);
    }

    #[test]
    fn current_events_intent_fetches_web_not_memory_deeply() {
        let plan = plan(Intent::NeedsWebSearch, false, true);
        assert!(plan.web);
        assert_eq!(plan.memory, MemoryDepth::Light);
        assert!(!plan.vector);
    }

    #[test]
    fn complex_multipart_uses_every_layer() {
        let plan = plan(Intent::Discussion, false, true);
        assert!(plan.web);
        assert!(plan.vector);
        assert!(plan.ingestion);
    }

    #[test]
    fn vague_query_forces_full_memory_with_expansion() {
        let plan = plan(Intent::Factual, true, false);
        assert_eq!(plan.memory, MemoryDepth::Full);
        assert!(!plan.web);
    }
}
