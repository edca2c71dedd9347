// src/config/memory.rs
// Memory tiers, audit cadence, recall, and fusion configuration (§6, §8.2).

use serde::{Deserialize, Serialize};

use super::helpers::env_parsed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    T1, // cross-thread recent
    T2, // preferences/goals
    T3, // general
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::T1 => "T1",
            Tier::T2 => "T2",
            Tier::T3 => "T3",
        }
    }

    /// T1 > T2 > T3 composite ordering tie-break (§4.3 step 4).
    pub fn rank(&self) -> u8 {
        match self {
            Tier::T1 => 0,
            Tier::T2 => 1,
            Tier::T3 => 2,
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "T1" => Ok(Tier::T1),
            "T2" => Ok(Tier::T2),
            "T3" => Ok(Tier::T3),
            other => Err(anyhow::anyhow!("unknown tier: {other}")),
        }
    }
}

/// Per-tier scoring weights, save threshold, TTL and weekly decay (§4.2.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierPolicy {
    pub relevance_weight: f32,
    pub importance_weight: f32,
    pub coherence_weight: f32,
    pub recency_weight: f32,
    pub save_threshold: f32,
    pub ttl_days: i64,
    pub decay_per_week: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiersConfig {
    pub t1: TierPolicy,
    pub t2: TierPolicy,
    pub t3: TierPolicy,
    /// How often `src/tasks` runs the retention sweep (§4.2.3).
    pub sweep_interval_secs: u64,
}

impl TiersConfig {
    pub fn from_env() -> Self {
        // T1 emphasizes relevance + recency; T2 emphasizes importance (§4.2.1 step 2).
        Self {
            sweep_interval_secs: env_parsed("MEMORY_SWEEP_INTERVAL_SECS", 3600),
            t1: TierPolicy {
                relevance_weight: 0.45,
                importance_weight: 0.2,
                coherence_weight: 0.15,
                recency_weight: 0.2,
                save_threshold: env_parsed("MEMORY_T1_SAVE_THRESHOLD", 0.65),
                ttl_days: env_parsed("MEMORY_T1_TTL_DAYS", 120),
                decay_per_week: env_parsed("MEMORY_T1_DECAY_PER_WEEK", 0.01),
            },
            t2: TierPolicy {
                relevance_weight: 0.3,
                importance_weight: 0.45,
                coherence_weight: 0.15,
                recency_weight: 0.1,
                save_threshold: env_parsed("MEMORY_T2_SAVE_THRESHOLD", 0.70),
                ttl_days: env_parsed("MEMORY_T2_TTL_DAYS", 365),
                decay_per_week: env_parsed("MEMORY_T2_DECAY_PER_WEEK", 0.005),
            },
            t3: TierPolicy {
                relevance_weight: 0.4,
                importance_weight: 0.3,
                coherence_weight: 0.2,
                recency_weight: 0.1,
                save_threshold: env_parsed("MEMORY_T3_SAVE_THRESHOLD", 0.70),
                ttl_days: env_parsed("MEMORY_T3_TTL_DAYS", 90),
                decay_per_week: env_parsed("MEMORY_T3_DECAY_PER_WEEK", 0.02),
            },
        }
    }

    pub fn policy(&self, tier: Tier) -> &TierPolicy {
        match tier {
            Tier::T1 => &self.t1,
            Tier::T2 => &self.t2,
            Tier::T3 => &self.t3,
        }
    }
}

/// Audit cadence trigger thresholds (§4.2.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceConfig {
    pub msgs: u32,
    pub tokens: u32,
    pub minutes: i64,
    pub debounce_sec: i64,
    pub max_per_audit: usize,
}

impl CadenceConfig {
    pub fn from_env() -> Self {
        Self {
            msgs: env_parsed("MEMORY_CADENCE_MSGS", 6),
            tokens: env_parsed("MEMORY_CADENCE_TOKENS", 1500),
            minutes: env_parsed("MEMORY_CADENCE_MINUTES", 3),
            debounce_sec: env_parsed("MEMORY_CADENCE_DEBOUNCE_SEC", 30),
            max_per_audit: env_parsed("MEMORY_MAX_PER_AUDIT", 3),
        }
    }
}

/// Hybrid recall fusion weights and deadlines (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    pub deadline_ms: u64,
    pub max_items: usize,
    pub fts_weight: f32,
    pub vector_weight: f32,
    pub keyword_weight: f32,
    pub vector_only_weight: f32,
    pub keyword_with_vector_weight: f32,
    pub vector_similarity_threshold: f32,
    pub dedup_window: usize,
}

impl RecallConfig {
    pub fn from_env() -> Self {
        Self {
            deadline_ms: env_parsed("RECALL_DEADLINE_MS", 300),
            max_items: env_parsed("RECALL_MAX_ITEMS", 5),
            fts_weight: 0.4,
            vector_weight: 0.4,
            keyword_weight: 0.2,
            vector_only_weight: 0.6,
            keyword_with_vector_weight: 0.4,
            vector_similarity_threshold: env_parsed("RECALL_VECTOR_SIM_THRESHOLD", 0.5),
            dedup_window: env_parsed("MEMORY_DEDUP_WINDOW", 20),
        }
    }
}

/// Deduplication/superseding thresholds (§4.2.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    pub keyword_jaccard_threshold: f32,
    pub content_similarity_threshold: f32,
    pub embedding_cosine_threshold: f32,
    pub priority_bump: f32,
}

impl DedupConfig {
    pub fn from_env() -> Self {
        Self {
            keyword_jaccard_threshold: env_parsed("MEMORY_DEDUP_JACCARD", 0.7),
            content_similarity_threshold: env_parsed("MEMORY_DEDUP_CONTENT_SIM", 0.85),
            embedding_cosine_threshold: env_parsed("MEMORY_DEDUP_EMBEDDING_COS", 0.85),
            priority_bump: env_parsed("MEMORY_DEDUP_PRIORITY_BUMP", 0.05),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
    pub embedding_dim: u64,
}

impl QdrantConfig {
    pub fn from_env() -> Self {
        Self {
            url: super::helpers::env_or("QDRANT_URL", "http://localhost:6334"),
            collection: super::helpers::env_or("QDRANT_COLLECTION", "threadline_memories"),
            embedding_dim: env_parsed("QDRANT_EMBEDDING_DIM", 1536),
        }
    }
}

/// Thread summary length and staleness policy (§3 Thread summary, §4.2.1 step 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub max_chars_standard: usize,
    pub max_chars_important: usize,
    pub stale_after_minutes_standard: i64,
    pub stale_after_minutes_important: i64,
    pub important_memory_count: i64,
}

impl SummaryConfig {
    pub fn from_env() -> Self {
        Self {
            max_chars_standard: env_parsed("SUMMARY_MAX_CHARS_STANDARD", 500),
            max_chars_important: env_parsed("SUMMARY_MAX_CHARS_IMPORTANT", 800),
            stale_after_minutes_standard: env_parsed("SUMMARY_STALE_MINUTES_STANDARD", 60),
            stale_after_minutes_important: env_parsed("SUMMARY_STALE_MINUTES_IMPORTANT", 20),
            important_memory_count: env_parsed("SUMMARY_IMPORTANT_MEMORY_COUNT", 3),
        }
    }
}
