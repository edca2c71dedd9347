// src/config/unlimited_recall.rs
// Unlimited-recall capture, worker, trigger, and loader thresholds (§4.4).

use serde::{Deserialize, Serialize};

use super::helpers::env_parsed;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlimitedRecallConfig {
    pub label_job_min_messages: i64,
    pub summary_job_min_messages: i64,
    pub summary_job_interval_messages: i64,
    pub worker_poll_interval_ms: u64,
    pub worker_max_retries: i32,
    pub worker_batch_size: i64,
    pub resume_min_confidence: f32,
    pub historical_min_confidence: f32,
    pub semantic_min_confidence: f32,
    pub full_load_token_ceiling: i64,
    pub hierarchical_token_ceiling: i64,
    pub hierarchical_edge_messages: usize,
    pub snippet_window: usize,
    pub injected_context_budget_fraction: f32,
}

impl UnlimitedRecallConfig {
    pub fn from_env() -> Self {
        Self {
            label_job_min_messages: env_parsed("UR_LABEL_JOB_MIN_MESSAGES", 5),
            summary_job_min_messages: env_parsed("UR_SUMMARY_JOB_MIN_MESSAGES", 10),
            summary_job_interval_messages: env_parsed("UR_SUMMARY_JOB_INTERVAL_MESSAGES", 20),
            worker_poll_interval_ms: env_parsed("UR_WORKER_POLL_INTERVAL_MS", 5_000),
            worker_max_retries: env_parsed("UR_WORKER_MAX_RETRIES", 3),
            worker_batch_size: env_parsed("UR_WORKER_BATCH_SIZE", 1),
            resume_min_confidence: env_parsed("UR_RESUME_MIN_CONFIDENCE", 0.7),
            historical_min_confidence: env_parsed("UR_HISTORICAL_MIN_CONFIDENCE", 0.7),
            semantic_min_confidence: env_parsed("UR_SEMANTIC_MIN_CONFIDENCE", 0.6),
            full_load_token_ceiling: env_parsed("UR_FULL_LOAD_TOKEN_CEILING", 96_000),
            hierarchical_token_ceiling: env_parsed("UR_HIERARCHICAL_TOKEN_CEILING", 240_000),
            hierarchical_edge_messages: env_parsed("UR_HIERARCHICAL_EDGE_MESSAGES", 20),
            snippet_window: env_parsed("UR_SNIPPET_WINDOW", 2),
            injected_context_budget_fraction: env_parsed("UR_INJECTED_CONTEXT_BUDGET_FRACTION", 0.5),
        }
    }
}
