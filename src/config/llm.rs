// src/config/llm.rs
// Model routing and provider-facing configuration (§4.9). Provider
// credentials/endpoints are read from env but the providers themselves are
// external collaborators (§6) — not implemented here.

use serde::{Deserialize, Serialize};

use super::helpers::{env_or, env_parsed};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub default_model: String,
    pub reasoning_model: String,
    pub fast_model: String,
    pub complexity_threshold_reasoning: f32,
    pub max_context_tokens: u32,
}

impl RouterConfig {
    pub fn from_env() -> Self {
        Self {
            default_model: env_or("MODEL_DEFAULT", "standard"),
            reasoning_model: env_or("MODEL_REASONING", "reasoning"),
            fast_model: env_or("MODEL_FAST", "fast"),
            complexity_threshold_reasoning: env_parsed("MODEL_ROUTER_REASONING_THRESHOLD", 0.7),
            max_context_tokens: env_parsed("MODEL_ROUTER_MAX_CONTEXT_TOKENS", 128_000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub chat_base_url: String,
    pub chat_api_key: Option<String>,
    pub chat_timeout_secs: u64,
    pub embedding_base_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dim: u64,
    pub web_research_base_url: String,
    pub web_research_timeout_secs: u64,
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        Self {
            chat_base_url: env_or("LLM_CHAT_BASE_URL", "http://localhost:11434/v1"),
            chat_api_key: std::env::var("LLM_CHAT_API_KEY").ok(),
            chat_timeout_secs: env_parsed("LLM_CHAT_TIMEOUT_SECS", 60),
            embedding_base_url: env_or("LLM_EMBEDDING_BASE_URL", "http://localhost:11434/v1"),
            embedding_api_key: std::env::var("LLM_EMBEDDING_API_KEY").ok(),
            embedding_model: env_or("LLM_EMBEDDING_MODEL", "text-embedding-3-small"),
            embedding_dim: env_parsed("LLM_EMBEDDING_DIM", 1536),
            web_research_base_url: env_or("WEB_RESEARCH_BASE_URL", "http://localhost:7800"),
            web_research_timeout_secs: env_parsed("WEB_RESEARCH_TIMEOUT_SECS", 4),
        }
    }
}

/// Deadlines for the parallel context-gathering fan-out (§4.1 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatherDeadlines {
    pub memory_recall_ms: u64,
    pub conversation_fetch_ms: u64,
    pub unlimited_recall_ms: u64,
    pub web_research_ms: u64,
    pub ingestion_ms: u64,
    pub overall_ms: u64,
}

impl GatherDeadlines {
    pub fn from_env() -> Self {
        Self {
            memory_recall_ms: env_parsed("DEADLINE_MEMORY_RECALL_MS", 300),
            conversation_fetch_ms: env_parsed("DEADLINE_CONVERSATION_FETCH_MS", 150),
            unlimited_recall_ms: env_parsed("DEADLINE_UNLIMITED_RECALL_MS", 400),
            web_research_ms: env_parsed("DEADLINE_WEB_RESEARCH_MS", 2500),
            ingestion_ms: env_parsed("DEADLINE_INGESTION_MS", 200),
            overall_ms: env_parsed("DEADLINE_GATHER_OVERALL_MS", 2500),
        }
    }
}
