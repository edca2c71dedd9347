// src/config/server.rs
// Server, database, logging and rate-limit configuration.

use serde::{Deserialize, Serialize};

use super::helpers::{env_or, env_parsed};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("GATEWAY_HOST", "0.0.0.0"),
            port: env_parsed("GATEWAY_PORT", 8080),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: env_or("DATABASE_URL", "sqlite://threadline.db"),
            max_connections: env_parsed("SQLITE_MAX_CONNECTIONS", 10),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            level: env_or("LOG_LEVEL", "info"),
        }
    }
}

/// §5: token-bucket rate limit and per-user stream concurrency cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst: u32,
    pub max_concurrent_streams_per_user: usize,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        Self {
            requests_per_second: env_parsed("RATE_LIMIT_RPS", 10),
            burst: env_parsed("RATE_LIMIT_BURST", 20),
            max_concurrent_streams_per_user: env_parsed("MAX_CONCURRENT_STREAMS_PER_USER", 2),
        }
    }
}

/// §6 "Configuration (recognized options)": `flags.{fr, rag, hybridRAG,
/// search, memoryEvents}` — coarse kill switches a caller can flip without
/// a redeploy. Each layer checks its own flag before fanning out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// "fr" — full recall / unlimited-recall trigger injection.
    pub fr: bool,
    pub rag: bool,
    pub hybrid_rag: bool,
    pub search: bool,
    pub memory_events: bool,
}

impl FeatureFlags {
    pub fn from_env() -> Self {
        Self {
            fr: env_parsed("FLAG_FR", true),
            rag: env_parsed("FLAG_RAG", true),
            hybrid_rag: env_parsed("FLAG_HYBRID_RAG", true),
            search: env_parsed("FLAG_SEARCH", true),
            memory_events: env_parsed("FLAG_MEMORY_EVENTS", true),
        }
    }
}
