// src/config/mod.rs
// Composed application configuration, loaded once from the environment.

pub mod helpers;
pub mod llm;
pub mod memory;
pub mod server;
pub mod unlimited_recall;

use lazy_static::lazy_static;

pub use llm::{GatherDeadlines, ProviderConfig, RouterConfig};
pub use memory::{CadenceConfig, DedupConfig, QdrantConfig, RecallConfig, SummaryConfig, Tier, TiersConfig};
pub use server::{DatabaseConfig, FeatureFlags, LoggingConfig, RateLimitConfig, ServerConfig};
pub use unlimited_recall::UnlimitedRecallConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub rate_limit: RateLimitConfig,
    pub tiers: TiersConfig,
    pub cadence: CadenceConfig,
    pub recall: RecallConfig,
    pub dedup: DedupConfig,
    pub qdrant: QdrantConfig,
    pub summary: SummaryConfig,
    pub router: RouterConfig,
    pub providers: ProviderConfig,
    pub deadlines: GatherDeadlines,
    pub unlimited_recall: UnlimitedRecallConfig,
    pub flags: FeatureFlags,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            logging: LoggingConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            tiers: TiersConfig::from_env(),
            cadence: CadenceConfig::from_env(),
            recall: RecallConfig::from_env(),
            dedup: DedupConfig::from_env(),
            qdrant: QdrantConfig::from_env(),
            summary: SummaryConfig::from_env(),
            router: RouterConfig::from_env(),
            providers: ProviderConfig::from_env(),
            deadlines: GatherDeadlines::from_env(),
            unlimited_recall: UnlimitedRecallConfig::from_env(),
            flags: FeatureFlags::from_env(),
        }
    }
}

lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}
