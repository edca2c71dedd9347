// src/memory/sweeper.rs
// Background TTL/decay sweep (§4.2.3): weekly priority decay per tier, then
// a soft-delete pass for anything past its tier's TTL. Runs on a periodic
// timer from `src/tasks`.

use tracing::{debug, info};

use crate::config::{Tier, TiersConfig};

use super::store::MemoryStore;

pub struct RetentionSweeper {
    store: MemoryStore,
    tiers: TiersConfig,
}

impl RetentionSweeper {
    pub fn new(store: MemoryStore, tiers: TiersConfig) -> Self {
        Self { store, tiers }
    }

    /// Runs one full sweep across all three tiers. Never panics on a
    /// per-tier failure — logs and continues to the next tier.
    pub async fn sweep(&self) {
        for tier in [Tier::T1, Tier::T2, Tier::T3] {
            self.decay_tier(tier).await;
            self.expire_tier(tier).await;
        }
    }

    async fn decay_tier(&self, tier: Tier) {
        let policy = self.tiers.policy(tier);
        let memories = match self.store.live_memories_for_tier(tier, 10_000).await {
            Ok(m) => m,
            Err(e) => {
                debug!(?tier, error = %e, "decay: failed to load memories");
                return;
            }
        };

        for memory in memories {
            let weeks = memory.weeks_since_last_seen();
            if weeks < 1.0 {
                continue;
            }
            let decayed = (memory.priority - policy.decay_per_week * weeks).max(0.0);
            if (decayed - memory.priority).abs() < f32::EPSILON {
                continue;
            }
            if let Err(e) = self.store.update_priority(&memory.memory_id, decayed).await {
                debug!(error = %e, "decay: failed to persist priority");
            }
        }
    }

    async fn expire_tier(&self, tier: Tier) {
        let policy = self.tiers.policy(tier);
        let cutoff = chrono::Utc::now() - chrono::Duration::days(policy.ttl_days);

        match self.store.soft_delete_expired(tier, cutoff).await {
            Ok(0) => {}
            Ok(n) => info!(?tier, count = n, "sweeper soft-deleted expired memories"),
            Err(e) => debug!(?tier, error = %e, "sweeper: soft-delete failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::Memory;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> MemoryStore {
        let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap();
        let store = MemoryStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn expire_tier_soft_deletes_past_ttl() {
        let store = store().await;
        let tiers = TiersConfig::from_env();
        let mut memory = Memory::new("u1".into(), "t1".into(), "stale fact".into(), Tier::T3, 0.5, 0.9);
        let policy = tiers.policy(Tier::T3);
        memory.last_seen_ts = chrono::Utc::now() - chrono::Duration::days(policy.ttl_days + 1);
        let normalized = crate::utils::text::normalize_content(&memory.content);
        store.upsert_memory(&memory, &normalized).await.unwrap();

        let sweeper = RetentionSweeper::new(store.clone(), tiers);
        sweeper.expire_tier(Tier::T3).await;

        let live = sweeper.store.live_memories_for_tier(Tier::T3, 10).await.unwrap();
        assert!(live.is_empty());
    }

    #[tokio::test]
    async fn decay_tier_reduces_priority_for_stale_memory() {
        let store = store().await;
        let tiers = TiersConfig::from_env();
        let mut memory = Memory::new("u1".into(), "t1".into(), "old preference".into(), Tier::T2, 0.9, 0.9);
        memory.last_seen_ts = chrono::Utc::now() - chrono::Duration::weeks(4);
        let normalized = crate::utils::text::normalize_content(&memory.content);
        store.upsert_memory(&memory, &normalized).await.unwrap();

        let sweeper = RetentionSweeper::new(store.clone(), tiers);
        sweeper.decay_tier(Tier::T2).await;

        let live = sweeper.store.live_memories_for_tier(Tier::T2, 10).await.unwrap();
        assert_eq!(live.len(), 1);
        assert!(live[0].priority < 0.9);
    }
}
