// src/memory/profile.rs
// User profile rebuild (§3 User profile): a low-priority context block
// distilled from the user's live memories, rebuilt after every audit.

use serde_json::json;
use tracing::warn;

use super::store::MemoryStore;
use super::types::UserProfile;

/// Rebuilds `userId`'s profile from their current live memories, grouped by
/// tier. Never fails the caller — a storage error is logged and skipped,
/// since profile rebuild is a best-effort side effect of an audit.
pub async fn rebuild(store: &MemoryStore, user_id: &str) {
    let memories = match store.live_memories_for_user(user_id, 200).await {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "failed to load memories for profile rebuild");
            return;
        }
    };

    let preferences: Vec<&str> = memories
        .iter()
        .filter(|m| m.tier == crate::config::Tier::T2)
        .map(|m| m.content.as_str())
        .collect();

    let recent_cross_thread: Vec<&str> = memories
        .iter()
        .filter(|m| m.tier == crate::config::Tier::T1)
        .map(|m| m.content.as_str())
        .collect();

    let general: Vec<&str> = memories
        .iter()
        .filter(|m| m.tier == crate::config::Tier::T3)
        .map(|m| m.content.as_str())
        .collect();

    let profile_json = json!({
        "preferences": preferences,
        "recentCrossThread": recent_cross_thread,
        "general": general,
        "memoryCount": memories.len(),
    })
    .to_string();

    let profile = UserProfile {
        user_id: user_id.to_string(),
        profile_json,
        last_updated: chrono::Utc::now(),
    };

    if let Err(e) = store.upsert_profile(&profile).await {
        warn!(error = %e, "failed to persist rebuilt profile");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tier;
    use crate::memory::types::Memory;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> MemoryStore {
        let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap();
        let store = MemoryStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn rebuild_groups_memories_by_tier() {
        let store = store().await;
        let m = Memory::new("u1".into(), "t1".into(), "prefers dark mode".into(), Tier::T2, 0.9, 0.9);
        let normalized = crate::utils::text::normalize_content(&m.content);
        store.upsert_memory(&m, &normalized).await.unwrap();

        rebuild(&store, "u1").await;

        let profile = store.profile("u1").await.unwrap().unwrap();
        assert!(profile.profile_json.contains("prefers dark mode"));
    }
}
