// src/cache/mod.rs
//
//! In-memory TTL caches for transient, request-scoped state (§3):
//! - Research capsules, keyed `factPack:{threadId}:{batchId}`, consumed once.
//! - User profile reads, to avoid re-hitting storage on every turn.
//! - Cross-thread tier-detection results, reused across a single audit burst.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSource {
    pub host: String,
    pub url: String,
    pub date: Option<String>,
    pub authority_tier: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchClaim {
    pub text: String,
    pub confidence: f32,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchCapsule {
    pub claims: Vec<ResearchClaim>,
    pub sources: Vec<ResearchSource>,
    pub entities: Vec<String>,
    pub ttl_class: String,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileCacheEntry {
    pub profile_json: String,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

/// Caches shared across the gateway and memory service for the lifetime of
/// the process.
pub struct AppCaches {
    research_capsules: Cache<String, Arc<ResearchCapsule>>,
    profiles: Cache<String, Arc<ProfileCacheEntry>>,
    tier_detection: Cache<String, Arc<str>>,
    /// Cross-thread cache for T1 tier detection (§4.2.1 step 4, §9): maps
    /// `(userId, normalizedContent)` to the first threadId it was seen in.
    cross_thread_seen: Cache<String, Arc<str>>,
}

impl AppCaches {
    pub fn new() -> Self {
        Self {
            // Research capsules are consumed once at the top of a stream;
            // a short TTL bounds memory even if nothing ever reads them.
            research_capsules: Cache::builder()
                .time_to_live(Duration::from_secs(300))
                .max_capacity(10_000)
                .build(),
            profiles: Cache::builder()
                .time_to_live(Duration::from_secs(120))
                .max_capacity(50_000)
                .build(),
            tier_detection: Cache::builder()
                .time_to_live(Duration::from_secs(60))
                .max_capacity(50_000)
                .build(),
            cross_thread_seen: Cache::builder()
                .time_to_live(Duration::from_secs(3600))
                .max_capacity(200_000)
                .build(),
        }
    }

    fn cross_thread_key(user_id: &str, normalized_content: &str) -> String {
        format!("{user_id}:{normalized_content}")
    }

    /// Records (or reads) that `normalized_content` was seen for `user_id`
    /// in `thread_id`. Returns `(tier_is_t1, seen_before)`: `tier_is_t1` is
    /// true when the content had already been observed in a *different*
    /// thread (§4.2.1 step 4's T1 rule); the entry is created on first
    /// observation so later calls in other threads can detect the hit.
    pub async fn observe_cross_thread(
        &self,
        user_id: &str,
        normalized_content: &str,
        thread_id: &str,
    ) -> (bool, bool) {
        let key = Self::cross_thread_key(user_id, normalized_content);
        match self.cross_thread_seen.get(&key).await {
            Some(seen_thread_id) => {
                let is_t1 = seen_thread_id.as_ref() != thread_id;
                (is_t1, true)
            }
            None => {
                self.cross_thread_seen.insert(key, Arc::from(thread_id)).await;
                (false, false)
            }
        }
    }

    pub fn capsule_key(thread_id: &str, batch_id: &str) -> String {
        format!("factPack:{thread_id}:{batch_id}")
    }

    pub async fn put_capsule(&self, key: String, capsule: ResearchCapsule) {
        self.research_capsules.insert(key, Arc::new(capsule)).await;
    }

    /// Consumes (removes) the capsule so it fires the `research_capsule`
    /// SSE event at most once per batch (§4.10).
    pub async fn take_capsule(&self, key: &str) -> Option<Arc<ResearchCapsule>> {
        let value = self.research_capsules.get(key).await;
        if value.is_some() {
            self.research_capsules.invalidate(key).await;
            debug!(key, "research capsule consumed");
        }
        value
    }

    pub async fn put_profile(&self, user_id: String, entry: ProfileCacheEntry) {
        self.profiles.insert(user_id, Arc::new(entry)).await;
    }

    pub async fn get_profile(&self, user_id: &str) -> Option<Arc<ProfileCacheEntry>> {
        self.profiles.get(user_id).await
    }

    pub async fn invalidate_profile(&self, user_id: &str) {
        self.profiles.invalidate(user_id).await;
    }

    pub async fn cache_tier_detection(&self, thread_id: &str, tier: &str) {
        self.tier_detection
            .insert(thread_id.to_string(), Arc::from(tier))
            .await;
    }

    pub async fn cached_tier_detection(&self, thread_id: &str) -> Option<Arc<str>> {
        self.tier_detection.get(thread_id).await
    }
}

impl Default for AppCaches {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capsule_is_consumed_exactly_once() {
        let caches = AppCaches::new();
        let key = AppCaches::capsule_key("thread-1", "batch-1");
        caches
            .put_capsule(
                key.clone(),
                ResearchCapsule {
                    claims: vec![],
                    sources: vec![],
                    entities: vec![],
                    ttl_class: "short".into(),
                    fetched_at: chrono::Utc::now(),
                    expires_at: chrono::Utc::now() + chrono::Duration::minutes(5),
                },
            )
            .await;

        assert!(caches.take_capsule(&key).await.is_some());
        assert!(caches.take_capsule(&key).await.is_none());
    }

    #[tokio::test]
    async fn profile_cache_round_trips() {
        let caches = AppCaches::new();
        caches
            .put_profile(
                "user-1".into(),
                ProfileCacheEntry {
                    profile_json: "{}".into(),
                    last_updated: chrono::Utc::now(),
                },
            )
            .await;
        assert!(caches.get_profile("user-1").await.is_some());
        caches.invalidate_profile("user-1").await;
        assert!(caches.get_profile("user-1").await.is_none());
    }

    #[tokio::test]
    async fn cross_thread_observe_detects_second_thread() {
        let caches = AppCaches::new();
        let (is_t1, seen) = caches.observe_cross_thread("u1", "likes rust", "thread-a").await;
        assert!(!is_t1);
        assert!(!seen);

        let (is_t1, seen) = caches.observe_cross_thread("u1", "likes rust", "thread-b").await;
        assert!(is_t1);
        assert!(seen);
    }

    #[tokio::test]
    async fn cross_thread_same_thread_is_not_t1() {
        let caches = AppCaches::new();
        caches.observe_cross_thread("u1", "likes rust", "thread-a").await;
        let (is_t1, seen) = caches.observe_cross_thread("u1", "likes rust", "thread-a").await;
        assert!(!is_t1);
        assert!(seen);
    }
}
