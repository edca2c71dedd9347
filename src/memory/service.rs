// src/memory/service.rs
// Memory service public operations (§4.2): the facade the HTTP layer and
// the gateway orchestrator call through. Wraps the store, recall engine,
// dedup path, cadence tracker, and audit pipeline into one entry point.

use std::sync::Arc;

use crate::config::Tier;
use crate::error::{CoreError, CoreResult};

use super::audit::{AuditOutcome, AuditPipeline, CadenceTracker};
use super::dedup;
use super::recall::{RecallEngine, RecallRequest};
use super::redaction;
use super::store::{ConversationHeader, MemoryStore};
use super::types::{Memory, Message, Role, UserProfile};

/// §3 invariant: memory content is capped at 1024 chars.
const MAX_MEMORY_CONTENT_CHARS: usize = 1024;

pub struct MemoryService {
    store: MemoryStore,
    recall: RecallEngine,
    cadence: CadenceTracker,
    audit: AuditPipeline,
    dedup: crate::config::DedupConfig,
}

impl MemoryService {
    pub fn new(
        store: MemoryStore,
        recall: RecallEngine,
        cadence: CadenceTracker,
        audit: AuditPipeline,
        dedup: crate::config::DedupConfig,
    ) -> Self {
        Self {
            store,
            recall,
            cadence,
            audit,
            dedup,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// `POST /memories` (§4.2): redact, then run the dedup path, then write.
    pub async fn create_memory(
        &self,
        user_id: &str,
        thread_id: &str,
        content: &str,
        priority: Option<f32>,
        tier: Option<Tier>,
    ) -> CoreResult<Memory> {
        if content.trim().is_empty() {
            return Err(CoreError::validation("content must not be empty"));
        }
        if content.chars().count() > MAX_MEMORY_CONTENT_CHARS {
            return Err(CoreError::validation(format!("content must not exceed {MAX_MEMORY_CONTENT_CHARS} chars")));
        }
        let tier = tier.unwrap_or(Tier::T3);

        let redaction::RedactionResult {
            redacted_content,
            redaction_map,
        } = redaction::redact(content);

        let recent = self.store.live_memories_for_user(user_id, 20).await?;
        let decision = dedup::decide(&redacted_content, None, &recent, &self.dedup);

        let memory = match decision {
            dedup::DedupDecision::Insert => {
                let mut m = Memory::new(
                    user_id.to_string(),
                    thread_id.to_string(),
                    redacted_content,
                    tier,
                    priority.unwrap_or(0.8),
                    0.9,
                );
                m.redaction_map = redaction_map;
                m
            }
            dedup::DedupDecision::Supersede { existing_memory_id, .. } => {
                let mut existing = self
                    .store
                    .memory_by_id(&existing_memory_id)
                    .await?
                    .ok_or_else(|| CoreError::integrity("superseded memory vanished mid-write"))?;
                existing.record_remention(thread_id);
                crate::metrics::record_memory_superseded();
                existing
            }
        };

        let normalized = crate::utils::text::normalize_content(&memory.content);
        let written = self.store.upsert_memory(&memory, &normalized).await?;
        crate::metrics::record_memory_saved(written.tier.as_str());
        Ok(written)
    }

    /// `GET /memories` (§4.2): paginated listing by user, optional thread filter.
    pub async fn list_memories(
        &self,
        user_id: &str,
        thread_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> CoreResult<Vec<Memory>> {
        Ok(self.store.list_memories(user_id, thread_id, limit.clamp(1, 200), offset.max(0)).await?)
    }

    /// `PATCH /memories/{id}` (§4.2): partial update, soft delete via `deleted`.
    pub async fn patch_memory(
        &self,
        memory_id: &str,
        content: Option<&str>,
        priority: Option<f32>,
        tier: Option<Tier>,
        deleted: bool,
    ) -> CoreResult<Memory> {
        self.store
            .patch_memory(memory_id, content, priority, tier, deleted)
            .await?
            .ok_or_else(|| CoreError::validation(format!("no such memory: {memory_id}")))
    }

    /// `GET /recall` (§4.3): delegates straight to the hybrid recall engine,
    /// which never errors — it degrades to an empty vector under deadline
    /// pressure.
    pub async fn recall(&self, request: RecallRequest<'_>) -> Vec<Memory> {
        self.recall.recall(request).await
    }

    /// `POST /events/message` (§4.2, §4.2.1): fire-and-forget message
    /// capture plus cadence bookkeeping. Returns the audit outcome only
    /// when the cadence trigger actually fired this call.
    pub async fn ingest_message_event(
        &self,
        user_id: &str,
        thread_id: &str,
        message_id: &str,
        role: Role,
        content: &str,
        tokens_in: Option<i64>,
        tokens_out: Option<i64>,
    ) -> CoreResult<Option<AuditOutcome>> {
        let mut message = Message::new(thread_id.to_string(), user_id.to_string(), role, content.to_string());
        message.message_id = message_id.to_string();
        message.tokens_in = tokens_in;
        message.tokens_out = tokens_out;
        if !self.store.insert_message(&message).await? {
            return Ok(None);
        }

        let tokens = (tokens_in.unwrap_or(0) + tokens_out.unwrap_or(0)).max(0) as u32;
        if !self.cadence.record_message(thread_id, tokens) {
            return Ok(None);
        }

        let outcome = self.audit.run(user_id, thread_id).await.map_err(CoreError::Internal)?;
        self.cadence.reset(thread_id);
        Ok(Some(outcome))
    }

    /// `GET /conversations` (§4.2): last N conversation headers, most recent first.
    pub async fn conversations(&self, user_id: &str, limit: i64) -> CoreResult<Vec<ConversationHeader>> {
        Ok(self.store.conversation_headers(user_id, limit.clamp(1, 50)).await?)
    }

    /// `GET /profile` (§4.2): the rebuilt user profile JSON, or an empty
    /// shell if the user has never had an audit run.
    pub async fn profile(&self, user_id: &str) -> CoreResult<UserProfile> {
        match self.store.profile(user_id).await? {
            Some(profile) => Ok(profile),
            None => Ok(UserProfile {
                user_id: user_id.to_string(),
                profile_json: "{}".to_string(),
                last_updated: chrono::Utc::now(),
            }),
        }
    }
}

pub type SharedMemoryService = Arc<MemoryService>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CadenceConfig, DedupConfig, RecallConfig, TiersConfig};
    use crate::memory::audit::AuditPipeline;
    use crate::memory::recall::RecallEngine;
    use crate::memory::summarizer::SummaryGenerator;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn service() -> MemoryService {
        let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap();
        let store = MemoryStore::new(pool);
        store.migrate().await.unwrap();

        let tiers = TiersConfig::from_env();
        let dedup_cfg = DedupConfig::from_env();
        let cadence_cfg = CadenceConfig::from_env();
        let caches = Arc::new(crate::cache::AppCaches::new());
        let summarizer = SummaryGenerator::new(None, crate::config::CONFIG.summary.clone(), "none".into());
        let audit = AuditPipeline::new(
            store.clone(),
            caches,
            tiers.clone(),
            cadence_cfg.clone(),
            dedup_cfg.clone(),
            None,
            summarizer,
        );
        let recall = RecallEngine::new(store.clone(), None, None, RecallConfig::from_env());
        let cadence = CadenceTracker::new(cadence_cfg);

        MemoryService::new(store, recall, cadence, audit, dedup_cfg)
    }

    #[tokio::test]
    async fn create_memory_redacts_and_persists() {
        let svc = service().await;
        let memory = svc
            .create_memory("u1", "t1", "my email is a@b.com", None, None)
            .await
            .unwrap();
        assert!(!memory.content.contains("a@b.com"));
    }

    #[tokio::test]
    async fn create_memory_rejects_empty_content() {
        let svc = service().await;
        assert!(svc.create_memory("u1", "t1", "   ", None, None).await.is_err());
    }

    #[tokio::test]
    async fn list_memories_returns_created_entry() {
        let svc = service().await;
        svc.create_memory("u1", "t1", "likes dark mode", None, None).await.unwrap();
        let listed = svc.list_memories("u1", None, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn patch_memory_soft_deletes() {
        let svc = service().await;
        let memory = svc.create_memory("u1", "t1", "likes tea", None, None).await.unwrap();
        let patched = svc.patch_memory(&memory.memory_id, None, None, None, true).await.unwrap();
        assert!(patched.deleted_at.is_some());
    }

    #[tokio::test]
    async fn profile_defaults_to_empty_shell() {
        let svc = service().await;
        let profile = svc.profile("nobody").await.unwrap();
        assert_eq!(profile.profile_json, "{}");
    }

    #[tokio::test]
    async fn ingest_message_event_triggers_audit_after_threshold() {
        let svc = service().await;
        let mut fired = false;
        for i in 0..10 {
            let outcome = svc
                .ingest_message_event(
                    "u1",
                    "t1",
                    &format!("m{i}"),
                    Role::User,
                    "I prefer dark mode over light mode",
                    Some(5),
                    Some(5),
                )
                .await
                .unwrap();
            if outcome.is_some() {
                fired = true;
            }
        }
        assert!(fired);
    }
}
