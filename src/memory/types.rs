// src/memory/types.rs
// Durable entities owned by the memory service (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(anyhow::anyhow!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub thread_id: String,
    pub user_id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub tokens_in: Option<i64>,
    pub tokens_out: Option<i64>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub important: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(thread_id: String, user_id: String, role: Role, content: String) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            thread_id,
            user_id,
            role: role.as_str().to_string(),
            content,
            created_at: Utc::now(),
            tokens_in: None,
            tokens_out: None,
            provider: None,
            model: None,
            important: false,
            deleted_at: None,
        }
    }
}

/// A compressed, durable fact or preference (§3 Memory). Content is
/// PII-redacted before the first write and never mutated afterward —
/// re-mentions update `repeats`/`thread_set`/`last_seen_ts` on the existing
/// row instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub memory_id: String,
    pub user_id: String,
    pub thread_id: String,
    pub content: String,
    pub tier: Tier,
    pub priority: f32,
    pub confidence: f32,
    pub entities: Vec<String>,
    pub redaction_map: Option<serde_json::Value>,
    pub source_thread_id: String,
    pub repeats: i64,
    pub thread_set: Vec<String>,
    pub last_seen_ts: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub embedding: Option<Vec<f32>>,
}

impl Memory {
    pub fn new(
        user_id: String,
        thread_id: String,
        content: String,
        tier: Tier,
        priority: f32,
        confidence: f32,
    ) -> Self {
        let now = Utc::now();
        Self {
            memory_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            thread_id: thread_id.clone(),
            content,
            tier,
            priority: priority.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            entities: Vec::new(),
            redaction_map: None,
            source_thread_id: thread_id.clone(),
            repeats: 1,
            thread_set: vec![thread_id],
            last_seen_ts: now,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            embedding: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Applies a re-mention: bumps `repeats`, records the new thread, and
    /// refreshes `last_seen_ts` without touching `content` (§3 invariant).
    pub fn record_remention(&mut self, thread_id: &str) {
        self.repeats += 1;
        if !self.thread_set.iter().any(|t| t == thread_id) {
            self.thread_set.push(thread_id.to_string());
        }
        self.last_seen_ts = Utc::now();
        self.updated_at = Utc::now();
    }

    pub fn age_days(&self) -> i64 {
        (Utc::now() - self.created_at).num_days()
    }

    pub fn weeks_since_last_seen(&self) -> f32 {
        (Utc::now() - self.last_seen_ts).num_hours() as f32 / (24.0 * 7.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryAudit {
    pub audit_id: String,
    pub user_id: String,
    pub thread_id: String,
    pub start_msg_id: String,
    pub end_msg_id: String,
    pub token_count: i64,
    pub score: f32,
    pub saved: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: String,
    pub user_id: String,
    pub summary: String,
    pub last_msg_id: String,
    pub token_count: i64,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub profile_json: String,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remention_bumps_repeats_without_touching_content() {
        let mut m = Memory::new(
            "u1".into(),
            "t1".into(),
            "likes rust".into(),
            Tier::T3,
            0.7,
            0.9,
        );
        let original_content = m.content.clone();
        m.record_remention("t2");
        assert_eq!(m.repeats, 2);
        assert_eq!(m.thread_set, vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(m.content, original_content);
    }

    #[test]
    fn remention_from_same_thread_does_not_duplicate() {
        let mut m = Memory::new("u1".into(), "t1".into(), "x".into(), Tier::T1, 0.5, 0.5);
        m.record_remention("t1");
        assert_eq!(m.thread_set, vec!["t1".to_string()]);
        assert_eq!(m.repeats, 2);
    }
}
