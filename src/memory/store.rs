// src/memory/store.rs
// SQLite repository for messages, memories, audits, thread summaries, and
// user profiles — the tables the memory service exclusively owns (§3).

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::config::Tier;

use super::types::{Memory, MemoryAudit, Message, ThreadSummary, UserProfile};

#[derive(Clone)]
pub struct MemoryStore {
    pool: SqlitePool,
}

/// One row of `GET /conversations` (§4.2).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationHeader {
    pub thread_id: String,
    pub last_message_at: DateTime<Utc>,
    pub message_count: i64,
}

impl MemoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                message_id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                tokens_in INTEGER,
                tokens_out INTEGER,
                provider TEXT,
                model TEXT,
                important INTEGER NOT NULL DEFAULT 0,
                deleted_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages(thread_id, created_at, message_id);

            CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
                content, content='messages', content_rowid='rowid'
            );

            CREATE TABLE IF NOT EXISTS memories (
                memory_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                content TEXT NOT NULL CHECK (length(content) <= 1024),
                normalized_content TEXT NOT NULL,
                tier TEXT NOT NULL,
                priority REAL NOT NULL,
                confidence REAL NOT NULL,
                entities TEXT,
                redaction_map TEXT,
                source_thread_id TEXT NOT NULL,
                repeats INTEGER NOT NULL DEFAULT 1,
                thread_set TEXT NOT NULL,
                last_seen_ts INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                deleted_at INTEGER,
                embedding TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id, deleted_at);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_memories_dedup
                ON memories(user_id, tier, normalized_content) WHERE deleted_at IS NULL;

            CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
                content, content='memories', content_rowid='rowid'
            );

            CREATE TABLE IF NOT EXISTS memory_audits (
                audit_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                start_msg_id TEXT NOT NULL,
                end_msg_id TEXT NOT NULL,
                token_count INTEGER NOT NULL,
                score REAL NOT NULL,
                saved INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_audits_thread ON memory_audits(thread_id, created_at);

            CREATE TABLE IF NOT EXISTS thread_summaries (
                thread_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                summary TEXT NOT NULL,
                last_msg_id TEXT NOT NULL,
                token_count INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                deleted_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS user_profiles (
                user_id TEXT PRIMARY KEY,
                profile_json TEXT NOT NULL,
                last_updated INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ---- messages --------------------------------------------------

    /// Idempotent on `message_id` (§8: re-posting the same `messageId` to
    /// `/events/message` has no additional effect). Returns whether a row
    /// was actually inserted.
    pub async fn insert_message(&self, msg: &Message) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages
                (message_id, thread_id, user_id, role, content, created_at,
                 tokens_in, tokens_out, provider, model, important, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(message_id) DO NOTHING
            "#,
        )
        .bind(&msg.message_id)
        .bind(&msg.thread_id)
        .bind(&msg.user_id)
        .bind(&msg.role)
        .bind(&msg.content)
        .bind(msg.created_at.timestamp_millis())
        .bind(msg.tokens_in)
        .bind(msg.tokens_out)
        .bind(&msg.provider)
        .bind(&msg.model)
        .bind(msg.important as i64)
        .bind(msg.deleted_at.map(|d| d.timestamp_millis()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(message_id = %msg.message_id, "duplicate message_id, ignoring");
            return Ok(false);
        }

        sqlx::query("INSERT INTO messages_fts(rowid, content) SELECT rowid, content FROM messages WHERE message_id = ?")
            .bind(&msg.message_id)
            .execute(&self.pool)
            .await?;

        debug!(message_id = %msg.message_id, thread_id = %msg.thread_id, "inserted message");
        Ok(true)
    }

    pub async fn messages_for_thread(&self, thread_id: &str, limit: i64) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT message_id, thread_id, user_id, role, content, created_at,
                   tokens_in, tokens_out, provider, model, important, deleted_at
            FROM messages
            WHERE thread_id = ? AND deleted_at IS NULL
            ORDER BY created_at DESC, message_id DESC
            LIMIT ?
            "#,
        )
        .bind(thread_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_message).collect())
    }

    // ---- memories ----------------------------------------------------

    /// Inserts a new memory, or — if the unique `(user_id, tier,
    /// normalized_content)` index already has a live row — updates
    /// `repeats`/`thread_set`/`last_seen_ts` on it instead (§3 dedup
    /// invariant, §4.2.2).
    pub async fn upsert_memory(&self, memory: &Memory, normalized_content: &str) -> Result<Memory> {
        let existing = self
            .find_live_duplicate(&memory.user_id, memory.tier, normalized_content)
            .await?;

        if let Some(mut existing) = existing {
            existing.record_remention(&memory.thread_id);
            self.update_memory_recall_fields(&existing).await?;
            return Ok(existing);
        }

        self.insert_memory_row(memory, normalized_content).await?;
        Ok(memory.clone())
    }

    async fn insert_memory_row(&self, memory: &Memory, normalized_content: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO memories
                (memory_id, user_id, thread_id, content, normalized_content, tier,
                 priority, confidence, entities, redaction_map, source_thread_id,
                 repeats, thread_set, last_seen_ts, created_at, updated_at, deleted_at, embedding)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&memory.memory_id)
        .bind(&memory.user_id)
        .bind(&memory.thread_id)
        .bind(&memory.content)
        .bind(normalized_content)
        .bind(memory.tier.as_str())
        .bind(memory.priority)
        .bind(memory.confidence)
        .bind(serde_json::to_string(&memory.entities)?)
        .bind(memory.redaction_map.as_ref().map(|v| v.to_string()))
        .bind(&memory.source_thread_id)
        .bind(memory.repeats)
        .bind(serde_json::to_string(&memory.thread_set)?)
        .bind(memory.last_seen_ts.timestamp_millis())
        .bind(memory.created_at.timestamp_millis())
        .bind(memory.updated_at.timestamp_millis())
        .bind(memory.deleted_at.map(|d| d.timestamp_millis()))
        .bind(memory.embedding.as_ref().map(|e| serde_json::to_string(e).unwrap_or_default()))
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT INTO memories_fts(rowid, content) SELECT rowid, content FROM memories WHERE memory_id = ?")
            .bind(&memory.memory_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_memory_recall_fields(&self, memory: &Memory) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE memories
            SET repeats = ?, thread_set = ?, last_seen_ts = ?, updated_at = ?
            WHERE memory_id = ?
            "#,
        )
        .bind(memory.repeats)
        .bind(serde_json::to_string(&memory.thread_set)?)
        .bind(memory.last_seen_ts.timestamp_millis())
        .bind(memory.updated_at.timestamp_millis())
        .bind(&memory.memory_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_live_duplicate(
        &self,
        user_id: &str,
        tier: Tier,
        normalized_content: &str,
    ) -> Result<Option<Memory>> {
        let row = sqlx::query(
            r#"
            SELECT memory_id, user_id, thread_id, content, tier, priority, confidence,
                   entities, redaction_map, source_thread_id, repeats, thread_set,
                   last_seen_ts, created_at, updated_at, deleted_at, embedding
            FROM memories
            WHERE user_id = ? AND tier = ? AND normalized_content = ? AND deleted_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(tier.as_str())
        .bind(normalized_content)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_memory))
    }

    pub async fn memory_by_id(&self, memory_id: &str) -> Result<Option<Memory>> {
        let row = sqlx::query(
            r#"
            SELECT memory_id, user_id, thread_id, content, tier, priority, confidence,
                   entities, redaction_map, source_thread_id, repeats, thread_set,
                   last_seen_ts, created_at, updated_at, deleted_at, embedding
            FROM memories
            WHERE memory_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(memory_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_memory))
    }

    pub async fn mark_superseded(&self, memory_id: &str) -> Result<()> {
        sqlx::query("UPDATE memories SET deleted_at = ? WHERE memory_id = ?")
            .bind(Utc::now().timestamp_millis())
            .bind(memory_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn live_memories_for_tier(&self, tier: Tier, limit: i64) -> Result<Vec<Memory>> {
        let rows = sqlx::query(
            r#"
            SELECT memory_id, user_id, thread_id, content, tier, priority, confidence,
                   entities, redaction_map, source_thread_id, repeats, thread_set,
                   last_seen_ts, created_at, updated_at, deleted_at, embedding
            FROM memories
            WHERE tier = ? AND deleted_at IS NULL
            LIMIT ?
            "#,
        )
        .bind(tier.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_memory).collect())
    }

    pub async fn update_priority(&self, memory_id: &str, priority: f32) -> Result<()> {
        sqlx::query("UPDATE memories SET priority = ? WHERE memory_id = ?")
            .bind(priority)
            .bind(memory_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn soft_delete_expired(&self, tier: Tier, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE memories SET deleted_at = ? WHERE tier = ? AND deleted_at IS NULL AND last_seen_ts < ?",
        )
        .bind(Utc::now().timestamp_millis())
        .bind(tier.as_str())
        .bind(cutoff.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn live_memories_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Memory>> {
        let rows = sqlx::query(
            r#"
            SELECT memory_id, user_id, thread_id, content, tier, priority, confidence,
                   entities, redaction_map, source_thread_id, repeats, thread_set,
                   last_seen_ts, created_at, updated_at, deleted_at, embedding
            FROM memories
            WHERE user_id = ? AND deleted_at IS NULL
            ORDER BY updated_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_memory).collect())
    }

    pub async fn fts_search_memories(&self, user_id: &str, query: &str, limit: i64) -> Result<Vec<Memory>> {
        let rows = sqlx::query(
            r#"
            SELECT m.memory_id, m.user_id, m.thread_id, m.content, m.tier, m.priority, m.confidence,
                   m.entities, m.redaction_map, m.source_thread_id, m.repeats, m.thread_set,
                   m.last_seen_ts, m.created_at, m.updated_at, m.deleted_at, m.embedding
            FROM memories_fts f
            JOIN memories m ON m.rowid = f.rowid
            WHERE memories_fts MATCH ? AND m.user_id = ? AND m.deleted_at IS NULL
            ORDER BY rank
            LIMIT ?
            "#,
        )
        .bind(sanitize_fts_query(query))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_memory).collect())
    }

    /// Paginated listing for `GET /memories` (§4.2), optionally filtered to
    /// one thread.
    pub async fn list_memories(
        &self,
        user_id: &str,
        thread_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Memory>> {
        let rows = match thread_id {
            Some(thread_id) => {
                sqlx::query(
                    r#"
                    SELECT memory_id, user_id, thread_id, content, tier, priority, confidence,
                           entities, redaction_map, source_thread_id, repeats, thread_set,
                           last_seen_ts, created_at, updated_at, deleted_at, embedding
                    FROM memories
                    WHERE user_id = ? AND thread_id = ? AND deleted_at IS NULL
                    ORDER BY updated_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(user_id)
                .bind(thread_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT memory_id, user_id, thread_id, content, tier, priority, confidence,
                           entities, redaction_map, source_thread_id, repeats, thread_set,
                           last_seen_ts, created_at, updated_at, deleted_at, embedding
                    FROM memories
                    WHERE user_id = ? AND deleted_at IS NULL
                    ORDER BY updated_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(user_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(row_to_memory).collect())
    }

    /// Partial update for `PATCH /memories/{id}`: any `None` field is left
    /// untouched. `deleted` soft-deletes the row.
    pub async fn patch_memory(
        &self,
        memory_id: &str,
        content: Option<&str>,
        priority: Option<f32>,
        tier: Option<Tier>,
        deleted: bool,
    ) -> Result<Option<Memory>> {
        let Some(mut existing) = self.memory_by_id(memory_id).await? else {
            return Ok(None);
        };

        if let Some(content) = content {
            existing.content = content.to_string();
        }
        if let Some(priority) = priority {
            existing.priority = priority.clamp(0.0, 1.0);
        }
        if let Some(tier) = tier {
            existing.tier = tier;
        }
        existing.updated_at = Utc::now();
        if deleted {
            existing.deleted_at = Some(Utc::now());
        }

        sqlx::query(
            r#"
            UPDATE memories
            SET content = ?, normalized_content = ?, priority = ?, tier = ?, updated_at = ?, deleted_at = ?
            WHERE memory_id = ?
            "#,
        )
        .bind(&existing.content)
        .bind(crate::utils::text::normalize_content(&existing.content))
        .bind(existing.priority)
        .bind(existing.tier.as_str())
        .bind(existing.updated_at.timestamp_millis())
        .bind(existing.deleted_at.map(|d| d.timestamp_millis()))
        .bind(memory_id)
        .execute(&self.pool)
        .await?;

        Ok(Some(existing))
    }

    /// Last N conversation headers for `GET /conversations` (§4.2),
    /// most-recent-first.
    pub async fn conversation_headers(&self, user_id: &str, limit: i64) -> Result<Vec<ConversationHeader>> {
        let rows = sqlx::query(
            r#"
            SELECT thread_id, MAX(created_at) AS last_message_at, COUNT(*) AS message_count
            FROM messages
            WHERE user_id = ? AND deleted_at IS NULL
            GROUP BY thread_id
            ORDER BY last_message_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ConversationHeader {
                thread_id: row.get("thread_id"),
                last_message_at: DateTime::from_timestamp_millis(row.get("last_message_at")).unwrap_or_else(Utc::now),
                message_count: row.get("message_count"),
            })
            .collect())
    }

    // ---- audits / summaries / profiles --------------------------------

    pub async fn insert_audit(&self, audit: &MemoryAudit) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO memory_audits
                (audit_id, user_id, thread_id, start_msg_id, end_msg_id, token_count, score, saved, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&audit.audit_id)
        .bind(&audit.user_id)
        .bind(&audit.thread_id)
        .bind(&audit.start_msg_id)
        .bind(&audit.end_msg_id)
        .bind(audit.token_count)
        .bind(audit.score)
        .bind(audit.saved)
        .bind(audit.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn last_audit_for_thread(&self, thread_id: &str) -> Result<Option<MemoryAudit>> {
        let row = sqlx::query(
            r#"
            SELECT audit_id, user_id, thread_id, start_msg_id, end_msg_id, token_count, score, saved, created_at
            FROM memory_audits WHERE thread_id = ? ORDER BY created_at DESC LIMIT 1
            "#,
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_audit))
    }

    pub async fn upsert_thread_summary(&self, summary: &ThreadSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO thread_summaries (thread_id, user_id, summary, last_msg_id, token_count, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(thread_id) DO UPDATE SET
                summary = excluded.summary,
                last_msg_id = excluded.last_msg_id,
                token_count = excluded.token_count,
                updated_at = excluded.updated_at,
                deleted_at = excluded.deleted_at
            "#,
        )
        .bind(&summary.thread_id)
        .bind(&summary.user_id)
        .bind(&summary.summary)
        .bind(&summary.last_msg_id)
        .bind(summary.token_count)
        .bind(summary.updated_at.timestamp_millis())
        .bind(summary.deleted_at.map(|d| d.timestamp_millis()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn thread_summary(&self, thread_id: &str) -> Result<Option<ThreadSummary>> {
        let row = sqlx::query(
            "SELECT thread_id, user_id, summary, last_msg_id, token_count, updated_at, deleted_at FROM thread_summaries WHERE thread_id = ?",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_summary))
    }

    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, profile_json, last_updated)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET profile_json = excluded.profile_json, last_updated = excluded.last_updated
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.profile_json)
        .bind(profile.last_updated.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT user_id, profile_json, last_updated FROM user_profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| UserProfile {
            user_id: r.get("user_id"),
            profile_json: r.get("profile_json"),
            last_updated: millis_to_utc(r.get("last_updated")),
        }))
    }
}

fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

fn row_to_message(row: sqlx::sqlite::SqliteRow) -> Message {
    Message {
        message_id: row.get("message_id"),
        thread_id: row.get("thread_id"),
        user_id: row.get("user_id"),
        role: row.get("role"),
        content: row.get("content"),
        created_at: millis_to_utc(row.get("created_at")),
        tokens_in: row.get("tokens_in"),
        tokens_out: row.get("tokens_out"),
        provider: row.get("provider"),
        model: row.get("model"),
        important: row.get::<i64, _>("important") != 0,
        deleted_at: row.get::<Option<i64>, _>("deleted_at").map(millis_to_utc),
    }
}

fn row_to_memory(row: sqlx::sqlite::SqliteRow) -> Memory {
    let tier_str: String = row.get("tier");
    let entities_json: String = row.get("entities");
    let thread_set_json: String = row.get("thread_set");
    let redaction_map_str: Option<String> = row.get("redaction_map");
    let embedding_str: Option<String> = row.get("embedding");

    Memory {
        memory_id: row.get("memory_id"),
        user_id: row.get("user_id"),
        thread_id: row.get("thread_id"),
        content: row.get("content"),
        tier: tier_str.parse().unwrap_or(Tier::T3),
        priority: row.get("priority"),
        confidence: row.get("confidence"),
        entities: serde_json::from_str(&entities_json).unwrap_or_default(),
        redaction_map: redaction_map_str.and_then(|s| serde_json::from_str(&s).ok()),
        source_thread_id: row.get("source_thread_id"),
        repeats: row.get("repeats"),
        thread_set: serde_json::from_str(&thread_set_json).unwrap_or_default(),
        last_seen_ts: millis_to_utc(row.get("last_seen_ts")),
        created_at: millis_to_utc(row.get("created_at")),
        updated_at: millis_to_utc(row.get("updated_at")),
        deleted_at: row.get::<Option<i64>, _>("deleted_at").map(millis_to_utc),
        embedding: embedding_str.and_then(|s| serde_json::from_str(&s).ok()),
    }
}

fn row_to_audit(row: sqlx::sqlite::SqliteRow) -> MemoryAudit {
    MemoryAudit {
        audit_id: row.get("audit_id"),
        user_id: row.get("user_id"),
        thread_id: row.get("thread_id"),
        start_msg_id: row.get("start_msg_id"),
        end_msg_id: row.get("end_msg_id"),
        token_count: row.get("token_count"),
        score: row.get("score"),
        saved: row.get("saved"),
        created_at: millis_to_utc(row.get("created_at")),
    }
}

fn row_to_summary(row: sqlx::sqlite::SqliteRow) -> ThreadSummary {
    ThreadSummary {
        thread_id: row.get("thread_id"),
        user_id: row.get("user_id"),
        summary: row.get("summary"),
        last_msg_id: row.get("last_msg_id"),
        token_count: row.get("token_count"),
        updated_at: millis_to_utc(row.get("updated_at")),
        deleted_at: row.get::<Option<i64>, _>("deleted_at").map(millis_to_utc),
    }
}

/// FTS5 query strings must not contain bare operators; quote the whole
/// phrase and let SQLite's tokenizer do the rest.
fn sanitize_fts_query(query: &str) -> String {
    format!("\"{}\"", query.replace('"', ""))
}
