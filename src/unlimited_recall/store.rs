// src/unlimited_recall/store.rs
// SQLite repository for 100%-capture messages, per-thread packages,
// background jobs, and recall events (§4.4). Separate tables from the
// memory service's own `messages` — capture here is unconditional and never
// subject to memory retention/TTL.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::types::{
    CapturedMessage, ConversationPackage, JobStatus, JobType, RecallEvent, RecallJob,
};

#[derive(Clone)]
pub struct UnlimitedRecallStore {
    pool: SqlitePool,
}

impl UnlimitedRecallStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_messages (
                message_id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                tokens INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_conv_messages_thread
                ON conversation_messages(thread_id, created_at);

            CREATE TABLE IF NOT EXISTS conversation_packages (
                thread_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                message_count INTEGER NOT NULL DEFAULT 0,
                total_tokens INTEGER NOT NULL DEFAULT 0,
                last_message_at INTEGER NOT NULL,
                label TEXT,
                summary TEXT,
                summary_updated_at INTEGER,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_conv_packages_user
                ON conversation_packages(user_id, last_message_at);

            CREATE TABLE IF NOT EXISTS recall_jobs (
                job_id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL,
                job_type TEXT NOT NULL,
                status TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                error TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_recall_jobs_status ON recall_jobs(job_type, status, created_at);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_recall_jobs_active
                ON recall_jobs(thread_id, job_type) WHERE status IN ('pending', 'running');

            CREATE TABLE IF NOT EXISTS conversation_embeddings (
                thread_id TEXT PRIMARY KEY,
                embedding TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS recall_events (
                event_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                trigger TEXT NOT NULL,
                confidence REAL NOT NULL,
                strategy TEXT,
                resolved_thread_id TEXT,
                tokens_injected INTEGER NOT NULL DEFAULT 0,
                relevance_score REAL NOT NULL DEFAULT 0,
                latency_ms INTEGER NOT NULL DEFAULT 0,
                success INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ---- capture -----------------------------------------------------

    pub async fn capture_message(&self, message: &CapturedMessage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversation_messages
                (message_id, thread_id, user_id, role, content, tokens, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.message_id)
        .bind(&message.thread_id)
        .bind(&message.user_id)
        .bind(&message.role)
        .bind(&message.content)
        .bind(message.tokens)
        .bind(message.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts the package row on first message, otherwise bumps its
    /// counters (§4.4 Capture). Returns the package as it stands after the
    /// update.
    pub async fn bump_package(&self, thread_id: &str, user_id: &str, tokens: i64) -> Result<ConversationPackage> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO conversation_packages (thread_id, user_id, message_count, total_tokens, last_message_at, created_at)
            VALUES (?, ?, 1, ?, ?, ?)
            ON CONFLICT(thread_id) DO UPDATE SET
                message_count = message_count + 1,
                total_tokens = total_tokens + excluded.total_tokens,
                last_message_at = excluded.last_message_at
            "#,
        )
        .bind(thread_id)
        .bind(user_id)
        .bind(tokens)
        .bind(now.timestamp_millis())
        .bind(now.timestamp_millis())
        .execute(&self.pool)
        .await?;

        self.package(thread_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("package vanished immediately after upsert"))
    }

    pub async fn package(&self, thread_id: &str) -> Result<Option<ConversationPackage>> {
        let row = sqlx::query(
            "SELECT thread_id, user_id, message_count, total_tokens, last_message_at, label, summary, summary_updated_at, created_at \
             FROM conversation_packages WHERE thread_id = ?",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_package))
    }

    pub async fn set_label(&self, thread_id: &str, label: &str) -> Result<()> {
        sqlx::query("UPDATE conversation_packages SET label = ? WHERE thread_id = ?")
            .bind(label)
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_summary(&self, thread_id: &str, summary: &str) -> Result<()> {
        sqlx::query("UPDATE conversation_packages SET summary = ?, summary_updated_at = ? WHERE thread_id = ?")
            .bind(summary)
            .bind(Utc::now().timestamp_millis())
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn messages_for_thread(&self, thread_id: &str, limit: i64, offset: i64) -> Result<Vec<CapturedMessage>> {
        let rows = sqlx::query(
            "SELECT message_id, thread_id, user_id, role, content, tokens, created_at \
             FROM conversation_messages WHERE thread_id = ? ORDER BY created_at ASC LIMIT ? OFFSET ?",
        )
        .bind(thread_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_message).collect())
    }

    pub async fn message_count(&self, thread_id: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM conversation_messages WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn packages_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<ConversationPackage>> {
        let rows = sqlx::query(
            "SELECT thread_id, user_id, message_count, total_tokens, last_message_at, label, summary, summary_updated_at, created_at \
             FROM conversation_packages WHERE user_id = ? ORDER BY last_message_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_package).collect())
    }

    // ---- jobs ----------------------------------------------------------

    /// Enqueues a job unless one is already `pending`/`running` for this
    /// `(threadId, jobType)` (§4.4 "at most one running per thread+type").
    pub async fn enqueue_job(&self, thread_id: &str, job_type: JobType) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let result = sqlx::query(
            r#"
            INSERT INTO recall_jobs (job_id, thread_id, job_type, status, retry_count, created_at, updated_at)
            VALUES (?, ?, ?, 'pending', 0, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(thread_id)
        .bind(job_type.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(thread_id, job_type = job_type.as_str(), "job already queued, skipping");
        }
        Ok(())
    }

    /// Atomically claims the oldest pending job of `job_type`.
    pub async fn claim_next_job(&self, job_type: JobType) -> Result<Option<RecallJob>> {
        let now = Utc::now().timestamp_millis();
        let row = sqlx::query(
            r#"
            UPDATE recall_jobs
            SET status = 'running', updated_at = ?
            WHERE job_id = (
                SELECT job_id FROM recall_jobs
                WHERE job_type = ? AND status = 'pending'
                ORDER BY created_at ASC
                LIMIT 1
            )
            RETURNING job_id, thread_id, job_type, status, retry_count, error, created_at, updated_at
            "#,
        )
        .bind(now)
        .bind(job_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_job))
    }

    pub async fn complete_job(&self, job_id: &str) -> Result<()> {
        sqlx::query("UPDATE recall_jobs SET status = 'completed', updated_at = ? WHERE job_id = ?")
            .bind(Utc::now().timestamp_millis())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Re-queues on transient failure (retry_count < max_retries), else
    /// marks permanently `failed` with the error text (§4.4 Worker loop).
    pub async fn fail_job(&self, job_id: &str, error: &str, max_retries: i32) -> Result<()> {
        let row = sqlx::query("SELECT retry_count FROM recall_jobs WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(()) };
        let retry_count: i32 = row.get("retry_count");

        let now = Utc::now().timestamp_millis();
        if retry_count + 1 >= max_retries {
            sqlx::query("UPDATE recall_jobs SET status = 'failed', retry_count = ?, error = ?, updated_at = ? WHERE job_id = ?")
                .bind(retry_count + 1)
                .bind(error)
                .bind(now)
                .bind(job_id)
                .execute(&self.pool)
                .await?;
        } else {
            sqlx::query("UPDATE recall_jobs SET status = 'pending', retry_count = ?, error = ?, updated_at = ? WHERE job_id = ?")
                .bind(retry_count + 1)
                .bind(error)
                .bind(now)
                .bind(job_id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    // ---- embeddings ------------------------------------------------------

    pub async fn upsert_conversation_embedding(&self, thread_id: &str, embedding: &[f32]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversation_embeddings (thread_id, embedding, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(thread_id) DO UPDATE SET embedding = excluded.embedding, updated_at = excluded.updated_at
            "#,
        )
        .bind(thread_id)
        .bind(serde_json::to_string(embedding)?)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn conversation_embeddings_for_user(&self, user_id: &str) -> Result<Vec<(String, Vec<f32>)>> {
        let rows = sqlx::query(
            r#"
            SELECT ce.thread_id AS thread_id, ce.embedding AS embedding
            FROM conversation_embeddings ce
            JOIN conversation_packages cp ON cp.thread_id = ce.thread_id
            WHERE cp.user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let thread_id: String = row.get("thread_id");
                let raw: String = row.get("embedding");
                serde_json::from_str::<Vec<f32>>(&raw).ok().map(|e| (thread_id, e))
            })
            .collect())
    }

    // ---- recall events -----------------------------------------------

    pub async fn insert_recall_event(&self, event: &RecallEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO recall_events
                (event_id, user_id, thread_id, trigger, confidence, strategy, resolved_thread_id,
                 tokens_injected, relevance_score, latency_ms, success, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.event_id)
        .bind(&event.user_id)
        .bind(&event.thread_id)
        .bind(&event.trigger)
        .bind(event.confidence)
        .bind(&event.strategy)
        .bind(&event.resolved_thread_id)
        .bind(event.tokens_injected)
        .bind(event.relevance_score)
        .bind(event.latency_ms)
        .bind(event.success)
        .bind(event.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_message(row: sqlx::sqlite::SqliteRow) -> CapturedMessage {
    let created_at_ms: i64 = row.get("created_at");
    CapturedMessage {
        message_id: row.get("message_id"),
        thread_id: row.get("thread_id"),
        user_id: row.get("user_id"),
        role: row.get("role"),
        content: row.get("content"),
        tokens: row.get("tokens"),
        created_at: DateTime::from_timestamp_millis(created_at_ms).unwrap_or_else(Utc::now),
    }
}

fn row_to_package(row: sqlx::sqlite::SqliteRow) -> ConversationPackage {
    let last_message_at_ms: i64 = row.get("last_message_at");
    let created_at_ms: i64 = row.get("created_at");
    let summary_updated_at_ms: Option<i64> = row.get("summary_updated_at");
    ConversationPackage {
        thread_id: row.get("thread_id"),
        user_id: row.get("user_id"),
        message_count: row.get("message_count"),
        total_tokens: row.get("total_tokens"),
        last_message_at: DateTime::from_timestamp_millis(last_message_at_ms).unwrap_or_else(Utc::now),
        label: row.get("label"),
        summary: row.get("summary"),
        summary_updated_at: summary_updated_at_ms.and_then(DateTime::from_timestamp_millis),
        created_at: DateTime::from_timestamp_millis(created_at_ms).unwrap_or_else(Utc::now),
    }
}

fn row_to_job(row: sqlx::sqlite::SqliteRow) -> RecallJob {
    let job_type: String = row.get("job_type");
    let status: String = row.get("status");
    let created_at_ms: i64 = row.get("created_at");
    let updated_at_ms: i64 = row.get("updated_at");
    RecallJob {
        job_id: row.get("job_id"),
        thread_id: row.get("thread_id"),
        job_type: job_type.parse().unwrap_or(JobType::Label),
        status: status.parse().unwrap_or(JobStatus::Pending),
        retry_count: row.get("retry_count"),
        error: row.get("error"),
        created_at: DateTime::from_timestamp_millis(created_at_ms).unwrap_or_else(Utc::now),
        updated_at: DateTime::from_timestamp_millis(updated_at_ms).unwrap_or_else(Utc::now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unlimited_recall::types::CapturedMessage;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> UnlimitedRecallStore {
        let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap();
        let store = UnlimitedRecallStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn message(thread_id: &str) -> CapturedMessage {
        CapturedMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            user_id: "u1".to_string(),
            role: "user".to_string(),
            content: "hello".to_string(),
            tokens: 5,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn bump_package_accumulates_counts() {
        let store = store().await;
        store.bump_package("t1", "u1", 10).await.unwrap();
        let pkg = store.bump_package("t1", "u1", 15).await.unwrap();
        assert_eq!(pkg.message_count, 2);
        assert_eq!(pkg.total_tokens, 25);
    }

    #[tokio::test]
    async fn capture_then_list_messages_in_order() {
        let store = store().await;
        store.capture_message(&message("t1")).await.unwrap();
        store.capture_message(&message("t1")).await.unwrap();
        let messages = store.messages_for_thread("t1", 10, 0).await.unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn enqueue_job_is_idempotent_while_pending() {
        let store = store().await;
        store.enqueue_job("t1", JobType::Label).await.unwrap();
        store.enqueue_job("t1", JobType::Label).await.unwrap();
        let job = store.claim_next_job(JobType::Label).await.unwrap();
        assert!(job.is_some());
        let none = store.claim_next_job(JobType::Label).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn fail_job_requeues_until_max_retries() {
        let store = store().await;
        store.enqueue_job("t1", JobType::Summary).await.unwrap();
        let job = store.claim_next_job(JobType::Summary).await.unwrap().unwrap();
        store.fail_job(&job.job_id, "transient", 3).await.unwrap();

        let requeued = store.claim_next_job(JobType::Summary).await.unwrap();
        assert!(requeued.is_some());
    }
}
