// src/unlimited_recall/worker.rs
// Background job worker (§4.4 Worker loop): polls for pending label/summary/
// embedding jobs, executes one of each per tick, retries transient failures
// up to a cap, and chains summary -> embedding.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::UnlimitedRecallConfig;
use crate::llm::provider::{CompletionRequest, Message as LlmMessage};
use crate::llm::{EmbeddingProvider, LlmProvider};

use super::store::UnlimitedRecallStore;
use super::types::{JobType, RecallJob};

pub struct RecallWorker {
    store: UnlimitedRecallStore,
    llm: Option<Arc<dyn LlmProvider>>,
    embeddings: Option<Arc<dyn EmbeddingProvider>>,
    config: UnlimitedRecallConfig,
    model: String,
}

impl RecallWorker {
    pub fn new(
        store: UnlimitedRecallStore,
        llm: Option<Arc<dyn LlmProvider>>,
        embeddings: Option<Arc<dyn EmbeddingProvider>>,
        config: UnlimitedRecallConfig,
        model: String,
    ) -> Self {
        Self {
            store,
            llm,
            embeddings,
            config,
            model,
        }
    }

    /// Runs forever, polling every `worker_poll_interval_ms`. Intended to
    /// be spawned once at startup by `src/tasks`.
    pub async fn run(&self) {
        loop {
            self.tick().await;
            tokio::time::sleep(Duration::from_millis(self.config.worker_poll_interval_ms)).await;
        }
    }

    /// Processes at most one job per type. Exposed separately from `run`
    /// so tests can drive it without a sleep loop.
    pub async fn tick(&self) {
        self.process(JobType::Label).await;
        self.process(JobType::Summary).await;
        self.process(JobType::Embedding).await;
    }

    async fn process(&self, job_type: JobType) {
        let job = match self.store.claim_next_job(job_type).await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "unlimited recall worker: failed to claim job");
                return;
            }
        };

        let result = match job_type {
            JobType::Label => self.run_label(&job).await,
            JobType::Summary => self.run_summary(&job).await,
            JobType::Embedding => self.run_embedding(&job).await,
        };

        match result {
            Ok(()) => {
                if let Err(e) = self.store.complete_job(&job.job_id).await {
                    warn!(error = %e, "failed to mark job completed");
                }
                crate::metrics::record_job_outcome(job_type.as_str(), true);
            }
            Err(e) => {
                warn!(job_id = %job.job_id, error = %e, "unlimited recall job failed");
                if let Err(e) = self.store.fail_job(&job.job_id, &e.to_string(), self.config.worker_max_retries).await {
                    warn!(error = %e, "failed to record job failure");
                }
                crate::metrics::record_job_outcome(job_type.as_str(), false);
            }
        }
    }

    async fn run_label(&self, job: &RecallJob) -> anyhow::Result<()> {
        let messages = self.store.messages_for_thread(&job.thread_id, 10, 0).await?;
        let label = match &self.llm {
            Some(llm) => self.label_via_llm(llm, &messages).await.unwrap_or_else(|_| fallback_label(&messages)),
            None => fallback_label(&messages),
        };
        self.store.set_label(&job.thread_id, &label).await?;
        Ok(())
    }

    async fn label_via_llm(&self, llm: &Arc<dyn LlmProvider>, messages: &[super::types::CapturedMessage]) -> anyhow::Result<String> {
        let transcript = messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                LlmMessage::system("Give this conversation a short title, at most 6 words. Respond with only the title."),
                LlmMessage::user(transcript),
            ],
            max_tokens: Some(20),
            temperature: Some(0.2),
        };

        let text = llm.complete(request).await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            anyhow::bail!("empty label response");
        }
        Ok(trimmed.to_string())
    }

    async fn run_summary(&self, job: &RecallJob) -> anyhow::Result<()> {
        let messages = self.store.messages_for_thread(&job.thread_id, 100_000, 0).await?;
        let summary = match &self.llm {
            Some(llm) => self.summary_via_llm(llm, &messages).await.unwrap_or_else(|_| fallback_summary(&messages)),
            None => fallback_summary(&messages),
        };
        self.store.set_summary(&job.thread_id, &summary).await?;
        self.store.enqueue_job(&job.thread_id, JobType::Embedding).await?;
        Ok(())
    }

    async fn summary_via_llm(&self, llm: &Arc<dyn LlmProvider>, messages: &[super::types::CapturedMessage]) -> anyhow::Result<String> {
        let transcript = messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                LlmMessage::system(
                    "Summarize this full conversation in at most 500 characters, covering topics and decisions.",
                ),
                LlmMessage::user(transcript),
            ],
            max_tokens: Some(200),
            temperature: Some(0.2),
        };

        let text = llm.complete(request).await?;
        if text.trim().is_empty() {
            anyhow::bail!("empty summary response");
        }
        Ok(text.trim().to_string())
    }

    async fn run_embedding(&self, job: &RecallJob) -> anyhow::Result<()> {
        let Some(embeddings) = &self.embeddings else {
            debug!(thread_id = job.thread_id, "no embedding provider configured, skipping");
            return Ok(());
        };
        let package = self
            .store
            .package(&job.thread_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("package missing for embedding job"))?;
        let Some(summary) = package.summary else {
            anyhow::bail!("embedding job ran before summary existed");
        };

        let vector = embeddings.embed(&summary).await?;
        self.store.upsert_conversation_embedding(&job.thread_id, &vector).await?;
        Ok(())
    }
}

fn fallback_label(messages: &[super::types::CapturedMessage]) -> String {
    messages
        .iter()
        .find(|m| m.role == "user")
        .map(|m| {
            let words: Vec<&str> = m.content.split_whitespace().take(6).collect();
            words.join(" ")
        })
        .unwrap_or_else(|| "Untitled conversation".to_string())
}

fn fallback_summary(messages: &[super::types::CapturedMessage]) -> String {
    messages
        .iter()
        .find(|m| m.role == "user")
        .map(|m| m.content.chars().take(500).collect())
        .unwrap_or_else(|| "(no messages)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unlimited_recall::types::CapturedMessage;
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn worker() -> RecallWorker {
        let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap();
        let store = UnlimitedRecallStore::new(pool);
        store.migrate().await.unwrap();
        RecallWorker::new(store, None, None, UnlimitedRecallConfig::from_env(), "none".into())
    }

    async fn seed(worker: &RecallWorker, thread_id: &str) {
        let msg = CapturedMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            user_id: "u1".to_string(),
            role: "user".to_string(),
            content: "tell me about rust ownership".to_string(),
            tokens: 5,
            created_at: Utc::now(),
        };
        worker.store.capture_message(&msg).await.unwrap();
        worker.store.bump_package(thread_id, "u1", 5).await.unwrap();
    }

    #[tokio::test]
    async fn label_job_falls_back_without_llm() {
        let worker = worker().await;
        seed(&worker, "t1").await;
        worker.store.enqueue_job("t1", JobType::Label).await.unwrap();
        worker.tick().await;

        let package = worker.store.package("t1").await.unwrap().unwrap();
        assert!(package.label.is_some());
    }

    #[tokio::test]
    async fn summary_completion_chains_embedding_job() {
        let worker = worker().await;
        seed(&worker, "t1").await;
        worker.store.enqueue_job("t1", JobType::Summary).await.unwrap();
        worker.process(JobType::Summary).await;

        let package = worker.store.package("t1").await.unwrap().unwrap();
        assert!(package.summary.is_some());

        // With no embedding provider configured, the chained job still
        // claims and completes as a no-op rather than sitting pending.
        worker.process(JobType::Embedding).await;
        let embedding_job = worker.store.claim_next_job(JobType::Embedding).await.unwrap();
        assert!(embedding_job.is_none());
    }

    #[tokio::test]
    async fn embedding_job_without_provider_completes_as_noop() {
        let worker = worker().await;
        seed(&worker, "t1").await;
        worker.store.set_summary("t1", "a summary").await.unwrap();
        worker.store.enqueue_job("t1", JobType::Embedding).await.unwrap();
        worker.tick().await;

        let job = worker.store.claim_next_job(JobType::Embedding).await.unwrap();
        assert!(job.is_none());
    }
}
