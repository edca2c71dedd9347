// src/unlimited_recall/capture.rs
// Synchronous, per-turn capture (§4.4 Capture): append the message, bump
// the conversation package, and enqueue label/summary jobs when their
// message-count thresholds are crossed. Never on the critical path for
// the turn's response — callers fire-and-forget this.

use tracing::warn;

use crate::config::UnlimitedRecallConfig;

use super::store::UnlimitedRecallStore;
use super::types::{CapturedMessage, JobType};

pub struct CaptureService {
    store: UnlimitedRecallStore,
    config: UnlimitedRecallConfig,
}

impl CaptureService {
    pub fn new(store: UnlimitedRecallStore, config: UnlimitedRecallConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &UnlimitedRecallStore {
        &self.store
    }

    /// Captures one message and enqueues the jobs its package now qualifies
    /// for. Swallows storage errors — capture failing must never fail the
    /// turn that produced the message.
    pub async fn capture(&self, message: CapturedMessage) {
        let thread_id = message.thread_id.clone();
        let user_id = message.user_id.clone();
        let tokens = message.tokens;

        if let Err(e) = self.store.capture_message(&message).await {
            warn!(error = %e, "unlimited recall: failed to capture message");
            return;
        }

        let package = match self.store.bump_package(&thread_id, &user_id, tokens).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "unlimited recall: failed to update package");
                return;
            }
        };

        if package.message_count >= self.config.label_job_min_messages && package.label.is_none() {
            self.enqueue(&thread_id, JobType::Label).await;
        }

        let needs_first_summary = package.message_count >= self.config.summary_job_min_messages && package.summary.is_none();
        let needs_refresh_summary = package.summary.is_some()
            && self.config.summary_job_interval_messages > 0
            && package.message_count % self.config.summary_job_interval_messages == 0;

        if needs_first_summary || needs_refresh_summary {
            self.enqueue(&thread_id, JobType::Summary).await;
        }
    }

    async fn enqueue(&self, thread_id: &str, job_type: JobType) {
        if let Err(e) = self.store.enqueue_job(thread_id, job_type).await {
            warn!(error = %e, job_type = job_type.as_str(), "unlimited recall: failed to enqueue job");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn service() -> CaptureService {
        let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap();
        let store = UnlimitedRecallStore::new(pool);
        store.migrate().await.unwrap();
        CaptureService::new(store, UnlimitedRecallConfig::from_env())
    }

    fn message(thread_id: &str) -> CapturedMessage {
        CapturedMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            user_id: "u1".to_string(),
            role: "user".to_string(),
            content: "hi".to_string(),
            tokens: 3,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn enqueues_label_job_at_threshold() {
        let service = service().await;
        for _ in 0..5 {
            service.capture(message("t1")).await;
        }
        let job = service.store.claim_next_job(JobType::Label).await.unwrap();
        assert!(job.is_some());
    }

    #[tokio::test]
    async fn does_not_enqueue_label_before_threshold() {
        let service = service().await;
        for _ in 0..4 {
            service.capture(message("t1")).await;
        }
        let job = service.store.claim_next_job(JobType::Label).await.unwrap();
        assert!(job.is_none());
    }

    #[tokio::test]
    async fn enqueues_summary_job_at_threshold() {
        let service = service().await;
        for _ in 0..10 {
            service.capture(message("t1")).await;
        }
        let job = service.store.claim_next_job(JobType::Summary).await.unwrap();
        assert!(job.is_some());
    }
}
