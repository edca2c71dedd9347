// src/unlimited_recall/types.rs
// Durable entities owned by the unlimited-recall subsystem (§4.4): full
// message capture, per-thread packages, background jobs, and recall events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fully-captured message — separate from the gateway's own `messages`
/// table so 100% capture survives independently of memory-service retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedMessage {
    pub message_id: String,
    pub thread_id: String,
    pub user_id: String,
    pub role: String,
    pub content: String,
    pub tokens: i64,
    pub created_at: DateTime<Utc>,
}

/// Rolling per-thread bookkeeping (§4.4 Capture).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPackage {
    pub thread_id: String,
    pub user_id: String,
    pub message_count: i64,
    pub total_tokens: i64,
    pub last_message_at: DateTime<Utc>,
    pub label: Option<String>,
    pub summary: Option<String>,
    pub summary_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Label,
    Summary,
    Embedding,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Label => "label",
            JobType::Summary => "summary",
            JobType::Embedding => "embedding",
        }
    }
}

impl std::str::FromStr for JobType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "label" => Ok(JobType::Label),
            "summary" => Ok(JobType::Summary),
            "embedding" => Ok(JobType::Embedding),
            other => Err(anyhow::anyhow!("unknown job type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(anyhow::anyhow!("unknown job status: {other}")),
        }
    }
}

/// A queued label/summary/embedding job (§4.4 Worker loop). At most one
/// `running` job per `(threadId, jobType)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallJob {
    pub job_id: String,
    pub thread_id: String,
    pub job_type: JobType,
    pub status: JobStatus,
    pub retry_count: i32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Resume,
    Historical,
    Semantic,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Resume => "resume",
            TriggerKind::Historical => "historical",
            TriggerKind::Semantic => "semantic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderStrategy {
    Full,
    Hierarchical,
    Compressed,
    Snippet,
}

impl LoaderStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderStrategy::Full => "full",
            LoaderStrategy::Hierarchical => "hierarchical",
            LoaderStrategy::Compressed => "compressed",
            LoaderStrategy::Snippet => "snippet",
        }
    }
}

/// Output of trigger detection (§4.4 Trigger detection) on the current turn.
#[derive(Debug, Clone)]
pub struct TriggerDetection {
    pub kind: TriggerKind,
    pub confidence: f32,
    /// Populated for `Historical`: the `[t-w, t+w]` window to search within.
    pub timeframe: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// One recall injection attempt, logged regardless of outcome (§4.4 final
/// paragraph: "failures never propagate to the turn"; §3 Recall event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallEvent {
    pub event_id: String,
    pub user_id: String,
    pub thread_id: String,
    pub trigger: String,
    pub confidence: f32,
    pub strategy: Option<String>,
    pub resolved_thread_id: Option<String>,
    pub tokens_injected: i64,
    pub relevance_score: f32,
    pub latency_ms: i64,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

/// Context assembled by the loader, ready for the preprocessor (§4.7).
#[derive(Debug, Clone)]
pub struct RecallContext {
    pub strategy: LoaderStrategy,
    pub thread_id: String,
    pub messages: Vec<CapturedMessage>,
    pub summary: Option<String>,
    pub skipped_span_note: Option<String>,
}
