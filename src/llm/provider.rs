// src/llm/provider.rs
// Chat-completion provider trait. Concrete providers are external
// collaborators (§1 Non-goals: "LLM providers and their hosted models");
// this defines the fixed interface the gateway calls through.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::stream::UpstreamEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

pub type UpstreamStream =
    std::pin::Pin<Box<dyn futures::Stream<Item = Result<UpstreamEvent>> + Send>>;

/// Fixed interface onto the hosted chat model (§1, §6). Implementations live
/// outside this crate's core scope; only HTTP-client plumbing for them does.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn stream_completion(&self, request: CompletionRequest) -> Result<UpstreamStream>;

    /// Drains a stream into a single string. Used by background callers
    /// (audit extraction, summarization) that don't relay tokens onward.
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        use futures::StreamExt;

        let mut stream = self.stream_completion(request).await?;
        let mut out = String::new();

        while let Some(event) = stream.next().await {
            match event? {
                UpstreamEvent::TextDelta { delta } => out.push_str(&delta),
                UpstreamEvent::Done { .. } => break,
                UpstreamEvent::Error { message } => return Err(anyhow::anyhow!(message)),
            }
        }

        Ok(out)
    }
}
