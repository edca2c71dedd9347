// src/llm/openai_provider.rs
// HTTP chat-completion provider for an OpenAI-compatible endpoint (§6: the
// LLM providers are external collaborators; this is the thin HTTP-client
// plumbing onto the fixed interface in `provider.rs`). Streams via SSE and
// hands each line to `UpstreamEvent::from_sse_line`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde_json::json;
use tracing::warn;

use super::provider::{CompletionRequest, LlmProvider, UpstreamStream};
use super::stream::UpstreamEvent;

pub struct OpenAiCompatProvider {
    name: String,
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            name: name.into(),
            http,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_completion(&self, request: CompletionRequest) -> Result<UpstreamStream> {
        let body = json!({
            "model": request.model,
            "messages": request.messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": true,
        });

        let mut builder = self.http.post(format!("{}/chat/completions", self.base_url)).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let mut source = EventSource::new(builder).context("failed to open upstream stream")?;

        let stream = stream! {
            loop {
                match source.next().await {
                    Some(Ok(Event::Open)) => continue,
                    Some(Ok(Event::Message(message))) => {
                        let line = format!("data: {}", message.data);
                        match UpstreamEvent::from_sse_line(&line) {
                            Some(event) => {
                                let is_done = matches!(event, UpstreamEvent::Done { .. });
                                yield Ok(event);
                                if is_done {
                                    break;
                                }
                            }
                            None => continue,
                        }
                    }
                    Some(Err(reqwest_eventsource::Error::StreamEnded)) => {
                        yield Ok(UpstreamEvent::Done { input_tokens: 0, output_tokens: 0 });
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "upstream SSE error");
                        yield Err(anyhow::anyhow!(e.to_string()));
                        break;
                    }
                    None => break,
                }
            }
            source.close();
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_base_url() {
        let provider = OpenAiCompatProvider::new("test", "http://localhost:11434/v1", None, 30).unwrap();
        assert_eq!(provider.name(), "test");
    }
}
