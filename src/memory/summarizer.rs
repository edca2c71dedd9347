// src/memory/summarizer.rs
// Thread summary generation (§3 Thread summary, §4.2.1 step 7). Calls the
// LLM with the last <=50 messages and a bounded length budget; falls back to
// the first user message truncated when the call fails.

use std::sync::Arc;

use tracing::warn;

use crate::config::SummaryConfig;
use crate::llm::provider::{CompletionRequest, Message as LlmMessage};
use crate::llm::LlmProvider;

use super::types::{Message, ThreadSummary};

#[derive(Clone)]
pub struct SummaryGenerator {
    llm: Option<Arc<dyn LlmProvider>>,
    config: SummaryConfig,
    model: String,
}

impl SummaryGenerator {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, config: SummaryConfig, model: String) -> Self {
        Self { llm, config, model }
    }

    /// Always returns a usable summary — on LLM failure, falls back to
    /// "first user message truncated" (§4.2.1 step 7 final sentence).
    pub async fn generate(&self, user_id: &str, thread_id: &str, messages: &[Message], important: bool) -> ThreadSummary {
        let max_chars = if important {
            self.config.max_chars_important
        } else {
            self.config.max_chars_standard
        };

        let summary_text = match self.call_llm(messages, max_chars).await {
            Some(text) => truncate_chars(&text, max_chars),
            None => truncate_chars(&fallback_summary(messages), max_chars),
        };

        let last_msg_id = messages.last().map(|m| m.message_id.clone()).unwrap_or_default();
        let token_count = messages.iter().map(|m| m.tokens_in.unwrap_or(0) + m.tokens_out.unwrap_or(0)).sum();

        ThreadSummary {
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
            summary: summary_text,
            last_msg_id,
            token_count,
            updated_at: chrono::Utc::now(),
            deleted_at: None,
        }
    }

    async fn call_llm(&self, messages: &[Message], max_chars: usize) -> Option<String> {
        let llm = self.llm.as_ref()?;
        if messages.is_empty() {
            return None;
        }

        let transcript = messages
            .iter()
            .map(|m| format!("{}: {}", m.role.to_uppercase(), m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                LlmMessage::system(format!(
                    "Summarize this conversation in at most {max_chars} characters. \
                     Focus on topics discussed, decisions made, and context useful for future turns. \
                     Respond with only the summary."
                )),
                LlmMessage::user(transcript),
            ],
            max_tokens: Some((max_chars / 3) as u32 + 20),
            temperature: Some(0.2),
        };

        match llm.complete(request).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "thread summary LLM call failed");
                None
            }
        }
    }
}

fn fallback_summary(messages: &[Message]) -> String {
    messages
        .iter()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
        .unwrap_or_else(|| "(no messages)".to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::Role;

    fn config() -> SummaryConfig {
        SummaryConfig {
            max_chars_standard: 500,
            max_chars_important: 800,
            stale_after_minutes_standard: 60,
            stale_after_minutes_important: 20,
            important_memory_count: 3,
        }
    }

    #[tokio::test]
    async fn falls_back_to_first_user_message_without_llm() {
        let generator = SummaryGenerator::new(None, config(), "none".into());
        let messages = vec![Message::new("t1".into(), "u1".into(), Role::User, "hello there".into())];
        let summary = generator.generate("u1", "t1", &messages, false).await;
        assert_eq!(summary.summary, "hello there");
    }

    #[tokio::test]
    async fn fallback_handles_empty_thread() {
        let generator = SummaryGenerator::new(None, config(), "none".into());
        let summary = generator.generate("u1", "t1", &[], false).await;
        assert_eq!(summary.summary, "(no messages)");
    }

    #[test]
    fn truncates_to_max_chars() {
        let long = "a".repeat(1000);
        assert_eq!(truncate_chars(&long, 10).len(), 10);
    }
}
