// src/llm/stream.rs
// Parses a provider's raw SSE lines into a provider-agnostic event the
// gateway can relay onward as its own SSE events (§6, §4.1 step 8).

use serde_json::Value;

#[derive(Debug, Clone)]
pub enum UpstreamEvent {
    TextDelta { delta: String },
    Done { input_tokens: i64, output_tokens: i64 },
    Error { message: String },
}

impl UpstreamEvent {
    /// Parses one `data: {...}` SSE line from an OpenAI-compatible
    /// chat-completions stream. Unrecognized lines are skipped, not errors.
    pub fn from_sse_line(line: &str) -> Option<Self> {
        let data = line.strip_prefix("data: ")?;

        if data == "[DONE]" {
            return None;
        }

        let json: Value = serde_json::from_str(data).ok()?;

        if let Some(error) = json.get("error") {
            return Some(UpstreamEvent::Error {
                message: error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown upstream error")
                    .to_string(),
            });
        }

        if let Some(usage) = json.get("usage") {
            return Some(UpstreamEvent::Done {
                input_tokens: usage.get("prompt_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                output_tokens: usage
                    .get("completion_tokens")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0),
            });
        }

        let delta = json
            .pointer("/choices/0/delta/content")
            .and_then(|v| v.as_str())?;

        Some(UpstreamEvent::TextDelta {
            delta: delta.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"hi"}}]}"#;
        match UpstreamEvent::from_sse_line(line) {
            Some(UpstreamEvent::TextDelta { delta }) => assert_eq!(delta, "hi"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn done_sentinel_yields_none() {
        assert!(UpstreamEvent::from_sse_line("data: [DONE]").is_none());
    }

    #[test]
    fn parses_error_event() {
        let line = r#"data: {"error":{"message":"boom"}}"#;
        match UpstreamEvent::from_sse_line(line) {
            Some(UpstreamEvent::Error { message }) => assert_eq!(message, "boom"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
