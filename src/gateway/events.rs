// src/gateway/events.rs
// SSE event vocabulary for `POST /chat/stream` (§6 external interfaces
// table). One enum, one `axum::response::sse::Event` conversion — handlers
// never build raw SSE frames by hand.

use axum::response::sse::Event as SseEvent;
use serde::Serialize;

use crate::cache::ResearchCapsule;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    #[serde(rename = "delta")]
    Delta { delta: String },
    #[serde(rename = "research_capsule")]
    ResearchCapsule {
        claims: Vec<crate::cache::ResearchClaim>,
        sources: Vec<crate::cache::ResearchSource>,
        entities: Vec<String>,
    },
    #[serde(rename = "research_summary")]
    ResearchSummary { summary: String },
    #[serde(rename = "sources")]
    Sources { urls: Vec<String> },
    #[serde(rename = "thinking_step")]
    ThinkingStep { label: String },
    #[serde(rename = "done")]
    Done { input_tokens: i64, output_tokens: i64 },
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ChatEvent {
    pub fn from_capsule(capsule: &ResearchCapsule) -> Self {
        ChatEvent::ResearchCapsule {
            claims: capsule.claims.clone(),
            sources: capsule.sources.clone(),
            entities: capsule.entities.clone(),
        }
    }

    pub fn into_sse(self) -> SseEvent {
        let name = match &self {
            ChatEvent::Delta { .. } => "delta",
            ChatEvent::ResearchCapsule { .. } => "research_capsule",
            ChatEvent::ResearchSummary { .. } => "research_summary",
            ChatEvent::Sources { .. } => "sources",
            ChatEvent::ThinkingStep { .. } => "thinking_step",
            ChatEvent::Done { .. } => "done",
            ChatEvent::Error { .. } => "error",
        };
        SseEvent::default().event(name).json_data(&self).unwrap_or_else(|_| SseEvent::default().event("error"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_event_serializes_with_token_counts() {
        let event = ChatEvent::Done { input_tokens: 10, output_tokens: 20 };
        let sse = event.into_sse();
        assert!(format!("{sse:?}").contains("done"));
    }
}
