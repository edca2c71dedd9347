// src/llm/router/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Factual,
    Explanatory,
    Discussion,
    Action,
    MemoryList,
    MemorySave,
    ConversationalFollowup,
    NeedsWebSearch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub complexity: Complexity,
    pub intent: Intent,
    pub word_count: usize,
    pub requires_detail: bool,
    pub suggests_follow_up: bool,
    /// Populated only when `intent == MemorySave` (§4.6 extraction rules).
    pub memory_save_content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
}
