// src/llm/router/analyzer.rs
// Query analyzer (§4.6): a pure function over the last user message plus the
// minimal surrounding context it needs (prior assistant turn, recent word
// counts) to decide complexity, intent, and follow-up shape.

use super::types::{Complexity, Intent, QueryAnalysis};

const TECHNICAL_VOCAB: &[&str] = &[
    "algorithm", "architecture", "database", "api", "async", "thread", "latency",
    "schema", "protocol", "encryption", "kubernetes", "regression", "recursion",
];

const EXPLANATORY_MARKERS: &[&str] = &["how", "why", "explain", "analyze", "compare"];

const RECENCY_MARKERS: &[&str] = &["latest", "news", "today", "this week", "right now", "currently"];

const ANAPHORA: &[&str] = &["that", "it", "this one", "those"];

const CONTINUATION_PHRASES: &[&str] = &["tell me more", "go on", "continue", "and then", "what else"];

pub fn analyze(
    user_message: &str,
    last_assistant_message: Option<&str>,
    has_recent_history: bool,
) -> QueryAnalysis {
    let lower = user_message.to_lowercase();
    let word_count = crate::utils::text::word_count(user_message);

    let complexity = determine_complexity(&lower, word_count);
    let memory_save_content = detect_memory_save(&lower, user_message, last_assistant_message);
    let intent = determine_intent(&lower, memory_save_content.is_some());

    let suggests_follow_up = detect_follow_up(&lower, word_count, has_recent_history);
    let requires_detail = matches!(complexity, Complexity::Complex)
        || matches!(intent, Intent::Explanatory | Intent::Discussion);

    QueryAnalysis {
        complexity,
        intent,
        word_count,
        requires_detail,
        suggests_follow_up,
        memory_save_content,
    }
}

fn determine_complexity(lower: &str, word_count: usize) -> Complexity {
    let has_explanatory = EXPLANATORY_MARKERS.iter().any(|m| lower.contains(m));
    let has_technical = TECHNICAL_VOCAB.iter().any(|m| lower.contains(m));

    if word_count > 40 && (has_explanatory || has_technical) {
        Complexity::Complex
    } else if has_explanatory || has_technical || word_count > 15 {
        Complexity::Moderate
    } else {
        Complexity::Simple
    }
}

fn determine_intent(lower: &str, is_memory_save: bool) -> Intent {
    if is_memory_save {
        return Intent::MemorySave;
    }
    if lower.contains("what have i told you")
        || lower.contains("what do you remember")
        || lower.contains("list my")
    {
        return Intent::MemoryList;
    }
    if RECENCY_MARKERS.iter().any(|m| lower.contains(m)) || contains_year_token(lower) {
        return Intent::NeedsWebSearch;
    }
    if lower.contains("can you")
        || lower.contains("please")
        || lower.starts_with("do ")
        || lower.contains("let's")
    {
        return Intent::Action;
    }
    if EXPLANATORY_MARKERS.iter().any(|m| lower.contains(m)) {
        return Intent::Explanatory;
    }
    if lower.split_whitespace().count() <= 3 {
        return Intent::ConversationalFollowup;
    }
    if lower.ends_with('?') {
        return Intent::Factual;
    }
    Intent::Discussion
}

fn contains_year_token(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_ascii_digit())
        .filter(|tok| tok.len() == 4)
        .any(|tok| tok.parse::<u32>().is_ok_and(|y| (1900..=2100).contains(&y)))
}

/// Implements the three extraction rules from §4.6.
fn detect_memory_save(
    lower: &str,
    original: &str,
    last_assistant_message: Option<&str>,
) -> Option<String> {
    if (lower.contains("remember this") || lower.contains("remember that"))
        && !lower.contains("remember that my")
    {
        return last_assistant_message.map(|s| s.to_string());
    }

    if let Some(idx) = lower.find("remember that my") {
        let rest = &original[idx + "remember that ".len()..];
        return Some(rest.trim().to_string());
    }

    if lower.contains("store this") || lower.contains("memorize my") {
        if let Some(quoted) = extract_quoted(original) {
            return Some(quoted);
        }
        return Some(original.trim().to_string());
    }

    extract_quoted_after(original, "remember")
}

fn extract_quoted(text: &str) -> Option<String> {
    let start = text.find('\'').or_else(|| text.find('"'))?;
    let quote_char = text.as_bytes()[start] as char;
    let rest = &text[start + 1..];
    let end = rest.find(quote_char)?;
    Some(rest[..end].to_string())
}

fn extract_quoted_after(text: &str, keyword: &str) -> Option<String> {
    let lower = text.to_lowercase();
    if !lower.contains(keyword) {
        return None;
    }
    extract_quoted(text)
}

fn detect_follow_up(lower: &str, word_count: usize, has_recent_history: bool) -> bool {
    if !has_recent_history {
        return false;
    }
    if CONTINUATION_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }
    if word_count <= 3 && lower.ends_with('?') {
        return true;
    }
    ANAPHORA.iter().any(|a| {
        lower
            .split_whitespace()
            .any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == *a)
    }) && word_count <= 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_remember_that_my_pattern() {
        let analysis = analyze("remember that my favorite language is rust", None, false);
        assert_eq!(analysis.intent, Intent::MemorySave);
        assert_eq!(
            analysis.memory_save_content.as_deref(),
            Some("my favorite language is rust")
        );
    }

    #[test]
    fn remember_this_takes_prior_assistant_message() {
        let analysis = analyze("remember this", Some("Rust ownership avoids GC pauses."), false);
        assert_eq!(analysis.intent, Intent::MemorySave);
        assert_eq!(
            analysis.memory_save_content.as_deref(),
            Some("Rust ownership avoids GC pauses.")
        );
    }

    #[test]
    fn quoted_store_this_extracts_span() {
        let analysis = analyze("store this 'I prefer dark mode'", None, false);
        assert_eq!(
            analysis.memory_save_content.as_deref(),
            Some("I prefer dark mode")
        );
    }

    #[test]
    fn recency_marker_triggers_web_search_intent() {
        let analysis = analyze("what's the latest news on rust 2024", None, false);
        assert_eq!(analysis.intent, Intent::NeedsWebSearch);
    }

    #[test]
    fn short_question_with_history_is_follow_up() {
        let analysis = analyze("why is that?", None, true);
        assert!(analysis.suggests_follow_up);
    }

    #[test]
    fn long_explanatory_question_is_complex() {
        let analysis = analyze(
            "can you explain in detail how the database schema and async runtime architecture interact under high latency for this kubernetes deployment",
            None,
            false,
        );
        assert_eq!(analysis.complexity, Complexity::Complex);
    }
}
