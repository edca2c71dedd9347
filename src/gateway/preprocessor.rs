// src/gateway/preprocessor.rs
// Context preprocessor (§4.7): turns structured context blocks into
// narrative prose the LLM sees as ordinary prior-context sentences, never
// as JSON or bracketed tags.

use crate::cache::ResearchCapsule;
use crate::memory::types::Memory;

/// One block of narrative context, ready to become a prompt-builder
/// context message (§4.8). `priority` mirrors the instruction priority
/// scale so the builder can drop the least important blocks first when
/// the system-prompt budget is tight.
#[derive(Debug, Clone)]
pub struct ContextBlock {
    pub label: &'static str,
    pub text: String,
    pub priority: super::prompt_builder::Priority,
}

pub fn memory_block(memory: &Memory) -> ContextBlock {
    ContextBlock {
        label: "memory",
        text: format!("You mentioned {}.", lowercase_first(&memory.content)),
        priority: super::prompt_builder::Priority::High,
    }
}

pub fn conversation_summary_block(index: usize, summary: &str) -> ContextBlock {
    let ordinal = if index == 0 { "a previous conversation".to_string() } else { format!("conversation {}", index + 1) };
    ContextBlock {
        label: "conversation_summary",
        text: format!("In {ordinal}, {}", lowercase_first(summary)),
        priority: super::prompt_builder::Priority::Medium,
    }
}

/// Research capsule JSON (§3, §4.10) → bullet-free prose with inline
/// source hosts, never the raw claim/source arrays.
pub fn research_capsule_block(capsule: &ResearchCapsule) -> ContextBlock {
    let claims = capsule
        .claims
        .iter()
        .map(|c| c.text.trim_end_matches('.').to_string())
        .collect::<Vec<_>>()
        .join("; ");

    let hosts = capsule
        .sources
        .iter()
        .map(|s| s.host.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let text = if hosts.is_empty() {
        format!("Recent research found: {claims}.")
    } else {
        format!("Recent research ({hosts}) found: {claims}.")
    };

    ContextBlock {
        label: "research_capsule",
        text,
        priority: super::prompt_builder::Priority::Low,
    }
}

/// Unlimited-recall loaded context (§4.4) → "you recently discussed …"
/// framing, never raw message dumps.
pub fn unlimited_recall_block(summary: Option<&str>, skipped_span_note: Option<&str>) -> Option<ContextBlock> {
    let summary = summary?;
    let mut text = format!("In a previous conversation, {}", lowercase_first(summary));
    if let Some(note) = skipped_span_note {
        text.push_str(&format!(" ({note})."));
    }
    Some(ContextBlock {
        label: "unlimited_recall",
        text,
        priority: super::prompt_builder::Priority::Medium,
    })
}

/// Ingestion chunks (§1 Supplemented features) → "you recently asked
/// about … ; here's the relevant excerpt: …".
pub fn ingestion_block(topic: &str, excerpt: &str) -> ContextBlock {
    ContextBlock {
        label: "ingestion",
        text: format!("You recently asked about {topic}; here's the relevant excerpt: {excerpt}"),
        priority: super::prompt_builder::Priority::Low,
    }
}

fn lowercase_first(text: &str) -> String {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ResearchClaim, ResearchSource};
    use crate::config::Tier;
    use chrono::Utc;

    #[test]
    fn memory_block_reads_as_narrative() {
        let memory = Memory::new("u1".into(), "t1".into(), "Studied dopamine earlier".into(), Tier::T3, 0.5, 0.9);
        let block = memory_block(&memory);
        assert_eq!(block.text, "You mentioned studied dopamine earlier.");
    }

    #[test]
    fn conversation_summary_block_frames_as_previous_conversation() {
        let block = conversation_summary_block(1, "we discussed databases");
        assert!(block.text.starts_with("In conversation 2,"));
    }

    #[test]
    fn research_capsule_block_has_no_raw_json_markers() {
        let capsule = ResearchCapsule {
            claims: vec![ResearchClaim { text: "Rust 1.80 shipped.".into(), confidence: 0.9, date: None }],
            sources: vec![ResearchSource { host: "rust-lang.org".into(), url: "https://rust-lang.org".into(), date: None, authority_tier: 1 }],
            entities: vec![],
            ttl_class: "short".into(),
            fetched_at: Utc::now(),
            expires_at: Utc::now(),
        };
        let block = research_capsule_block(&capsule);
        assert!(!block.text.contains('{'));
        assert!(block.text.contains("rust-lang.org"));
    }

    #[test]
    fn unlimited_recall_block_is_none_without_summary() {
        assert!(unlimited_recall_block(None, None).is_none());
    }
}
