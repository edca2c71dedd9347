// src/memory/audit/pipeline.rs
// Full audit run (§4.2.1): load a thread window, score candidate windows,
// detect tier, redact, write via the dedup path, then refresh the thread
// summary and user profile.

use std::sync::Arc;

use anyhow::Result;
use lazy_static::lazy_static;
use regex::RegexSet;
use tracing::{debug, info, warn};

use crate::config::{CadenceConfig, DedupConfig, Tier, TiersConfig};
use crate::llm::provider::{CompletionRequest, Message as LlmMessage};
use crate::llm::LlmProvider;

use super::super::dedup;
use super::super::profile;
use super::super::redaction;
use super::super::store::MemoryStore;
use super::super::summarizer::SummaryGenerator;
use super::super::types::{Memory, MemoryAudit, Message};
use super::scorer::{score, score_empty, CandidateFactors};
use crate::cache::AppCaches;

lazy_static! {
    /// §4.2.1 step 4: preference/goal/avoidance phrasing that marks a
    /// candidate as T2 regardless of cross-thread history.
    static ref T2_PATTERNS: RegexSet = RegexSet::new([
        r"(?i)\bi prefer\b",
        r"(?i)\bmy goal is\b",
        r"(?i)\bi always\b",
        r"(?i)\bi never\b",
        r"(?i)\bi avoid\b",
        r"(?i)\bi want to\b",
        r"(?i)\bi'm trying to\b",
        r"(?i)\bi am trying to\b",
        r"(?i)\bmy favorite\b",
        r"(?i)\bi hate\b",
        r"(?i)\bi love\b",
    ])
    .unwrap();
}

pub struct AuditPipeline {
    store: MemoryStore,
    caches: Arc<AppCaches>,
    tiers: TiersConfig,
    cadence: CadenceConfig,
    dedup: DedupConfig,
    llm: Option<Arc<dyn LlmProvider>>,
    summarizer: SummaryGenerator,
}

#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub audit: MemoryAudit,
    pub saved_memory_ids: Vec<String>,
}

impl AuditPipeline {
    pub fn new(
        store: MemoryStore,
        caches: Arc<AppCaches>,
        tiers: TiersConfig,
        cadence: CadenceConfig,
        dedup: DedupConfig,
        llm: Option<Arc<dyn LlmProvider>>,
        summarizer: SummaryGenerator,
    ) -> Self {
        Self {
            store,
            caches,
            tiers,
            cadence,
            dedup,
            llm,
            summarizer,
        }
    }

    /// Runs one audit over `thread_id` for `user_id` (§4.2.1 steps 1-8).
    /// Never fails the caller — storage errors are logged and surfaced as a
    /// zero-saved audit so cadence bookkeeping still advances.
    pub async fn run(&self, user_id: &str, thread_id: &str) -> Result<AuditOutcome> {
        let messages = self.store.messages_for_thread(thread_id, 50).await.unwrap_or_default();
        // `messages_for_thread` returns newest-first; the scorer wants
        // chronological order to judge each user+assistant exchange.
        let mut chronological = messages;
        chronological.reverse();

        if chronological.is_empty() {
            return Ok(self.empty_outcome(user_id, thread_id));
        }

        let token_count: i64 = chronological
            .iter()
            .map(|m| m.tokens_in.unwrap_or(0) + m.tokens_out.unwrap_or(0))
            .sum();

        let candidates = self.extract_candidates(user_id, thread_id, &chronological).await;
        let saved_ids = self.write_candidates(user_id, thread_id, candidates.clone()).await;

        let avg_score = if candidates.is_empty() {
            0.0
        } else {
            candidates.iter().map(|c| c.1).sum::<f32>() / candidates.len() as f32
        };

        let audit = MemoryAudit {
            audit_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            thread_id: thread_id.to_string(),
            start_msg_id: chronological.first().map(|m| m.message_id.clone()).unwrap_or_default(),
            end_msg_id: chronological.last().map(|m| m.message_id.clone()).unwrap_or_default(),
            token_count,
            score: avg_score,
            saved: saved_ids.len() as i64,
            created_at: chrono::Utc::now(),
        };
        self.store.insert_audit(&audit).await?;

        self.refresh_summary_if_stale(user_id, thread_id, &chronological, saved_ids.len())
            .await;
        profile::rebuild(&self.store, user_id).await;

        info!(
            thread_id, saved = audit.saved, score = audit.score,
            "audit pipeline completed"
        );
        crate::metrics::record_audit_run("cadence", audit.saved as u64);

        Ok(AuditOutcome {
            audit,
            saved_memory_ids: saved_ids,
        })
    }

    fn empty_outcome(&self, user_id: &str, thread_id: &str) -> AuditOutcome {
        let scored = score_empty();
        AuditOutcome {
            audit: MemoryAudit {
                audit_id: uuid::Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                thread_id: thread_id.to_string(),
                start_msg_id: String::new(),
                end_msg_id: String::new(),
                token_count: 0,
                score: scored.score,
                saved: 0,
                created_at: chrono::Utc::now(),
            },
            saved_memory_ids: Vec::new(),
        }
    }

    /// Slides a one-exchange (user message + following assistant reply)
    /// window over the thread, scores each against the T3 baseline policy,
    /// keeps the ones clearing 0.65, detects tier, and re-gates against
    /// that tier's own threshold — capped at `cadence.max_per_audit`.
    async fn extract_candidates(
        &self,
        user_id: &str,
        thread_id: &str,
        messages: &[Message],
    ) -> Vec<(String, f32, Tier)> {
        let mut out = Vec::new();

        for window in messages.windows(2) {
            if out.len() >= self.cadence.max_per_audit {
                break;
            }
            let (first, second) = (&window[0], &window[1]);
            let candidate_msg = if first.role == "user" { first } else { continue };
            let reply = if second.role == "assistant" { Some(second) } else { None };

            let factors = CandidateFactors {
                relevance: relevance_heuristic(&candidate_msg.content),
                importance: importance_heuristic(&candidate_msg.content),
                coherence: coherence_heuristic(&candidate_msg.content, reply.map(|m| m.content.as_str())),
                message_timestamp: candidate_msg.created_at,
            };

            let baseline = score(&factors, self.tiers.policy(Tier::T3));
            if baseline.score < 0.65 {
                continue;
            }

            let normalized = crate::utils::text::normalize_content(&candidate_msg.content);
            let is_t2 = T2_PATTERNS.is_match(&candidate_msg.content);
            let (is_t1, _) = self
                .caches
                .observe_cross_thread(user_id, &normalized, thread_id)
                .await;

            let tier = if is_t2 {
                Tier::T2
            } else if is_t1 {
                Tier::T1
            } else {
                Tier::T3
            };

            let final_score = if tier == Tier::T3 {
                baseline
            } else {
                score(&factors, self.tiers.policy(tier))
            };

            if final_score.score < self.tiers.policy(tier).save_threshold {
                continue;
            }

            let extracted = self.extract_memory_text(candidate_msg, reply).await;
            if let Some(content) = extracted {
                out.push((content, final_score.score, tier));
            }
        }

        out
    }

    /// Distills one candidate window into a memory sentence via the LLM
    /// (§4.2.1 step 3) when a provider is configured; otherwise falls back
    /// to the raw user message, trimmed (never blocks the audit on the LLM
    /// being unavailable).
    async fn extract_memory_text(&self, candidate: &Message, reply: Option<&Message>) -> Option<String> {
        let Some(llm) = &self.llm else {
            let trimmed = candidate.content.trim();
            return (!trimmed.is_empty()).then(|| trimmed.to_string());
        };

        let exchange = match reply {
            Some(r) => format!("User: {}\n\nAssistant: {}", candidate.content, r.content),
            None => format!("User: {}", candidate.content),
        };

        let request = build_extraction_request("audit-extraction", &exchange);
        match llm.complete(request).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "audit extraction call failed, falling back to raw message");
                let trimmed = candidate.content.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }

    async fn write_candidates(&self, user_id: &str, thread_id: &str, candidates: Vec<(String, f32, Tier)>) -> Vec<String> {
        let mut saved = Vec::new();
        let recent = self
            .store
            .live_memories_for_user(user_id, 20)
            .await
            .unwrap_or_default();

        for (content, score, tier) in candidates {
            let redaction::RedactionResult {
                redacted_content,
                redaction_map,
            } = redaction::redact(&content);

            let decision = dedup::decide(&redacted_content, None, &recent, &self.dedup);
            let memory = match decision {
                dedup::DedupDecision::Insert => {
                    let mut m = Memory::new(user_id.to_string(), thread_id.to_string(), redacted_content.clone(), tier, 0.8, score);
                    m.redaction_map = redaction_map;
                    m
                }
                dedup::DedupDecision::Supersede { existing_memory_id, .. } => {
                    let Ok(Some(mut existing)) = self.store.memory_by_id(&existing_memory_id).await else {
                        continue;
                    };
                    existing.record_remention(thread_id);
                    crate::metrics::record_memory_superseded();
                    existing
                }
            };

            let normalized = crate::utils::text::normalize_content(&memory.content);
            match self.store.upsert_memory(&memory, &normalized).await {
                Ok(written) => {
                    crate::metrics::record_memory_saved(tier.as_str());
                    saved.push(written.memory_id);
                }
                Err(e) => warn!(error = %e, "failed to write audited memory"),
            }
        }

        saved
    }

    /// §4.2.1 step 7: regenerate the thread summary if missing or stale.
    /// Important threads (>=3 memories saved this audit, or any T1/T2 save)
    /// get the shorter staleness window and longer budget.
    async fn refresh_summary_if_stale(&self, user_id: &str, thread_id: &str, messages: &[Message], saved_this_run: usize) {
        let existing = self.store.thread_summary(thread_id).await.unwrap_or(None);
        let important = saved_this_run as i64 >= crate::config::CONFIG.summary.important_memory_count;

        let stale = match &existing {
            None => true,
            Some(s) => {
                let minutes = (chrono::Utc::now() - s.updated_at).num_minutes();
                let threshold = if important {
                    crate::config::CONFIG.summary.stale_after_minutes_important
                } else {
                    crate::config::CONFIG.summary.stale_after_minutes_standard
                };
                minutes >= threshold
            }
        };

        if !stale {
            return;
        }

        let summary = self.summarizer.generate(user_id, thread_id, messages, important).await;
        if let Err(e) = self.store.upsert_thread_summary(&summary).await {
            warn!(error = %e, "failed to persist thread summary");
        } else {
            debug!(thread_id, "thread summary refreshed");
        }
    }
}

fn relevance_heuristic(content: &str) -> f32 {
    let word_count = crate::utils::text::word_count(content) as f32;
    (word_count / 20.0).min(1.0).max(0.2)
}

fn importance_heuristic(content: &str) -> f32 {
    let lower = content.to_lowercase();
    let hits = ["prefer", "always", "never", "goal", "important", "remember", "favorite", "name is"]
        .iter()
        .filter(|kw| lower.contains(*kw))
        .count();
    (0.4 + hits as f32 * 0.15).min(1.0)
}

fn coherence_heuristic(content: &str, reply: Option<&str>) -> f32 {
    let has_reply = reply.is_some_and(|r| !r.trim().is_empty());
    let well_formed = content.trim_end().ends_with(['.', '?', '!']) || content.split_whitespace().count() > 3;
    match (has_reply, well_formed) {
        (true, true) => 0.9,
        (true, false) => 0.7,
        (false, true) => 0.6,
        (false, false) => 0.4,
    }
}

/// Used when no LLM provider is configured — the audit still runs, it just
/// can't extract an abstractive memory sentence from the raw message.
pub fn build_extraction_request(model: &str, exchange: &str) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        messages: vec![
            LlmMessage::system(
                "Extract one durable fact or preference about the user from this exchange. \
                 Respond with a single short sentence, or an empty string if nothing is worth keeping.",
            ),
            LlmMessage::user(exchange),
        ],
        max_tokens: Some(60),
        temperature: Some(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t2_patterns_match_preference_language() {
        assert!(T2_PATTERNS.is_match("I prefer dark mode over light mode"));
        assert!(T2_PATTERNS.is_match("my goal is to ship this quarter"));
        assert!(!T2_PATTERNS.is_match("what time is it"));
    }

    #[test]
    fn importance_heuristic_rewards_preference_keywords() {
        assert!(importance_heuristic("I always use tabs") > importance_heuristic("the weather is nice"));
    }

    #[test]
    fn coherence_rewards_reply_and_well_formed_sentence() {
        assert!(coherence_heuristic("What is your favorite color?", Some("Blue.")) > coherence_heuristic("color", None));
    }
}
