// src/memory/audit/scorer.rs
// Audit candidate scoring (§4.2.1 step 2): Q = 0.4*relevance + 0.3*importance
// + 0.2*coherence + 0.1*recency, tier-weighted.

use chrono::{DateTime, Utc};

use crate::config::memory::TierPolicy;

#[derive(Debug, Clone)]
pub struct CandidateFactors {
    pub relevance: f32,
    pub importance: f32,
    pub coherence: f32,
    pub message_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub score: f32,
    pub relevance: f32,
    pub importance: f32,
    pub coherence: f32,
    pub recency: f32,
}

/// Scores one candidate window against a tier's weights. Recency uses the
/// same exponential day-decay as recall scoring.
pub fn score(factors: &CandidateFactors, policy: &TierPolicy) -> ScoredCandidate {
    let age_hours = (Utc::now() - factors.message_timestamp).num_hours().max(0) as f32;
    let recency = (-age_hours / 24.0).exp();

    let combined = policy.relevance_weight * factors.relevance
        + policy.importance_weight * factors.importance
        + policy.coherence_weight * factors.coherence
        + policy.recency_weight * recency;

    ScoredCandidate {
        score: combined.clamp(0.0, 1.0),
        relevance: factors.relevance,
        importance: factors.importance,
        coherence: factors.coherence,
        recency,
    }
}

/// Scores an empty candidate set as zero, never a divide-by-zero (§4.2.1
/// final paragraph).
pub fn score_empty() -> ScoredCandidate {
    ScoredCandidate {
        score: 0.0,
        relevance: 0.0,
        importance: 0.0,
        coherence: 0.0,
        recency: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TierPolicy {
        TierPolicy {
            relevance_weight: 0.4,
            importance_weight: 0.3,
            coherence_weight: 0.2,
            recency_weight: 0.1,
            save_threshold: 0.65,
            ttl_days: 90,
            decay_per_week: 0.02,
        }
    }

    #[test]
    fn fresh_relevant_message_scores_high() {
        let factors = CandidateFactors {
            relevance: 1.0,
            importance: 1.0,
            coherence: 1.0,
            message_timestamp: Utc::now(),
        };
        let scored = score(&factors, &policy());
        assert!(scored.score > 0.9);
    }

    #[test]
    fn empty_candidate_never_divides_by_zero() {
        let scored = score_empty();
        assert_eq!(scored.score, 0.0);
    }

    #[test]
    fn stale_message_decays_recency_component() {
        let factors = CandidateFactors {
            relevance: 0.5,
            importance: 0.5,
            coherence: 0.5,
            message_timestamp: Utc::now() - chrono::Duration::days(10),
        };
        let scored = score(&factors, &policy());
        assert!(scored.recency < 0.1);
    }
}
