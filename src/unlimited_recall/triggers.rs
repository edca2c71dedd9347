// src/unlimited_recall/triggers.rs
// Trigger detection (§4.4 Trigger detection): resume/historical/semantic
// phrasing in the current user message, run synchronously at request time.

use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::{Regex, RegexSet};

use crate::config::UnlimitedRecallConfig;

use super::types::{TriggerDetection, TriggerKind};

lazy_static! {
    static ref RESUME_PATTERNS: RegexSet = RegexSet::new([
        r"(?i)pick up where we left off",
        r"(?i)continue our last conversation",
        r"(?i)continue where we left off",
        r"(?i)back to what we were (?:talking|discussing)",
        r"(?i)resume our (?:chat|conversation|discussion)",
    ])
    .unwrap();

    static ref HISTORICAL_TIMEFRAME: Regex = Regex::new(
        r"(?i)(\d+)\s*(minute|hour|day|week|month)s?\s*ago|yesterday|last\s+(week|month|night)"
    )
    .unwrap();

    static ref TOPIC_CUE: Regex = Regex::new(
        r"(?i)\b(we|you|i)\s+(talked|discussed|mentioned|said|were\s+talking)\b"
    )
    .unwrap();

    static ref SEMANTIC_CUE: Regex = Regex::new(
        r"(?i)\b(earlier|before|previously|that conversation|that chat|we discussed)\b"
    )
    .unwrap();
}

/// Detects the strongest applicable trigger in `query`, or `None` below the
/// configured minimum confidence for every kind.
pub fn detect(query: &str, now: DateTime<Utc>, config: &UnlimitedRecallConfig) -> Option<TriggerDetection> {
    if RESUME_PATTERNS.is_match(query) {
        if 0.9 >= config.resume_min_confidence {
            return Some(TriggerDetection {
                kind: TriggerKind::Resume,
                confidence: 0.9,
                timeframe: None,
            });
        }
        return None;
    }

    if let Some(detection) = historical(query, now, config) {
        return Some(detection);
    }

    if SEMANTIC_CUE.is_match(query) && 0.6 >= config.semantic_min_confidence {
        return Some(TriggerDetection {
            kind: TriggerKind::Semantic,
            confidence: 0.6,
            timeframe: None,
        });
    }

    None
}

fn historical(query: &str, now: DateTime<Utc>, config: &UnlimitedRecallConfig) -> Option<TriggerDetection> {
    let timeframe_match = HISTORICAL_TIMEFRAME.captures(query)?;
    if !TOPIC_CUE.is_match(query) {
        return None;
    }
    if 0.85 < config.historical_min_confidence {
        return None;
    }

    let interval = interval_from_capture(&timeframe_match);
    let half_width = std::cmp::max(Duration::minutes(5), interval / 2);
    let center = now - interval;

    Some(TriggerDetection {
        kind: TriggerKind::Historical,
        confidence: 0.85,
        timeframe: Some((center - half_width, center + half_width)),
    })
}

fn interval_from_capture(captures: &regex::Captures) -> Duration {
    if let (Some(n), Some(unit)) = (captures.get(1), captures.get(2)) {
        let n: i64 = n.as_str().parse().unwrap_or(1);
        return match unit.as_str().to_lowercase().as_str() {
            "minute" => Duration::minutes(n),
            "hour" => Duration::hours(n),
            "day" => Duration::days(n),
            "week" => Duration::weeks(n),
            "month" => Duration::days(n * 30),
            _ => Duration::days(1),
        };
    }

    let whole = captures.get(0).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
    if whole.contains("yesterday") {
        Duration::days(1)
    } else if whole.contains("week") {
        Duration::weeks(1)
    } else if whole.contains("month") {
        Duration::days(30)
    } else {
        Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> UnlimitedRecallConfig {
        UnlimitedRecallConfig::from_env()
    }

    #[test]
    fn detects_resume_phrase() {
        let detection = detect("let's pick up where we left off", Utc::now(), &config()).unwrap();
        assert_eq!(detection.kind, TriggerKind::Resume);
        assert!(detection.confidence >= 0.7);
    }

    #[test]
    fn detects_historical_with_timeframe_and_topic_cue() {
        let detection = detect("3 weeks ago we discussed databases", Utc::now(), &config()).unwrap();
        assert_eq!(detection.kind, TriggerKind::Historical);
        assert!(detection.timeframe.is_some());
    }

    #[test]
    fn historical_requires_topic_cue() {
        let detection = detect("3 weeks ago I went on vacation", Utc::now(), &config());
        assert!(detection.is_none() || detection.unwrap().kind != TriggerKind::Historical);
    }

    #[test]
    fn detects_semantic_reference() {
        let detection = detect("what did we discuss earlier about pricing", Utc::now(), &config()).unwrap();
        assert_eq!(detection.kind, TriggerKind::Semantic);
    }

    #[test]
    fn plain_question_has_no_trigger() {
        assert!(detect("what's the weather like today", Utc::now(), &config()).is_none());
    }
}
