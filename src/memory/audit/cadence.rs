// src/memory/audit/cadence.rs
// Audit cadence tracker (§4.2.1): triggers on >=6 messages OR >=1500
// user+assistant tokens OR >=3 minutes since the last audit, debounced to
// at most one trigger per thread per 30s.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::CadenceConfig;

#[derive(Debug, Clone)]
struct ThreadCadenceState {
    messages_since_audit: u32,
    tokens_since_audit: u32,
    last_audit_at: DateTime<Utc>,
    last_trigger_at: Option<DateTime<Utc>>,
}

impl ThreadCadenceState {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            messages_since_audit: 0,
            tokens_since_audit: 0,
            last_audit_at: now,
            last_trigger_at: None,
        }
    }
}

pub struct CadenceTracker {
    config: CadenceConfig,
    state: Mutex<HashMap<String, ThreadCadenceState>>,
}

impl CadenceTracker {
    pub fn new(config: CadenceConfig) -> Self {
        Self {
            config,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Records one message event and returns whether an audit should fire
    /// for this thread right now.
    pub fn record_message(&self, thread_id: &str, tokens: u32) -> bool {
        let now = Utc::now();
        let mut state = self.state.lock();
        let entry = state
            .entry(thread_id.to_string())
            .or_insert_with(|| ThreadCadenceState::fresh(now));

        entry.messages_since_audit += 1;
        entry.tokens_since_audit += tokens;

        let minutes_elapsed = (now - entry.last_audit_at).num_seconds() as f32 / 60.0;

        let threshold_hit = entry.messages_since_audit >= self.config.msgs
            || entry.tokens_since_audit >= self.config.tokens
            || minutes_elapsed >= self.config.minutes as f32;

        if !threshold_hit {
            return false;
        }

        if let Some(last_trigger) = entry.last_trigger_at {
            let since_last_trigger = (now - last_trigger).num_seconds();
            if since_last_trigger < self.config.debounce_sec {
                return false;
            }
        }

        entry.last_trigger_at = Some(now);
        true
    }

    /// Resets the cadence window after an audit actually runs.
    pub fn reset(&self, thread_id: &str) {
        let now = Utc::now();
        let mut state = self.state.lock();
        state.insert(thread_id.to_string(), ThreadCadenceState::fresh(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CadenceConfig {
        CadenceConfig {
            msgs: 3,
            tokens: 1000,
            minutes: 60,
            debounce_sec: 30,
            max_per_audit: 3,
        }
    }

    #[test]
    fn triggers_after_message_count_threshold() {
        let tracker = CadenceTracker::new(config());
        assert!(!tracker.record_message("t1", 10));
        assert!(!tracker.record_message("t1", 10));
        assert!(tracker.record_message("t1", 10));
    }

    #[test]
    fn triggers_after_token_threshold() {
        let tracker = CadenceTracker::new(config());
        assert!(tracker.record_message("t1", 1200));
    }

    #[test]
    fn debounce_suppresses_immediate_retrigger() {
        let tracker = CadenceTracker::new(config());
        assert!(tracker.record_message("t1", 1200));
        assert!(!tracker.record_message("t1", 1200));
    }

    #[test]
    fn reset_clears_accumulated_state() {
        let tracker = CadenceTracker::new(config());
        tracker.record_message("t1", 1200);
        tracker.reset("t1");
        assert!(!tracker.record_message("t1", 10));
    }

    #[test]
    fn threads_are_tracked_independently() {
        let tracker = CadenceTracker::new(config());
        tracker.record_message("t1", 1200);
        assert!(!tracker.record_message("t2", 10));
    }
}
