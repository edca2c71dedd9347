// src/utils/rate_limiter.rs
// Per-user token-bucket rate limiting (§4.1 step 1, §5).

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovRateLimiter};

use crate::config::RateLimitConfig;

pub struct UserRateLimiter {
    limiter: Arc<GovRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>,
}

impl UserRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second.max(1)).expect("nonzero rps"),
        )
        .allow_burst(NonZeroU32::new(config.burst.max(1)).expect("nonzero burst"));

        Self {
            limiter: Arc::new(GovRateLimiter::keyed(quota)),
        }
    }

    /// Non-blocking admission check; the gateway rejects with `RateLimited`
    /// rather than queuing (§4.1: "excess requests fail with backpressure").
    pub fn check(&self, user_id: &str) -> bool {
        self.limiter.check_key(&user_id.to_string()).is_ok()
    }

    pub fn retry_after_secs(&self, user_id: &str) -> u64 {
        match self.limiter.check_key(&user_id.to_string()) {
            Ok(_) => 0,
            Err(not_until) => not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rps: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second: rps,
            burst,
            max_concurrent_streams_per_user: 2,
        }
    }

    #[test]
    fn admits_within_burst_then_rejects() {
        let limiter = UserRateLimiter::new(&config(1, 2));
        assert!(limiter.check("u1"));
        assert!(limiter.check("u1"));
        assert!(!limiter.check("u1"));
    }

    #[test]
    fn tracks_users_independently() {
        let limiter = UserRateLimiter::new(&config(1, 1));
        assert!(limiter.check("u1"));
        assert!(limiter.check("u2"));
    }
}
