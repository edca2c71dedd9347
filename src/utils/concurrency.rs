// src/utils/concurrency.rs
// Per-user concurrent-stream cap (§4.1: "at most C concurrent streams per
// user, default 2; excess requests fail with backpressure").

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OwnedSemaphorePermit;
use tokio::sync::Semaphore;

pub struct StreamConcurrencyGuard {
    per_user: Mutex<HashMap<String, Arc<Semaphore>>>,
    max_concurrent: usize,
}

impl StreamConcurrencyGuard {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            per_user: Mutex::new(HashMap::new()),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Attempt to reserve a stream slot for `user_id`. Returns `None` when
    /// the user is already at the concurrency cap.
    pub fn try_acquire(&self, user_id: &str) -> Option<OwnedSemaphorePermit> {
        let sem = {
            let mut map = self.per_user.lock();
            map.entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.max_concurrent)))
                .clone()
        };
        sem.try_acquire_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_concurrent_streams_per_user() {
        let guard = StreamConcurrencyGuard::new(2);
        let p1 = guard.try_acquire("u1");
        let p2 = guard.try_acquire("u1");
        let p3 = guard.try_acquire("u1");
        assert!(p1.is_some());
        assert!(p2.is_some());
        assert!(p3.is_none());
    }

    #[test]
    fn independent_per_user_budgets() {
        let guard = StreamConcurrencyGuard::new(1);
        let _p1 = guard.try_acquire("u1");
        assert!(guard.try_acquire("u2").is_some());
    }
}
