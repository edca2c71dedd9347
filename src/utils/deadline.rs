// src/utils/deadline.rs
// Soft-deadline helper for the context-gathering fan-out (§4.1 step 3): each
// layer gets its own timeout and returns partial results on expiry, never an
// error on the request's critical path.

use std::future::Future;
use std::time::Duration;

/// Runs `fut` under `timeout_ms`. Returns `None` on expiry rather than an
/// error so callers can degrade gracefully instead of failing the turn.
pub async fn with_soft_deadline<T, F>(timeout_ms: u64, fut: F) -> Option<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(Duration::from_millis(timeout_ms), fut)
        .await
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_value_when_fast_enough() {
        let result = with_soft_deadline(50, async { 7 }).await;
        assert_eq!(result, Some(7));
    }

    #[tokio::test]
    async fn returns_none_on_expiry() {
        let result = with_soft_deadline(5, async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            7
        })
        .await;
        assert_eq!(result, None);
    }
}
