//! Call spacing for the AI assistant and the web search service
//!
//! Both collaborators expect polite use: at most one call per configured
//! interval. The limiter holds the previous call time behind an async
//! mutex and sleeps the task until the interval has passed, so concurrent
//! fills queue up instead of bursting.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct RateLimiter {
    last_call: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            last_call: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Sleep until `min_interval` has passed since the previous call,
    /// then claim the current slot. The first call never sleeps.
    pub async fn wait(&self) {
        let mut last = self.last_call.lock().await;

        if let Some(previous) = *last {
            let remaining = self.min_interval.saturating_sub(previous.elapsed());
            if !remaining.is_zero() {
                tracing::debug!(?remaining, "Throttling external call");
                tokio::time::sleep(remaining).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::new(5000);
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_consecutive_calls_are_spaced() {
        let limiter = RateLimiter::new(50);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait().await;
        }
        // Two enforced gaps of 50ms each, with slack for timer jitter
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_zero_interval_never_sleeps() {
        let limiter = RateLimiter::new(0);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
