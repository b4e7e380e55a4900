//! Client-side pacing for AI categorization calls

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Minimum-interval limiter shared by every AI strategy built from one config
///
/// `acquire` holds the lock while it sleeps, so concurrent callers are
/// served one at a time, each at least `interval` after the previous one.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Duration>,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Limiter allowing `requests_per_minute` calls; 0 disables limiting
    pub fn new(requests_per_minute: u32) -> Self {
        let interval = (requests_per_minute > 0)
            .then(|| Duration::from_secs(60) / requests_per_minute);
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// Limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Minimum spacing between calls, None when unlimited
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Wait until the next call is allowed and record it
    pub async fn acquire(&self) {
        let Some(interval) = self.interval else {
            return;
        };

        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                let wait = interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Rate limiting AI call");
                tokio::time::sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_interval_from_rpm() {
        assert_eq!(RateLimiter::new(10).interval(), Some(Duration::from_secs(6)));
        assert_eq!(
            RateLimiter::new(600).interval(),
            Some(Duration::from_millis(100))
        );
        assert_eq!(RateLimiter::new(0).interval(), None);
    }

    #[tokio::test]
    async fn test_unlimited_never_waits() {
        let limiter = RateLimiter::unlimited();
        let start = Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_calls_are_spaced() {
        // 1200 rpm = 50ms between calls
        let limiter = RateLimiter::new(1200);
        let start = Instant::now();
        for _ in 0..4 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(1200));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
