//! Request pacing.
//!
//! Provider rate limits are usually stated per minute; spacing request starts
//! evenly keeps us under them without tracking quota windows. Retries go
//! through the same limiter as first attempts.

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

/// Enforces a minimum interval between the starts of consecutive requests.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// Wait until a new request may start, then record its start.
    pub async fn acquire(&self) {
        let mut last = self.last_start.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if Instant::now() < ready_at {
                debug!(
                    "Rate limit: waiting {}ms",
                    (ready_at - Instant::now()).as_millis()
                );
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_request_does_not_wait() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_requests_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(1000));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_time_counts_toward_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(1000));
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
