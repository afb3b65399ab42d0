//! Rolling-window rate limiter for outbound service calls.
//!
//! One limiter instance is bound to one upstream service and shared
//! (via `Arc`) by every session and agent targeting that service.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Permits at most `rate_limit` calls per rolling `period`.
///
/// Call timestamps live in a ring buffer bounded by `rate_limit`;
/// expired entries are evicted from the front on every acquisition.
/// The lock is held across the wait so concurrent callers are admitted
/// in order and never overshoot the budget.
#[derive(Debug)]
pub struct RateLimiter {
    rate_limit: usize,
    period: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter permitting `rate_limit` calls per `period`.
    ///
    /// A `rate_limit` of zero is treated as one.
    #[must_use]
    pub fn new(rate_limit: usize, period: Duration) -> Self {
        let rate_limit = rate_limit.max(1);
        Self {
            rate_limit,
            period,
            calls: Mutex::new(VecDeque::with_capacity(rate_limit)),
        }
    }

    /// Maximum calls per window.
    #[must_use]
    pub const fn rate_limit(&self) -> usize {
        self.rate_limit
    }

    /// Length of the rolling window.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Waits until a slot is free, then records the call.
    ///
    /// Never fails. Dropping the returned future (for example when a
    /// cancellation branch wins a `select!`) abandons the wait without
    /// recording a call.
    pub async fn acquire(&self) {
        let mut calls = self.calls.lock().await;
        loop {
            let now = Instant::now();
            self.evict(&mut calls, now);
            if calls.len() < self.rate_limit {
                break;
            }
            let Some(&oldest) = calls.front() else {
                break;
            };
            let wait = self.period.saturating_sub(now.duration_since(oldest));
            if !wait.is_zero() {
                tracing::debug!(
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    rate_limit = self.rate_limit,
                    "rate limit reached, waiting"
                );
                tokio::time::sleep(wait).await;
            }
        }
        calls.push_back(Instant::now());
    }

    /// Number of calls recorded inside the current window.
    pub async fn recorded_calls(&self) -> usize {
        let mut calls = self.calls.lock().await;
        self.evict(&mut calls, Instant::now());
        calls.len()
    }

    fn evict(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&front) = calls.front() {
            if now.duration_since(front) >= self.period {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_calls_under_limit_do_not_wait() {
        let limiter = RateLimiter::new(3, Duration::from_secs(10));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.recorded_calls().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fourth_call_waits_for_oldest_to_expire() {
        let limiter = RateLimiter::new(3, Duration::from_secs(10));
        let start = Instant::now();
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(2)).await;
        limiter.acquire().await;
        limiter.acquire().await;

        limiter.acquire().await;
        // The oldest call was at t=0, so the fourth is admitted at t=10.
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(limiter.recorded_calls().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_secs(5));
        limiter.acquire().await;
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(6)).await;
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_between_tasks() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(1)));
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap_or_else(|_| unreachable!());
        }
        // Five calls at two per second need two full windows of waiting.
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_wait_records_nothing() {
        let limiter = RateLimiter::new(1, Duration::from_secs(30));
        limiter.acquire().await;
        let waited =
            tokio::time::timeout(Duration::from_secs(1), limiter.acquire()).await;
        assert!(waited.is_err());
        assert_eq!(limiter.recorded_calls().await, 1);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let limiter = RateLimiter::new(0, Duration::from_secs(1));
        assert_eq!(limiter.rate_limit(), 1);
    }
}
