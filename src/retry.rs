//! Attempt budgets and jittered backoff.
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// Non-standard diagnostic header sent on every retried attempt.
pub const RETRY_COUNT: HeaderName = HeaderName::from_static("retry-count");

/// Attempts allowed for the HEAD probe.
pub const PROBE_ATTEMPTS: u32 = 3;
/// Attempts allowed for each range GET.
pub const FETCH_ATTEMPTS: u32 = 5;
/// Upper bound of the uniform delay slept between attempts.
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(100);

/// Retry budget for one probe or one chunk fetch.
///
/// Policies carry no shared state: every operation draws its own jitter, so
/// concurrent retries do not line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            max_jitter,
        }
    }

    pub fn probe() -> Self {
        Self::new(PROBE_ATTEMPTS, DEFAULT_MAX_JITTER)
    }

    pub fn fetch() -> Self {
        Self::new(FETCH_ATTEMPTS, DEFAULT_MAX_JITTER)
    }

    /// A random delay in `[0, max_jitter]`.
    pub fn jitter(&self) -> Duration {
        let max = self.max_jitter.as_micros() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rand::rng().random_range(0..=max))
    }

    /// Sleep for a freshly drawn jitter.
    pub async fn backoff(&self) {
        let delay = self.jitter();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Headers for the attempt with the given 0-based index. Retried attempts
    /// (index >= 1) carry `Retry-Count: <index>`.
    pub fn attempt_headers(attempt: u32) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if attempt > 0 {
            headers.insert(RETRY_COUNT, HeaderValue::from(attempt));
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy::fetch();
        for _ in 0..1000 {
            assert!(policy.jitter() <= DEFAULT_MAX_JITTER);
        }
    }

    #[test]
    fn zero_jitter_never_sleeps() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        assert_eq!(policy.jitter(), Duration::ZERO);
    }

    #[test]
    fn first_attempt_has_no_retry_header() {
        assert!(RetryPolicy::attempt_headers(0).is_empty());

        let headers = RetryPolicy::attempt_headers(2);
        assert_eq!(headers.get(RETRY_COUNT).unwrap(), "2");
    }

    #[test]
    fn budget_is_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::probe().max_attempts, 3);
        assert_eq!(RetryPolicy::fetch().max_attempts, 5);
    }
}
