//! Bounded retry policy for idempotent API reads.

use std::time::Duration;

use reqwest::header::HeaderMap;

/// Upper bound for a single backoff delay.
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Retry policy applied to GET requests.
///
/// Writes are never retried; see [`crate::client::PagerDutyClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A policy that performs exactly one attempt.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the attempt following `attempt` (1-based).
    ///
    /// A server-provided `Retry-After` wins over the exponential schedule.
    #[must_use]
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(delay) = retry_after {
            return delay.max(self.base_delay).min(MAX_DELAY);
        }
        let exponent = attempt.saturating_sub(1).min(10);
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(exponent))
            .min(MAX_DELAY)
    }
}

/// Statuses worth retrying: rate limiting and server errors.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

/// Transport failures worth retrying.
#[must_use]
pub fn is_retryable_transport(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Parse a `Retry-After` header given in seconds.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get("retry-after")?.to_str().ok()?;
    let seconds = raw.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}
