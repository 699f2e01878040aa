//! Bounded retry configuration for rate-limited requests.
//!
//! GitHub signals two distinct throttles: the primary rate limit (quota
//! exhausted) and abuse detection (secondary limit). Each gets its own small
//! retry budget; once a budget is spent the error surfaces to the caller.
//! Delays honor the server's `retry-after` when present and add jitter from
//! an injectable source so tests stay deterministic.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use policy::{PlatformError, RetryPolicy};

// ---------------------------------------------------------------------------
// Jitter
// ---------------------------------------------------------------------------

/// Source of random back-off jitter.
pub trait JitterSource: Send + Sync {
    /// Returns a delay in `[0, max]`.
    fn jitter(&self, max: Duration) -> Duration;
}

/// Uniformly random jitter from the thread-local RNG.
#[derive(Debug, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn jitter(&self, max: Duration) -> Duration {
        if max.is_zero() {
            return Duration::ZERO;
        }
        let millis = rand::thread_rng().gen_range(0..=max.as_millis() as u64);
        Duration::from_millis(millis)
    }
}

/// No jitter at all; deterministic delays for tests.
#[derive(Debug, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn jitter(&self, _max: Duration) -> Duration {
        Duration::ZERO
    }
}

// ---------------------------------------------------------------------------
// Retry configuration
// ---------------------------------------------------------------------------

/// Explicit retry configuration, passed at client-construction time.
#[derive(Clone)]
pub struct RetryConfig {
    /// Retries permitted after a primary rate-limit response.
    pub max_rate_limit_retries: u32,

    /// Retries permitted after an abuse-detection response.
    pub max_abuse_retries: u32,

    /// Delay used when the server gives no `retry-after` hint.
    pub base_delay: Duration,

    /// Upper bound on added jitter.
    pub max_jitter: Duration,

    /// Jitter source; swap in [`NoJitter`] for deterministic tests.
    pub jitter: Arc<dyn JitterSource>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 1,
            max_abuse_retries: 1,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(250),
            jitter: Arc::new(RandomJitter),
        }
    }
}

impl std::fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_rate_limit_retries", &self.max_rate_limit_retries)
            .field("max_abuse_retries", &self.max_abuse_retries)
            .field("base_delay", &self.base_delay)
            .field("max_jitter", &self.max_jitter)
            .finish_non_exhaustive()
    }
}

impl RetryConfig {
    /// Computes the delay to wait before retrying after `error`.
    ///
    /// Only meaningful for errors whose [`RetryPolicy`] is retryable; a
    /// non-retryable error yields the base delay, but the client never asks
    /// for it.
    pub fn delay_for(&self, error: &PlatformError) -> Duration {
        let floor = match error.retry_policy() {
            RetryPolicy::Retryable { after: Some(after) } => after,
            _ => self.base_delay,
        };
        floor + self.jitter.jitter(self.max_jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_hint_takes_precedence_over_base_delay() {
        let config = RetryConfig {
            base_delay: Duration::from_secs(5),
            jitter: Arc::new(NoJitter),
            ..RetryConfig::default()
        };
        let err = PlatformError::RateLimited {
            retry_after: Some(Duration::from_secs(12)),
        };
        assert_eq!(config.delay_for(&err), Duration::from_secs(12));
    }

    #[test]
    fn base_delay_used_when_no_hint_is_given() {
        let config = RetryConfig {
            base_delay: Duration::from_secs(2),
            jitter: Arc::new(NoJitter),
            ..RetryConfig::default()
        };
        let err = PlatformError::AbuseDetected { retry_after: None };
        assert_eq!(config.delay_for(&err), Duration::from_secs(2));
    }

    #[test]
    fn jitter_is_bounded() {
        let jitter = RandomJitter;
        for _ in 0..100 {
            assert!(jitter.jitter(Duration::from_millis(50)) <= Duration::from_millis(50));
        }
        assert_eq!(jitter.jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn default_budgets_are_one_retry_each() {
        let config = RetryConfig::default();
        assert_eq!(config.max_rate_limit_retries, 1);
        assert_eq!(config.max_abuse_retries, 1);
    }
}
