//! Retry classification and exponential-backoff delays for HTTP calls.
//!
//! The delay before attempt `n` (zero-indexed, `n >= 1`) is
//! `min(base * 2^n + jitter, max_delay)` where `jitter` is drawn uniformly
//! from `[0, max_jitter)`. Only the deterministic component doubles.

use std::time::Duration;

use rand::Rng;

/// Retries allowed after the first attempt unless a request overrides it.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Per-attempt deadline unless a request overrides it.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP status codes worth retrying: request timeout, rate limiting and
/// server-side failures. Every other 4xx fails identically on retry.
pub const RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Whether a non-success HTTP status may be retried.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status)
}

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Deterministic delay unit, doubled per attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay, jitter included.
    pub max_delay: Duration,
    /// Exclusive upper bound of the random additive jitter.
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl BackoffPolicy {
    /// Delay before `attempt` with an explicit jitter value.
    ///
    /// The result is clamped to [`BackoffPolicy::max_delay`]. Large attempt
    /// numbers saturate instead of overflowing.
    pub fn delay_with_jitter(&self, attempt: u32, jitter: Duration) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(factor)
            .saturating_add(jitter)
            .min(self.max_delay)
    }

    /// Delay before `attempt` with freshly sampled jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay_with_jitter(attempt, self.sample_jitter())
    }

    /// Uniform jitter in `[0, max_jitter)`.
    pub fn sample_jitter(&self) -> Duration {
        let bound = self.max_jitter.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..bound))
    }
}
