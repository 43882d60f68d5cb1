//! Retry policy for transient fetch failures.
//!
//! A region whose fetch fails with a retryable [`TransportError`] is retried
//! according to a [`RetryPolicy`]. Once attempts are exhausted the last error
//! is returned and the run aborts.
//!
//! ```ignore
//! use whiffy::retry::RetryPolicy;
//!
//! // Four attempts with exponential backoff, starting at 500ms
//! let policy = RetryPolicy::exponential(4);
//! ```
//!
//! [`TransportError`]: crate::provider::TransportError

use std::thread;
use std::time::Duration;

/// Default number of attempts per region (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Default initial delay for exponential backoff (500ms).
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 500;

/// Default maximum delay for exponential backoff (30 seconds).
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// How a fetch handles transient failures.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    /// No retries - fail immediately on error.
    None,

    /// Fixed number of attempts with constant delay between them.
    Fixed {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Delay between retry attempts.
        delay: Duration,
    },

    /// Exponential backoff with configurable parameters.
    ///
    /// The delay is multiplied after each failed attempt, up to a maximum.
    ExponentialBackoff {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Initial delay after the first failure.
        initial_delay: Duration,
        /// Maximum delay cap (delay won't exceed this).
        max_delay: Duration,
        /// Multiplier applied to delay after each failure (typically 2.0).
        multiplier: f64,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Creates an exponential backoff policy with the default delays.
    pub fn exponential(max_attempts: u32) -> Self {
        Self::ExponentialBackoff {
            max_attempts,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Creates an exponential backoff policy with a custom initial delay.
    pub fn exponential_from(max_attempts: u32, initial_delay: Duration) -> Self {
        Self::ExponentialBackoff {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Creates a fixed retry policy.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::Fixed {
            max_attempts,
            delay,
        }
    }

    /// Calculates the delay before retry number `attempt`.
    ///
    /// `attempt` is 1-based, where 1 is the first retry. Returns `None` when
    /// no more retries are allowed.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed {
                max_attempts,
                delay,
            } => {
                if attempt < *max_attempts {
                    Some(*delay)
                } else {
                    None
                }
            }
            Self::ExponentialBackoff {
                max_attempts,
                initial_delay,
                max_delay,
                multiplier,
            } => {
                if attempt < *max_attempts {
                    let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                    let delay_ms = initial_delay.as_millis() as f64 * factor;
                    let delay =
                        Duration::from_millis(delay_ms.min(max_delay.as_millis() as f64) as u64);
                    Some(delay.min(*max_delay))
                } else {
                    None
                }
            }
        }
    }

    /// Returns the maximum number of attempts for this policy.
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Fixed { max_attempts, .. } => *max_attempts,
            Self::ExponentialBackoff { max_attempts, .. } => *max_attempts,
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `retryable` decides whether an error is worth another attempt. The
    /// returned error is paired with the number of attempts made.
    pub fn run<T, E, F, R>(&self, mut op: F, retryable: R) -> Result<T, (E, u32)>
    where
        F: FnMut() -> Result<T, E>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if retryable(&e) => match self.delay_for_attempt(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            max_attempts = self.max_attempts(),
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Fetch failed, retrying"
                        );
                        thread::sleep(delay);
                    }
                    None => return Err((e, attempt)),
                },
                Err(e) => return Err((e, attempt)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_default_policy_is_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(
            policy.delay_for_attempt(1),
            Some(Duration::from_millis(DEFAULT_INITIAL_DELAY_MS))
        );
    }

    #[test]
    fn test_exponential_delays_double_and_cap() {
        let policy = RetryPolicy::ExponentialBackoff {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
        };

        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for_attempt(3), Some(Duration::from_millis(350)));
        assert_eq!(policy.delay_for_attempt(10), None);
    }

    #[test]
    fn test_none_policy_never_retries() {
        assert_eq!(RetryPolicy::None.delay_for_attempt(1), None);
        assert_eq!(RetryPolicy::None.max_attempts(), 1);
    }

    #[test]
    fn test_run_recovers_after_transient_failures() {
        let policy = RetryPolicy::fixed(3, Duration::ZERO);
        let calls = Cell::new(0);

        let result: Result<u32, (String, u32)> = policy.run(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err("flaky".to_string())
                } else {
                    Ok(42)
                }
            },
            |_| true,
        );

        assert_eq!(result, Ok(42));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_run_reports_attempts_on_exhaustion() {
        let policy = RetryPolicy::fixed(2, Duration::ZERO);

        let result: Result<(), (String, u32)> =
            policy.run(|| Err("down".to_string()), |_| true);

        assert_eq!(result, Err(("down".to_string(), 2)));
    }

    #[test]
    fn test_run_stops_on_permanent_error() {
        let policy = RetryPolicy::fixed(5, Duration::ZERO);
        let calls = Cell::new(0);

        let result: Result<(), (String, u32)> = policy.run(
            || {
                calls.set(calls.get() + 1);
                Err("fatal".to_string())
            },
            |_| false,
        );

        assert_eq!(result, Err(("fatal".to_string(), 1)));
        assert_eq!(calls.get(), 1);
    }
}
