//! Retry policy applied to every remote call.
//!
//! A [`RetryPolicy`] is an immutable value built once per harvest cycle and
//! threaded into the call executor. It re-issues a failed call while the
//! failure is transient and the attempt and elapsed-time budgets allow it.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::traits::ApiError;

/// Shape of the random spread applied to an exponential backoff ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// Sleep anywhere in `[0, ceiling)`
    Full,
    /// Sleep in `[ceiling / 2, ceiling)`
    Equal,
}

/// Retry configuration, fixed for a whole harvest cycle.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first call included
    pub max_attempts: u32,

    /// Ceiling on wall time across all attempts and sleeps
    pub max_elapsed: Duration,

    /// Cap on a single backoff sleep
    pub max_wait_between_calls: Duration,

    /// Base unit the exponential backoff grows from
    pub base_sleep: Duration,

    /// Retry on every 5xx status
    pub retry_on_any_5xx: bool,

    /// Retryable statuses mapped to the provider codes that qualify.
    ///
    /// An empty list means any code for that status.
    pub retryable: HashMap<u16, Vec<String>>,

    /// Retry failures that never produced a status (connection resets, timeouts)
    pub retry_transport_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let mut retryable = HashMap::new();
        retryable.insert(
            400,
            vec![
                "QuotaExceeded".to_string(),
                "LimitExceeded".to_string(),
                "TooManyRequests".to_string(),
            ],
        );
        retryable.insert(429, Vec::new());

        Self {
            max_attempts: 10,
            max_elapsed: Duration::from_secs(900),
            max_wait_between_calls: Duration::from_secs(100),
            base_sleep: Duration::from_secs(2),
            retry_on_any_5xx: true,
            retryable,
            retry_transport_errors: true,
        }
    }
}

impl RetryPolicy {
    /// Same predicate as the default policy with millisecond-scale timings.
    pub fn for_testing() -> Self {
        Self {
            max_attempts: 3,
            max_elapsed: Duration::from_secs(5),
            max_wait_between_calls: Duration::from_millis(50),
            base_sleep: Duration::from_millis(10),
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    /// Whether `error` is transient under this policy.
    pub fn is_retryable(&self, error: &ApiError) -> bool {
        match error {
            ApiError::Transport(_) => self.retry_transport_errors,
            ApiError::Service { status, code, .. } => {
                if self.retry_on_any_5xx && (500..600).contains(status) {
                    return true;
                }
                match self.retryable.get(status) {
                    Some(codes) => codes.is_empty() || codes.iter().any(|c| c == code),
                    None => false,
                }
            }
        }
    }

    /// Jitter shape for a failure: throttles spread with equal jitter.
    pub fn jitter_for(&self, error: &ApiError) -> Jitter {
        match error.status() {
            Some(429) => Jitter::Equal,
            _ => Jitter::Full,
        }
    }

    /// Exponential ceiling for the sleep after failed attempt `attempt` (1-based).
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_sleep
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_wait_between_calls)
            .min(self.max_wait_between_calls)
    }

    /// Sleep after failed attempt `attempt`, given a uniform sample in `[0, 1)`.
    pub fn delay(&self, attempt: u32, jitter: Jitter, sample: f64) -> Duration {
        let ceiling = self.backoff_ceiling(attempt);
        let sample = sample.clamp(0.0, 1.0);
        match jitter {
            Jitter::Full => ceiling.mul_f64(sample),
            Jitter::Equal => {
                let half = ceiling / 2;
                half + half.mul_f64(sample)
            }
        }
    }

    /// Runs `operation` until it succeeds or a stop condition is reached.
    ///
    /// Each attempt is bounded by the remaining elapsed budget, so the whole
    /// call never outlives `max_elapsed`.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError`] carrying the last failure, the number of
    /// attempts made, and why retrying stopped.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<Attempted<T>, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let remaining = self.max_elapsed.saturating_sub(start.elapsed());

            let error = match tokio::time::timeout(remaining, operation()).await {
                Ok(Ok(value)) => return Ok(Attempted { value, attempts }),
                Ok(Err(error)) => error,
                Err(_) => {
                    return Err(RetryError {
                        attempts,
                        elapsed: start.elapsed(),
                        stop: StopReason::ElapsedBudgetExhausted,
                        source: ApiError::Transport(format!(
                            "attempt cut off by the {:?} retry budget",
                            self.max_elapsed
                        )),
                    });
                }
            };

            let stop = if !self.is_retryable(&error) {
                Some(StopReason::NotRetryable)
            } else if attempts >= self.max_attempts {
                Some(StopReason::AttemptsExhausted)
            } else {
                None
            };
            if let Some(stop) = stop {
                return Err(RetryError {
                    attempts,
                    elapsed: start.elapsed(),
                    stop,
                    source: error,
                });
            }

            let sample: f64 = rand::rng().random();
            let delay = self.delay(attempts, self.jitter_for(&error), sample);
            if start.elapsed() + delay >= self.max_elapsed {
                return Err(RetryError {
                    attempts,
                    elapsed: start.elapsed(),
                    stop: StopReason::ElapsedBudgetExhausted,
                    source: error,
                });
            }

            debug!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying remote call"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// A successful result together with the attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Why the policy stopped re-issuing a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The failure is not eligible for retry
    NotRetryable,
    /// `max_attempts` calls were made
    AttemptsExhausted,
    /// Another attempt would cross `max_elapsed`
    ElapsedBudgetExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::NotRetryable => "non-retryable failure",
            StopReason::AttemptsExhausted => "attempts exhausted",
            StopReason::ElapsedBudgetExhausted => "elapsed budget exhausted",
        };
        f.write_str(s)
    }
}

/// Terminal failure of a retried call.
#[derive(Error, Debug, Clone)]
#[error("{stop} after {attempts} attempt(s) in {elapsed:?}: {source}")]
pub struct RetryError {
    pub attempts: u32,
    pub elapsed: Duration,
    pub stop: StopReason,
    pub source: ApiError,
}
