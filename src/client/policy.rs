use crate::config::ClientConfig;
use crate::Error;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the backoff jitter fraction in `[0, 1)`.
///
/// The clock source only de-synchronizes concurrent clients; it is not random
/// in any meaningful sense.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JitterSource {
    /// Sub-second fraction of the wall clock.
    Clock,
    /// Constant fraction, clamped into `[0, 1)`.
    Fixed(f64),
}

impl JitterSource {
    pub fn sample(self) -> f64 {
        match self {
            JitterSource::Clock => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.subsec_nanos() as f64 / 1_000_000_000.0)
                .unwrap_or(0.0),
            JitterSource::Fixed(v) if v.is_finite() => v.clamp(0.0, 0.999_999),
            JitterSource::Fixed(_) => 0.0,
        }
    }
}

/// Internal decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Retry/backoff policy shared by both facades.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `retry_delay * 2^(n-1) * (0.5 + 0.5 * jitter)`.
    pub retry_delay: Duration,
    pub jitter: JitterSource,
}

// Caps 2^(n-1) so huge retry counts cannot overflow the delay.
const MAX_BACKOFF_EXPONENT: u32 = 16;

impl RetryPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            jitter: JitterSource::Clock,
        }
    }

    pub fn with_jitter(mut self, jitter: JitterSource) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total attempts, including the first one.
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after the failed attempt `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let factor = (1u32 << exponent) as f64;
        let scale = 0.5 + 0.5 * self.jitter.sample();
        Duration::try_from_secs_f64(self.retry_delay.as_secs_f64() * factor * scale)
            .unwrap_or(self.retry_delay)
    }

    /// Decide what to do after attempt `attempt` (1-based) failed with `err`.
    pub(crate) fn decide(&self, err: &Error, attempt: u32) -> Decision {
        if err.is_retryable() && attempt < self.max_attempts() {
            Decision::Retry {
                delay: self.backoff_delay(attempt),
            }
        } else {
            Decision::Fail
        }
    }
}

/// One run of the retry engine, free of any I/O or sleeping.
///
/// Drivers loop on [`RetryLoop::next_attempt`], perform the request, report
/// failures through [`RetryLoop::record_failure`], sleep for the returned
/// delay with their own primitive, and finish with [`RetryLoop::into_error`].
pub(crate) struct RetryLoop<'p> {
    policy: &'p RetryPolicy,
    operation: &'static str,
    attempt: u32,
    halted: bool,
    last_error: Option<Error>,
}

impl<'p> RetryLoop<'p> {
    pub fn new(policy: &'p RetryPolicy, operation: &'static str) -> Self {
        Self {
            policy,
            operation,
            attempt: 0,
            halted: false,
            last_error: None,
        }
    }

    /// `Some(attempt)` (1-based) while another attempt may be made.
    pub fn next_attempt(&mut self) -> Option<u32> {
        if self.halted || self.attempt >= self.policy.max_attempts() {
            return None;
        }
        self.attempt += 1;
        Some(self.attempt)
    }

    /// Record a failed attempt. Returns the delay to wait before the next
    /// attempt, or `None` when the loop is over.
    pub fn record_failure(&mut self, err: Error) -> Option<Duration> {
        let decision = self.policy.decide(&err, self.attempt);
        let outcome = match decision {
            Decision::Retry { delay } => {
                tracing::warn!(
                    operation = self.operation,
                    attempt = self.attempt,
                    max_attempts = self.policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "request failed, retrying"
                );
                Some(delay)
            }
            Decision::Fail => {
                if err.is_retryable() {
                    tracing::warn!(
                        operation = self.operation,
                        attempts = self.attempt,
                        error = %err,
                        "retries exhausted"
                    );
                }
                self.halted = true;
                None
            }
        };
        self.last_error = Some(err);
        outcome
    }

    /// The error to surface once the loop is over.
    pub fn into_error(self) -> Error {
        self.last_error.unwrap_or_else(|| {
            Error::connection(format!(
                "{} failed without receiving a response",
                self.operation
            ))
        })
    }
}
