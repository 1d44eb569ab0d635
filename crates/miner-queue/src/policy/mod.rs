//! Attempt limits and exponential backoff

use std::time::Duration;

use crate::QueueError;

/// Upper bound on the number of attempts made for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptLimit {
    /// At most this many attempts, the first one included; never zero
    Limited(u32),
    /// Retry until the operation succeeds
    Unlimited,
}

impl AttemptLimit {
    /// Limit to `attempts` total attempts
    pub fn limited(attempts: u32) -> Self {
        Self::Limited(attempts)
    }

    /// Whether another attempt may follow `attempts_made` failed ones
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        match self {
            AttemptLimit::Limited(max) => attempts_made < *max,
            AttemptLimit::Unlimited => true,
        }
    }
}

/// Exponential backoff schedule: `delay(n) = base * multiplier^n`
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay before the first retry
    pub base: Duration,
    /// Growth factor applied per retry
    pub multiplier: f64,
    /// Optional ceiling on any single delay
    pub max_delay: Option<Duration>,
}

impl Backoff {
    /// Create a backoff schedule without a ceiling
    pub fn new(base: Duration, multiplier: f64) -> Self {
        Self {
            base,
            multiplier,
            max_delay: None,
        }
    }

    /// Cap every delay at `max_delay`
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Delay to wait before retry number `retry` (0-based).
    ///
    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry.min(i32::MAX as u32) as i32);
        let nanos = self.base.as_nanos() as f64 * factor;

        let delay = if nanos.is_nan() || nanos <= 0.0 {
            Duration::ZERO
        } else if nanos >= u64::MAX as f64 {
            Duration::MAX
        } else {
            Duration::from_nanos(nanos as u64)
        };

        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

/// Attempt limit plus backoff schedule, shared by every call of a queue
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// How many attempts a call may make
    pub attempts: AttemptLimit,
    /// How long to wait between attempts
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: AttemptLimit::limited(5),
            backoff: Backoff::new(Duration::from_secs(1), 4.0),
        }
    }
}

impl RetryPolicy {
    /// Policy with a fixed attempt limit
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            attempts: AttemptLimit::limited(max_attempts),
            backoff,
        }
    }

    /// Policy that keeps retrying until the operation succeeds
    pub fn unlimited(backoff: Backoff) -> Self {
        Self {
            attempts: AttemptLimit::Unlimited,
            backoff,
        }
    }

    /// Whether a call that has failed `attempts_made` times may try again
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        self.attempts.allows_another(attempts_made)
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }

    /// Whether calls under this policy can retry forever
    pub fn is_unlimited(&self) -> bool {
        matches!(self.attempts, AttemptLimit::Unlimited)
    }

    /// Reject zero attempt limits and schedules that shrink or are not numbers
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.attempts == AttemptLimit::Limited(0) {
            return Err(QueueError::InvalidPolicy {
                reason: "attempts must be at least 1".to_string(),
            });
        }

        if !self.backoff.multiplier.is_finite() {
            return Err(QueueError::InvalidPolicy {
                reason: format!("multiplier must be finite, got {}", self.backoff.multiplier),
            });
        }

        if self.backoff.multiplier < 1.0 {
            return Err(QueueError::InvalidPolicy {
                reason: format!(
                    "multiplier must be at least 1.0, got {}",
                    self.backoff.multiplier
                ),
            });
        }

        Ok(())
    }
}
