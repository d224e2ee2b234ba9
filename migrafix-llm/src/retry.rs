//! Retry policy with growing per-attempt timeouts.
//!
//! [`RetryState`] is a small state machine: each failure either yields the
//! next attempt's timeout and backoff, or gives up.

use crate::error::GenerateError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first (minimum 1).
    pub max_attempts: u32,
    #[serde(with = "secs")]
    pub initial_timeout: Duration,
    /// Factor applied to the timeout after a timed-out attempt.
    pub timeout_multiplier: f64,
    #[serde(with = "secs")]
    pub max_timeout: Duration,
    #[serde(with = "secs")]
    pub initial_backoff: Duration,
    #[serde(with = "secs")]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_timeout: Duration::from_secs(300),
            timeout_multiplier: 1.5,
            max_timeout: Duration::from_secs(3600),
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn start(&self) -> RetryState {
        RetryState {
            policy: self.clone(),
            attempt: 1,
            timeout: self.initial_timeout,
            timeouts: Vec::new(),
        }
    }

    /// Backoff before attempt `attempt + 1`, doubling from the initial value.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }

    fn grow(&self, timeout: Duration) -> Duration {
        let factor = if self.timeout_multiplier.is_finite() && self.timeout_multiplier > 1.0 {
            self.timeout_multiplier
        } else {
            1.0
        };
        let next = timeout.as_secs_f64() * factor;
        Duration::from_secs_f64(next.min(self.max_timeout.as_secs_f64()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    Retry { timeout: Duration, backoff: Duration },
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
    timeout: Duration,
    timeouts: Vec<Duration>,
}

impl RetryState {
    /// 1-based number of the current attempt.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Timeout for the current attempt.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Timeouts used by the attempts that already failed.
    pub fn timeouts(&self) -> &[Duration] {
        &self.timeouts
    }

    pub fn is_final_attempt(&self) -> bool {
        self.attempt >= self.policy.max_attempts.max(1)
    }

    /// Record a failed attempt and decide what happens next.
    pub fn on_failure(&mut self, err: &GenerateError) -> RetryStep {
        self.timeouts.push(self.timeout);
        if !err.is_retryable() || self.is_final_attempt() {
            return RetryStep::GiveUp;
        }

        let backoff = match err {
            GenerateError::RateLimited {
                retry_after: Some(wait),
            } => (*wait).min(self.policy.max_backoff),
            _ => self.policy.backoff_after(self.attempt),
        };
        if matches!(err, GenerateError::Timeout(_)) {
            self.timeout = self.policy.grow(self.timeout);
        }
        self.attempt += 1;
        RetryStep::Retry {
            timeout: self.timeout,
            backoff,
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
