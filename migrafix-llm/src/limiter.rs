use crate::error::GenerateError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Gates generation calls: at most `max_in_flight` at once, and consecutive
/// starts at least `min_interval` apart. Waiting callers are suspended, not
/// spinning.
#[derive(Debug)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

/// Held for the duration of one call.
#[derive(Debug)]
pub struct RatePermit {
    _permit: OwnedSemaphorePermit,
}

impl RateLimiter {
    pub fn new(max_in_flight: usize, min_interval: Duration) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(Semaphore::MAX_PERMITS, Duration::ZERO)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }

    pub async fn acquire(&self) -> Result<RatePermit, GenerateError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GenerateError::Transport("rate limiter closed".to_string()))?;

        if !self.min_interval.is_zero() {
            let mut last = self.last_start.lock().await;
            if let Some(prev) = *last {
                tokio::time::sleep_until(prev + self.min_interval).await;
            }
            *last = Some(Instant::now());
        }

        Ok(RatePermit { _permit: permit })
    }
}
