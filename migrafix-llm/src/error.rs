use std::time::Duration;
use thiserror::Error;

/// Failure of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("generation timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("rate limited by generation service")]
    RateLimited { retry_after: Option<Duration> },

    #[error("transport error: {0}")]
    Transport(String),

    /// Bad request, authentication, or a response that can never succeed.
    #[error("permanent error: {0}")]
    Permanent(String),
}

impl GenerateError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GenerateError::Permanent(_))
    }
}

/// A generation unit that exhausted its retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("generation failed after {attempts} attempt(s): {last_error}")]
pub struct GenerationFailure {
    pub attempts: u32,
    pub last_error: GenerateError,
    /// Timeout used for each attempt, in order.
    pub timeouts: Vec<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_permanent_errors_are_final() {
        assert!(GenerateError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(GenerateError::RateLimited { retry_after: None }.is_retryable());
        assert!(GenerateError::Transport("reset".into()).is_retryable());
        assert!(!GenerateError::Permanent("HTTP 401".into()).is_retryable());
    }

    #[test]
    fn failure_message_names_attempts() {
        let f = GenerationFailure {
            attempts: 3,
            last_error: GenerateError::Timeout(Duration::from_millis(1500)),
            timeouts: vec![],
        };
        assert_eq!(
            f.to_string(),
            "generation failed after 3 attempt(s): generation timed out after 1.5s"
        );
    }
}
