//! Generation-service plumbing for migrafix.
//!
//! - [`Generator`]: the port a generation service implements.
//! - [`RetryPolicy`]: bounded attempts with growing timeouts and backoff.
//! - [`RateLimiter`]: caps in-flight calls and spaces their starts.
//! - [`ResponseCache`]: prompt-hash keyed cache, optionally persisted.
//! - [`GenerationContext`]: the above bundled and shared across workers.
//! - [`HttpGenerator`]: OpenAI and Anthropic HTTP clients.

mod cache;
mod context;
mod error;
mod http;
mod limiter;
mod retry;

pub use cache::{ResponseCache, cache_key};
pub use context::{Generated, GenerationContext, GenerationCounters};
pub use error::{GenerateError, GenerationFailure};
pub use http::{HttpConfig, HttpGenerator, Provider, status_error};
pub use limiter::{RatePermit, RateLimiter};
pub use retry::{RetryPolicy, RetryState, RetryStep};

use async_trait::async_trait;
use std::time::Duration;

/// A text generation service. Implementations make one attempt per call;
/// retry and backoff belong to the caller.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerateError>;
}
