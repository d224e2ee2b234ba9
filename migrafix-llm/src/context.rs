//! Shared generation context: generator, rate limiter, retry budget and cache.
//!
//! One context is shared by every worker in a run. Its mutable parts (cache,
//! limiter state, counters) synchronize internally.

use crate::cache::ResponseCache;
use crate::error::{GenerateError, GenerationFailure};
use crate::limiter::RateLimiter;
use crate::retry::{RetryPolicy, RetryStep};
use crate::Generator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Output of one successful generation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    pub from_cache: bool,
    /// Calls made, 0 for a cache hit.
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationCounters {
    pub calls: u64,
    pub cache_hits: u64,
    pub retries: u64,
}

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicU64,
    cache_hits: AtomicU64,
    retries: AtomicU64,
}

pub struct GenerationContext {
    generator: Arc<dyn Generator>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    cache: Option<ResponseCache>,
    counters: Counters,
}

impl std::fmt::Debug for GenerationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationContext")
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .field("cache", &self.cache.as_ref().map(ResponseCache::len))
            .finish_non_exhaustive()
    }
}

impl GenerationContext {
    pub fn new(generator: Arc<dyn Generator>, limiter: RateLimiter, retry: RetryPolicy) -> Self {
        Self {
            generator,
            limiter,
            retry,
            cache: None,
            counters: Counters::default(),
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    pub fn counters(&self) -> GenerationCounters {
        GenerationCounters {
            calls: self.counters.calls.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
        }
    }

    /// Store a response whose extraction succeeded.
    pub fn remember(&self, prompt: &str, text: &str) {
        if let Some(cache) = &self.cache {
            cache.put(prompt, text);
        }
    }

    /// Run one generation unit under the retry policy.
    ///
    /// Every attempt holds a rate-limiter permit and is bounded by the
    /// attempt's timeout, whether or not the generator honors it.
    pub async fn generate(
        &self,
        prompt: &str,
        use_cache: bool,
    ) -> Result<Generated, GenerationFailure> {
        if use_cache {
            if let Some(text) = self.cache.as_ref().and_then(|c| c.get(prompt)) {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(len = text.len(), "response served from cache");
                return Ok(Generated {
                    text,
                    from_cache: true,
                    attempts: 0,
                });
            }
        }

        let mut state = self.retry.start();
        loop {
            let timeout = state.timeout();
            let result = match self.limiter.acquire().await {
                Ok(_permit) => {
                    self.counters.calls.fetch_add(1, Ordering::Relaxed);
                    match tokio::time::timeout(timeout, self.generator.generate(prompt, timeout))
                        .await
                    {
                        Ok(r) => r,
                        Err(_) => Err(GenerateError::Timeout(timeout)),
                    }
                }
                Err(e) => Err(e),
            };

            let err = match result {
                Ok(text) => {
                    return Ok(Generated {
                        text,
                        from_cache: false,
                        attempts: state.attempt(),
                    });
                }
                Err(e) => e,
            };

            match state.on_failure(&err) {
                RetryStep::Retry {
                    timeout: next,
                    backoff,
                } => {
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        attempt = state.attempt() - 1,
                        error = %err,
                        next_timeout_secs = next.as_secs_f64(),
                        backoff_ms = backoff.as_millis() as u64,
                        "generation attempt failed; retrying"
                    );
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                }
                RetryStep::GiveUp => {
                    warn!(attempts = state.attempt(), error = %err, "generation gave up");
                    return Err(GenerationFailure {
                        attempts: state.attempt(),
                        last_error: err,
                        timeouts: state.timeouts().to_vec(),
                    });
                }
            }
        }
    }
}
