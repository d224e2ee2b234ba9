use async_trait::async_trait;
use migrafix_llm::{
    GenerateError, GenerationContext, Generator, RateLimiter, ResponseCache, RetryPolicy,
};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays scripted results and records the timeout of every call.
struct Scripted {
    script: Mutex<VecDeque<Result<String, GenerateError>>>,
    seen: Mutex<Vec<Duration>>,
}

impl Scripted {
    fn new(script: Vec<Result<String, GenerateError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Duration> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for Scripted {
    async fn generate(&self, _prompt: &str, timeout: Duration) -> Result<String, GenerateError> {
        self.seen.lock().unwrap().push(timeout);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerateError::Permanent("script exhausted".into())))
    }
}

/// Never answers; only the context's timeout ends the call.
struct Hangs;

#[async_trait]
impl Generator for Hangs {
    async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, GenerateError> {
        std::future::pending().await
    }
}

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_timeout: Duration::from_secs(10),
        timeout_multiplier: 1.5,
        max_timeout: Duration::from_secs(3600),
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    }
}

fn context(g: Arc<dyn Generator>, max_attempts: u32) -> GenerationContext {
    GenerationContext::new(g, RateLimiter::new(2, Duration::ZERO), policy(max_attempts))
}

#[tokio::test]
async fn retries_after_timeout_with_larger_timeout() {
    let g = Scripted::new(vec![
        Err(GenerateError::Timeout(Duration::from_secs(10))),
        Ok("{}".into()),
    ]);
    let ctx = context(g.clone(), 3);
    let out = ctx.generate("p", true).await.unwrap();

    assert_eq!(out.text, "{}");
    assert_eq!(out.attempts, 2);
    assert_eq!(g.calls(), vec![Duration::from_secs(10), Duration::from_secs(15)]);
    assert_eq!(ctx.counters().retries, 1);
}

#[tokio::test(start_paused = true)]
async fn five_timeouts_give_up_with_growing_timeouts() {
    let ctx = context(Arc::new(Hangs), 5);
    let failure = ctx.generate("p", false).await.unwrap_err();

    assert_eq!(failure.attempts, 5);
    assert!(matches!(failure.last_error, GenerateError::Timeout(_)));
    assert_eq!(failure.timeouts.len(), 5);
    assert!(failure.timeouts.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(ctx.counters().calls, 5);
}

#[tokio::test]
async fn permanent_error_is_not_retried() {
    let g = Scripted::new(vec![Err(GenerateError::Permanent("HTTP 401".into()))]);
    let ctx = context(g.clone(), 3);
    let failure = ctx.generate("p", false).await.unwrap_err();
    assert_eq!(failure.attempts, 1);
    assert_eq!(g.calls().len(), 1);
}

#[tokio::test]
async fn cache_hit_skips_the_generator() {
    let g = Scripted::new(vec![]);
    let ctx = context(g.clone(), 1).with_cache(ResponseCache::in_memory());
    ctx.remember("p", "cached");

    let hit = ctx.generate("p", true).await.unwrap();
    assert!(hit.from_cache);
    assert_eq!(hit.attempts, 0);
    assert!(g.calls().is_empty());

    // Bypassing the cache goes to the generator.
    assert!(ctx.generate("p", false).await.is_err());
    assert_eq!(g.calls().len(), 1);
    assert_eq!(ctx.counters().cache_hits, 1);
}

#[tokio::test]
async fn rate_limit_is_retried() {
    let g = Scripted::new(vec![
        Err(GenerateError::RateLimited { retry_after: None }),
        Err(GenerateError::Transport("reset".into())),
        Ok("done".into()),
    ]);
    let ctx = context(g.clone(), 3);
    let out = ctx.generate("p", false).await.unwrap();
    assert_eq!(out.text, "done");
    // Only timeouts grow the timeout.
    assert_eq!(g.calls(), vec![Duration::from_secs(10); 3]);
}
