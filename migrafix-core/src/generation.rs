//! Generation steps: one prompt in, one extracted record out.

use migrafix_extract::{Extraction, RecordKind, extract};
use migrafix_llm::{GenerationContext, GenerationFailure};
use migrafix_types::change::ProposedChange;
use migrafix_types::report::StageNote;
use tracing::{debug, warn};

/// Extraction plus how many generation attempts it took.
#[derive(Debug, Clone)]
pub struct Generation {
    pub extraction: Extraction,
    pub attempts: u32,
}

impl Generation {
    pub fn note(&self) -> StageNote {
        StageNote {
            used_fallback: self.extraction.used_fallback(),
            note: self.extraction.fallback_reason().map(str::to_string),
        }
    }
}

/// Generate a `kind` record for `prompt`.
///
/// Output that only extracts as a fallback is asked for again, up to
/// `parse_retries` times, bypassing the cache. Only responses that extract
/// cleanly are remembered.
pub async fn generate_record(
    ctx: &GenerationContext,
    prompt: &str,
    kind: RecordKind,
    parse_retries: u32,
) -> Result<Generation, GenerationFailure> {
    let mut attempts = 0;
    let mut retry = 0;
    loop {
        let generated = ctx.generate(prompt, retry == 0).await?;
        attempts += generated.attempts;
        let extraction = extract(&generated.text, kind);

        if !extraction.used_fallback() {
            if !generated.from_cache {
                ctx.remember(prompt, &generated.text);
            }
            if extraction.repaired {
                debug!(kind = kind.as_str(), "model output needed repair");
            }
            return Ok(Generation {
                extraction,
                attempts,
            });
        }

        warn!(
            kind = kind.as_str(),
            reason = extraction.fallback_reason().unwrap_or_default(),
            retry,
            "model output unusable"
        );
        if retry >= parse_retries {
            return Ok(Generation {
                extraction,
                attempts,
            });
        }
        retry += 1;
    }
}

/// Result of change generation for one file.
#[derive(Debug)]
pub enum FileGeneration {
    Proposed(Vec<ProposedChange>),
    /// Output never extracted; no changes are proposed for the file.
    Degraded(String),
    /// Retries exhausted; the file is excluded from the change set.
    Failed(GenerationFailure),
}

pub async fn generate_file_changes(
    ctx: &GenerationContext,
    path: &str,
    prompt: &str,
    parse_retries: u32,
) -> FileGeneration {
    match generate_record(ctx, prompt, RecordKind::Changes, parse_retries).await {
        Ok(g) if g.extraction.used_fallback() => FileGeneration::Degraded(
            g.extraction
                .fallback_reason()
                .unwrap_or("unusable model output")
                .to_string(),
        ),
        Ok(g) => {
            let mut changes = g.extraction.into_changes();
            for c in &mut changes {
                c.file = path.to_string();
            }
            debug!(path, proposals = changes.len(), "changes generated");
            FileGeneration::Proposed(changes)
        }
        Err(failure) => {
            warn!(path, attempts = failure.attempts, error = %failure, "change generation failed");
            FileGeneration::Failed(failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use migrafix_llm::{GenerateError, Generator, RateLimiter, ResponseCache, RetryPolicy};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct Replies(Mutex<Vec<&'static str>>);

    #[async_trait]
    impl Generator for Replies {
        async fn generate(&self, _prompt: &str, _t: Duration) -> Result<String, GenerateError> {
            let mut r = self.0.lock().unwrap();
            if r.is_empty() {
                return Err(GenerateError::Permanent("script exhausted".into()));
            }
            Ok(r.remove(0).to_string())
        }
    }

    fn ctx(replies: Vec<&'static str>) -> GenerationContext {
        GenerationContext::new(
            Arc::new(Replies(Mutex::new(replies))),
            RateLimiter::unlimited(),
            RetryPolicy::default(),
        )
        .with_cache(ResponseCache::in_memory())
    }

    #[tokio::test]
    async fn unusable_output_is_asked_again_once() {
        let c = ctx(vec!["no json here", r#"{"javax_to_jakarta": []}"#]);
        let g = generate_record(&c, "p", RecordKind::Changes, 1).await.unwrap();
        assert!(!g.extraction.used_fallback());
        assert_eq!(g.attempts, 2);
        assert_eq!(c.cache().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fallback_is_kept_after_parse_retries() {
        let c = ctx(vec!["prose", "more prose"]);
        let g = generate_record(&c, "p", RecordKind::Analysis, 1).await.unwrap();
        assert!(g.note().used_fallback);
        assert!(c.cache().unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_field_is_forced_to_generated_file() {
        let c = ctx(vec![
            r#"{"javax_to_jakarta": [{"file": "Other.java", "from": "javax.a.B", "to": "jakarta.a.B"}]}"#,
        ]);
        match generate_file_changes(&c, "src/A.java", "p", 0).await {
            FileGeneration::Proposed(changes) => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].file, "src/A.java");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn permanent_error_marks_file_failed() {
        let c = ctx(vec![]);
        assert!(matches!(
            generate_file_changes(&c, "A.java", "p", 0).await,
            FileGeneration::Failed(_)
        ));
    }
}
