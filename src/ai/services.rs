use tracing::{debug, warn};

use super::{ResponseCache, TextGenerator};
use crate::error::GenerationError;

/// Calls the generator until it returns something other than the previous response
/// for `cache_key`, making at most `1 + max_retries` attempts without backoff.
///
/// When every attempt repeats the cached text, the last repeat is still returned.
/// Errors only surface once all attempts have failed.
pub async fn generate_distinct(
    generator: &dyn TextGenerator,
    cache: &ResponseCache,
    cache_key: &str,
    full_prompt: &str,
    max_retries: u32,
) -> Result<String, GenerationError> {
    let attempts = max_retries + 1;
    let previous = cache.last(cache_key);
    let mut last_error: Option<GenerationError> = None;
    let mut repeated: Option<String> = None;

    for attempt in 1..=attempts {
        match generator.generate(full_prompt).await {
            Ok(text) => {
                if previous.as_deref() == Some(text.as_str()) && attempt < attempts {
                    debug!(attempt, "duplicate response, retrying");
                    repeated = Some(text);
                    continue;
                }
                cache.record(cache_key, &text);
                return Ok(text);
            }
            Err(e) => {
                warn!(attempt, error = %e, "generation attempt failed");
                last_error = Some(e);
            }
        }
    }

    if let Some(text) = repeated {
        cache.record(cache_key, &text);
        return Ok(text);
    }
    Err(GenerationError::Exhausted {
        attempts,
        last: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ScriptedGenerator;

    #[tokio::test]
    async fn retries_once_on_verbatim_repeat() {
        let gen = ScriptedGenerator::new("fallback");
        gen.push_reply("same").push_reply("fresh");
        let cache = ResponseCache::new(8);
        cache.record("tofu", "same");

        let out = generate_distinct(&gen, &cache, "tofu", "prompt", 2).await.unwrap();
        assert_eq!(out, "fresh");
        assert_eq!(gen.prompts().len(), 2);
        assert_eq!(cache.last("tofu").as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn accepts_repeat_on_final_attempt() {
        let gen = ScriptedGenerator::new("same");
        let cache = ResponseCache::new(8);
        cache.record("tofu", "same");

        let out = generate_distinct(&gen, &cache, "tofu", "prompt", 2).await.unwrap();
        assert_eq!(out, "same");
        assert_eq!(gen.prompts().len(), 3);
    }

    #[tokio::test]
    async fn recovers_from_transient_errors() {
        let gen = ScriptedGenerator::new("ok");
        gen.push_error("timeout").push_error("timeout");
        let cache = ResponseCache::new(8);

        let out = generate_distinct(&gen, &cache, "k", "prompt", 2).await.unwrap();
        assert_eq!(out, "ok");
    }

    #[tokio::test]
    async fn gives_up_after_bounded_attempts() {
        let gen = ScriptedGenerator::new("never reached");
        gen.push_error("a").push_error("b").push_error("c").push_error("d");
        let cache = ResponseCache::new(8);

        let err = generate_distinct(&gen, &cache, "k", "prompt", 2).await.unwrap_err();
        match err {
            GenerationError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.contains('c'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(gen.prompts().len(), 3);
        assert!(cache.is_empty());
    }
}
