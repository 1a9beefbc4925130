//! Question generation: send one batch and collect its cards.
//!
//! The model call sits behind the [`QuestionGenerator`] trait so the retry,
//! pacing and parsing logic here can be driven by any backend. The
//! production backend is [`LlmQuestionGenerator`], a thin adapter over an
//! `edgequake_llm` provider.
//!
//! ## Retry Strategy
//!
//! [`GenerationError::Transient`] failures (429, 5xx, timeouts) are retried
//! with exponential backoff (`retry_backoff_ms * 2^(attempt-1)`); with a
//! 500 ms base and 3 retries the waits are 500 ms → 1 s → 2 s. Every attempt
//! also waits its turn at the [`RateLimiter`]. [`GenerationError::Fatal`]
//! failures stop the batch immediately. A reply that parses to no card list
//! is recorded as malformed and not retried.

use crate::config::DispatchConfig;
use crate::error::{BatchError, CardifyError};
use crate::output::BatchResult;
use crate::pipeline::batch::Batch;
use crate::pipeline::cards;
use crate::pipeline::rate::RateLimiter;
use crate::prompts::{self, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, warn};

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Everything a generator needs to answer one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub batch_index: usize,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// A successful model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Why a generation attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Worth retrying: rate limits, overloaded backends, timeouts.
    #[error("transient: {0}")]
    Transient(String),
    /// Retrying cannot help: bad credentials, invalid request.
    #[error("fatal: {0}")]
    Fatal(String),
}

/// Backend that turns a batch prompt into a reply.
pub trait QuestionGenerator: Send + Sync {
    fn generate(
        &self,
        request: &BatchRequest,
    ) -> impl Future<Output = Result<Generation, GenerationError>> + Send;
}

/// [`QuestionGenerator`] over an `edgequake_llm` provider.
pub struct LlmQuestionGenerator {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmQuestionGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &DispatchConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }

    /// Resolve the provider from `config` and wrap it.
    pub fn from_config(config: &DispatchConfig) -> Result<Self, CardifyError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }
}

impl QuestionGenerator for LlmQuestionGenerator {
    async fn generate(&self, request: &BatchRequest) -> Result<Generation, GenerationError> {
        let messages = vec![
            ChatMessage::system(request.system_prompt.as_str()),
            ChatMessage::user(request.user_prompt.as_str()),
        ];
        // Every provider failure is retried, bounded by max_retries.
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| GenerationError::Transient(e.to_string()))?;

        Ok(Generation {
            content: response.content,
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }
}

/// Build the request for `batch`.
pub fn build_request(batch: &Batch, config: &DispatchConfig) -> BatchRequest {
    BatchRequest {
        batch_index: batch.batch_index,
        system_prompt: config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        user_prompt: prompts::render_batch(batch),
    }
}

/// Send one batch, retrying transient failures.
///
/// Always returns a `BatchResult`; failures are recorded in `result.error`
/// so one bad batch doesn't abort the whole run.
pub async fn process_batch<G: QuestionGenerator>(
    generator: &G,
    limiter: &RateLimiter,
    batch: &Batch,
    config: &DispatchConfig,
) -> BatchResult {
    let start = Instant::now();
    let request = build_request(batch, config);
    let failed = |retries: u32, error: BatchError| BatchResult {
        batch_index: batch.batch_index,
        sequence_range: batch.sequence_range(),
        cards: Vec::new(),
        raw_response: String::new(),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        retries,
        error: Some(error),
    };

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Batch {}: retry {}/{} after {}ms",
                batch.batch_index, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        limiter.acquire().await;
        match generator.generate(&request).await {
            Ok(generation) => {
                debug!(
                    "Batch {}: {} input tokens, {} output tokens, {:?}",
                    batch.batch_index,
                    generation.input_tokens,
                    generation.output_tokens,
                    start.elapsed()
                );
                let (cards, error) = match cards::parse_cards(&generation.content, batch) {
                    Ok(cards) => (cards, None),
                    Err(e) => {
                        warn!("{}", e);
                        (Vec::new(), Some(e))
                    }
                };
                return BatchResult {
                    batch_index: batch.batch_index,
                    sequence_range: batch.sequence_range(),
                    cards,
                    raw_response: generation.content,
                    input_tokens: generation.input_tokens,
                    output_tokens: generation.output_tokens,
                    duration_ms: start.elapsed().as_millis() as u64,
                    retries: attempt,
                    error,
                };
            }
            Err(GenerationError::Fatal(detail)) => {
                warn!("Batch {}: rejected — {}", batch.batch_index, detail);
                return failed(
                    attempt,
                    BatchError::Rejected {
                        batch: batch.batch_index,
                        detail,
                    },
                );
            }
            Err(GenerationError::Transient(detail)) => {
                warn!(
                    "Batch {}: attempt {} failed — {}",
                    batch.batch_index,
                    attempt + 1,
                    detail
                );
                last_err = Some(detail);
            }
        }
    }

    failed(
        config.max_retries,
        BatchError::GenerationFailed {
            batch: batch.batch_index,
            retries: config.max_retries,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        },
    )
}

/// Delay before retry number `attempt` (1-based).
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    let exponent = attempt.saturating_sub(1).min(16);
    base_ms.saturating_mul(1u64 << exponent)
}

/// Build `CompletionOptions` from the dispatch config.
fn build_options(config: &DispatchConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. A pre-built provider in the config
/// 2. A provider name in the config (with the configured or default model)
/// 3. `CARDIFY_LLM_PROVIDER` + `CARDIFY_MODEL` environment variables
/// 4. OpenAI, when `OPENAI_API_KEY` is set
/// 5. Whatever `ProviderFactory::from_env` detects
pub fn resolve_provider(config: &DispatchConfig) -> Result<Arc<dyn LLMProvider>, CardifyError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("CARDIFY_LLM_PROVIDER"),
        std::env::var("CARDIFY_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|key| !key.is_empty()) {
        return create_provider("openai", model);
    }

    let (llm_provider, _) =
        ProviderFactory::from_env().map_err(|e| CardifyError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!("No LLM provider auto-detected: {}", e),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, CardifyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        CardifyError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Chunk;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed script of outcomes, one per call.
    struct Scripted {
        script: Mutex<Vec<Result<Generation, GenerationError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(mut script: Vec<Result<Generation, GenerationError>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl QuestionGenerator for Scripted {
        async fn generate(&self, _request: &BatchRequest) -> Result<Generation, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(GenerationError::Fatal("script exhausted".into())))
        }
    }

    fn ok(content: &str) -> Result<Generation, GenerationError> {
        Ok(Generation {
            content: content.into(),
            input_tokens: 12,
            output_tokens: 34,
        })
    }

    fn batch() -> Batch {
        Batch {
            batch_index: 0,
            chunks: vec![Chunk {
                sequence_index: 0,
                text: "# A\nBody".into(),
                byte_range: 0..8,
                chapter_path: vec!["A".into()],
                char_count: 8,
                forced_split: false,
                has_code: false,
                start_page: None,
                end_page: None,
            }],
            estimated_tokens: 2,
        }
    }

    fn config(max_retries: u32) -> DispatchConfig {
        DispatchConfig::builder()
            .max_retries(max_retries)
            .retry_backoff_ms(100)
            .min_request_interval_ms(0)
            .build()
            .unwrap()
    }

    const CARDS: &str = r#"[{"question": "Q", "answer": "A"}]"#;

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&DispatchConfig::default());
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 3), 2000);
        assert_eq!(backoff_ms(u64::MAX, 40), u64::MAX);
    }

    #[test]
    fn request_uses_custom_prompt() {
        let cfg = DispatchConfig::builder().system_prompt("be brief").build().unwrap();
        let req = build_request(&batch(), &cfg);
        assert_eq!(req.system_prompt, "be brief");
        assert!(req.user_prompt.contains("Excerpt 0"));
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt() {
        let generator = Scripted::new(vec![ok(CARDS)]);
        let limiter = RateLimiter::new(Duration::ZERO);
        let result = process_batch(&generator, &limiter, &batch(), &config(3)).await;
        assert!(result.error.is_none());
        assert_eq!(result.cards.len(), 1);
        assert_eq!(result.retries, 0);
        assert_eq!(result.input_tokens, 12);
        assert_eq!(result.sequence_range, 0..1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_retried_with_backoff() {
        let generator = Scripted::new(vec![
            Err(GenerationError::Transient("503".into())),
            Err(GenerationError::Transient("429".into())),
            ok(CARDS),
        ]);
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        let result = process_batch(&generator, &limiter, &batch(), &config(3)).await;
        assert!(result.error.is_none());
        assert_eq!(result.retries, 2);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
        // 100ms + 200ms of backoff.
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_exhausted() {
        let generator = Scripted::new(vec![
            Err(GenerationError::Transient("a".into())),
            Err(GenerationError::Transient("b".into())),
            Err(GenerationError::Transient("c".into())),
        ]);
        let limiter = RateLimiter::new(Duration::ZERO);
        let result = process_batch(&generator, &limiter, &batch(), &config(2)).await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            result.error,
            Some(BatchError::GenerationFailed {
                batch: 0,
                retries: 2,
                detail: "c".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_not_retried() {
        let generator = Scripted::new(vec![Err(GenerationError::Fatal("401".into())), ok(CARDS)]);
        let limiter = RateLimiter::new(Duration::ZERO);
        let result = process_batch(&generator, &limiter, &batch(), &config(3)).await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result.error, Some(BatchError::Rejected { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_reply_kept_for_inspection() {
        let generator = Scripted::new(vec![ok("no cards today")]);
        let limiter = RateLimiter::new(Duration::ZERO);
        let result = process_batch(&generator, &limiter, &batch(), &config(3)).await;
        assert!(matches!(result.error, Some(BatchError::MalformedResponse { .. })));
        assert_eq!(result.raw_response, "no cards today");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }
}
