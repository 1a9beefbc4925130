//! Configuration types for chunking and question generation.
//!
//! Chunking is controlled by [`ChunkerConfig`], card generation by
//! [`DispatchConfig`]. Both are built via builders whose `build()` validates
//! the settings, so an invalid size bound surfaces as
//! [`CardifyError::Configuration`] before any work starts.

use crate::error::CardifyError;
use crate::progress::DispatchProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Deepest ATX heading level markdown can express.
pub const MAX_HEADING_LEVEL: u8 = 6;

// ── Chunker ──────────────────────────────────────────────────────────────

/// Size bounds and structure settings for the chunker.
///
/// # Example
/// ```rust
/// use cardify::ChunkerConfig;
///
/// let config = ChunkerConfig::builder()
///     .max_chunk_chars(2_000)
///     .min_chunk_chars(200)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_chunk_chars, 2_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Upper bound on a chunk's character count. Must be > 0. Default: 4000.
    ///
    /// A single token longer than the limit is cut at exactly this many
    /// characters and the pieces are flagged `forced_split`.
    pub max_chunk_chars: usize,

    /// Sections shorter than this are merged with following sections that
    /// share the same chapter path. Default: 0 (never merge).
    pub min_chunk_chars: usize,

    /// Deepest heading level that opens a new section (1–6). Default: 6.
    ///
    /// Deeper headings stay in the body text of their parent section.
    pub heading_depth: u8,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 4000,
            min_chunk_chars: 0,
            heading_depth: MAX_HEADING_LEVEL,
        }
    }
}

impl ChunkerConfig {
    /// Create a new builder for `ChunkerConfig`.
    pub fn builder() -> ChunkerConfigBuilder {
        ChunkerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check the size bounds.
    ///
    /// Fields are public, so the chunker re-validates every config it is
    /// handed rather than trusting that it came through the builder.
    pub fn validate(&self) -> Result<(), CardifyError> {
        if self.max_chunk_chars == 0 {
            return Err(CardifyError::Configuration(
                "max_chunk_chars must be > 0".into(),
            ));
        }
        if self.min_chunk_chars > self.max_chunk_chars {
            return Err(CardifyError::Configuration(format!(
                "min_chunk_chars ({}) must not exceed max_chunk_chars ({})",
                self.min_chunk_chars, self.max_chunk_chars
            )));
        }
        if self.heading_depth == 0 || self.heading_depth > MAX_HEADING_LEVEL {
            return Err(CardifyError::Configuration(format!(
                "heading_depth must be 1–{MAX_HEADING_LEVEL}, got {}",
                self.heading_depth
            )));
        }
        Ok(())
    }
}

/// Builder for [`ChunkerConfig`].
#[derive(Debug)]
pub struct ChunkerConfigBuilder {
    config: ChunkerConfig,
}

impl ChunkerConfigBuilder {
    pub fn max_chunk_chars(mut self, n: usize) -> Self {
        self.config.max_chunk_chars = n;
        self
    }

    pub fn min_chunk_chars(mut self, n: usize) -> Self {
        self.config.min_chunk_chars = n;
        self
    }

    pub fn heading_depth(mut self, depth: u8) -> Self {
        self.config.heading_depth = depth;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ChunkerConfig, CardifyError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Dispatcher ───────────────────────────────────────────────────────────

/// Configuration for batching chunks and generating study cards.
///
/// Built via [`DispatchConfig::builder()`] or using
/// [`DispatchConfig::default()`].
#[derive(Clone)]
pub struct DispatchConfig {
    /// Maximum number of chunks sent in one request. Default: 4.
    pub max_batch_chunks: usize,

    /// Estimated input-token budget per request. Default: `Some(6000)`.
    ///
    /// Tokens are estimated at four characters each. A single chunk larger
    /// than the budget is still sent, alone in its own batch.
    pub max_batch_tokens: Option<usize>,

    /// Minimum time between the start of two requests, retries included.
    /// Default: 1000 ms.
    pub min_request_interval_ms: u64,

    /// Maximum retry attempts on a transient failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt.
    /// Default: 500.
    pub retry_backoff_ms: u64,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens the model may generate per batch. Default: 2048.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Receives per-batch progress events.
    pub progress_callback: Option<Arc<dyn DispatchProgressCallback>>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_batch_chunks: 4,
            max_batch_tokens: Some(6000),
            min_request_interval_ms: 1000,
            max_retries: 3,
            retry_backoff_ms: 500,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 2048,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DispatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchConfig")
            .field("max_batch_chunks", &self.max_batch_chunks)
            .field("max_batch_tokens", &self.max_batch_tokens)
            .field("min_request_interval_ms", &self.min_request_interval_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DispatchProgressCallback>"),
            )
            .finish()
    }
}

impl DispatchConfig {
    /// Create a new builder for `DispatchConfig`.
    pub fn builder() -> DispatchConfigBuilder {
        DispatchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DispatchConfig`].
#[derive(Debug)]
pub struct DispatchConfigBuilder {
    config: DispatchConfig,
}

impl DispatchConfigBuilder {
    pub fn max_batch_chunks(mut self, n: usize) -> Self {
        self.config.max_batch_chunks = n;
        self
    }

    pub fn max_batch_tokens(mut self, budget: Option<usize>) -> Self {
        self.config.max_batch_tokens = budget;
        self
    }

    pub fn min_request_interval_ms(mut self, ms: u64) -> Self {
        self.config.min_request_interval_ms = ms;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn DispatchProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DispatchConfig, CardifyError> {
        let c = &self.config;
        if c.max_batch_chunks == 0 {
            return Err(CardifyError::Configuration(
                "max_batch_chunks must be ≥ 1".into(),
            ));
        }
        if c.max_batch_tokens == Some(0) {
            return Err(CardifyError::Configuration(
                "max_batch_tokens must be ≥ 1 when set".into(),
            ));
        }
        Ok(self.config)
    }
}
