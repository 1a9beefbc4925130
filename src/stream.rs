//! Streaming card generation: emit batches as they complete.
//!
//! Unlike the eager [`crate::dispatch::generate_cards`], which returns after
//! every batch has been attempted, [`generate_cards_stream`] yields one item
//! per batch as soon as it finishes. Batches are still sent one at a time,
//! so items arrive in sequence order. Nothing is sent until the stream is
//! polled, and dropping it stops further requests.

use crate::config::DispatchConfig;
use crate::error::BatchError;
use crate::output::{BatchResult, Chunk};
use crate::pipeline::batch::plan_batches;
use crate::pipeline::llm::{process_batch, QuestionGenerator};
use crate::pipeline::rate::RateLimiter;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of batch results.
pub type BatchStream = Pin<Box<dyn Stream<Item = Result<BatchResult, BatchError>> + Send>>;

/// Generate study cards, streaming one result per batch.
///
/// # Example
/// ```rust,no_run
/// use cardify::{chunk_markdown, generate_cards_stream, ChunkerConfig, DispatchConfig,
///     LlmQuestionGenerator};
/// use futures::StreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let chunks = chunk_markdown("# Intro\nSome text.", &ChunkerConfig::default())?.chunks;
/// let config = DispatchConfig::default();
/// let generator = Arc::new(LlmQuestionGenerator::from_config(&config)?);
/// let mut stream = generate_cards_stream(&chunks, generator, &config);
/// while let Some(batch) = stream.next().await {
///     match batch {
///         Ok(b) => println!("batch {}: {} cards", b.batch_index, b.cards.len()),
///         Err(e) => eprintln!("Error: {e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn generate_cards_stream<G>(chunks: &[Chunk], generator: Arc<G>, config: &DispatchConfig) -> BatchStream
where
    G: QuestionGenerator + 'static,
{
    let batches = plan_batches(chunks, config.max_batch_chunks, config.max_batch_tokens);
    info!("Streaming {} chunks in {} batches", chunks.len(), batches.len());

    let limiter = Arc::new(RateLimiter::new(Duration::from_millis(
        config.min_request_interval_ms,
    )));
    let config = config.clone();

    let s = stream::iter(batches).then(move |batch| {
        let generator = Arc::clone(&generator);
        let limiter = Arc::clone(&limiter);
        let cfg = config.clone();
        async move {
            let mut result = process_batch(generator.as_ref(), &limiter, &batch, &cfg).await;
            match result.error.take() {
                None => Ok(result),
                Some(err) => Err(err),
            }
        }
    });

    Box::pin(s)
}
