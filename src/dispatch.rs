//! Eager card generation: send every batch, then return.
//!
//! Batches go out one at a time in sequence order, paced by the rate
//! limiter. A failed batch is recorded and the run moves on; only a run in
//! which every batch failed is an error. Use
//! [`crate::stream::generate_cards_stream`] to receive batches as they
//! finish.

use crate::config::DispatchConfig;
use crate::error::CardifyError;
use crate::output::{Chunk, DispatchOutput, DispatchStats};
use crate::pipeline::batch::plan_batches;
use crate::pipeline::llm::{process_batch, LlmQuestionGenerator, QuestionGenerator};
use crate::pipeline::rate::RateLimiter;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Generate study cards for `chunks` with the given backend.
///
/// # Errors
/// [`CardifyError::AllBatchesFailed`] when there was at least one batch and
/// none succeeded. Partial failures are reported per batch in
/// [`crate::output::BatchResult::error`].
pub async fn generate_cards<G: QuestionGenerator>(
    chunks: &[Chunk],
    generator: &G,
    config: &DispatchConfig,
) -> Result<DispatchOutput, CardifyError> {
    let total_start = Instant::now();
    let batches = plan_batches(chunks, config.max_batch_chunks, config.max_batch_tokens);
    let total = batches.len();
    info!("Dispatching {} chunks in {} batches", chunks.len(), total);

    let limiter = RateLimiter::new(Duration::from_millis(config.min_request_interval_ms));
    if let Some(ref cb) = config.progress_callback {
        cb.on_dispatch_start(total);
    }

    let mut results = Vec::with_capacity(total);
    for batch in &batches {
        if let Some(ref cb) = config.progress_callback {
            cb.on_batch_start(batch.batch_index, total);
        }
        let result = process_batch(generator, &limiter, batch, config).await;
        if let Some(ref cb) = config.progress_callback {
            match result.error {
                None => cb.on_batch_complete(batch.batch_index, total, result.cards.len()),
                Some(ref e) => cb.on_batch_error(batch.batch_index, total, &e.to_string()),
            }
        }
        results.push(result);
    }

    let succeeded = results.iter().filter(|r| r.error.is_none()).count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_dispatch_complete(total, succeeded);
    }

    if total > 0 && succeeded == 0 {
        let first_error = results
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        let retries = results.iter().map(|r| r.retries).max().unwrap_or(0);
        return Err(CardifyError::AllBatchesFailed {
            total,
            retries,
            first_error,
        });
    }

    let stats = DispatchStats {
        total_batches: total,
        succeeded_batches: succeeded,
        failed_batches: total - succeeded,
        total_cards: results.iter().map(|r| r.cards.len()).sum(),
        total_input_tokens: results.iter().map(|r| r.input_tokens as u64).sum(),
        total_output_tokens: results.iter().map(|r| r.output_tokens as u64).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Dispatch complete: {}/{} batches, {} cards, {}ms",
        succeeded, total, stats.total_cards, stats.total_duration_ms
    );

    Ok(DispatchOutput {
        batches: results,
        stats,
    })
}

/// Generate study cards through the LLM provider resolved from `config`.
pub async fn generate_cards_with_llm(
    chunks: &[Chunk],
    config: &DispatchConfig,
) -> Result<DispatchOutput, CardifyError> {
    let generator = LlmQuestionGenerator::from_config(config)?;
    generate_cards(chunks, &generator, config).await
}
