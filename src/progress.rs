//! Progress-callback trait for per-batch dispatch events.
//!
//! Inject an [`Arc<dyn DispatchProgressCallback>`] via
//! [`crate::config::DispatchConfigBuilder::progress_callback`] to receive
//! events as each batch of chunks is sent for question generation. The CLI
//! drives its progress bar from these events; library users can forward them
//! to a channel, a log, or a UI.
//!
//! # Example
//!
//! ```rust
//! use cardify::{DispatchConfig, DispatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CardCounter {
//!     cards: AtomicUsize,
//! }
//!
//! impl DispatchProgressCallback for CardCounter {
//!     fn on_batch_complete(&self, _batch: usize, _total: usize, card_count: usize) {
//!         self.cards.fetch_add(card_count, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(CardCounter { cards: AtomicUsize::new(0) });
//! let config = DispatchConfig::builder()
//!     .progress_callback(counter as Arc<dyn DispatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the dispatcher as it works through the batches.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Batch numbers are 0-indexed.
pub trait DispatchProgressCallback: Send + Sync {
    /// Called once before the first request.
    fn on_dispatch_start(&self, total_batches: usize) {
        let _ = total_batches;
    }

    /// Called just before a batch is sent.
    fn on_batch_start(&self, batch: usize, total_batches: usize) {
        let _ = (batch, total_batches);
    }

    /// Called when a batch produced cards.
    fn on_batch_complete(&self, batch: usize, total_batches: usize, card_count: usize) {
        let _ = (batch, total_batches, card_count);
    }

    /// Called when a batch failed after all retries.
    fn on_batch_error(&self, batch: usize, total_batches: usize, error: &str) {
        let _ = (batch, total_batches, error);
    }

    /// Called once after every batch has been attempted.
    fn on_dispatch_complete(&self, total_batches: usize, success_count: usize) {
        let _ = (total_batches, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DispatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DispatchConfig`].
pub type ProgressCallback = Arc<dyn DispatchProgressCallback>;
