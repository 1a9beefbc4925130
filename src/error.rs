//! Error types for the cardify library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CardifyError`] — **Fatal**: the run cannot proceed at all (invalid
//!   size bounds, empty document, missing markdown, provider not configured).
//!   Returned as `Err(CardifyError)` from the top-level `chunk_*` and
//!   `generate_cards*` functions.
//!
//! * [`BatchError`] — **Non-fatal**: a single batch of chunks failed to
//!   produce cards (transient API error, unparsable reply) but the other
//!   batches are fine. Stored inside [`crate::output::BatchResult`] so callers
//!   can keep the cards that did come back.
//!
//! The chunker only ever returns [`CardifyError`]: it either produces the
//! full partition or fails before any chunk is handed out.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the cardify library.
#[derive(Debug, Error)]
pub enum CardifyError {
    // ── Chunking errors ───────────────────────────────────────────────────
    /// Size bounds or other settings are invalid. Never retried.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The document text is empty or contains only whitespace.
    ///
    /// Recoverable: callers may skip the document and carry on.
    #[error("Document is empty or contains only whitespace")]
    EmptyDocument,

    /// An explicitly supplied heading event does not fit the document text.
    #[error("Heading '{title}' at offset {offset} is invalid: {detail}")]
    InvalidHeading {
        title: String,
        offset: usize,
        detail: String,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// No markdown file was found for the given input.
    #[error("No markdown file found for '{path}'\nExpected a sibling .md or .markdown file, or pass --markdown.")]
    MarkdownNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The markdown file exists but could not be read as UTF-8 text.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Question generation errors ────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every batch failed; no cards were produced. `retries` is the most
    /// any single batch was retried.
    #[error("All {total} batches failed (at most {retries} retries per batch).\nFirst error: {first_error}")]
    AllBatchesFailed {
        total: usize,
        retries: u32,
        first_error: String,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single batch.
///
/// Stored alongside [`crate::output::BatchResult`] when a batch fails.
/// The run continues unless ALL batches fail.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum BatchError {
    /// The generator kept failing with transient errors until retries ran out.
    #[error("Batch {batch}: generation failed after {retries} retries: {detail}")]
    GenerationFailed {
        batch: usize,
        retries: u32,
        detail: String,
    },

    /// The generator reported an error that retrying cannot fix.
    #[error("Batch {batch}: request rejected: {detail}")]
    Rejected { batch: usize, detail: String },

    /// The reply did not contain a readable list of cards.
    #[error("Batch {batch}: malformed response: {detail}")]
    MalformedResponse { batch: usize, detail: String },
}

impl BatchError {
    /// Index of the batch this error belongs to.
    pub fn batch(&self) -> usize {
        match self {
            BatchError::GenerationFailed { batch, .. }
            | BatchError::Rejected { batch, .. }
            | BatchError::MalformedResponse { batch, .. } => *batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_display() {
        let e = CardifyError::Configuration("max_chunk_chars must be > 0".into());
        assert!(e.to_string().contains("max_chunk_chars"));
    }

    #[test]
    fn all_batches_failed_display() {
        let e = CardifyError::AllBatchesFailed {
            total: 4,
            retries: 3,
            first_error: "503 overloaded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 4 batches"), "got: {msg}");
        assert!(msg.contains("at most 3 retries"), "got: {msg}");
        assert!(msg.contains("503 overloaded"));
    }

    #[test]
    fn markdown_not_found_mentions_flag() {
        let e = CardifyError::MarkdownNotFound {
            path: PathBuf::from("book.pdf"),
        };
        assert!(e.to_string().contains("--markdown"));
    }

    #[test]
    fn batch_error_reports_its_batch() {
        let e = BatchError::MalformedResponse {
            batch: 7,
            detail: "no JSON array".into(),
        };
        assert_eq!(e.batch(), 7);
        assert!(e.to_string().contains("Batch 7"));
    }
}
