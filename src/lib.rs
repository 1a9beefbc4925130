//! # cardify
//!
//! Split book-length markdown into heading-aware chunks and turn them into
//! study cards with an LLM.
//!
//! ## Why this crate?
//!
//! Sending a whole book to a model either blows the context window or loses
//! track of where each answer came from. This crate cuts the markdown at
//! heading boundaries, keeps every chunk under a character limit, and tags
//! each one with its chapter path. The chunks partition the document
//! exactly, so nothing is dropped or duplicated before generation.
//!
//! ## Pipeline Overview
//!
//! ```text
//! markdown
//!  │
//!  ├─ 1. Input     resolve the .md file (or the sibling of a converted PDF)
//!  ├─ 2. Scan      headings, fenced code, page markers
//!  ├─ 3. Sections  cut at headings, build chapter paths
//!  ├─ 4. Bound     split oversized sections, merge short ones
//!  ├─ 5. Batch     group chunks under count/token limits
//!  ├─ 6. LLM       rate-limited calls with retry/backoff
//!  └─ 7. Cards     parse JSON replies into question/answer cards
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardify::{chunk_file, generate_cards_with_llm, ChunkerConfig, DispatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let chunking = chunk_file("book.md", &ChunkerConfig::default())?;
//!     eprintln!("{} chunks", chunking.stats.chunk_count);
//!
//!     // Provider auto-detected from CARDIFY_LLM_PROVIDER / OPENAI_API_KEY / ...
//!     let output = generate_cards_with_llm(&chunking.chunks, &DispatchConfig::default()).await?;
//!     for card in output.cards() {
//!         println!("Q: {}\nA: {}\n", card.question, card.answer);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cardify` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! cardify = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chunker;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chunker::{chunk_document, chunk_file, chunk_markdown};
pub use config::{ChunkerConfig, ChunkerConfigBuilder, DispatchConfig, DispatchConfigBuilder};
pub use dispatch::{generate_cards, generate_cards_with_llm};
pub use document::{Document, HeadingEvent, PageMarker};
pub use error::{BatchError, CardifyError};
pub use output::{
    to_jsonl, write_jsonl, BatchResult, Chunk, ChunkingOutput, ChunkingStats, DispatchOutput,
    DispatchStats, StudyCard,
};
pub use pipeline::llm::{
    BatchRequest, Generation, GenerationError, LlmQuestionGenerator, QuestionGenerator,
};
pub use progress::{DispatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{generate_cards_stream, BatchStream};
