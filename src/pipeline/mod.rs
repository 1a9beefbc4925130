//! Pipeline stages for markdown chunking and card generation.
//!
//! Each submodule implements one step. The chunking stages are pure and
//! synchronous; only [`llm`] and [`rate`] touch the network or the clock.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ scan ──▶ sections ──▶ split ──▶ pages
//! (path)   (headings, (chapter    (bound,    (page
//!           fences)    paths)      merge)     ranges)
//!
//! chunks ──▶ batch ──▶ rate ──▶ llm ──▶ cards
//!           (plan)    (pace)   (retry)  (parse)
//! ```
//!
//! 1. [`input`]    resolve the markdown file to read, including the sibling of a PDF
//! 2. [`scan`]     find ATX headings, fenced code spans and page markers
//! 3. [`sections`] cut the text at heading offsets and attach a chapter path
//! 4. [`split`]    bound oversized sections and merge short ones
//! 5. [`pages`]    map byte ranges onto converter page markers
//! 6. [`batch`]    group chunks into requests under count and token limits
//! 7. [`rate`]     space request starts
//! 8. [`llm`]      drive the provider call with retry/backoff
//! 9. [`cards`]    parse the JSON reply into study cards

pub mod batch;
pub mod cards;
pub mod input;
pub mod llm;
pub mod pages;
pub mod rate;
pub mod scan;
pub mod sections;
pub mod split;
