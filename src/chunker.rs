//! Chunking entry points.
//!
//! [`chunk_document`] is the pure core: one synchronous pass from a
//! [`Document`] and a [`ChunkerConfig`] to a fully materialised
//! [`ChunkingOutput`]. It holds no shared state, so independent documents can
//! be chunked on as many threads as you like. [`chunk_markdown`] and
//! [`chunk_file`] are conveniences that build the document first.
//!
//! ```text
//! Document ──▶ sections ──▶ bound + merge ──▶ chunks
//!              (heading     (size limit,      (sequence index,
//!               stack)       min merge)        pages, code flag)
//! ```

use crate::config::ChunkerConfig;
use crate::document::Document;
use crate::error::CardifyError;
use crate::output::{Chunk, ChunkingOutput, ChunkingStats};
use crate::pipeline::pages::PageTracker;
use crate::pipeline::{input, sections, split};
use std::path::Path;
use tracing::{debug, info};

/// Partition a document into size-bounded, heading-aligned chunks.
///
/// Concatenating the chunk texts in order gives back the document text
/// exactly; no markers are injected into chunk text, the structural location
/// lives in [`Chunk::chapter_path`] only.
///
/// # Errors
/// - [`CardifyError::Configuration`] for invalid size bounds
/// - [`CardifyError::EmptyDocument`] for empty or whitespace-only text
///
/// Nothing is returned on error; the partition is all or nothing.
///
/// # Example
/// ```rust
/// use cardify::{chunk_document, ChunkerConfig, Document};
///
/// let doc = Document::from_markdown("# A\nintro\n## B\nbody\n## C\nmore\n");
/// let config = ChunkerConfig::builder().max_chunk_chars(100).build().unwrap();
/// let output = chunk_document(&doc, &config).unwrap();
/// assert_eq!(output.chunks[2].chapter_path, ["A", "C"]);
/// ```
pub fn chunk_document(doc: &Document, config: &ChunkerConfig) -> Result<ChunkingOutput, CardifyError> {
    config.validate()?;
    if doc.is_blank() {
        return Err(CardifyError::EmptyDocument);
    }

    let text = doc.text();
    let sections = sections::build_sections(doc, config.heading_depth);
    let section_count = sections.len();

    let pieces: Vec<split::Piece> = sections
        .iter()
        .flat_map(|s| split::bound_section(text, s, config.max_chunk_chars))
        .collect();
    let pieces = split::merge_short_sections(pieces, config.min_chunk_chars, config.max_chunk_chars);

    let mut pages = PageTracker::new(doc.page_markers());
    let code_spans = doc.code_spans();
    let mut stats = ChunkingStats {
        total_chars: 0,
        section_count,
        ..Default::default()
    };

    let chunks: Vec<Chunk> = pieces
        .into_iter()
        .enumerate()
        .map(|(sequence_index, piece)| {
            let (start_page, end_page) = pages.pages_for(&piece.byte_range);
            let has_code = code_spans
                .iter()
                .any(|span| span.start < piece.byte_range.end && piece.byte_range.start < span.end);

            stats.total_chars += piece.char_count;
            stats.merged_sections += piece.sections - 1;
            stats.largest_chunk_chars = stats.largest_chunk_chars.max(piece.char_count);
            if piece.forced_split {
                stats.forced_split_chunks += 1;
            }

            Chunk {
                sequence_index,
                text: text[piece.byte_range.clone()].to_string(),
                byte_range: piece.byte_range,
                chapter_path: piece.chapter_path,
                char_count: piece.char_count,
                forced_split: piece.forced_split,
                has_code,
                start_page,
                end_page,
            }
        })
        .collect();
    stats.chunk_count = chunks.len();

    debug!(
        "Chunked {} chars: {} sections → {} chunks ({} merged, {} forced)",
        stats.total_chars,
        stats.section_count,
        stats.chunk_count,
        stats.merged_sections,
        stats.forced_split_chunks
    );

    Ok(ChunkingOutput { chunks, stats })
}

/// Chunk markdown text, deriving the heading index from `#` lines.
pub fn chunk_markdown(markdown: &str, config: &ChunkerConfig) -> Result<ChunkingOutput, CardifyError> {
    chunk_document(&Document::from_markdown(markdown), config)
}

/// Read a markdown file (or the markdown next to a PDF) and chunk it.
///
/// `.pdf` inputs are resolved to a sibling `.md` / `.markdown` file.
pub fn chunk_file(path: impl AsRef<Path>, config: &ChunkerConfig) -> Result<ChunkingOutput, CardifyError> {
    let path = path.as_ref();
    let source = input::resolve_markdown(path, None)?;
    info!("Chunking {}", source.display());
    let markdown = input::read_markdown(&source)?;
    chunk_markdown(&markdown, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HeadingEvent;

    fn config(max: usize) -> ChunkerConfig {
        ChunkerConfig::builder().max_chunk_chars(max).build().unwrap()
    }

    #[test]
    fn zero_max_is_configuration_error() {
        let doc = Document::from_markdown("text");
        let bad = ChunkerConfig {
            max_chunk_chars: 0,
            ..Default::default()
        };
        assert!(matches!(
            chunk_document(&doc, &bad),
            Err(CardifyError::Configuration(_))
        ));
    }

    #[test]
    fn configuration_checked_before_content() {
        let bad = ChunkerConfig {
            max_chunk_chars: 0,
            ..Default::default()
        };
        assert!(matches!(
            chunk_markdown("", &bad),
            Err(CardifyError::Configuration(_))
        ));
    }

    #[test]
    fn empty_and_blank_documents_rejected() {
        assert!(matches!(
            chunk_markdown("", &config(10)),
            Err(CardifyError::EmptyDocument)
        ));
        assert!(matches!(
            chunk_markdown("  \n\n\t ", &config(10)),
            Err(CardifyError::EmptyDocument)
        ));
    }

    #[test]
    fn chunks_carry_hierarchy() {
        let md = "# A\nintro\n## B\nbee\n## C\nsea\n";
        let out = chunk_markdown(md, &config(100)).unwrap();
        let paths: Vec<Vec<String>> = out.chunks.iter().map(|c| c.chapter_path.clone()).collect();
        assert_eq!(paths, vec![vec!["A"], vec!["A", "B"], vec!["A", "C"]]);
        assert_eq!(out.chunks[2].text, "## C\nsea\n");
        assert_eq!(out.reassemble(), md);
    }

    #[test]
    fn explicit_heading_events_used_verbatim() {
        let text = "Part II\nChapter 5\nSection 5.3 body";
        let doc = Document::new(
            text,
            vec![
                HeadingEvent::new(1, "Part II", 0),
                HeadingEvent::new(2, "Chapter 5", 8),
                HeadingEvent::new(3, "Section 5.3", 18),
            ],
        )
        .unwrap();
        let out = chunk_document(&doc, &config(1000)).unwrap();
        assert_eq!(
            out.chunks.last().unwrap().chapter_path,
            ["Part II", "Chapter 5", "Section 5.3"]
        );
        assert_eq!(out.reassemble(), text);
    }

    #[test]
    fn code_and_pages_attached() {
        let md = "{0}------\n\n# Intro\ntext\n\n{1}------\n\n# Code\n```rust\nfn main() {}\n```\n";
        let out = chunk_markdown(md, &config(1000)).unwrap();
        assert_eq!(out.chunks.len(), 3);
        assert!(!out.chunks[1].has_code);
        assert!(out.chunks[2].has_code);
        assert_eq!(out.chunks[0].start_page, Some(0));
        // "# Intro" section holds the {1} marker at its end.
        assert_eq!((out.chunks[1].start_page, out.chunks[1].end_page), (Some(1), Some(1)));
        assert_eq!((out.chunks[2].start_page, out.chunks[2].end_page), (Some(1), Some(1)));
    }

    #[test]
    fn stats_reflect_run() {
        let md = format!("# T\n{}", "y".repeat(30));
        let out = chunk_markdown(&md, &config(10)).unwrap();
        assert_eq!(out.stats.section_count, 1);
        assert_eq!(out.stats.chunk_count, out.chunks.len());
        assert_eq!(out.stats.total_chars, md.chars().count());
        assert!(out.stats.forced_split_chunks > 0);
        assert_eq!(out.stats.largest_chunk_chars, 10);
    }

    #[test]
    fn min_chunk_merges_duplicate_headings() {
        let md = "## Notes\na\n## Notes\nb\n";
        let cfg = ChunkerConfig::builder()
            .max_chunk_chars(100)
            .min_chunk_chars(50)
            .build()
            .unwrap();
        let out = chunk_markdown(md, &cfg).unwrap();
        assert_eq!(out.chunks.len(), 1);
        assert_eq!(out.stats.merged_sections, 1);
        assert_eq!(out.chunks[0].text, md);
    }

    #[test]
    fn leading_bom_keeps_first_chapter_in_paths() {
        let md = "\u{feff}# Chapter 1\nbody\n## Sec\nmore\n";
        let out = chunk_markdown(md, &config(100)).unwrap();
        let paths: Vec<Vec<String>> = out.chunks.iter().map(|c| c.chapter_path.clone()).collect();
        assert_eq!(paths, [vec!["Chapter 1"], vec!["Chapter 1", "Sec"]]);
        assert_eq!(out.chunks[0].byte_range.start, 0);
        assert_eq!(out.reassemble(), md);
    }

    #[test]
    fn blank_line_with_spaces_preferred_over_later_space() {
        let out = chunk_markdown("aa bb\n \ncc dd ee ff", &config(15)).unwrap();
        assert_eq!(out.chunks[0].text, "aa bb\n \n");
        assert_eq!(out.chunks[1].text, "cc dd ee ff");
    }
}
