//! Output records: chunks, study cards and the run statistics around them.
//!
//! Everything here derives `Serialize` so downstream tooling can build API
//! payloads or inspect a run as JSON without extra mapping code.

use crate::error::{BatchError, CardifyError};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

// ── Chunking ─────────────────────────────────────────────────────────────

/// A contiguous, size-bounded span of document text with its structural
/// location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in emission order: 0, 1, 2, … with no gaps.
    pub sequence_index: usize,
    /// The exact document text of this span. Never empty.
    pub text: String,
    /// Half-open byte offsets into the document text.
    pub byte_range: Range<usize>,
    /// Enclosing heading titles, outermost first.
    pub chapter_path: Vec<String>,
    /// Number of Unicode scalar values in `text`.
    pub char_count: usize,
    /// True when one of this chunk's boundaries breaks a token.
    pub forced_split: bool,
    /// True when the chunk overlaps a fenced code block.
    pub has_code: bool,
    /// Page of the first page marker in the chunk, or the page carried over
    /// from the previous chunk.
    pub start_page: Option<u32>,
    /// Page of the last page marker in the chunk, or the page carried over
    /// from the previous chunk.
    pub end_page: Option<u32>,
}

impl Chunk {
    /// Rough input-token estimate (four characters per token, rounded up).
    pub fn estimated_tokens(&self) -> usize {
        self.char_count.div_ceil(4)
    }
}

/// Statistics for one chunking pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingStats {
    /// Characters in the document.
    pub total_chars: usize,
    /// Heading-delimited sections found.
    pub section_count: usize,
    /// Chunks emitted.
    pub chunk_count: usize,
    /// Sections absorbed into a preceding short section.
    pub merged_sections: usize,
    /// Chunks flagged `forced_split`.
    pub forced_split_chunks: usize,
    /// Character count of the largest chunk.
    pub largest_chunk_chars: usize,
}

/// Result of chunking one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingOutput {
    pub chunks: Vec<Chunk>,
    pub stats: ChunkingStats,
}

impl ChunkingOutput {
    /// Concatenate the chunk texts in sequence order.
    ///
    /// Always equal to the original document text.
    pub fn reassemble(&self) -> String {
        let mut out = String::with_capacity(self.stats.total_chars);
        for chunk in &self.chunks {
            out.push_str(&chunk.text);
        }
        out
    }
}

// ── Question generation ──────────────────────────────────────────────────

/// A question/answer pair produced from a batch of chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyCard {
    pub question: String,
    pub answer: String,
    /// Sequence indices of the chunks the card was generated from.
    pub source_chunks: Vec<usize>,
    /// Chapter path of the first source chunk.
    pub chapter_path: Vec<String>,
}

/// Outcome of one batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Position of the batch in dispatch order (0-indexed).
    pub batch_index: usize,
    /// Sequence indices covered by the batch.
    pub sequence_range: Range<usize>,
    /// Cards parsed from the reply. Empty on error.
    pub cards: Vec<StudyCard>,
    /// Raw reply text, kept for inspection. Empty on generation error.
    pub raw_response: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// Retries spent before the final attempt.
    pub retries: u32,
    pub error: Option<BatchError>,
}

/// Statistics for one dispatch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchStats {
    pub total_batches: usize,
    pub succeeded_batches: usize,
    pub failed_batches: usize,
    pub total_cards: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// Result of generating cards for a chunk sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutput {
    pub batches: Vec<BatchResult>,
    pub stats: DispatchStats,
}

impl DispatchOutput {
    /// All cards in batch order.
    pub fn cards(&self) -> impl Iterator<Item = &StudyCard> {
        self.batches.iter().flat_map(|b| b.cards.iter())
    }
}

// ── Files ────────────────────────────────────────────────────────────────

/// Render records as JSON Lines, one object per line.
pub fn to_jsonl<T: Serialize>(records: &[T]) -> Result<String, CardifyError> {
    let mut out = String::new();
    for record in records {
        let line = serde_json::to_string(record)
            .map_err(|e| CardifyError::Internal(format!("Failed to serialise record: {e}")))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Write records to `path` as JSON Lines.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_jsonl<T: Serialize>(
    path: impl AsRef<Path>,
    records: &[T],
) -> Result<(), CardifyError> {
    let path = path.as_ref();
    let body = to_jsonl(records)?;
    let write_err = |e: std::io::Error| CardifyError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("jsonl.tmp");
    tokio::fs::write(&tmp_path, body).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str, path: &[&str]) -> Chunk {
        Chunk {
            sequence_index: index,
            text: text.to_string(),
            byte_range: 0..text.len(),
            chapter_path: path.iter().map(|s| s.to_string()).collect(),
            char_count: text.chars().count(),
            forced_split: false,
            has_code: false,
            start_page: None,
            end_page: None,
        }
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(chunk(0, "abcd", &[]).estimated_tokens(), 1);
        assert_eq!(chunk(0, "abcde", &[]).estimated_tokens(), 2);
    }

    #[test]
    fn chunk_serialises_byte_range() {
        let json = serde_json::to_value(chunk(3, "hello", &["A"])).unwrap();
        assert_eq!(json["sequence_index"], 3);
        assert_eq!(json["byte_range"]["start"], 0);
        assert_eq!(json["byte_range"]["end"], 5);
        assert_eq!(json["chapter_path"][0], "A");
    }

    #[test]
    fn jsonl_has_one_line_per_record() {
        let chunks = vec![chunk(0, "a", &["A"]), chunk(1, "b", &["A"])];
        let body = to_jsonl(&chunks).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: Chunk = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back, chunks[1]);
    }

    #[tokio::test]
    async fn write_jsonl_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chunks.jsonl");
        write_jsonl(&path, &[chunk(0, "hello", &[])]).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with('\n'));
        assert!(written.contains("\"hello\""));
        assert!(!path.with_extension("jsonl.tmp").exists());
    }
}
