//! Prompt text for question generation.
//!
//! Kept apart from the retry and batching logic so the wording can change
//! without touching [`crate::pipeline::llm`]. The default prompt only fixes
//! the reply format that [`crate::pipeline::cards`] parses; tune the content
//! with a custom system prompt.

use crate::pipeline::batch::Batch;
use std::fmt::Write;

/// Default system prompt: asks for a bare JSON array of cards.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You write study cards from excerpts of a book.
Reply with ONLY a JSON array. Each element is an object with two string fields:
\"question\" and \"answer\". Do not wrap the array in markdown fences.";

/// Label used for text that sits before the first heading.
pub const FRONT_MATTER_LABEL: &str = "(front matter)";

/// Render the user message for a batch.
///
/// Each chunk is introduced by its sequence index and chapter path so the
/// model knows where in the book the excerpt comes from. The path is only
/// added here; chunk text itself never carries it.
pub fn render_batch(batch: &Batch) -> String {
    let mut out = String::new();
    for chunk in &batch.chunks {
        let location = if chunk.chapter_path.is_empty() {
            FRONT_MATTER_LABEL.to_string()
        } else {
            chunk.chapter_path.join(" > ")
        };
        let _ = writeln!(out, "### Excerpt {} — {}", chunk.sequence_index, location);
        out.push('\n');
        out.push_str(chunk.text.trim_end());
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Chunk;

    fn chunk(i: usize, text: &str, path: &[&str]) -> Chunk {
        Chunk {
            sequence_index: i,
            text: text.into(),
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
    fn default_prompt_requests_json() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("JSON array"));
    }

    #[test]
    fn batch_rendering_includes_paths() {
        let batch = Batch {
            batch_index: 0,
            chunks: vec![
                chunk(0, "Preface text\n\n", &[]),
                chunk(1, "## Ownership\nBorrowing rules.\n", &["Part I", "Ownership"]),
            ],
            estimated_tokens: 10,
        };
        let rendered = render_batch(&batch);
        assert!(rendered.contains("### Excerpt 0 — (front matter)"));
        assert!(rendered.contains("### Excerpt 1 — Part I > Ownership"));
        assert!(rendered.contains("Borrowing rules."));
    }
}
