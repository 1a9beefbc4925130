//! Batch planning: group chunks into requests.
//!
//! Chunks are taken in sequence order and packed greedily. A batch closes
//! when the next chunk would push it past `max_batch_chunks` or past the
//! estimated token budget. A chunk that alone exceeds the budget still goes
//! out, in a batch of its own; no chunk is ever dropped or reordered.

use crate::output::Chunk;
use std::ops::Range;

/// A group of consecutive chunks sent in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub batch_index: usize,
    pub chunks: Vec<Chunk>,
    pub estimated_tokens: usize,
}

impl Batch {
    /// Sequence indices covered by this batch.
    pub fn sequence_range(&self) -> Range<usize> {
        match (self.chunks.first(), self.chunks.last()) {
            (Some(first), Some(last)) => first.sequence_index..last.sequence_index + 1,
            _ => 0..0,
        }
    }
}

/// Pack `chunks` into batches.
///
/// `max_batch_chunks` is treated as at least 1.
pub fn plan_batches(chunks: &[Chunk], max_batch_chunks: usize, max_batch_tokens: Option<usize>) -> Vec<Batch> {
    let max_chunks = max_batch_chunks.max(1);
    let mut batches: Vec<Batch> = Vec::new();
    let mut current: Vec<Chunk> = Vec::new();
    let mut current_tokens = 0usize;

    for chunk in chunks {
        let tokens = chunk.estimated_tokens();
        let over_count = current.len() >= max_chunks;
        let over_budget = max_batch_tokens.is_some_and(|budget| current_tokens + tokens > budget);
        if !current.is_empty() && (over_count || over_budget) {
            batches.push(Batch {
                batch_index: batches.len(),
                chunks: std::mem::take(&mut current),
                estimated_tokens: current_tokens,
            });
            current_tokens = 0;
        }
        current.push(chunk.clone());
        current_tokens += tokens;
    }

    if !current.is_empty() {
        batches.push(Batch {
            batch_index: batches.len(),
            chunks: current,
            estimated_tokens: current_tokens,
        });
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, chars: usize) -> Chunk {
        let text = "a".repeat(chars);
        Chunk {
            sequence_index: index,
            byte_range: 0..text.len(),
            char_count: chars,
            text,
            chapter_path: vec![],
            forced_split: false,
            has_code: false,
            start_page: None,
            end_page: None,
        }
    }

    fn sizes(batches: &[Batch]) -> Vec<usize> {
        batches.iter().map(|b| b.chunks.len()).collect()
    }

    #[test]
    fn empty_input_no_batches() {
        assert!(plan_batches(&[], 4, None).is_empty());
    }

    #[test]
    fn count_limit_applies() {
        let chunks: Vec<Chunk> = (0..7).map(|i| chunk(i, 10)).collect();
        let batches = plan_batches(&chunks, 3, None);
        assert_eq!(sizes(&batches), [3, 3, 1]);
        assert_eq!(batches[1].sequence_range(), 3..6);
        assert_eq!(batches[2].batch_index, 2);
    }

    #[test]
    fn token_budget_applies() {
        // 40 chars = 10 tokens each; budget 25 fits two.
        let chunks: Vec<Chunk> = (0..5).map(|i| chunk(i, 40)).collect();
        let batches = plan_batches(&chunks, 10, Some(25));
        assert_eq!(sizes(&batches), [2, 2, 1]);
        assert_eq!(batches[0].estimated_tokens, 20);
    }

    #[test]
    fn oversized_chunk_goes_alone() {
        let chunks = vec![chunk(0, 8), chunk(1, 400), chunk(2, 8)];
        let batches = plan_batches(&chunks, 10, Some(50));
        assert_eq!(sizes(&batches), [1, 1, 1]);
        assert_eq!(batches[1].chunks[0].sequence_index, 1);
    }

    #[test]
    fn order_preserved_across_batches() {
        let chunks: Vec<Chunk> = (0..9).map(|i| chunk(i, 5)).collect();
        let flattened: Vec<usize> = plan_batches(&chunks, 2, Some(3))
            .iter()
            .flat_map(|b| b.chunks.iter().map(|c| c.sequence_index))
            .collect();
        assert_eq!(flattened, (0..9).collect::<Vec<_>>());
    }
}
