//! Size bounding: split oversized sections and merge undersized ones.
//!
//! ## Split order
//!
//! An oversized section is cut repeatedly. Each cut looks only at the next
//! `max_chars` characters (the window) and picks, in order of preference:
//!
//! 1. the last paragraph boundary (blank line) in the window,
//! 2. the last whitespace character in the window,
//! 3. exactly `max_chars` characters, which breaks a token.
//!
//! The separator stays with the left piece, so pieces concatenate back to the
//! section text. Both pieces touching a cut of the third kind are flagged
//! `forced_split`.
//!
//! ## Merge
//!
//! Whole sections shorter than `min_chars` absorb the following sections with
//! the same chapter path while the total stays within `max_chars`. Pieces of a
//! split section are never merged.

use crate::pipeline::sections::Section;
use std::ops::Range;

/// A size-bounded span waiting to become a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub byte_range: Range<usize>,
    pub chapter_path: Vec<String>,
    pub char_count: usize,
    pub forced_split: bool,
    /// True when the piece is a whole section, i.e. eligible for merging.
    pub whole_section: bool,
    /// Number of sections folded into this piece (1 when unmerged).
    pub sections: usize,
}

/// Turn one section into one or more pieces no longer than `max_chars`.
pub fn bound_section(text: &str, section: &Section, max_chars: usize) -> Vec<Piece> {
    let range = section.byte_range.clone();
    let char_count = text[range.clone()].chars().count();

    if char_count <= max_chars {
        return vec![Piece {
            byte_range: range,
            chapter_path: section.chapter_path.clone(),
            char_count,
            forced_split: false,
            whole_section: true,
            sections: 1,
        }];
    }

    split_span(text, range, max_chars)
        .into_iter()
        .map(|span| Piece {
            byte_range: span.byte_range,
            chapter_path: section.chapter_path.clone(),
            char_count: span.char_count,
            forced_split: span.forced_split,
            whole_section: false,
            sections: 1,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    byte_range: Range<usize>,
    char_count: usize,
    forced_split: bool,
}

fn split_span(text: &str, range: Range<usize>, max_chars: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = range.start;
    let mut cut_was_forced = false;

    loop {
        let rest = &text[start..range.end];
        let Some((window_len, _)) = rest.char_indices().nth(max_chars) else {
            spans.push(Span {
                byte_range: start..range.end,
                char_count: rest.chars().count(),
                forced_split: cut_was_forced,
            });
            return spans;
        };

        let window = &rest[..window_len];
        let (cut, forced) = match find_cut(window) {
            Some(cut) => (cut, false),
            None => (window_len, true),
        };

        spans.push(Span {
            byte_range: start..start + cut,
            char_count: rest[..cut].chars().count(),
            forced_split: forced || cut_was_forced,
        });
        cut_was_forced = forced;
        start += cut;
    }
}

/// Byte length of the left piece for the best cut inside `window`.
fn find_cut(window: &str) -> Option<usize> {
    paragraph_cut(window).or_else(|| whitespace_cut(window))
}

fn paragraph_cut(window: &str) -> Option<usize> {
    // End of the last complete whitespace-only line with text before it.
    let mut cut = None;
    let mut line_start = 0;
    for line in window.split_inclusive('\n') {
        let line_end = line_start + line.len();
        if line_start > 0
            && line.ends_with('\n')
            && line.trim().is_empty()
            && !window[..line_start].trim().is_empty()
        {
            cut = Some(line_end);
        }
        line_start = line_end;
    }
    cut
}

fn whitespace_cut(window: &str) -> Option<usize> {
    window
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
}

/// Greedily merge short whole sections into their successors.
pub fn merge_short_sections(pieces: Vec<Piece>, min_chars: usize, max_chars: usize) -> Vec<Piece> {
    if min_chars == 0 {
        return pieces;
    }

    let mut merged: Vec<Piece> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        if let Some(acc) = merged.last_mut() {
            let can_merge = acc.whole_section
                && piece.whole_section
                && acc.char_count < min_chars
                && acc.chapter_path == piece.chapter_path
                && acc.char_count + piece.char_count <= max_chars;
            if can_merge {
                acc.byte_range.end = piece.byte_range.end;
                acc.char_count += piece.char_count;
                acc.sections += piece.sections;
                continue;
            }
        }
        merged.push(piece);
    }
    merged
}
