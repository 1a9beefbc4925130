//! Structure scan: derive headings, code spans and page markers from markdown.
//!
//! The external converter hands over plain markdown text. This single pass
//! over its lines recovers everything the chunker needs to know about the
//! text's structure:
//!
//! - ATX headings (`#` repeated per level) become [`HeadingEvent`]s.
//! - Fenced code blocks (```` ``` ```` or `~~~`) are recorded as byte spans,
//!   and lines inside them are never treated as headings or page markers.
//! - `{N}--` page markers (two or more dashes, anywhere in a line) become
//!   [`PageMarker`]s.
//!
//! Setext headings (underlined with `===`) are not recognised; PDF
//! converters emit ATX headings.

use crate::document::{HeadingEvent, PageMarker};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// Everything one scan of the text produces.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScannedMarkdown {
    pub headings: Vec<HeadingEvent>,
    pub code_spans: Vec<Range<usize>>,
    pub page_markers: Vec<PageMarker>,
}

static RE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").unwrap());

static RE_CLOSING_HASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[ \t]+)#+$").unwrap());

static RE_FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})").unwrap());

static RE_PAGE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\d+)\}-{2,}").unwrap());

const BOM: char = '\u{feff}';

/// An open code fence: its character, run length and starting offset.
struct OpenFence {
    ch: char,
    len: usize,
    start: usize,
}

/// Scan `text` line by line.
pub fn scan_markdown(text: &str) -> ScannedMarkdown {
    let mut out = ScannedMarkdown::default();
    let mut fence: Option<OpenFence> = None;
    let mut offset = 0usize;

    for raw in text.split_inclusive('\n') {
        let mut line = raw.trim_end_matches(['\n', '\r']);
        let line_start = offset;
        // Where `line` begins; differs from `line_start` only after a BOM.
        let mut content_start = line_start;
        if line_start == 0 {
            // A leading BOM stays in the text but not in the line.
            if let Some(rest) = line.strip_prefix(BOM) {
                line = rest;
                content_start = BOM.len_utf8();
            }
        }
        offset += raw.len();

        if let Some(open) = &fence {
            if closes_fence(line, open) {
                out.code_spans.push(open.start..offset);
                fence = None;
            }
            continue;
        }

        if let Some(caps) = RE_FENCE_OPEN.captures(line) {
            let run = &caps[1];
            let ch = run.chars().next().unwrap_or('`');
            // Backtick fences may not have backticks in their info string.
            let info = &line[caps[0].len()..];
            if ch != '`' || !info.contains('`') {
                fence = Some(OpenFence {
                    ch,
                    len: run.len(),
                    start: line_start,
                });
                continue;
            }
        }

        if let Some(heading) = parse_heading(line, line_start) {
            out.headings.push(heading);
            continue;
        }

        for caps in RE_PAGE_MARKER.captures_iter(line) {
            let (Some(whole), Ok(page)) = (caps.get(0), caps[1].parse::<u32>()) else {
                continue;
            };
            out.page_markers.push(PageMarker {
                page,
                offset: content_start + whole.start(),
            });
        }
    }

    // An unclosed fence runs to the end of the document.
    if let Some(open) = fence {
        out.code_spans.push(open.start..text.len());
    }

    out
}

fn closes_fence(line: &str, open: &OpenFence) -> bool {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return false;
    }
    let run = trimmed.chars().take_while(|&c| c == open.ch).count();
    run >= open.len && trimmed[run * open.ch.len_utf8()..].trim().is_empty()
}

/// Parse one line as an ATX heading.
pub fn parse_heading(line: &str, offset: usize) -> Option<HeadingEvent> {
    let caps = RE_HEADING.captures(line)?;
    let level = caps[1].len() as u8;
    let raw_title = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let title = RE_CLOSING_HASHES.replace(raw_title, "");
    Some(HeadingEvent::new(level, title.trim(), offset))
}
