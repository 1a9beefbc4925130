//! The markdown document handed over by the external PDF converter.
//!
//! A [`Document`] is the converter's markdown text plus the structure derived
//! from it: heading events, fenced-code spans and page markers. It is
//! immutable once built; the chunker only ever borrows it.

use crate::config::MAX_HEADING_LEVEL;
use crate::error::CardifyError;
use crate::pipeline::scan;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// An ATX heading found in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingEvent {
    /// Heading level, 1 (`#`) through 6 (`######`).
    pub level: u8,
    /// Heading text without the leading `#`s and surrounding whitespace.
    pub title: String,
    /// Byte offset of the start of the heading line.
    pub offset: usize,
}

impl HeadingEvent {
    pub fn new(level: u8, title: impl Into<String>, offset: usize) -> Self {
        Self {
            level,
            title: title.into(),
            offset,
        }
    }
}

/// A `{N}--` marker inserted by paginating converters at the start of page N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMarker {
    /// Page number as written in the marker.
    pub page: u32,
    /// Byte offset of the start of the marker line.
    pub offset: usize,
}

/// Converted markdown text with its heading index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    headings: Vec<HeadingEvent>,
    code_spans: Vec<Range<usize>>,
    page_markers: Vec<PageMarker>,
}

impl Document {
    /// Build a document from text and an explicit heading list.
    ///
    /// Use this when the converter supplies its own heading index. Code spans
    /// and page markers are still derived from the text.
    ///
    /// # Errors
    /// [`CardifyError::InvalidHeading`] when an event's level is outside
    /// 1–6, its offset lies beyond the text or inside a multi-byte
    /// character, or offsets go backwards.
    pub fn new(text: impl Into<String>, headings: Vec<HeadingEvent>) -> Result<Self, CardifyError> {
        let text = text.into();
        let mut previous = 0usize;
        for h in &headings {
            let invalid = |detail: String| CardifyError::InvalidHeading {
                title: h.title.clone(),
                offset: h.offset,
                detail,
            };
            if h.level == 0 || h.level > MAX_HEADING_LEVEL {
                return Err(invalid(format!("level {} is not 1–6", h.level)));
            }
            if h.offset > text.len() {
                return Err(invalid(format!("text is only {} bytes long", text.len())));
            }
            if !text.is_char_boundary(h.offset) {
                return Err(invalid("offset splits a UTF-8 character".into()));
            }
            if h.offset < previous {
                return Err(invalid(format!(
                    "offsets must be non-decreasing (previous heading at {previous})"
                )));
            }
            previous = h.offset;
        }

        let scanned = scan::scan_markdown(&text);
        Ok(Self {
            text,
            headings,
            code_spans: scanned.code_spans,
            page_markers: scanned.page_markers,
        })
    }

    /// Build a document by deriving the heading index from the markdown.
    pub fn from_markdown(text: impl Into<String>) -> Self {
        let text = text.into();
        let scanned = scan::scan_markdown(&text);
        Self {
            text,
            headings: scanned.headings,
            code_spans: scanned.code_spans,
            page_markers: scanned.page_markers,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn headings(&self) -> &[HeadingEvent] {
        &self.headings
    }

    /// Byte spans of fenced code blocks, fences included.
    pub fn code_spans(&self) -> &[Range<usize>] {
        &self.code_spans
    }

    pub fn page_markers(&self) -> &[PageMarker] {
        &self.page_markers
    }

    /// True when the text is empty or whitespace-only (a leading BOM aside).
    pub fn is_blank(&self) -> bool {
        self.text.trim_start_matches('\u{feff}').trim().is_empty()
    }
}
