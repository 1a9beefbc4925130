//! Sectioning: partition the document at heading boundaries.
//!
//! Headings are walked in document order with an explicit stack of
//! `(level, title)` pairs. Opening a heading of level L pops every entry of
//! level >= L and then pushes the new heading, so the stack always holds the
//! chain of enclosing headings, outermost first. Only ancestor lookups are
//! ever needed, so no tree is built.

use crate::document::{Document, HeadingEvent};
use std::ops::Range;

/// A maximal span of text owned by one heading (or by no heading, for text
/// before the first one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub byte_range: Range<usize>,
    pub chapter_path: Vec<String>,
}

/// Stack of currently open headings.
#[derive(Debug, Default)]
struct HeadingStack {
    entries: Vec<(u8, String)>,
}

impl HeadingStack {
    fn open(&mut self, heading: &HeadingEvent) {
        while self
            .entries
            .last()
            .is_some_and(|(level, _)| *level >= heading.level)
        {
            self.entries.pop();
        }
        self.entries.push((heading.level, heading.title.clone()));
    }

    fn path(&self) -> Vec<String> {
        self.entries.iter().map(|(_, title)| title.clone()).collect()
    }
}

/// Split the document into sections.
///
/// Headings deeper than `heading_depth` do not open sections. Empty spans
/// (two headings at the same offset) are skipped, but their headings still
/// go through the stack.
pub fn build_sections(doc: &Document, heading_depth: u8) -> Vec<Section> {
    let text_len = doc.text().len();
    let headings: Vec<&HeadingEvent> = doc
        .headings()
        .iter()
        .filter(|h| h.level <= heading_depth)
        .collect();

    let mut sections = Vec::with_capacity(headings.len() + 1);
    let mut stack = HeadingStack::default();

    let first_boundary = headings.first().map_or(text_len, |h| h.offset);
    if first_boundary > 0 {
        sections.push(Section {
            byte_range: 0..first_boundary,
            chapter_path: Vec::new(),
        });
    }

    for (i, heading) in headings.iter().enumerate() {
        stack.open(heading);
        let end = headings.get(i + 1).map_or(text_len, |next| next.offset);
        if end > heading.offset {
            sections.push(Section {
                byte_range: heading.offset..end,
                chapter_path: stack.path(),
            });
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(sections: &[Section]) -> Vec<Vec<&str>> {
        sections
            .iter()
            .map(|s| s.chapter_path.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn no_headings_single_section() {
        let doc = Document::from_markdown("just text\n\nmore text");
        let sections = build_sections(&doc, 6);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].byte_range, 0..doc.text().len());
        assert!(sections[0].chapter_path.is_empty());
    }

    #[test]
    fn sibling_heading_replaces_previous() {
        let doc = Document::from_markdown("# A\na\n## B\nb\n## C\nc\n");
        let sections = build_sections(&doc, 6);
        assert_eq!(paths(&sections), vec![vec!["A"], vec!["A", "B"], vec!["A", "C"]]);
    }

    #[test]
    fn shallower_heading_pops_deeper_ones() {
        let text = "# Part II\n## Chapter 5\n### Section 5.3\nx\n# Part III\ny\n";
        let sections = build_sections(&Document::from_markdown(text), 6);
        assert_eq!(
            paths(&sections),
            vec![
                vec!["Part II"],
                vec!["Part II", "Chapter 5"],
                vec!["Part II", "Chapter 5", "Section 5.3"],
                vec!["Part III"],
            ]
        );
    }

    #[test]
    fn skipped_level_keeps_ancestors() {
        let text = "# A\n### Deep\nx\n## B\ny\n";
        let sections = build_sections(&Document::from_markdown(text), 6);
        assert_eq!(
            paths(&sections),
            vec![vec!["A"], vec!["A", "Deep"], vec!["A", "B"]]
        );
    }

    #[test]
    fn preamble_has_empty_path() {
        let doc = Document::from_markdown("front matter\n# One\nbody\n");
        let sections = build_sections(&doc, 6);
        assert_eq!(sections[0].byte_range, 0..13);
        assert!(sections[0].chapter_path.is_empty());
        assert_eq!(sections[1].chapter_path, vec!["One"]);
    }

    #[test]
    fn duplicate_headings_stay_distinct() {
        let doc = Document::from_markdown("## Notes\na\n## Notes\nb\n");
        let sections = build_sections(&doc, 6);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].chapter_path, vec!["Notes"]);
        assert_eq!(sections[1].chapter_path, vec!["Notes"]);
        assert_ne!(sections[0].byte_range, sections[1].byte_range);
    }

    #[test]
    fn headings_below_depth_stay_in_body() {
        let doc = Document::from_markdown("# A\n## B\n### C\ntext\n");
        let sections = build_sections(&doc, 2);
        assert_eq!(paths(&sections), vec![vec!["A"], vec!["A", "B"]]);
        assert_eq!(sections[1].byte_range.end, doc.text().len());
    }

    #[test]
    fn coincident_explicit_headings_skip_empty_span() {
        let doc = Document::new(
            "Title text",
            vec![HeadingEvent::new(1, "Book", 0), HeadingEvent::new(2, "Intro", 0)],
        )
        .unwrap();
        let sections = build_sections(&doc, 6);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].chapter_path, vec!["Book", "Intro"]);
    }
}
