//! Page attribution for chunks.
//!
//! Paginating converters start every page with a `{N}------` marker line.
//! A chunk's page range comes from the first and last marker inside it. A
//! chunk with no marker of its own inherits the previous chunk's end page for
//! both ends, since all of its text sits on that page.

use crate::document::PageMarker;
use std::ops::Range;

/// Walks page markers alongside the chunks, which arrive in document order.
#[derive(Debug)]
pub struct PageTracker<'a> {
    markers: &'a [PageMarker],
    next: usize,
    last_end: Option<u32>,
}

impl<'a> PageTracker<'a> {
    pub fn new(markers: &'a [PageMarker]) -> Self {
        Self {
            markers,
            next: 0,
            last_end: None,
        }
    }

    /// Page range of the chunk covering `byte_range`.
    ///
    /// Ranges must be passed in increasing, non-overlapping order.
    pub fn pages_for(&mut self, byte_range: &Range<usize>) -> (Option<u32>, Option<u32>) {
        // Markers before this range belong to earlier chunks.
        while self
            .markers
            .get(self.next)
            .is_some_and(|m| m.offset < byte_range.start)
        {
            self.last_end = Some(self.markers[self.next].page);
            self.next += 1;
        }

        let mut first = None;
        let mut last = None;
        while let Some(marker) = self.markers.get(self.next) {
            if marker.offset >= byte_range.end {
                break;
            }
            first.get_or_insert(marker.page);
            last = Some(marker.page);
            self.next += 1;
        }

        match (first, last) {
            (Some(start), Some(end)) => {
                self.last_end = Some(end);
                (Some(start), Some(end))
            }
            _ => (self.last_end, self.last_end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers(pairs: &[(u32, usize)]) -> Vec<PageMarker> {
        pairs
            .iter()
            .map(|&(page, offset)| PageMarker { page, offset })
            .collect()
    }

    #[test]
    fn no_markers_gives_no_pages() {
        let mut tracker = PageTracker::new(&[]);
        assert_eq!(tracker.pages_for(&(0..10)), (None, None));
    }

    #[test]
    fn first_and_last_marker_inside_chunk() {
        let m = markers(&[(0, 0), (1, 40), (2, 80)]);
        let mut tracker = PageTracker::new(&m);
        assert_eq!(tracker.pages_for(&(0..100)), (Some(0), Some(2)));
    }

    #[test]
    fn chunk_without_marker_inherits_previous_end() {
        let m = markers(&[(3, 0), (4, 50)]);
        let mut tracker = PageTracker::new(&m);
        assert_eq!(tracker.pages_for(&(0..20)), (Some(3), Some(3)));
        assert_eq!(tracker.pages_for(&(20..45)), (Some(3), Some(3)));
        assert_eq!(tracker.pages_for(&(45..70)), (Some(4), Some(4)));
        assert_eq!(tracker.pages_for(&(70..90)), (Some(4), Some(4)));
    }

    #[test]
    fn text_before_first_marker_has_no_page() {
        let m = markers(&[(1, 30)]);
        let mut tracker = PageTracker::new(&m);
        assert_eq!(tracker.pages_for(&(0..30)), (None, None));
        assert_eq!(tracker.pages_for(&(30..60)), (Some(1), Some(1)));
    }
}
