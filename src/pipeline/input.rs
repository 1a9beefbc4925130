//! Input resolution: find and read the converter's markdown output.
//!
//! The PDF-to-markdown step runs outside this crate. Users hand us either the
//! markdown itself or the original PDF, in which case the converter's output
//! is expected next to it with the same stem (`book.pdf` → `book.md` or
//! `book.markdown`). An explicit markdown path always wins.

use crate::error::CardifyError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions tried, in order, when looking for a PDF's markdown sibling.
pub const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// True when the path has a `.pdf` extension (case-insensitive).
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Look for `<stem>.md` then `<stem>.markdown` next to `pdf_path`.
pub fn find_markdown_sibling(pdf_path: &Path) -> Option<PathBuf> {
    MARKDOWN_EXTENSIONS
        .iter()
        .map(|ext| pdf_path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

/// Resolve the markdown file to read for `input`.
///
/// - `explicit` set: it must exist.
/// - `input` is a PDF: a markdown sibling must exist.
/// - otherwise `input` itself is the markdown and must exist.
pub fn resolve_markdown(input: &Path, explicit: Option<&Path>) -> Result<PathBuf, CardifyError> {
    let resolved = match explicit {
        Some(path) if path.is_file() => path.to_path_buf(),
        Some(path) => {
            return Err(CardifyError::MarkdownNotFound {
                path: path.to_path_buf(),
            })
        }
        None if is_pdf(input) => {
            find_markdown_sibling(input).ok_or_else(|| CardifyError::MarkdownNotFound {
                path: input.to_path_buf(),
            })?
        }
        None if input.is_file() => input.to_path_buf(),
        None => {
            return Err(CardifyError::MarkdownNotFound {
                path: input.to_path_buf(),
            })
        }
    };
    debug!("Resolved markdown: {}", resolved.display());
    Ok(resolved)
}

/// Read a markdown file as UTF-8 text.
pub fn read_markdown(path: &Path) -> Result<String, CardifyError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => CardifyError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => CardifyError::MarkdownNotFound {
            path: path.to_path_buf(),
        },
        _ => CardifyError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_detection() {
        assert!(is_pdf(Path::new("book.pdf")));
        assert!(is_pdf(Path::new("BOOK.PDF")));
        assert!(!is_pdf(Path::new("book.md")));
        assert!(!is_pdf(Path::new("book")));
    }

    #[test]
    fn pdf_resolves_to_md_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("book.pdf");
        std::fs::write(&pdf, b"%PDF-1.7").unwrap();
        std::fs::write(dir.path().join("book.markdown"), "# Hi\n").unwrap();

        let resolved = resolve_markdown(&pdf, None).unwrap();
        assert_eq!(resolved, dir.path().join("book.markdown"));

        // `.md` is preferred once it exists.
        std::fs::write(dir.path().join("book.md"), "# Hi\n").unwrap();
        assert_eq!(resolve_markdown(&pdf, None).unwrap(), dir.path().join("book.md"));
    }

    #[test]
    fn pdf_without_sibling_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("lonely.pdf");
        std::fs::write(&pdf, b"%PDF-1.7").unwrap();
        let err = resolve_markdown(&pdf, None).unwrap_err();
        assert!(matches!(err, CardifyError::MarkdownNotFound { .. }));
    }

    #[test]
    fn explicit_markdown_wins_and_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("book.pdf");
        let md = dir.path().join("notes.md");
        std::fs::write(&md, "text").unwrap();

        assert_eq!(resolve_markdown(&pdf, Some(&md)).unwrap(), md);
        let missing = dir.path().join("missing.md");
        assert!(resolve_markdown(&pdf, Some(&missing)).is_err());
    }

    #[test]
    fn read_markdown_returns_contents() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("a.md");
        std::fs::write(&md, "# Title\n\nBody\n").unwrap();
        assert_eq!(read_markdown(&md).unwrap(), "# Title\n\nBody\n");
    }

    #[test]
    fn read_invalid_utf8_fails() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("bad.md");
        std::fs::write(&md, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            read_markdown(&md),
            Err(CardifyError::ReadFailed { .. })
        ));
    }
}
