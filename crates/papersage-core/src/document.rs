//! Turning fetched bytes into pages of text.
//!
//! Fetched bytes are spooled to a temporary file first; the file is removed when the
//! returned handle drops, so every exit path of a request cleans up after itself.

use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

/// One page of extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 0-based page number.
    pub index: usize,
    pub text: String,
}

/// A paper's text, page by page. Lives only for one pipeline call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    /// Builds a document from page texts in order.
    pub fn from_pages<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Page {
                index,
                text: text.into(),
            })
            .collect();
        Self { pages }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// Writes `bytes` to a new temporary file in `dir` (or the system temp dir).
/// The file is deleted when the handle is dropped.
pub fn spool(bytes: &[u8], dir: Option<&Path>) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("papersage-").suffix(".download");
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(bytes)?;
    file.flush()?;
    debug!(path = %file.path().display(), bytes = bytes.len(), "spooled document");
    Ok(file)
}

/// Reads a local file into pages.
pub trait PageExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<Document, ExtractError>;
}

/// PDF text extraction via lopdf. Pages that fail to yield text come back empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PageExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<Document, ExtractError> {
        let pdf = lopdf::Document::load(path)
            .map_err(|e| ExtractError::Unsupported(format!("unreadable PDF: {e}")))?;
        let page_numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(ExtractError::Unsupported("PDF has no pages".to_string()));
        }
        let texts = page_numbers.iter().map(|&n| {
            pdf.extract_text(&[n]).unwrap_or_else(|e| {
                debug!(page = n, error = %e, "no extractable text on page");
                String::new()
            })
        });
        Ok(Document::from_pages(texts))
    }
}

/// Plain UTF-8 text; form feed (`\x0c`) separates pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PageExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<Document, ExtractError> {
        let bytes = std::fs::read(path).map_err(ExtractError::Read)?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ExtractError::Unsupported("text is not valid UTF-8".to_string()))?;
        Ok(Document::from_pages(text.split('\x0c')))
    }
}

/// Picks [PdfExtractor] for files starting with `%PDF`, else [PlainTextExtractor].
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoExtractor;

impl PageExtractor for AutoExtractor {
    fn extract(&self, path: &Path) -> Result<Document, ExtractError> {
        let mut magic = [0u8; 4];
        let mut file = std::fs::File::open(path).map_err(ExtractError::Read)?;
        let n = file.read(&mut magic).map_err(ExtractError::Read)?;
        if &magic[..n] == b"%PDF" {
            PdfExtractor.extract(path)
        } else {
            PlainTextExtractor.extract(path)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The content could not be turned into pages. Callers treat this as an empty document.
    #[error("unsupported document: {0}")]
    Unsupported(String),
    #[error("failed to read document: {0}")]
    Read(std::io::Error),
    #[error("extraction did not finish: {0}")]
    Aborted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spooled_file_is_removed_on_drop() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = spool(b"hello", Some(dir.path())).unwrap();
        let path = file.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn plain_text_splits_on_form_feed() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = spool(b"page one\x0cpage two\x0c", Some(dir.path())).unwrap();
        let doc = PlainTextExtractor.extract(file.path()).unwrap();
        assert_eq!(doc.pages.len(), 3);
        assert_eq!(doc.pages[1].index, 1);
        assert_eq!(doc.pages[1].text, "page two");
        assert_eq!(doc.pages[2].text, "");
    }

    #[test]
    fn auto_detects_non_pdf_as_text() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = spool(b"just words", Some(dir.path())).unwrap();
        let doc = AutoExtractor.extract(file.path()).unwrap();
        assert_eq!(doc, Document::from_pages(["just words"]));
    }

    #[test]
    fn broken_pdf_is_unsupported() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = spool(b"%PDF-1.7 garbage", Some(dir.path())).unwrap();
        let err = AutoExtractor.extract(file.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(_)));
    }

    #[test]
    fn blank_document_is_empty() {
        assert!(Document::from_pages(["", "  "]).is_empty());
        assert!(!Document::from_pages(["", "x"]).is_empty());
    }
}
