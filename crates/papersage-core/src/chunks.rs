//! Splits extracted pages into word-window chunks for embedding and retrieval.
//! A chunk never spans two pages, so every chunk points back to exactly one page.

use serde::Serialize;

use crate::document::Page;

/// Default number of words per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// A window of page text with its source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Page the words came from (0-based).
    pub page_index: usize,
    pub text: String,
    /// Position of this chunk in the document's chunk sequence (0, 1, 2, …).
    pub ordinal: usize,
}

/// Chunk a single page. Returns an empty vec for blank pages.
fn chunk_page(page: &Page, chunk_size: usize, first_ordinal: usize) -> Vec<Chunk> {
    let words: Vec<&str> = page.text.split_whitespace().collect();
    words
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, window)| Chunk {
            page_index: page.index,
            text: window.join(" "),
            ordinal: first_ordinal + i,
        })
        .collect()
}

/// Chunk every page in order. Ordinals run across the whole document.
pub fn chunk_pages(pages: &[Page], chunk_size: usize) -> Result<Vec<Chunk>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::InvalidChunkSize);
    }
    let mut chunks = Vec::new();
    for page in pages {
        let page_chunks = chunk_page(page, chunk_size, chunks.len());
        chunks.extend(page_chunks);
    }
    Ok(chunks)
}

/// Space-joins chunk texts in the given order.
pub fn join_text(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("chunk size must be at least one word")]
    InvalidChunkSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(index: usize, text: &str) -> Page {
        Page {
            index,
            text: text.to_string(),
        }
    }

    fn words(prefix: &str, n: usize) -> String {
        (0..n)
            .map(|i| format!("{prefix}{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn two_pages_split_at_page_boundary() {
        let pages = vec![page(0, &words("a", 600)), page(1, &words("b", 100))];
        let c = chunk_pages(&pages, 512).unwrap();
        assert_eq!(c.len(), 3);

        assert_eq!(c[0].page_index, 0);
        assert_eq!(c[0].text.split(' ').count(), 512);
        assert!(c[0].text.starts_with("a0 "));
        assert!(c[0].text.ends_with(" a511"));

        assert_eq!(c[1].page_index, 0);
        assert_eq!(c[1].text.split(' ').count(), 88);
        assert!(c[1].text.starts_with("a512 "));
        assert!(c[1].text.ends_with(" a599"));

        assert_eq!(c[2].page_index, 1);
        assert_eq!(c[2].text, words("b", 100));

        let ordinals: Vec<usize> = c.iter().map(|ch| ch.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn chunk_count_is_ceil_of_words_over_size() {
        for (w, size) in [(1, 1), (10, 3), (9, 3), (7, 10), (1000, 512)] {
            let c = chunk_pages(&[page(0, &words("w", w))], size).unwrap();
            assert_eq!(c.len(), w.div_ceil(size), "w={w} size={size}");
        }
    }

    #[test]
    fn rejoined_chunks_reproduce_normalized_page() {
        let text = "  Deep   learning\n\nfor\tprotein  folding \n is  hard ";
        let c = chunk_pages(&[page(3, text)], 2).unwrap();
        assert_eq!(join_text(&c), "Deep learning for protein folding is hard");
        assert!(c.iter().all(|ch| ch.page_index == 3));
    }

    #[test]
    fn blank_pages_yield_no_chunks() {
        let pages = vec![page(0, ""), page(1, "  \n "), page(2, "one two")];
        let c = chunk_pages(&pages, 512).unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].page_index, 2);
        assert_eq!(c[0].ordinal, 0);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = chunk_pages(&[page(0, "text")], 0).unwrap_err();
        assert!(matches!(err, ChunkError::InvalidChunkSize));
    }
}
