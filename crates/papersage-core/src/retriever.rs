//! Top-k chunk retrieval: embed the question, search the index, map hits back to chunks.

use tracing::debug;

use crate::chunks::Chunk;
use crate::embedder::{EmbedError, Embedder};
use crate::store::{search_built, IndexError, VectorIndex};

/// Chunks of one document plus their index. Owned by a single request.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    chunks: Vec<Chunk>,
    index: Option<VectorIndex>,
}

impl IndexedDocument {
    /// Wraps chunks without indexing them. Retrieval fails until [Self::index] runs.
    pub fn unindexed(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks,
            index: None,
        }
    }

    /// Embeds every chunk in one batch and builds the index.
    pub async fn index(&mut self, embedder: &dyn Embedder) -> Result<(), RetrieveError> {
        let texts: Vec<String> = self.chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed_many(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                got: embeddings.len(),
            }
            .into());
        }
        let index = VectorIndex::build(embeddings)?;
        debug!(chunks = index.len(), dimension = index.dimension(), "built chunk index");
        self.index = Some(index);
        Ok(())
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }
}

/// Answers "which chunks are closest to this question" for one indexed document.
pub struct Retriever<'a> {
    embedder: &'a dyn Embedder,
    document: &'a IndexedDocument,
}

impl<'a> Retriever<'a> {
    pub fn new(embedder: &'a dyn Embedder, document: &'a IndexedDocument) -> Self {
        Self { embedder, document }
    }

    /// Returns at most `k` chunks, closest first. Ties keep the earlier chunk first.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Chunk>, RetrieveError> {
        // Check before paying for the question embedding.
        let index = self
            .document
            .index
            .as_ref()
            .ok_or(IndexError::IndexNotBuilt)?;
        let query = self.embedder.embed(question).await?;
        let hits = search_built(Some(index), &query, k)?;
        Ok(hits
            .into_iter()
            .map(|(_, pos)| self.document.chunks()[pos].clone())
            .collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error(transparent)]
    Index(#[from] IndexError),
}
