//! Errors surfaced by the pipeline and library. Each variant is a distinct kind the
//! caller can act on; nothing here is retried or swallowed.

use crate::catalog::CatalogError;
use crate::chunks::ChunkError;
use crate::document::ExtractError;
use crate::embedder::EmbedError;
use crate::fetch::FetchError;
use crate::generator::GenerateError;
use crate::harvest::HarvestError;
use crate::retriever::RetrieveError;
use crate::store::IndexError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("document fetch failed: {0}")]
    DocumentFetchFailed(#[from] FetchError),
    #[error("document extraction failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("could not spool document to disk: {0}")]
    Scratch(#[source] std::io::Error),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error(transparent)]
    EmbeddingUnavailable(#[from] EmbedError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    GenerationUnavailable(#[from] GenerateError),
    /// A title or topic did not resolve to any catalog entry.
    #[error("no catalog entry matches {reference:?}")]
    NoMatch { reference: String },
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("harvest error: {0}")]
    Harvest(#[from] HarvestError),
}

impl From<RetrieveError> for PipelineError {
    fn from(e: RetrieveError) -> Self {
        match e {
            RetrieveError::Embed(e) => Self::EmbeddingUnavailable(e),
            RetrieveError::Index(e) => Self::Index(e),
        }
    }
}

impl PipelineError {
    /// True for fetch or generation timeouts.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::DocumentFetchFailed(e) => e.is_timeout(),
            Self::GenerationUnavailable(GenerateError::Timeout(_)) => true,
            _ => false,
        }
    }
}
