//! All backend logic independent of how the app is run (CLI or an HTTP layer).
//!
//! Papers are fetched, chunked, embedded and indexed per request; only config and the
//! paper catalog live in the app data directory (see [app_data]).

pub mod app_data;
pub mod catalog;
pub mod chunks;
pub mod config;
pub mod document;
pub mod embedder;
pub mod error;
pub mod fetch;
pub mod generator;
pub mod harvest;
pub mod library;
pub mod ollama;
pub mod pipeline;
pub mod resolver;
pub mod retriever;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use app_data::app_data_dir;
pub use catalog::{Catalog, CatalogEntry, CatalogError, JsonCatalog, PaperListing};
pub use chunks::{chunk_pages, Chunk, ChunkError, DEFAULT_CHUNK_SIZE};
pub use config::{load_config, save_config, Config, ConfigError};
pub use document::{AutoExtractor, Document, Page, PageExtractor, PdfExtractor, PlainTextExtractor};
pub use embedder::{EmbedError, Embedder, Embedding};
pub use error::PipelineError;
pub use fetch::{DocumentFetcher, FetchError, HttpFetcher};
pub use generator::{GenerateError, Generator, Prompt};
pub use harvest::{ArxivHarvester, HarvestError, MetadataHarvester};
pub use library::Library;
pub use ollama::{OllamaClient, OllamaError};
pub use pipeline::{AnswerResult, PaperAnswer, Pipeline, PipelineOptions, SummaryResult};
pub use resolver::{resolve, EntityResolver, ResolvedReference, DEFAULT_MATCH_THRESHOLD};
pub use retriever::{IndexedDocument, Retriever};
pub use store::{IndexError, VectorIndex};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "papersage-core ready"
}
