//! Paper pipeline: fetch → extract → chunk → embed → index → retrieve → generate.
//!
//! A [Pipeline] only holds shared, read-only handles (models, fetcher, library).
//! Everything derived from a document (pages, chunks, embeddings, index) is built
//! inside the call that needs it and dropped when that call returns, so concurrent
//! calls on one pipeline never see each other's state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::chunks::{chunk_pages, join_text, DEFAULT_CHUNK_SIZE};
use crate::config::{Config, DEFAULT_TOP_K};
use crate::document::{spool, AutoExtractor, Document, ExtractError, PageExtractor};
use crate::embedder::Embedder;
use crate::error::PipelineError;
use crate::fetch::{DocumentFetcher, FetchError};
use crate::generator::{GenerateError, Generator, Prompt, DEFAULT_NUM_CANDIDATES};
use crate::library::Library;
use crate::retriever::{IndexedDocument, Retriever};

/// Tunables for one pipeline. See [Config] for the persisted equivalents.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub top_k: usize,
    pub num_candidates: usize,
    pub fetch_timeout: Duration,
    pub generate_timeout: Duration,
    /// Directory for spooled downloads; system temp dir when `None`.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
            num_candidates: DEFAULT_NUM_CANDIDATES,
            fetch_timeout: Duration::from_secs(60),
            generate_timeout: Duration::from_secs(300),
            scratch_dir: None,
        }
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            top_k: config.top_k,
            num_candidates: config.num_candidates,
            fetch_timeout: config.fetch_timeout(),
            generate_timeout: config.generate_timeout(),
            scratch_dir: config.scratch_dir(),
        }
    }
}

/// Answer to a question about one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerResult {
    pub answer: String,
    pub source_heading: String,
    /// Pages of the chunks the answer was generated from, in retrieval order.
    pub source_pages: Vec<usize>,
}

/// [AnswerResult] tagged with the paper it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperAnswer {
    /// The URL or title as the caller passed it.
    pub reference: String,
    /// Where the paper was actually fetched from.
    pub paper_url: String,
    #[serde(flatten)]
    pub result: AnswerResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryResult {
    pub paper_name: String,
    pub summary: String,
}

pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: Arc<dyn PageExtractor>,
    library: Option<Library>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Self {
        Self {
            embedder,
            generator,
            fetcher,
            extractor: Arc::new(AutoExtractor),
            library: None,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Library used to turn paper titles into URLs.
    pub fn with_library(mut self, library: Library) -> Self {
        self.library = Some(library);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Maps a reference to a fetchable URL. Absolute http(s) URLs pass through;
    /// anything else is treated as a title and resolved through the library.
    pub async fn locate(&self, reference: &str) -> Result<String, PipelineError> {
        if is_http_url(reference) {
            return Ok(reference.to_string());
        }
        match &self.library {
            Some(library) => library.pdf_url_for_title(reference).await,
            None => Err(PipelineError::NoMatch {
                reference: reference.to_string(),
            }),
        }
    }

    /// Downloads `url` into a temp file and extracts its pages on the blocking pool.
    /// The temp file is gone by the time this returns, whatever the outcome.
    pub async fn load_document(&self, url: &str) -> Result<Document, PipelineError> {
        let bytes = tokio::time::timeout(self.options.fetch_timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
            })??;
        let file = spool(&bytes, self.options.scratch_dir.as_deref()).map_err(PipelineError::Scratch)?;
        let extractor = self.extractor.clone();
        // The closure owns the temp file, so it is dropped on the blocking thread
        // or, if the task panics, during unwinding.
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(file.path()))
            .await
            .unwrap_or_else(|e| Err(ExtractError::Aborted(e.to_string())));
        match extracted {
            Ok(doc) => {
                debug!(url, pages = doc.pages.len(), "extracted document");
                Ok(doc)
            }
            Err(ExtractError::Unsupported(reason)) => {
                warn!(url, %reason, "unsupported document, treating as empty");
                Ok(Document::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Answers `question` from the `k` (default `top_k`) chunks of one paper closest
    /// to it, and names the section those chunks came from.
    pub async fn answer_question(
        &self,
        reference: &str,
        question: &str,
        k: Option<usize>,
    ) -> Result<AnswerResult, PipelineError> {
        let url = self.locate(reference).await?;
        self.answer_from_url(&url, question, k.unwrap_or(self.options.top_k))
            .await
    }

    async fn answer_from_url(
        &self,
        url: &str,
        question: &str,
        k: usize,
    ) -> Result<AnswerResult, PipelineError> {
        info!(url, k, "answering question");
        let document = self.load_document(url).await?;
        let chunks = chunk_pages(&document.pages, self.options.chunk_size)?;

        let retrieved = if chunks.is_empty() {
            warn!(url, "document has no text, answering without context");
            Vec::new()
        } else {
            let mut indexed = IndexedDocument::unindexed(chunks);
            indexed.index(self.embedder.as_ref()).await?;
            Retriever::new(self.embedder.as_ref(), &indexed)
                .retrieve(question, k)
                .await?
        };

        let context = join_text(&retrieved);
        let answer = self.generate(Prompt::answer(question, &context)).await?;
        let source_heading = self.generate(Prompt::heading(&context)).await?;
        Ok(AnswerResult {
            answer,
            source_heading,
            source_pages: retrieved.iter().map(|c| c.page_index).collect(),
        })
    }

    /// Answers the same question for each paper, in order. Stops at the first failure.
    pub async fn answer_across_papers(
        &self,
        question: &str,
        references: &[String],
        k: Option<usize>,
    ) -> Result<Vec<PaperAnswer>, PipelineError> {
        let k = k.unwrap_or(self.options.top_k);
        let mut answers = Vec::with_capacity(references.len());
        for reference in references {
            let paper_url = self.locate(reference).await?;
            let result = self.answer_from_url(&paper_url, question, k).await?;
            answers.push(PaperAnswer {
                reference: reference.clone(),
                paper_url,
                result,
            });
        }
        Ok(answers)
    }

    /// Summarizes one paper from its full text (no retrieval).
    pub async fn summarize_paper(&self, reference: &str) -> Result<SummaryResult, PipelineError> {
        let url = self.locate(reference).await?;
        info!(url, "summarizing paper");
        let document = self.load_document(&url).await?;
        let chunks = chunk_pages(&document.pages, self.options.chunk_size)?;
        let summary = self.generate(Prompt::summary(&join_text(&chunks))).await?;
        Ok(SummaryResult {
            paper_name: paper_name(&url),
            summary,
        })
    }

    /// Summaries in input order. Stops at the first failure.
    pub async fn summarize_across_papers(
        &self,
        references: &[String],
    ) -> Result<Vec<SummaryResult>, PipelineError> {
        let mut summaries = Vec::with_capacity(references.len());
        for reference in references {
            summaries.push(self.summarize_paper(reference).await?);
        }
        Ok(summaries)
    }

    /// Summarizes every paper, then asks for future-work ideas over all summaries.
    pub async fn generate_future_work_ideas(
        &self,
        references: &[String],
    ) -> Result<String, PipelineError> {
        let summaries = self.summarize_across_papers(references).await?;
        let prompt = Prompt::future_work(
            summaries
                .iter()
                .map(|s| (s.paper_name.as_str(), s.summary.as_str())),
        );
        self.generate(prompt).await
    }

    async fn generate(&self, prompt: Prompt) -> Result<String, PipelineError> {
        let timeout = self.options.generate_timeout;
        let call = self.generator.generate(
            &prompt.text,
            prompt.max_tokens,
            self.options.num_candidates,
        );
        let text = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| GenerateError::Timeout(timeout))??;
        Ok(text)
    }
}

fn is_http_url(reference: &str) -> bool {
    Url::parse(reference)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Last non-empty path segment of `url`, or the whole string.
fn paper_name(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()?
                .filter(|s| !s.is_empty())
                .last()
                .map(str::to_string)
        })
        .unwrap_or_else(|| url.to_string())
}
