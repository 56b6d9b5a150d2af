//! Paper lookup on top of the catalog: fuzzy topic/title resolution and
//! harvesting new papers when a topic has none stored.

use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogEntry, PaperListing};
use crate::embedder::Embedder;
use crate::error::PipelineError;
use crate::harvest::MetadataHarvester;
use crate::resolver::EntityResolver;

#[derive(Clone)]
pub struct Library {
    catalog: Arc<dyn Catalog>,
    resolver: EntityResolver,
    harvester: Option<Arc<dyn MetadataHarvester>>,
}

impl Library {
    pub fn new(catalog: Arc<dyn Catalog>, embedder: Arc<dyn Embedder>, threshold: f32) -> Self {
        Self {
            catalog,
            resolver: EntityResolver::new(embedder, threshold),
            harvester: None,
        }
    }

    /// Source consulted when a topic has no stored papers.
    pub fn with_harvester(mut self, harvester: Arc<dyn MetadataHarvester>) -> Self {
        self.harvester = Some(harvester);
        self
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Stored topic closest to `topic` (lowercased), if any clears the threshold.
    pub async fn resolve_topic(&self, topic: &str) -> Result<Option<String>, PipelineError> {
        let topics = self.catalog.get_topics().await?;
        let resolved = self.resolver.resolve(&topic.to_lowercase(), &topics).await?;
        debug!(
            topic,
            matched = ?resolved.matched,
            score = ?resolved.score,
            threshold = self.resolver.threshold(),
            "resolved topic"
        );
        Ok(resolved.matched)
    }

    /// Papers on `topic` within the optional inclusive year bounds. When the catalog
    /// has none, harvested records are stored and the query is run again.
    /// An unresolvable topic yields an empty list.
    pub async fn get_papers(
        &self,
        topic: &str,
        year_from: Option<i32>,
        year_to: Option<i32>,
    ) -> Result<Vec<PaperListing>, PipelineError> {
        if let Some(stored) = self.resolve_topic(topic).await? {
            let papers = self.catalog.query_papers(&stored, year_from, year_to).await?;
            if !papers.is_empty() {
                return Ok(papers);
            }
        }
        let Some(harvester) = &self.harvester else {
            return Ok(Vec::new());
        };
        let harvested = harvester.search_external_source(topic).await?;
        info!(topic, count = harvested.len(), "storing harvested papers");
        for entry in harvested {
            self.catalog.create_paper(entry).await?;
        }
        match self.resolve_topic(topic).await? {
            Some(stored) => Ok(self.catalog.query_papers(&stored, year_from, year_to).await?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn add_paper(&self, entry: CatalogEntry) -> Result<(), PipelineError> {
        Ok(self.catalog.create_paper(entry).await?)
    }

    /// PDF URL for the stored title closest to `title`.
    pub async fn pdf_url_for_title(&self, title: &str) -> Result<String, PipelineError> {
        let titles = self.catalog.get_titles().await?;
        let resolved = self.resolver.resolve(title, &titles).await?;
        debug!(
            title,
            matched = ?resolved.matched,
            score = ?resolved.score,
            threshold = self.resolver.threshold(),
            "resolved title"
        );
        let no_match = || PipelineError::NoMatch {
            reference: title.to_string(),
        };
        let canonical = resolved.matched.ok_or_else(no_match)?;
        let url = self
            .catalog
            .get_url_for_title(&canonical)
            .await?
            .ok_or_else(no_match)?;
        Ok(to_pdf_url(&url))
    }
}

/// Turns an arXiv abstract link into its PDF link; other URLs just get `.pdf`.
pub fn to_pdf_url(url: &str) -> String {
    let url = url.replacen("/abs/", "/pdf/", 1);
    if url.ends_with(".pdf") {
        url
    } else {
        format!("{url}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::JsonCatalog;
    use crate::harvest::HarvestError;
    use crate::test_support::StubEmbedder;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedHarvester {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataHarvester for FixedHarvester {
        async fn search_external_source(
            &self,
            topic: &str,
        ) -> Result<Vec<CatalogEntry>, HarvestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![CatalogEntry {
                title: "Harvested".to_string(),
                year: 2021,
                topic: topic.to_string(),
                url: "http://arxiv.org/abs/2101.00001v1".to_string(),
            }])
        }
    }

    fn entry(title: &str, year: i32, topic: &str, url: &str) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            year,
            topic: topic.to_string(),
            url: url.to_string(),
        }
    }

    fn library(entries: Vec<CatalogEntry>) -> (Library, Arc<FixedHarvester>) {
        let harvester = Arc::new(FixedHarvester {
            calls: AtomicUsize::new(0),
        });
        let lib = Library::new(
            Arc::new(JsonCatalog::with_entries(entries)),
            Arc::new(StubEmbedder::new()),
            0.9,
        )
        .with_harvester(harvester.clone());
        (lib, harvester)
    }

    #[test]
    fn pdf_url_rewrites_abstract_links() {
        assert_eq!(
            to_pdf_url("http://arxiv.org/abs/1706.03762v7"),
            "http://arxiv.org/pdf/1706.03762v7.pdf"
        );
        assert_eq!(to_pdf_url("https://x.org/a.pdf"), "https://x.org/a.pdf");
    }

    #[tokio::test]
    async fn stored_topic_is_matched_case_insensitively() {
        let (lib, harvester) = library(vec![
            entry("Paper A", 2019, "graphs", "http://arxiv.org/abs/1"),
            entry("Paper B", 2022, "graphs", "http://arxiv.org/abs/2"),
        ]);
        let papers = lib.get_papers("GRAPHS", Some(2020), None).await.unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Paper B");
        assert_eq!(harvester.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_topic_is_harvested_and_stored() {
        let (lib, harvester) = library(Vec::new());
        let papers = lib.get_papers("robotics", None, None).await.unwrap();
        assert_eq!(harvester.calls.load(Ordering::SeqCst), 1);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Harvested");
        assert_eq!(
            lib.catalog().get_topics().await.unwrap(),
            vec!["robotics".to_string()]
        );
    }

    #[tokio::test]
    async fn title_resolves_to_pdf_url() {
        let (lib, _) = library(vec![entry(
            "Attention Is All You Need",
            2017,
            "nlp",
            "http://arxiv.org/abs/1706.03762v7",
        )]);
        let url = lib
            .pdf_url_for_title("attention is all you need")
            .await
            .unwrap();
        assert_eq!(url, "http://arxiv.org/pdf/1706.03762v7.pdf");
    }

    #[tokio::test]
    async fn unknown_title_is_no_match() {
        let (lib, _) = library(vec![entry("zzzz", 2017, "nlp", "http://x/abs/1")]);
        let err = lib.pdf_url_for_title("aaaa").await.unwrap_err();
        assert!(matches!(err, PipelineError::NoMatch { reference } if reference == "aaaa"));
    }
}
