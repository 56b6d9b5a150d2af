//! Finding papers on an external source when the catalog has none for a topic.

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::catalog::CatalogEntry;

pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";
pub const DEFAULT_MAX_RESULTS: usize = 10;

#[async_trait]
pub trait MetadataHarvester: Send + Sync {
    /// Papers about `topic`. Each record carries `topic` as given.
    async fn search_external_source(&self, topic: &str) -> Result<Vec<CatalogEntry>, HarvestError>;
}

/// Queries the arXiv Atom API.
#[derive(Debug, Clone)]
pub struct ArxivHarvester {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl ArxivHarvester {
    pub fn new(timeout: Duration) -> Result<Self, HarvestError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("papersage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HarvestError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: ARXIV_API_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        })
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn query_url(&self, topic: &str) -> Result<Url, HarvestError> {
        let max_results = self.max_results.to_string();
        Url::parse_with_params(
            &self.base_url,
            [
                ("search_query", format!("all:{topic}").as_str()),
                ("max_results", max_results.as_str()),
            ],
        )
        .map_err(|e| HarvestError::Request(e.to_string()))
    }
}

#[async_trait]
impl MetadataHarvester for ArxivHarvester {
    async fn search_external_source(&self, topic: &str) -> Result<Vec<CatalogEntry>, HarvestError> {
        let url = self.query_url(topic)?;
        debug!(%url, "querying arXiv");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HarvestError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| HarvestError::Request(e.to_string()))?;
        let entries = parse_atom_feed(&body, topic)?;
        info!(topic, found = entries.len(), "harvested papers from arXiv");
        Ok(entries)
    }
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Published,
    Id,
}

#[derive(Default)]
struct PartialEntry {
    title: String,
    published: String,
    id: String,
}

impl PartialEntry {
    fn finish(self, topic: &str) -> Option<CatalogEntry> {
        let title = self.title.split_whitespace().collect::<Vec<_>>().join(" ");
        let year = self.published.trim().get(..4)?.parse().ok()?;
        let url = self.id.trim().to_string();
        if title.is_empty() || url.is_empty() {
            return None;
        }
        Some(CatalogEntry {
            title,
            year,
            topic: topic.to_string(),
            url,
        })
    }
}

/// Extracts `(title, year, url)` from each `<entry>` of an Atom feed.
/// Entries missing any of them are skipped.
pub fn parse_atom_feed(xml: &str, topic: &str) -> Result<Vec<CatalogEntry>, HarvestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<PartialEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => current = Some(PartialEntry::default()),
                b"title" if current.is_some() => field = Some(Field::Title),
                b"published" if current.is_some() => field = Some(Field::Published),
                b"id" if current.is_some() => field = Some(Field::Id),
                _ => field = None,
            },
            Ok(Event::Text(t)) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map_err(|e| HarvestError::Parse(e.to_string()))?;
                    push_field(entry, f, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    push_field(entry, f, &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                field = None;
                if e.local_name().as_ref() == b"entry" {
                    if let Some(entry) = current.take().and_then(|p| p.finish(topic)) {
                        entries.push(entry);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(HarvestError::Parse(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }
    Ok(entries)
}

fn push_field(entry: &mut PartialEntry, field: Field, text: &str) {
    let target = match field {
        Field::Title => &mut entry.title,
        Field::Published => &mut entry.published,
        Field::Id => &mut entry.id,
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("metadata request failed: {0}")]
    Request(String),
    #[error("metadata source returned HTTP {0}")]
    Status(u16),
    #[error("malformed metadata feed: {0}")]
    Parse(String),
}
