//! Paper catalog: what papers we know about, by topic, with their URLs.
//!
//! The pipeline only reads from it, except to persist records found by a
//! [crate::harvest::MetadataHarvester].

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app_data;

const CATALOG_FILENAME: &str = "catalog.json";

/// One stored paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub year: i32,
    pub topic: String,
    pub url: String,
}

/// A row returned by [Catalog::query_papers].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperListing {
    pub title: String,
    pub year: i32,
    pub url: String,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Distinct topics in first-seen order.
    async fn get_topics(&self) -> Result<Vec<String>, CatalogError>;
    /// Every stored title in insertion order.
    async fn get_titles(&self) -> Result<Vec<String>, CatalogError>;
    /// URL of the first paper with exactly this title.
    async fn get_url_for_title(&self, title: &str) -> Result<Option<String>, CatalogError>;
    /// Papers with exactly this topic whose year falls in the inclusive bounds given.
    async fn query_papers(
        &self,
        topic: &str,
        year_from: Option<i32>,
        year_to: Option<i32>,
    ) -> Result<Vec<PaperListing>, CatalogError>;
    async fn create_paper(&self, entry: CatalogEntry) -> Result<(), CatalogError>;
}

/// Catalog held in memory and, when opened from a path, mirrored to a JSON file
/// after every write.
#[derive(Debug, Default)]
pub struct JsonCatalog {
    path: Option<PathBuf>,
    entries: RwLock<Vec<CatalogEntry>>,
}

impl JsonCatalog {
    /// A catalog that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<CatalogEntry>) -> Self {
        Self {
            path: None,
            entries: RwLock::new(entries),
        }
    }

    /// Loads `path` if it exists; otherwise starts empty and creates it on first write.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let entries = match std::fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).map_err(CatalogError::Parse)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(CatalogError::Read(path.to_path_buf(), e)),
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            entries: RwLock::new(entries),
        })
    }

    /// Opens `catalog.json` in the app data directory.
    pub fn open_default() -> Result<Self, CatalogError> {
        let dir = app_data::app_data_dir().ok_or(CatalogError::NoDataDir)?;
        Self::open(&dir.join(CATALOG_FILENAME))
    }

    fn save(&self, entries: &[CatalogEntry]) -> Result<(), CatalogError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let s = serde_json::to_string_pretty(entries).map_err(CatalogError::Parse)?;
        std::fs::write(path, s).map_err(|e| CatalogError::Write(path.clone(), e))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<CatalogEntry>>, CatalogError> {
        self.entries.read().map_err(|_| CatalogError::Poisoned)
    }
}

#[async_trait]
impl Catalog for JsonCatalog {
    async fn get_topics(&self) -> Result<Vec<String>, CatalogError> {
        let entries = self.read()?;
        let mut topics: Vec<String> = Vec::new();
        for e in entries.iter() {
            if !topics.contains(&e.topic) {
                topics.push(e.topic.clone());
            }
        }
        Ok(topics)
    }

    async fn get_titles(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.read()?.iter().map(|e| e.title.clone()).collect())
    }

    async fn get_url_for_title(&self, title: &str) -> Result<Option<String>, CatalogError> {
        Ok(self
            .read()?
            .iter()
            .find(|e| e.title == title)
            .map(|e| e.url.clone()))
    }

    async fn query_papers(
        &self,
        topic: &str,
        year_from: Option<i32>,
        year_to: Option<i32>,
    ) -> Result<Vec<PaperListing>, CatalogError> {
        Ok(self
            .read()?
            .iter()
            .filter(|e| e.topic == topic)
            .filter(|e| year_from.map_or(true, |y| e.year >= y))
            .filter(|e| year_to.map_or(true, |y| e.year <= y))
            .map(|e| PaperListing {
                title: e.title.clone(),
                year: e.year,
                url: e.url.clone(),
            })
            .collect())
    }

    async fn create_paper(&self, entry: CatalogEntry) -> Result<(), CatalogError> {
        let mut entries = self.entries.write().map_err(|_| CatalogError::Poisoned)?;
        debug!(title = %entry.title, topic = %entry.topic, "storing paper");
        entries.push(entry);
        self.save(&entries)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to read catalog {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to write catalog {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("invalid catalog file: {0}")]
    Parse(serde_json::Error),
    #[error("catalog lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, year: i32, topic: &str) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            year,
            topic: topic.to_string(),
            url: format!("http://arxiv.org/abs/{}", title.replace(' ', "-")),
        }
    }

    fn sample() -> JsonCatalog {
        JsonCatalog::with_entries(vec![
            entry("Attention Is All You Need", 2017, "deep learning"),
            entry("BERT", 2018, "deep learning"),
            entry("Spanner", 2012, "databases"),
            entry("GPT-3", 2020, "deep learning"),
        ])
    }

    #[tokio::test]
    async fn topics_are_distinct_in_first_seen_order() {
        let topics = sample().get_topics().await.unwrap();
        assert_eq!(topics, vec!["deep learning", "databases"]);
    }

    #[tokio::test]
    async fn year_bounds_are_inclusive_and_optional() {
        let c = sample();
        let titles = |rows: Vec<PaperListing>| -> Vec<String> {
            rows.into_iter().map(|r| r.title).collect()
        };
        let all = c.query_papers("deep learning", None, None).await.unwrap();
        assert_eq!(all.len(), 3);
        let ranged = c
            .query_papers("deep learning", Some(2018), Some(2020))
            .await
            .unwrap();
        assert_eq!(titles(ranged), vec!["BERT", "GPT-3"]);
        let from = c.query_papers("deep learning", Some(2019), None).await.unwrap();
        assert_eq!(titles(from), vec!["GPT-3"]);
        let to = c.query_papers("deep learning", None, Some(2017)).await.unwrap();
        assert_eq!(titles(to), vec!["Attention Is All You Need"]);
    }

    #[tokio::test]
    async fn url_lookup_is_exact() {
        let c = sample();
        assert_eq!(
            c.get_url_for_title("BERT").await.unwrap().as_deref(),
            Some("http://arxiv.org/abs/BERT")
        );
        assert_eq!(c.get_url_for_title("bert").await.unwrap(), None);
    }

    #[tokio::test]
    async fn writes_survive_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        let c = JsonCatalog::open(&path).unwrap();
        assert!(c.get_titles().await.unwrap().is_empty());
        c.create_paper(entry("Spanner", 2012, "databases")).await.unwrap();

        let reopened = JsonCatalog::open(&path).unwrap();
        assert_eq!(reopened.get_titles().await.unwrap(), vec!["Spanner"]);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonCatalog::open(&path), Err(CatalogError::Parse(_))));
    }
}
