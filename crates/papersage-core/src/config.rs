//! Persisted config (model endpoints, retrieval knobs, timeouts) in the app data directory.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::chunks::DEFAULT_CHUNK_SIZE;
use crate::generator::DEFAULT_NUM_CANDIDATES;
use crate::ollama::{DEFAULT_BASE_URL, DEFAULT_EMBED_MODEL, DEFAULT_GENERATE_MODEL};
use crate::resolver::DEFAULT_MATCH_THRESHOLD;

const CONFIG_FILENAME: &str = "config.toml";

/// Chunks retrieved per question unless the caller asks otherwise.
pub const DEFAULT_TOP_K: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ollama_url: String,
    pub embed_model: String,
    pub generate_model: String,
    /// Words per chunk.
    pub chunk_size: usize,
    pub top_k: usize,
    /// Beam width handed to the generator.
    pub num_candidates: usize,
    /// Minimum cosine similarity for title/topic resolution.
    pub match_threshold: f32,
    pub fetch_timeout_secs: u64,
    pub generate_timeout_secs: u64,
    /// Catalog JSON file. Defaults to `catalog.json` in the app data directory.
    pub catalog_path: Option<String>,
    /// Where downloads are spooled. Defaults to the system temp directory.
    pub scratch_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_BASE_URL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            generate_model: DEFAULT_GENERATE_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
            num_candidates: DEFAULT_NUM_CANDIDATES,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            fetch_timeout_secs: 60,
            generate_timeout_secs: 300,
            catalog_path: None,
            scratch_dir: None,
        }
    }
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }

    pub fn scratch_dir(&self) -> Option<PathBuf> {
        self.scratch_dir
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.catalog_path
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    let Some(data_dir) = app_data::app_data_dir() else {
        return Config::default();
    };
    let path = data_dir.join(CONFIG_FILENAME);
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Config::default();
    };
    parse_config(&s)
}

fn parse_config(s: &str) -> Config {
    toml::from_str(s).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "invalid config.toml, using defaults");
        Config::default()
    })
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let data_dir = app_data::app_data_dir().ok_or(ConfigError::NoDataDir)?;
    let path = data_dir.join(CONFIG_FILENAME);
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(&path, s).map_err(ConfigError::Write)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let c = parse_config("top_k = 5\ngenerate_model = \"mistral\"\n");
        assert_eq!(c.top_k, 5);
        assert_eq!(c.generate_model, "mistral");
        assert_eq!(c.chunk_size, 512);
        assert_eq!(c.match_threshold, 0.75);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        assert_eq!(parse_config("top_k = \"lots\""), Config::default());
    }

    #[test]
    fn round_trips_through_toml() {
        let mut c = Config::default();
        c.scratch_dir = Some("/tmp/papersage".to_string());
        let s = toml::to_string_pretty(&c).unwrap();
        assert_eq!(parse_config(&s), c);
        assert_eq!(c.scratch_dir(), Some(PathBuf::from("/tmp/papersage")));
    }

    #[test]
    fn empty_paths_mean_unset() {
        let c = parse_config("catalog_path = \"\"");
        assert_eq!(c.catalog_path(), None);
        assert_eq!(c.fetch_timeout(), Duration::from_secs(60));
    }
}
