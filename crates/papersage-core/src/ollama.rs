//! Ollama client for embeddings and completion. Wraps ollama-rs behind the
//! [Embedder] and [Generator] traits.

use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::embedder::{EmbedError, Embedder, Embedding};
use crate::generator::{GenerateError, Generator};

pub const DEFAULT_EMBED_MODEL: &str = "all-minilm";
pub const DEFAULT_GENERATE_MODEL: &str = "llama3.2";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Fixed sampling seed so repeated calls on one model give the same text.
const GENERATION_SEED: i32 = 42;

/// Thin wrapper around Ollama for embedding and completion.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    inner: Ollama,
    embed_model: String,
    generate_model: String,
}

impl OllamaClient {
    /// Create from URL string. Default: http://localhost:11434.
    pub fn from_url(url: &str) -> Result<Self, OllamaError> {
        let inner = Ollama::try_new(url).map_err(OllamaError::ParseUrl)?;
        Ok(Self {
            inner,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            generate_model: DEFAULT_GENERATE_MODEL.to_string(),
        })
    }

    /// Client for the URL and models named in `config`.
    pub fn from_config(config: &Config) -> Result<Self, OllamaError> {
        Ok(Self::from_url(&config.ollama_url)?
            .with_embed_model(config.embed_model.clone())
            .with_generate_model(config.generate_model.clone()))
    }

    /// Set the embedding model (e.g. `all-minilm`, `nomic-embed-text`).
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Set the completion model (e.g. `llama3.2`, `mistral`).
    pub fn with_generate_model(mut self, model: impl Into<String>) -> Self {
        self.generate_model = model.into();
        self
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        let req = GenerateEmbeddingsRequest::new(
            self.embed_model.clone(),
            EmbeddingsInput::Single(text.to_string()),
        );
        let res = self
            .inner
            .generate_embeddings(req)
            .await
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;
        res.embeddings
            .into_iter()
            .next()
            .ok_or(EmbedError::CountMismatch {
                expected: 1,
                got: 0,
            })
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let req = GenerateEmbeddingsRequest::new(
            self.embed_model.clone(),
            EmbeddingsInput::Multiple(texts.to_vec()),
        );
        let res = self
            .inner
            .generate_embeddings(req)
            .await
            .map_err(|e| EmbedError::Unavailable(e.to_string()))?;
        debug!(model = %self.embed_model, inputs = texts.len(), "embedded batch");
        Ok(res.embeddings)
    }
}

#[async_trait]
impl Generator for OllamaClient {
    /// Ollama has no beam search; temperature 0 makes decoding greedy and
    /// `num_candidates` bounds the top-k candidate pool.
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: usize,
        num_candidates: usize,
    ) -> Result<String, GenerateError> {
        let options = ModelOptions::default()
            .temperature(0.0)
            .seed(GENERATION_SEED)
            .top_k(num_candidates.max(1) as u32)
            .num_predict(max_tokens as i32);
        let req = GenerationRequest::new(self.generate_model.clone(), prompt.to_string())
            .options(options);
        let res = self
            .inner
            .generate(req)
            .await
            .map_err(|e| GenerateError::Unavailable(e.to_string()))?;
        debug!(model = %self.generate_model, max_tokens, "generated completion");
        Ok(res.response.trim().to_string())
    }
}

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("invalid Ollama URL: {0}")]
    ParseUrl(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_models_are_applied() {
        let mut config = Config::default();
        config.embed_model = "nomic-embed-text".to_string();
        config.generate_model = "mistral".to_string();
        let client = OllamaClient::from_config(&config).unwrap();
        assert_eq!(client.embed_model, "nomic-embed-text");
        assert_eq!(client.generate_model, "mistral");
    }

    #[test]
    fn bad_url_is_rejected() {
        assert!(matches!(
            OllamaClient::from_url("not a url"),
            Err(OllamaError::ParseUrl(_))
        ));
    }
}
