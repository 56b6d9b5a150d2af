//! Embedding capability. Anything that turns text into fixed-width vectors
//! (local model, Ollama, remote service) plugs in behind [Embedder].

use async_trait::async_trait;

/// A dense vector produced by one embedding model.
pub type Embedding = Vec<f32>;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one string. The same text always yields the same vector for a given model.
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError>;

    /// Embed many strings; one vector per input, in input order.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbedError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),
    #[error("embedding model returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
