//! In-memory vector index for chunk embeddings. Exact search, no persistence.
//! Built fresh for each document and dropped with the request.

use crate::embedder::Embedding;

/// Flat index ranking entries by squared Euclidean distance over the raw vectors.
/// Callers wanting cosine ranking normalize before building.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    items: Vec<Embedding>,
}

impl VectorIndex {
    /// Builds an index over `embeddings`. Position `i` in search results refers to
    /// `embeddings[i]`.
    pub fn build(embeddings: Vec<Embedding>) -> Result<Self, IndexError> {
        let dimension = embeddings.first().ok_or(IndexError::EmptyIndex)?.len();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                got: bad.len(),
            });
        }
        Ok(Self {
            dimension,
            items: embeddings,
        })
    }

    /// Returns up to `k` `(distance, position)` pairs, closest first.
    /// Equal distances keep the lower position first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, usize)>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        let mut scored: Vec<(f32, usize)> = self
            .items
            .iter()
            .enumerate()
            .map(|(pos, e)| (squared_l2(query, e), pos))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(k.min(self.items.len()));
        Ok(scored)
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Searches an index that may not have been built yet.
pub fn search_built(
    index: Option<&VectorIndex>,
    query: &[f32],
    k: usize,
) -> Result<Vec<(f32, usize)>, IndexError> {
    index.ok_or(IndexError::IndexNotBuilt)?.search(query, k)
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Cosine similarity in [-1, 1]. Zero vectors score 0 against everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let na = norm(a);
    let nb = norm(b);
    if na <= 0.0 || nb <= 0.0 {
        return 0.0;
    }
    dot(a, b) / (na * nb)
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    (0..n).map(|i| a[i] * b[i]).sum()
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("cannot build an index from zero embeddings")]
    EmptyIndex,
    #[error("index searched before it was built")]
    IndexNotBuilt,
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
