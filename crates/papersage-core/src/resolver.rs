//! Fuzzy matching of user-typed titles and topics to catalog entries.
//!
//! The query and every candidate are embedded together; the candidate with the
//! highest cosine similarity wins if it reaches the threshold.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::embedder::{EmbedError, Embedder};
use crate::store::cosine_similarity;

/// Minimum cosine similarity for a match.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.75;

/// Outcome of one resolution. `matched` is `None` when nothing reached the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedReference {
    pub matched: Option<String>,
    /// Best similarity seen, if there were any candidates.
    pub score: Option<f32>,
}

impl ResolvedReference {
    pub fn no_match() -> Self {
        Self {
            matched: None,
            score: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }
}

/// Resolves `query` against `candidates`. Ties at the top score go to the earliest
/// candidate. No candidates means no match and no embedder call.
pub async fn resolve(
    embedder: &dyn Embedder,
    query: &str,
    candidates: &[String],
    threshold: f32,
) -> Result<ResolvedReference, EmbedError> {
    if candidates.is_empty() {
        return Ok(ResolvedReference::no_match());
    }
    let mut texts = Vec::with_capacity(candidates.len() + 1);
    texts.push(query.to_string());
    texts.extend(candidates.iter().cloned());
    let embeddings = embedder.embed_many(&texts).await?;
    if embeddings.len() != texts.len() {
        return Err(EmbedError::CountMismatch {
            expected: texts.len(),
            got: embeddings.len(),
        });
    }
    let (query_vec, candidate_vecs) = embeddings.split_at(1);
    let dimension = query_vec[0].len();
    if let Some(bad) = candidate_vecs.iter().find(|v| v.len() != dimension) {
        return Err(EmbedError::DimensionMismatch {
            expected: dimension,
            got: bad.len(),
        });
    }

    let mut best: Option<(usize, f32)> = None;
    for (i, v) in candidate_vecs.iter().enumerate() {
        let score = cosine_similarity(&query_vec[0], v);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    let Some((idx, score)) = best else {
        return Ok(ResolvedReference::no_match());
    };
    debug!(query, candidate = %candidates[idx], score, threshold, "best resolver candidate");
    Ok(ResolvedReference {
        matched: (score >= threshold).then(|| candidates[idx].clone()),
        score: Some(score),
    })
}

/// [resolve] with a fixed embedder and threshold.
#[derive(Clone)]
pub struct EntityResolver {
    embedder: Arc<dyn Embedder>,
    threshold: f32,
}

impl EntityResolver {
    pub fn new(embedder: Arc<dyn Embedder>, threshold: f32) -> Self {
        Self {
            embedder,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub async fn resolve(
        &self,
        query: &str,
        candidates: &[String],
    ) -> Result<ResolvedReference, EmbedError> {
        resolve(self.embedder.as_ref(), query, candidates, self.threshold).await
    }
}
