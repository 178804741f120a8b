//! In-memory nearest-neighbour index over one document's chunks.
//!
//! A linear scan with cosine similarity. Adequate at session scale (a few
//! hundred chunks per document); there is no approximate fallback.

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::similarity::{cosine_similarity, is_degenerate};

/// A chunk of source text with its embedding. Immutable once indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub text: String,
    pub similarity_score: f64,
    /// Insertion position of the chunk in the index.
    pub position: usize,
}

impl AsRef<str> for SearchHit {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Append-only vector index.
///
/// Chunk ids are not deduplicated; uniqueness is the caller's concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Build an index from parallel lists of chunk texts and embeddings,
    /// assigning ids `chunk_0`, `chunk_1`, ...
    pub fn build(texts: Vec<String>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if texts.len() != embeddings.len() {
            return Err(AuditError::validation(format!(
                "{} chunks but {} embeddings",
                texts.len(),
                embeddings.len()
            )));
        }
        let mut index = Self::new();
        for (i, (text, embedding)) in texts.into_iter().zip(embeddings).enumerate() {
            index.add(format!("chunk_{i}"), embedding, text)?;
        }
        tracing::info!(
            chunks = index.len(),
            dimension = index.dimension().unwrap_or(0),
            "Built vector index"
        );
        Ok(index)
    }

    /// Append a chunk. The first chunk fixes the index dimension; later
    /// embeddings must match it.
    pub fn add(
        &mut self,
        chunk_id: impl Into<String>,
        embedding: Vec<f32>,
        text: impl Into<String>,
    ) -> Result<()> {
        let chunk_id = chunk_id.into();
        if embedding.is_empty() {
            return Err(AuditError::validation(format!(
                "chunk '{chunk_id}' has an empty embedding"
            )));
        }
        if let Some(dim) = self.dimension() {
            if embedding.len() != dim {
                return Err(AuditError::dimension_mismatch(dim, embedding.len()));
            }
        }
        if is_degenerate(&embedding) {
            tracing::warn!(chunk_id = %chunk_id, "Indexing zero-norm embedding");
        }
        self.chunks.push(Chunk {
            chunk_id,
            text: text.into(),
            embedding,
        });
        Ok(())
    }

    /// Up to `top_k` chunks by descending cosine similarity to the query.
    /// Exact ties keep insertion order.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let mut scored = Vec::with_capacity(self.chunks.len());
        for (position, chunk) in self.chunks.iter().enumerate() {
            scored.push((position, cosine_similarity(query_embedding, &chunk.embedding)?));
        }

        // Stable sort: equal scores stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        tracing::debug!(
            indexed = self.chunks.len(),
            top_k,
            returned = scored.len(),
            "Vector search"
        );

        Ok(scored
            .into_iter()
            .map(|(position, similarity_score)| {
                let chunk = &self.chunks[position];
                SearchHit {
                    chunk_id: chunk.chunk_id.clone(),
                    text: chunk.text.clone(),
                    similarity_score,
                    position,
                }
            })
            .collect())
    }

    /// The chunk at an insertion position.
    pub fn get(&self, position: usize) -> Option<&Chunk> {
        self.chunks.get(position)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimension, fixed by the first chunk.
    pub fn dimension(&self) -> Option<usize> {
        self.chunks.first().map(|c| c.embedding.len())
    }
}
