//! Per-chunk noise classification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aspects::Aspect;
use crate::config::NoiseConfig;
use crate::error::{AuditError, Result};
use crate::similarity::SimilarityMatrix;

/// Role of a retrieved chunk relative to the query aspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkRole {
    Supporting,
    Partial,
    Noise,
}

impl fmt::Display for ChunkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Supporting => "supporting",
            Self::Partial => "partial",
            Self::Noise => "noise",
        };
        f.pad(s)
    }
}

/// Verdict for one retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseClassification {
    pub chunk_id: String,
    /// Best similarity of this chunk to any aspect.
    pub max_similarity: f64,
    pub classification: ChunkRole,
}

/// Anything that carries a chunk id.
pub trait ChunkIdentity {
    fn chunk_id(&self) -> &str;
}

impl ChunkIdentity for crate::index::SearchHit {
    fn chunk_id(&self) -> &str {
        &self.chunk_id
    }
}

impl ChunkIdentity for crate::index::Chunk {
    fn chunk_id(&self) -> &str {
        &self.chunk_id
    }
}

impl ChunkIdentity for &str {
    fn chunk_id(&self) -> &str {
        self
    }
}

impl ChunkIdentity for String {
    fn chunk_id(&self) -> &str {
        self
    }
}

/// Classifies each retrieved chunk by its strongest link to any aspect.
#[derive(Debug, Clone)]
pub struct NoiseClassifier {
    config: NoiseConfig,
}

impl NoiseClassifier {
    pub fn new(config: NoiseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    /// Classify every chunk column of `matrix`, whose rows are `aspects`.
    pub fn classify<C: ChunkIdentity>(
        &self,
        chunks: &[C],
        matrix: &SimilarityMatrix,
        aspects: &[Aspect],
    ) -> Result<Vec<NoiseClassification>> {
        if aspects.is_empty() {
            return Err(AuditError::validation("aspect list is empty"));
        }
        if chunks.is_empty() {
            return Err(AuditError::validation("retrieved chunk list is empty"));
        }
        matrix.ensure_shape(aspects.len(), chunks.len())?;

        let results: Vec<NoiseClassification> = chunks
            .iter()
            .enumerate()
            .map(|(j, chunk)| {
                let max_similarity = matrix.column(j).fold(f64::NEG_INFINITY, f64::max);
                NoiseClassification {
                    chunk_id: chunk.chunk_id().to_string(),
                    max_similarity,
                    classification: self.classify_similarity(max_similarity),
                }
            })
            .collect();

        let noise = results
            .iter()
            .filter(|r| r.classification == ChunkRole::Noise)
            .count();
        tracing::debug!(chunks = results.len(), noise, "Classified retrieved chunks");
        Ok(results)
    }

    /// Map a max similarity onto the bands. Lower bounds are inclusive.
    pub fn classify_similarity(&self, similarity: f64) -> ChunkRole {
        if similarity >= self.config.supporting_threshold {
            ChunkRole::Supporting
        } else if similarity >= self.config.partial_threshold {
            ChunkRole::Partial
        } else {
            ChunkRole::Noise
        }
    }
}

/// Count chunks classified as noise.
pub fn noise_count(results: &[NoiseClassification]) -> usize {
    results
        .iter()
        .filter(|r| r.classification == ChunkRole::Noise)
        .count()
}
