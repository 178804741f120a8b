//! Per-aspect coverage classification.
//!
//! Each aspect is judged by its best-matching retrieved chunk. When that chunk
//! reads like a definition, its similarity receives a small boost (clamped to
//! 1.0) before the threshold bands are applied.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aspects::Aspect;
use crate::config::CoverageConfig;
use crate::error::{AuditError, Result};
use crate::similarity::SimilarityMatrix;

/// How well the retrieved chunks support an aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    Supported,
    Partial,
    Missing,
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Supported => "supported",
            Self::Partial => "partial",
            Self::Missing => "missing",
        };
        f.pad(s)
    }
}

/// Coverage verdict for one aspect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    pub aspect_id: String,
    pub aspect_text: String,
    /// Column of the best-matching chunk in the similarity matrix.
    pub best_chunk_index: usize,
    /// Best similarity after the definitional boost.
    pub best_similarity: f64,
    /// Best similarity as computed, before any boost.
    pub raw_similarity: f64,
    /// Whether the definitional boost was applied.
    pub boosted: bool,
    pub coverage: Coverage,
}

/// Classifies each aspect as supported, partial or missing.
#[derive(Debug, Clone)]
pub struct CoverageAnalyzer {
    config: CoverageConfig,
    phrases: Vec<String>,
}

impl CoverageAnalyzer {
    pub fn new(config: CoverageConfig) -> Result<Self> {
        config.validate()?;
        let phrases = config
            .definition_phrases
            .iter()
            .map(|p| p.to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Ok(Self { config, phrases })
    }

    pub fn config(&self) -> &CoverageConfig {
        &self.config
    }

    /// Analyze every aspect row of `matrix` against the retrieved chunk texts.
    pub fn analyze<T: AsRef<str>>(
        &self,
        aspects: &[Aspect],
        matrix: &SimilarityMatrix,
        retrieved_chunks: &[T],
    ) -> Result<Vec<CoverageResult>> {
        if aspects.is_empty() {
            return Err(AuditError::validation("aspect list is empty"));
        }
        if retrieved_chunks.is_empty() {
            return Err(AuditError::validation("retrieved chunk list is empty"));
        }
        matrix.ensure_shape(aspects.len(), retrieved_chunks.len())?;

        let mut results = Vec::with_capacity(aspects.len());
        for (i, aspect) in aspects.iter().enumerate() {
            let row = matrix
                .row(i)
                .ok_or_else(|| AuditError::validation(format!("missing matrix row {i}")))?;
            let (best_idx, raw) = argmax(row);

            let boosted = self.is_definitional(retrieved_chunks[best_idx].as_ref());
            let best_similarity = if boosted {
                (raw + self.config.definition_boost).min(1.0)
            } else {
                raw
            };
            let coverage = self.classify(best_similarity);

            tracing::debug!(
                aspect_id = %aspect.aspect_id,
                best_idx,
                raw,
                best_similarity,
                boosted,
                %coverage,
                "Aspect coverage"
            );

            results.push(CoverageResult {
                aspect_id: aspect.aspect_id.clone(),
                aspect_text: aspect.aspect_text.clone(),
                best_chunk_index: best_idx,
                best_similarity,
                raw_similarity: raw,
                boosted,
                coverage,
            });
        }
        Ok(results)
    }

    /// Map a (boosted) similarity onto the coverage bands. Lower bounds are inclusive.
    pub fn classify(&self, similarity: f64) -> Coverage {
        if similarity >= self.config.support_threshold {
            Coverage::Supported
        } else if similarity >= self.config.partial_threshold {
            Coverage::Partial
        } else {
            Coverage::Missing
        }
    }

    /// Whether `text` contains any definitional phrase, ignoring case.
    pub fn is_definitional(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}

/// Index and value of the first maximum.
fn argmax(row: &[f64]) -> (usize, f64) {
    let mut best = (0, row.first().copied().unwrap_or(0.0));
    for (j, &v) in row.iter().enumerate().skip(1) {
        if v > best.1 {
            best = (j, v);
        }
    }
    best
}
