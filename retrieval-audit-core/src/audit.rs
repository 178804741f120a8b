//! The audit pipeline: search, similarity, classification, scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::aspects::Aspect;
use crate::config::AuditConfig;
use crate::coverage::{CoverageAnalyzer, CoverageResult};
use crate::error::{AuditError, Result};
use crate::explain::{explain, recommend};
use crate::index::{Chunk, SearchHit, VectorIndex};
use crate::missing::{MissingEvidence, detect_missing};
use crate::noise::{NoiseClassification, NoiseClassifier};
use crate::scoring::{IntegrityScore, IntegrityScorer};
use crate::similarity::SimilarityMatrix;

/// Everything one audit run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub run_id: Uuid,
    pub audited_at: DateTime<Utc>,
    pub query: String,
    pub aspects: Vec<Aspect>,
    pub retrieved: Vec<SearchHit>,
    pub similarity: SimilarityMatrix,
    pub coverage: Vec<CoverageResult>,
    pub noise: Vec<NoiseClassification>,
    pub missing: Vec<MissingEvidence>,
    pub score: IntegrityScore,
    pub explanations: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Stateless audit engine built from a validated configuration.
#[derive(Debug, Clone)]
pub struct Auditor {
    config: AuditConfig,
    coverage: CoverageAnalyzer,
    noise: NoiseClassifier,
    scorer: IntegrityScorer,
}

impl Auditor {
    pub fn new(config: AuditConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            coverage: CoverageAnalyzer::new(config.coverage.clone())?,
            noise: NoiseClassifier::new(config.noise.clone())?,
            scorer: IntegrityScorer::new(config.scoring.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Audit the chunks `index` returns for a query.
    ///
    /// `aspect_embeddings[i]` must embed `aspects[i]`. The retrieved chunks are
    /// compared using the embeddings stored in the index.
    pub fn audit(
        &self,
        index: &VectorIndex,
        query: &str,
        query_embedding: &[f32],
        aspects: &[Aspect],
        aspect_embeddings: &[Vec<f32>],
    ) -> Result<AuditReport> {
        if aspects.is_empty() {
            return Err(AuditError::validation("aspect list is empty"));
        }
        if aspects.len() > self.config.aspects.max_aspects {
            return Err(AuditError::validation(format!(
                "{} aspects exceed the maximum of {}",
                aspects.len(),
                self.config.aspects.max_aspects
            )));
        }
        if aspects.len() != aspect_embeddings.len() {
            return Err(AuditError::validation(format!(
                "{} aspects but {} aspect embeddings",
                aspects.len(),
                aspect_embeddings.len()
            )));
        }
        if index.is_empty() {
            return Err(AuditError::validation("vector index is empty"));
        }

        let retrieved = index.search(query_embedding, self.config.retrieval.top_k)?;
        let chunk_embeddings: Vec<&[f32]> = retrieved
            .iter()
            .filter_map(|hit| index.get(hit.position))
            .map(|chunk| chunk.embedding.as_slice())
            .collect();

        let similarity = SimilarityMatrix::compute(aspect_embeddings, &chunk_embeddings)?;
        let coverage = self.coverage.analyze(aspects, &similarity, &retrieved)?;
        let noise = self.noise.classify(&retrieved, &similarity, aspects)?;
        let missing = detect_missing(&coverage);
        let score = self.scorer.score(&coverage, &noise, &missing);

        let report = AuditReport {
            run_id: Uuid::new_v4(),
            audited_at: Utc::now(),
            query: query.to_string(),
            aspects: aspects.to_vec(),
            explanations: explain(&coverage),
            recommendations: recommend(&noise, &missing),
            retrieved,
            similarity,
            coverage,
            noise,
            missing,
            score,
        };

        tracing::info!(
            run_id = %report.run_id,
            aspects = report.aspects.len(),
            retrieved = report.retrieved.len(),
            missing = report.missing.len(),
            score = report.score.score,
            "Retrieval audit complete"
        );
        Ok(report)
    }
}

/// An aspect with its precomputed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedAspect {
    pub aspect_id: String,
    pub aspect_text: String,
    pub embedding: Vec<f32>,
}

/// A self-contained audit request with precomputed embeddings, as produced by
/// a host that already talked to its embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRequest {
    pub query: String,
    pub query_embedding: Vec<f32>,
    pub aspects: Vec<EmbeddedAspect>,
    pub chunks: Vec<Chunk>,
    /// Overrides `retrieval.top_k` when set.
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl AuditRequest {
    /// Read a JSON request from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Build the index from the request's chunks and audit it.
    pub fn run(self, config: &AuditConfig) -> Result<AuditReport> {
        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        let auditor = Auditor::new(config)?;

        let mut index = VectorIndex::new();
        for chunk in self.chunks {
            index.add(chunk.chunk_id, chunk.embedding, chunk.text)?;
        }

        let (aspects, embeddings): (Vec<Aspect>, Vec<Vec<f32>>) = self
            .aspects
            .into_iter()
            .map(|a| (Aspect::new(a.aspect_id, a.aspect_text), a.embedding))
            .unzip();

        auditor.audit(
            &index,
            &self.query,
            &self.query_embedding,
            &aspects,
            &embeddings,
        )
    }
}
