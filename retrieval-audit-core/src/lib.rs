//! # retrieval-audit-core: Retrieval Integrity Auditing
//!
//! Audits the retrieval stage of a RAG pipeline. Given a query's aspects and the
//! chunks a retriever returned, it measures how well the chunks cover each
//! aspect, flags noisy chunks, and reduces both into a 0–100 integrity score
//! with an explicit penalty breakdown.
//!
//! ## Pipeline
//!
//! 1. [`VectorIndex`]: cosine nearest-neighbour search over one document's chunks
//! 2. [`SimilarityMatrix`]: aspect × chunk cosine similarities
//! 3. [`CoverageAnalyzer`]: supported / partial / missing per aspect
//! 4. [`NoiseClassifier`]: supporting / partial / noise per chunk
//! 5. [`IntegrityScorer`]: bounded score with coverage, noise and missing terms
//!
//! [`AuditSession`] owns the index for the currently loaded document and runs
//! the pipeline; [`Auditor`] is the stateless engine underneath it.

pub mod aspects;
pub mod audit;
pub mod chunker;
pub mod config;
pub mod coverage;
pub mod embeddings;
pub mod error;
pub mod explain;
pub mod index;
pub mod missing;
pub mod noise;
pub mod scoring;
pub mod session;
pub mod similarity;

pub use aspects::{Aspect, AspectExtractor, LineAspectExtractor, parse_aspects};
pub use audit::{AuditReport, AuditRequest, Auditor, EmbeddedAspect};
pub use config::{AuditConfig, load_config};
pub use coverage::{Coverage, CoverageAnalyzer, CoverageResult};
pub use embeddings::{Embedder, LocalEmbedder};
pub use error::{AuditError, Result};
pub use index::{Chunk, SearchHit, VectorIndex};
pub use missing::{MissingEvidence, detect_missing};
pub use noise::{ChunkRole, NoiseClassification, NoiseClassifier};
pub use scoring::{IntegrityScore, IntegrityScorer};
pub use session::{AuditSession, IndexOutcome};
pub use similarity::{SimilarityMatrix, cosine_similarity};
