//! Audit session: the explicit index context a host passes around.
//!
//! Lifecycle is `create -> query* -> replace-on-new-document`. A session holds
//! at most one index; indexing a different document replaces it wholesale.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::aspects::Aspect;
use crate::audit::{AuditReport, Auditor};
use crate::chunker::chunk_text;
use crate::config::AuditConfig;
use crate::embeddings::Embedder;
use crate::error::{AuditError, Result};
use crate::index::VectorIndex;

/// What `index_document` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IndexOutcome {
    /// The document matched the loaded one; the index was kept.
    Reused,
    /// A new index replaced the previous one.
    Rebuilt { chunk_count: usize },
}

#[derive(Debug, Clone)]
struct LoadedIndex {
    fingerprint: String,
    index: VectorIndex,
}

/// One document index plus the engine that audits queries against it.
#[derive(Debug, Clone)]
pub struct AuditSession {
    auditor: Auditor,
    loaded: Option<LoadedIndex>,
}

impl AuditSession {
    pub fn new(config: AuditConfig) -> Result<Self> {
        Ok(Self {
            auditor: Auditor::new(config)?,
            loaded: None,
        })
    }

    pub fn auditor(&self) -> &Auditor {
        &self.auditor
    }

    pub fn index(&self) -> Option<&VectorIndex> {
        self.loaded.as_ref().map(|l| &l.index)
    }

    /// Fingerprint of the document behind the current index.
    pub fn fingerprint(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.fingerprint.as_str())
    }

    /// Chunk, embed and index a document, unless it is already loaded.
    ///
    /// On failure the previous index stays in place.
    pub fn index_document(&mut self, text: &str, embedder: &dyn Embedder) -> Result<IndexOutcome> {
        let fingerprint = fingerprint(text);
        if self.fingerprint() == Some(fingerprint.as_str()) {
            tracing::debug!(fingerprint = %fingerprint, "Document already indexed");
            return Ok(IndexOutcome::Reused);
        }

        let chunks = chunk_text(text, &self.auditor.config().chunking);
        if chunks.is_empty() {
            return Err(AuditError::validation("document produced no chunks"));
        }

        let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let embeddings = embedder.embed_batch(&refs);
        let index = VectorIndex::build(chunks, embeddings)?;
        let chunk_count = index.len();

        tracing::info!(
            fingerprint = %fingerprint,
            chunks = chunk_count,
            provider = embedder.provider_name(),
            "Indexed document"
        );
        self.replace_index(fingerprint, index);
        Ok(IndexOutcome::Rebuilt { chunk_count })
    }

    /// Install an externally built index, dropping the current one.
    pub fn replace_index(&mut self, fingerprint: impl Into<String>, index: VectorIndex) {
        self.loaded = Some(LoadedIndex {
            fingerprint: fingerprint.into(),
            index,
        });
    }

    /// Drop the current index.
    pub fn clear(&mut self) {
        self.loaded = None;
    }

    /// Audit a query against the loaded index.
    pub fn audit(
        &self,
        query: &str,
        query_embedding: &[f32],
        aspects: &[Aspect],
        aspect_embeddings: &[Vec<f32>],
    ) -> Result<AuditReport> {
        let index = self
            .index()
            .ok_or_else(|| AuditError::validation("no document has been indexed"))?;
        self.auditor
            .audit(index, query, query_embedding, aspects, aspect_embeddings)
    }

    /// Embed the query and aspect texts with `embedder`, then audit.
    pub fn audit_with_embedder(
        &self,
        query: &str,
        aspects: &[Aspect],
        embedder: &dyn Embedder,
    ) -> Result<AuditReport> {
        let query_embedding = embedder.embed(query);
        let texts: Vec<&str> = aspects.iter().map(|a| a.aspect_text.as_str()).collect();
        let aspect_embeddings = embedder.embed_batch(&texts);
        self.audit(query, &query_embedding, aspects, &aspect_embeddings)
    }
}

/// Hex SHA-256 of a document's text.
pub fn fingerprint(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::LocalEmbedder;

    fn document(topic: &str) -> String {
        (0..6)
            .map(|i| format!("Paragraph {i} about {topic} explains {topic} at length. "))
            .collect()
    }

    #[test]
    fn test_index_lifecycle() {
        let embedder = LocalEmbedder::default();
        let mut session = AuditSession::new(AuditConfig::default()).unwrap();
        assert!(session.index().is_none());

        let doc = document("bonds");
        let first = session.index_document(&doc, &embedder).unwrap();
        assert!(matches!(first, IndexOutcome::Rebuilt { chunk_count } if chunk_count > 0));
        let fp = session.fingerprint().unwrap().to_string();

        assert_eq!(
            session.index_document(&doc, &embedder).unwrap(),
            IndexOutcome::Reused
        );

        session.index_document(&document("equities"), &embedder).unwrap();
        assert_ne!(session.fingerprint().unwrap(), fp);
    }

    #[test]
    fn test_failed_indexing_keeps_previous_index() {
        let embedder = LocalEmbedder::default();
        let mut session = AuditSession::new(AuditConfig::default()).unwrap();
        session.index_document(&document("bonds"), &embedder).unwrap();
        let before = session.fingerprint().unwrap().to_string();

        let err = session.index_document("too short", &embedder).unwrap_err();
        assert!(matches!(err, AuditError::Validation(_)));
        assert_eq!(session.fingerprint(), Some(before.as_str()));
    }

    #[test]
    fn test_audit_without_index_fails() {
        let session = AuditSession::new(AuditConfig::default()).unwrap();
        let err = session
            .audit_with_embedder("q", &[Aspect::new("A1", "bonds")], &LocalEmbedder::default())
            .unwrap_err();
        assert!(matches!(err, AuditError::Validation(_)));
    }

    #[test]
    fn test_replace_and_clear() {
        let mut session = AuditSession::new(AuditConfig::default()).unwrap();
        let index = VectorIndex::build(vec!["a".into()], vec![vec![1.0]]).unwrap();
        session.replace_index("external", index);
        assert_eq!(session.fingerprint(), Some("external"));
        assert_eq!(session.index().map(VectorIndex::len), Some(1));
        session.clear();
        assert!(session.index().is_none());
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let fp = fingerprint("abc");
        assert_eq!(
            fp,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
