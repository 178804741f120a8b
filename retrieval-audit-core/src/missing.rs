//! Missing evidence: aspects that no retrieved chunk supports even partially.

use serde::{Deserialize, Serialize};

use crate::coverage::{Coverage, CoverageResult};

/// An aspect with no supporting or partial chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingEvidence {
    pub aspect_id: String,
    pub aspect_text: String,
}

/// Collect the `missing` aspects, in aspect order.
pub fn detect_missing(coverage: &[CoverageResult]) -> Vec<MissingEvidence> {
    coverage
        .iter()
        .filter(|c| c.coverage == Coverage::Missing)
        .map(|c| MissingEvidence {
            aspect_id: c.aspect_id.clone(),
            aspect_text: c.aspect_text.clone(),
        })
        .collect()
}
