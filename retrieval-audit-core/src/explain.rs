//! Plain-language explanations and recommendations derived from an audit.

use crate::coverage::{Coverage, CoverageResult};
use crate::missing::MissingEvidence;
use crate::noise::{ChunkRole, NoiseClassification};

/// One sentence per aspect describing its coverage.
pub fn explain(coverage: &[CoverageResult]) -> Vec<String> {
    if coverage.is_empty() {
        return vec!["Retrieved documents sufficiently cover the query.".to_string()];
    }
    coverage
        .iter()
        .map(|c| match c.coverage {
            Coverage::Supported => format!(
                "The aspect '{}' is directly supported by the retrieved documents.",
                c.aspect_text
            ),
            Coverage::Partial => format!(
                "The aspect '{}' is partially supported, but no chunk provides a clear, direct explanation.",
                c.aspect_text
            ),
            Coverage::Missing => format!(
                "The aspect '{}' is missing from the retrieved documents.",
                c.aspect_text
            ),
        })
        .collect()
}

/// Actionable suggestions for improving retrieval.
pub fn recommend(noise: &[NoiseClassification], missing: &[MissingEvidence]) -> Vec<String> {
    let mut recs = Vec::new();
    if !missing.is_empty() {
        recs.push("Increase retrieval depth or improve query formulation.".to_string());
    }
    if noise.iter().any(|n| n.classification == ChunkRole::Noise) {
        recs.push("Apply re-ranking or filtering to remove noisy chunks.".to_string());
    }
    if recs.is_empty() {
        recs.push("Retrieval quality is sufficient.".to_string());
    }
    recs
}
