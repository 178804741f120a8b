//! Retrieval integrity score.
//!
//! ```text
//! coverage_score  = (supported + partial_weight * partial) / total_aspects * 100
//! noise_penalty   = min(max_noise_penalty, noise_chunks * noise_penalty_per_chunk)
//! missing_penalty = min(max_missing_penalty, missing * missing_penalty_per_aspect)
//! score           = clamp(coverage_score - noise_penalty - missing_penalty, 0, 100)
//! ```
//!
//! With zero aspects the coverage score is defined as 0.

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::coverage::{Coverage, CoverageResult};
use crate::error::Result;
use crate::missing::MissingEvidence;
use crate::noise::{NoiseClassification, noise_count};

/// Final score with its breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityScore {
    /// Final score in `[0, 100]`, rounded to one decimal.
    pub score: f64,
    /// Unrounded coverage component.
    pub coverage_score: f64,
    pub noise_penalty: f64,
    pub missing_penalty: f64,
}

impl IntegrityScore {
    /// Coverage score rounded to two decimals for display.
    pub fn coverage_score_display(&self) -> f64 {
        round_to(self.coverage_score, 2)
    }
}

/// Aggregates classifications into a bounded score.
#[derive(Debug, Clone)]
pub struct IntegrityScorer {
    config: ScoringConfig,
}

impl Default for IntegrityScorer {
    fn default() -> Self {
        Self {
            config: ScoringConfig::default(),
        }
    }
}

impl IntegrityScorer {
    pub fn new(config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn score(
        &self,
        coverage: &[CoverageResult],
        noise: &[NoiseClassification],
        missing: &[MissingEvidence],
    ) -> IntegrityScore {
        let total = coverage.len();
        let supported = count(coverage, Coverage::Supported);
        let partial = count(coverage, Coverage::Partial);

        let coverage_score = if total == 0 {
            tracing::warn!("No aspects to score; coverage score is 0");
            0.0
        } else {
            (supported as f64 + self.config.partial_weight * partial as f64) / total as f64 * 100.0
        };

        let noise_chunks = noise_count(noise);
        let noise_penalty = (noise_chunks as f64 * self.config.noise_penalty_per_chunk)
            .min(self.config.max_noise_penalty);
        let missing_penalty = (missing.len() as f64 * self.config.missing_penalty_per_aspect)
            .min(self.config.max_missing_penalty);

        let raw = (coverage_score - noise_penalty - missing_penalty).clamp(0.0, 100.0);
        let score = round_to(raw, 1);

        tracing::debug!(
            total,
            supported,
            partial,
            noise_chunks,
            missing = missing.len(),
            score,
            "Integrity score"
        );

        IntegrityScore {
            score,
            coverage_score,
            noise_penalty,
            missing_penalty,
        }
    }
}

fn count(coverage: &[CoverageResult], level: Coverage) -> usize {
    coverage.iter().filter(|c| c.coverage == level).count()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
