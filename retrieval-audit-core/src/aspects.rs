//! Query aspects: the unit of coverage measurement.
//!
//! Extracting aspects from a query is done by an external language model. This
//! module owns the deterministic half: turning its bullet-list reply into an
//! ordered, bounded aspect list.

use serde::{Deserialize, Serialize};

use crate::config::AspectConfig;
use crate::error::Result;

/// A short factual sub-claim of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aspect {
    pub aspect_id: String,
    pub aspect_text: String,
}

impl Aspect {
    pub fn new(aspect_id: impl Into<String>, aspect_text: impl Into<String>) -> Self {
        Self {
            aspect_id: aspect_id.into(),
            aspect_text: aspect_text.into(),
        }
    }
}

/// Source of aspects for a query (typically a language model behind an API).
pub trait AspectExtractor: Send + Sync {
    /// Return at most the configured maximum number of aspects, in order.
    fn extract(&self, query: &str) -> Result<Vec<Aspect>>;

    /// Human-readable name of this extractor.
    fn name(&self) -> &str;
}

/// Treats the query itself as a bullet or newline separated aspect list.
#[derive(Debug, Clone, Default)]
pub struct LineAspectExtractor {
    config: AspectConfig,
}

impl LineAspectExtractor {
    pub fn new(config: AspectConfig) -> Self {
        Self { config }
    }
}

impl AspectExtractor for LineAspectExtractor {
    fn extract(&self, query: &str) -> Result<Vec<Aspect>> {
        Ok(parse_aspects(query, &self.config))
    }

    fn name(&self) -> &str {
        "lines"
    }
}

const BULLET_CHARS: &[char] = &['-', '•', '*', ' ', '\t'];

/// Parse a bullet list into aspects.
///
/// Bullet markers and surrounding whitespace are stripped and lines shorter
/// than `min_aspect_chars` are dropped. An aspect's id is `A<n>` where `n` is
/// its 1-based line number in the trimmed `raw`, so dropped lines leave gaps
/// in the ids.
/// The list is cut at `max_aspects`.
pub fn parse_aspects(raw: &str, config: &AspectConfig) -> Vec<Aspect> {
    let mut aspects: Vec<Aspect> = raw
        .trim()
        .lines()
        .enumerate()
        .map(|(i, line)| (i, line.trim().trim_matches(BULLET_CHARS).trim()))
        .filter(|(_, line)| line.chars().count() >= config.min_aspect_chars)
        .map(|(i, text)| Aspect::new(format!("A{}", i + 1), text))
        .collect();

    if aspects.len() > config.max_aspects {
        tracing::warn!(
            parsed = aspects.len(),
            max = config.max_aspects,
            "Truncating aspect list"
        );
        aspects.truncate(config.max_aspects);
    }
    aspects
}
