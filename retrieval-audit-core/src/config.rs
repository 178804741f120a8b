//! Configuration for the retrieval audit engine.
//!
//! Uses `figment` for layered configuration: defaults -> user config -> workspace
//! config -> explicit file -> environment. Thresholds, penalty weights and the
//! definitional phrase list all live here so every classifier can be tuned and
//! tested in isolation.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AuditError, Result};

/// Top-level audit configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Aspect coverage classification.
    #[serde(default)]
    pub coverage: CoverageConfig,
    /// Per-chunk noise classification.
    #[serde(default)]
    pub noise: NoiseConfig,
    /// Integrity score composition.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Nearest-neighbour retrieval.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Aspect list parsing limits.
    #[serde(default)]
    pub aspects: AspectConfig,
    /// Document chunking.
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Local embedder settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl AuditConfig {
    /// Check every record. Out-of-range values are configuration errors; a band
    /// whose upper threshold sits below its lower one is a validation error.
    pub fn validate(&self) -> Result<()> {
        self.coverage.validate()?;
        self.noise.validate()?;
        self.scoring.validate()?;
        self.retrieval.validate()?;
        self.aspects.validate()?;
        self.chunking.validate()?;
        self.embedding.validate()
    }
}

/// Coverage analyzer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Boosted best similarity at or above this is `supported`.
    #[serde(default = "default_support_threshold")]
    pub support_threshold: f64,
    /// Boosted best similarity at or above this (and below support) is `partial`.
    #[serde(default = "default_coverage_partial_threshold")]
    pub partial_threshold: f64,
    /// Added to the best similarity when the best chunk reads like a definition.
    #[serde(default = "default_definition_boost")]
    pub definition_boost: f64,
    /// Case-insensitive phrases marking definitional text.
    #[serde(default = "default_definition_phrases")]
    pub definition_phrases: Vec<String>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            support_threshold: default_support_threshold(),
            partial_threshold: default_coverage_partial_threshold(),
            definition_boost: default_definition_boost(),
            definition_phrases: default_definition_phrases(),
        }
    }
}

impl CoverageConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit("coverage.support_threshold", self.support_threshold)?;
        check_unit("coverage.partial_threshold", self.partial_threshold)?;
        check_unit("coverage.definition_boost", self.definition_boost)?;
        check_band(
            "coverage",
            self.support_threshold,
            self.partial_threshold,
        )
    }
}

fn default_support_threshold() -> f64 {
    0.6
}

fn default_coverage_partial_threshold() -> f64 {
    0.35
}

fn default_definition_boost() -> f64 {
    0.15
}

fn default_definition_phrases() -> Vec<String> {
    ["is defined as", "refers to", "means that", "can be defined as"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Noise classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Max similarity at or above this marks a chunk `supporting`.
    #[serde(default = "default_supporting_threshold")]
    pub supporting_threshold: f64,
    /// Max similarity at or above this (and below supporting) marks it `partial`.
    #[serde(default = "default_noise_partial_threshold")]
    pub partial_threshold: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            supporting_threshold: default_supporting_threshold(),
            partial_threshold: default_noise_partial_threshold(),
        }
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit("noise.supporting_threshold", self.supporting_threshold)?;
        check_unit("noise.partial_threshold", self.partial_threshold)?;
        check_band("noise", self.supporting_threshold, self.partial_threshold)
    }
}

fn default_supporting_threshold() -> f64 {
    0.65
}

fn default_noise_partial_threshold() -> f64 {
    0.4
}

/// Integrity score weights and penalty caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Credit given to a `partial` aspect relative to a `supported` one.
    #[serde(default = "default_partial_weight")]
    pub partial_weight: f64,
    #[serde(default = "default_noise_penalty_per_chunk")]
    pub noise_penalty_per_chunk: f64,
    #[serde(default = "default_penalty_cap")]
    pub max_noise_penalty: f64,
    #[serde(default = "default_missing_penalty_per_aspect")]
    pub missing_penalty_per_aspect: f64,
    #[serde(default = "default_penalty_cap")]
    pub max_missing_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            partial_weight: default_partial_weight(),
            noise_penalty_per_chunk: default_noise_penalty_per_chunk(),
            max_noise_penalty: default_penalty_cap(),
            missing_penalty_per_aspect: default_missing_penalty_per_aspect(),
            max_missing_penalty: default_penalty_cap(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit("scoring.partial_weight", self.partial_weight)?;
        for (name, value) in [
            ("scoring.noise_penalty_per_chunk", self.noise_penalty_per_chunk),
            ("scoring.max_noise_penalty", self.max_noise_penalty),
            (
                "scoring.missing_penalty_per_aspect",
                self.missing_penalty_per_aspect,
            ),
            ("scoring.max_missing_penalty", self.max_missing_penalty),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(AuditError::config(format!(
                    "{name} must lie in [0, 100], got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn default_partial_weight() -> f64 {
    0.5
}

fn default_noise_penalty_per_chunk() -> f64 {
    10.0
}

fn default_missing_penalty_per_aspect() -> f64 {
    15.0
}

fn default_penalty_cap() -> f64 {
    30.0
}

/// Retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks fetched from the index per audit.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(AuditError::config("retrieval.top_k must be at least 1"));
        }
        Ok(())
    }
}

fn default_top_k() -> usize {
    5
}

/// Aspect list limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectConfig {
    /// Maximum aspects per query.
    #[serde(default = "default_max_aspects")]
    pub max_aspects: usize,
    /// Parsed lines shorter than this (in characters) are dropped.
    #[serde(default = "default_min_aspect_chars")]
    pub min_aspect_chars: usize,
}

impl Default for AspectConfig {
    fn default() -> Self {
        Self {
            max_aspects: default_max_aspects(),
            min_aspect_chars: default_min_aspect_chars(),
        }
    }
}

impl AspectConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_aspects == 0 {
            return Err(AuditError::config("aspects.max_aspects must be at least 1"));
        }
        Ok(())
    }
}

fn default_max_aspects() -> usize {
    3
}

fn default_min_aspect_chars() -> usize {
    5
}

/// Document chunking settings (characters, not tokens).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
    /// Trimmed windows must be strictly longer than this to be kept.
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
    /// Windows starting with any of these (case-insensitive) are dropped as
    /// headers, footers and captions.
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(AuditError::config("chunking.chunk_size must be at least 1"));
        }
        if self.overlap >= self.chunk_size {
            return Err(AuditError::config(format!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

fn default_chunk_size() -> usize {
    180
}

fn default_chunk_overlap() -> usize {
    40
}

fn default_min_chunk_chars() -> usize {
    80
}

fn default_skip_prefixes() -> Vec<String> {
    ["page ", "chapter", "figure", "table"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Local embedder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Dimensionality of the hashed term-frequency embedding.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(AuditError::config("embedding.dimensions must be at least 1"));
        }
        Ok(())
    }
}

fn default_dimensions() -> usize {
    256
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(AuditError::config(format!(
            "{name} must lie in [0, 1], got {value}"
        )));
    }
    Ok(())
}

fn check_band(name: &str, upper: f64, lower: f64) -> Result<()> {
    if upper < lower {
        return Err(AuditError::validation(format!(
            "{name} thresholds are inverted: upper {upper} < lower {lower}"
        )));
    }
    Ok(())
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `RETRIEVAL_AUDIT_`)
/// 2. Explicit config file (`--config`)
/// 3. Workspace-local config (`.retrieval-audit/config.toml`)
/// 4. User config (`~/.config/retrieval-audit/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> std::result::Result<AuditConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AuditConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "retrieval-audit", "retrieval-audit")
    {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".retrieval-audit").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        figment = figment.merge(Toml::file(path));
    }

    // RETRIEVAL_AUDIT_COVERAGE__SUPPORT_THRESHOLD, RETRIEVAL_AUDIT_RETRIEVAL__TOP_K, ...
    figment = figment.merge(Env::prefixed("RETRIEVAL_AUDIT_").split("__"));

    figment.extract().map_err(Box::new)
}
