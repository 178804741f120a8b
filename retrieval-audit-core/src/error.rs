//! Error types for the retrieval audit engine.

use thiserror::Error;

/// Top-level error type for audit operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Malformed audit input: empty aspect or chunk lists, inverted thresholds,
    /// shape mismatches between a similarity matrix and its inputs.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Embeddings of unequal length were compared.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A configuration value lies outside its allowed range.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuditError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AuditError>;
