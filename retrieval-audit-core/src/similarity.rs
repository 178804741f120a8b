//! Cosine similarity and the aspect × chunk similarity matrix.

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Vectors must share a dimension. A zero-norm (or non-finite) vector has
/// similarity `0.0` with everything, so one degenerate embedding lowers a score
/// instead of failing the whole audit.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(AuditError::dimension_mismatch(a.len(), b.len()));
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    // One sqrt over the product: sqrt(n * n) rounds back to n, so a vector
    // compared with itself yields exactly 1.0.
    let sim = dot / (norm_a * norm_b).sqrt();
    if !sim.is_finite() {
        return Ok(0.0);
    }
    Ok(sim.clamp(-1.0, 1.0))
}

/// True when the vector has zero (or non-finite) L2 norm.
pub fn is_degenerate(v: &[f32]) -> bool {
    let norm: f64 = v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum();
    norm == 0.0 || !norm.is_finite()
}

/// Pairwise cosine similarities: rows are aspects, columns are retrieved chunks.
///
/// Serializes as a list of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<f64>>", try_from = "Vec<Vec<f64>>")]
pub struct SimilarityMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    /// Compute one similarity per (aspect, chunk) pair.
    ///
    /// Every embedding on both sides must share the dimension of the first aspect
    /// embedding (or of the first chunk embedding when there are no aspects).
    pub fn compute<A, C>(aspect_embeddings: &[A], chunk_embeddings: &[C]) -> Result<Self>
    where
        A: AsRef<[f32]>,
        C: AsRef<[f32]>,
    {
        let aspects: Vec<&[f32]> = aspect_embeddings.iter().map(|a| a.as_ref()).collect();
        let chunks: Vec<&[f32]> = chunk_embeddings.iter().map(|c| c.as_ref()).collect();

        let dim = aspects.first().or_else(|| chunks.first()).map(|v| v.len());
        if let Some(dim) = dim {
            if let Some(bad) = aspects.iter().chain(&chunks).find(|v| v.len() != dim) {
                return Err(AuditError::dimension_mismatch(dim, bad.len()));
            }
        }

        let rows = aspects.len();
        let cols = chunks.len();
        let mut values = Vec::with_capacity(rows * cols);
        for a in &aspects {
            for c in &chunks {
                values.push(cosine_similarity(a, c)?);
            }
        }

        let degenerate = aspects
            .iter()
            .chain(&chunks)
            .filter(|v| is_degenerate(v))
            .count();
        if degenerate > 0 {
            tracing::warn!(
                degenerate,
                "Zero-norm embeddings in similarity input; their similarities are 0"
            );
        }
        tracing::debug!(rows, cols, "Computed similarity matrix");

        Ok(Self { rows, cols, values })
    }

    /// Build a matrix from explicit rows. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(AuditError::validation(format!(
                "ragged similarity matrix: expected {cols} columns, found a row with {}",
                bad.len()
            )));
        }
        let n_rows = rows.len();
        Ok(Self {
            rows: n_rows,
            cols,
            values: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of aspect rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of chunk columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            self.values.get(row * self.cols + col).copied()
        } else {
            None
        }
    }

    /// The similarities of one aspect against every chunk.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row < self.rows {
            Some(&self.values[row * self.cols..(row + 1) * self.cols])
        } else {
            None
        }
    }

    /// The similarities of one chunk against every aspect.
    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.rows).filter_map(move |row| self.get(row, col))
    }

    /// Fail unless the matrix is exactly `aspects × chunks`.
    pub fn ensure_shape(&self, aspects: usize, chunks: usize) -> Result<()> {
        if self.shape() != (aspects, chunks) {
            return Err(AuditError::validation(format!(
                "similarity matrix is {}x{}, expected {aspects}x{chunks}",
                self.rows, self.cols
            )));
        }
        Ok(())
    }

    /// Row-major copy, one `Vec` per aspect.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows)
            .filter_map(|r| self.row(r).map(<[f64]>::to_vec))
            .collect()
    }
}

impl From<SimilarityMatrix> for Vec<Vec<f64>> {
    fn from(matrix: SimilarityMatrix) -> Self {
        matrix.to_rows()
    }
}

impl TryFrom<Vec<Vec<f64>>> for SimilarityMatrix {
    type Error = AuditError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(rows)
    }
}
