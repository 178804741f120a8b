//! Embedding provider seam.
//!
//! Real deployments call a hosted embedding model; the audit engine only needs
//! the resulting vectors. `LocalEmbedder` is a deterministic offline stand-in
//! used by the CLI, tests and benchmarks.

use std::collections::HashMap;

/// Trait for embedding providers. Vectors from one provider are comparable
/// with each other; nothing is promised across providers.
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Generate embeddings for a batch of texts.
    fn embed_batch(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the dimensionality of embeddings.
    fn dimensions(&self) -> usize;

    /// Return the provider name.
    fn provider_name(&self) -> &str;
}

/// Hashed term-frequency embedding, L2-normalised.
///
/// Lowercased alphanumeric terms are hashed into `dimensions` buckets. Texts
/// sharing vocabulary get high cosine similarity; text with no terms maps to
/// the zero vector.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dimensions: usize,
}

impl LocalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

/// 64-bit FNV-1a.
fn fnv1a(term: &str) -> u64 {
    term.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

impl Embedder for LocalEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lowered = text.to_lowercase();
        let mut tf: HashMap<&str, u32> = HashMap::new();
        for term in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            *tf.entry(term).or_insert(0) += 1;
        }

        for (term, count) in tf {
            let bucket = (fnv1a(term) % self.dimensions as u64) as usize;
            vector[bucket] += count as f32;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "local"
    }
}
