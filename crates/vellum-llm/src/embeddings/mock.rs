//! Mock embedding provider for testing
//!
//! Produces deterministic pseudo-embeddings derived from the input text, so
//! identical texts embed identically across runs and differing texts almost
//! never collide.

use async_trait::async_trait;

use crate::error::EmbeddingResult;

use super::EmbeddingProvider;

/// Deterministic, network-free embedding provider.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    /// Provider producing 768-dimensional vectors.
    pub fn new() -> Self {
        Self::with_dimensions(768)
    }

    /// Provider producing vectors of the given size.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn seed(text: &str) -> u64 {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in text.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut state = Self::seed(text);
        let mut vector = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            vector.push(((state % 2000) as f32 / 1000.0) - 1.0);
        }

        // Unit-normalize so distances behave like real embeddings
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}
