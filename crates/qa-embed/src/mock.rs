//! Deterministic embedder for tests and model-free runs.

use async_trait::async_trait;

use qa_core::{Embedder, QaError, Result};

use crate::bm25::tokenize;
use crate::onnx::l2_normalize;

/// A mock embedder that doesn't require actual models.
///
/// Each token is hashed into a few dimensions, so texts sharing words end
/// up close to each other under cosine similarity.
pub struct MockEmbedder {
    dimension: usize,
    max_tokens: usize,
}

impl MockEmbedder {
    /// Create a new mock embedder with default settings.
    pub fn new() -> Self {
        Self {
            dimension: 384,
            max_tokens: 256,
        }
    }

    /// Create a mock embedder with custom settings.
    pub fn with_config(dimension: usize, max_tokens: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            max_tokens,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];

        for token in tokenize(text).iter().take(self.max_tokens) {
            let hash = blake3::hash(token.as_bytes());
            for chunk in hash.as_bytes().chunks_exact(4).take(3) {
                let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                let slot = word as usize % self.dimension;
                let sign = if word & 0x8000_0000 == 0 { 1.0 } else { -1.0 };
                embedding[slot] += sign;
            }
        }

        if embedding.iter().all(|x| *x == 0.0) {
            // Keep empty or stop-word-only input off the origin
            embedding[0] = 1.0;
        }

        l2_normalize(embedding)
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QaError::embedding("No embedding returned"))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_mock_embedder() {
        let embedder = MockEmbedder::new();

        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.max_tokens(), 256);

        let texts = ["Hello world", "Rust is great"];
        let embeddings = embedder.embed_documents(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 384);

        // Check L2 normalization
        let norm: f32 = embeddings[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_deterministic_embeddings() {
        let embedder = MockEmbedder::new();

        let e1 = embedder.embed_query("consistent input").await.unwrap();
        let e2 = embedder.embed_query("consistent input").await.unwrap();

        assert_eq!(e1, e2);
    }

    #[tokio::test]
    async fn test_shared_words_are_closer() {
        let embedder = MockEmbedder::new();

        let query = embedder.embed_query("python list comprehension").await.unwrap();
        let near = embedder
            .embed_query("how does a list comprehension work in python")
            .await
            .unwrap();
        let far = embedder.embed_query("segfault in kernel driver").await.unwrap();

        assert!(cosine(&query, &near) > cosine(&query, &far));
    }

    #[tokio::test]
    async fn test_empty_text_is_normalized() {
        let embedder = MockEmbedder::with_config(16, 32);
        let e = embedder.embed_query("").await.unwrap();
        assert_eq!(e.len(), 16);
        let norm: f32 = e.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
