//! Core traits defining the interfaces between components.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CollectionSchema, HybridQuery, QaPoint, ScoredPayload, SparseVector};

/// Vector database trait.
#[async_trait]
pub trait VectorStore: Send + Sync {
    // Collection operations
    async fn collection_exists(&self, name: &str) -> Result<bool>;
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()>;
    async fn delete_collection(&self, name: &str) -> Result<()>;

    // Point operations
    async fn upsert_points(&self, collection: &str, points: Vec<QaPoint>) -> Result<()>;
    async fn count_points(&self, collection: &str) -> Result<u64>;

    /// Run one fused prefetch query and return points in fused rank order.
    async fn hybrid_query(&self, collection: &str, query: &HybridQuery)
        -> Result<Vec<ScoredPayload>>;
}

/// Dense embedding model trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get the maximum context length in tokens.
    fn max_tokens(&self) -> usize;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Sparse (lexical) encoder trait.
pub trait SparseEncoder: Send + Sync {
    /// Encode a batch of document texts.
    fn encode_documents(&self, texts: &[&str]) -> Result<Vec<SparseVector>>;

    /// Encode a single query text.
    fn encode_query(&self, text: &str) -> Result<SparseVector>;

    /// Whether the store must apply IDF weighting to this encoder's vectors.
    fn uses_idf(&self) -> bool;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}
