//! qa-embed - Dense and sparse text encoders
//!
//! # Dense
//!
//! - [`OnnxEmbedder`]: ONNX Runtime inference over a sentence-transformer
//!   export, with masked mean pooling and L2 normalization.
//! - [`MockEmbedder`]: deterministic hash embeddings for tests.
//!
//! # Sparse
//!
//! - [`Bm25Encoder`]: BM25 term weights over hashed tokens. IDF is left to
//!   the vector store.

mod bm25;
mod mock;
mod onnx;

pub use bm25::{tokenize, Bm25Encoder};
pub use mock::MockEmbedder;
pub use onnx::OnnxEmbedder;

// Re-export the traits for convenience
pub use qa_core::{Embedder, SparseEncoder};
