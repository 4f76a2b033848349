//! qa-store - Vector store backends
//!
//! - [`QdrantStore`]: Qdrant over gRPC. Fusion, indexing and IDF weighting
//!   happen inside the database.
//! - [`MemoryStore`]: exact in-process search with the same fusion
//!   semantics, used by tests and `backend = "memory"`.

mod fusion;
mod memory;
mod qdrant;

pub use fusion::{distribution_based_fusion, reciprocal_rank_fusion, DEFAULT_RRF_K};
pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

// Re-export the trait for convenience
pub use qa_core::VectorStore;
