//! qa-query - Hybrid search over a Q&A collection
//!
//! Embeds the query with a dense and a sparse encoder, issues a single fused
//! prefetch query (Reciprocal Rank Fusion by default) and drops results that
//! score below the configured minimum.
//!
//! # Example
//!
//! ```rust,ignore
//! use qa_query::{HybridSearcher, SearchSettings};
//! use std::sync::Arc;
//!
//! let searcher = HybridSearcher::new(store, dense, sparse, SearchSettings::from_config(&config));
//! let payloads = searcher.search("how to reverse a list").await?;
//! ```

mod searcher;

pub use searcher::{HybridSearcher, SearchSettings};

// Re-export for convenience
pub use qa_core::{Payload, ScoredPayload};
