//! qa-core - Core types and traits for hybrid Q&A search
//!
//! This crate provides the configuration, error type, domain types and the
//! traits (`Embedder`, `SparseEncoder`, `VectorStore`) shared by the loader,
//! the searcher and the HTTP service.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{QaError, Result};
pub use traits::*;
pub use types::*;
