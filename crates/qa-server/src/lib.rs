//! qa-server - HTTP search API
//!
//! Serves `GET /api/search?q=...` over a [`HybridSearcher`](qa_query::HybridSearcher)
//! and a `GET /health` probe.

mod handlers;
mod routes;
mod server;
mod types;

pub use handlers::{AppState, MAX_QUERY_LENGTH};
pub use routes::create_router;
pub use server::HttpServer;
pub use types::{ErrorResponse, HealthResponse, SearchParams, SearchResponse};
