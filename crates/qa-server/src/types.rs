//! HTTP API request/response types.

use serde::{Deserialize, Serialize};

use qa_core::Payload;

/// Query string of `/api/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    /// The search text
    pub q: Option<String>,
    /// Overrides the configured result limit
    pub limit: Option<u64>,
}

/// Search results, one payload per hit in ranked order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub result: Vec<Payload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn missing_query() -> Self {
        Self::new("MISSING_QUERY", "query parameter `q` is required")
    }
}
