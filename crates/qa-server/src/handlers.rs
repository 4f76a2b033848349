//! HTTP API request handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error, warn};

use qa_core::QaError;
use qa_query::HybridSearcher;

use crate::types::{ErrorResponse, HealthResponse, SearchParams, SearchResponse};

/// Maximum allowed query length in bytes
pub const MAX_QUERY_LENGTH: usize = 4096;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub searcher: Arc<HybridSearcher>,
}

impl AppState {
    pub fn new(searcher: Arc<HybridSearcher>) -> Self {
        Self { searcher }
    }
}

fn error_response(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}

/// Status code for a failed search.
fn error_status(err: &QaError) -> StatusCode {
    match err {
        QaError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
        QaError::Store { .. } | QaError::CollectionNotFound { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Search endpoint
pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("INVALID_ARGUMENT", rejection.body_text()),
            );
        }
    };

    let Some(query) = params.q else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse::missing_query(),
        );
    };

    if query.len() > MAX_QUERY_LENGTH {
        return error_response(
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(
                "QUERY_TOO_LARGE",
                format!(
                    "Query length {} exceeds maximum allowed length of {} bytes",
                    query.len(),
                    MAX_QUERY_LENGTH
                ),
            ),
        );
    }

    debug!("HTTP search request: q={:?}, limit={:?}", query, params.limit);

    match state.searcher.search_scored(&query, params.limit).await {
        Ok(hits) => (
            StatusCode::OK,
            Json(SearchResponse {
                result: hits.into_iter().map(|hit| hit.payload).collect(),
            }),
        )
            .into_response(),
        Err(e) => {
            if e.is_client_error() {
                warn!("Rejected search: {}", e);
            } else {
                error!("Search failed: {}", e);
            }
            let status = error_status(&e);
            error_response(status, ErrorResponse::new(e.error_code(), e.to_string()))
        }
    }
}
