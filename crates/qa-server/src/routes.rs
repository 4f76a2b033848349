//! HTTP API route definitions.

use axum::{routing::get, Router};

use crate::handlers::{self, AppState};

/// Create the router with all routes
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/search", get(handlers::search))
        .with_state(app_state)
}
