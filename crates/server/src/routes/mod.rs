//! API route handlers
//!
//! - `health`: liveness/readiness probes and metrics
//! - `visualize`: the embedding visualization endpoint

pub mod health;
pub mod visualize;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Root endpoint (GET /), returns server information and the available
/// endpoints.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "tokenlens",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/visualize",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
