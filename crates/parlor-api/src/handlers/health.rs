//! Health check handler.

use axum::{http::StatusCode, response::IntoResponse, Json};

/// Liveness probe. The process is up; storage and token state are
/// in-process, so there is nothing further to check.
pub async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
