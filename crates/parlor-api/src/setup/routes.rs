//! Route configuration and setup.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use parlor_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, serve, upload, ws};
use crate::state::AppState;

/// Room for multipart framing on top of the upload cap. The cap itself is
/// enforced on the file bytes by the storage engine.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

const DEFAULT_HTTP_CONCURRENCY_LIMIT: usize = 10_000;

pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    let concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_HTTP_CONCURRENCY_LIMIT);

    let body_limit = match config.max_upload_bytes() {
        Some(limit) => DefaultBodyLimit::max(limit as usize + MULTIPART_OVERHEAD_BYTES),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/health", get(health::liveness_check))
        .route("/ws", get(ws::ws_handler))
        .route("/uploads/new/{token}", post(upload::upload_file))
        .route("/uploads/{owner}/{name}", get(serve::serve_file))
        .route("/uploads/{owner}/{name}/{*slug}", get(serve::serve_file_named))
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
        .layer(body_limit)
        .with_state(state)
}
