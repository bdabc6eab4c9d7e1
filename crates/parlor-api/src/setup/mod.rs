//! Application setup and initialization

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use parlor_core::Config;
use parlor_processing::{ImageNormalizer, ServePolicy};
use parlor_storage::{TranscodePolicy, UploadStore};

use crate::state::AppState;
use crate::tokens::UploadTokenStore;

/// Build the application state and router.
///
/// Telemetry is deliberately not initialized here; `main` does that once,
/// which keeps this callable repeatedly from tests.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    config.validate().context("Configuration validation failed")?;

    let transcodes =
        TranscodePolicy::new().with_transform("heic", Arc::new(ImageNormalizer::default()));

    let store = UploadStore::new(config.upload_root.clone(), transcodes)
        .await
        .context("Failed to initialize upload storage")?;

    let tokens = UploadTokenStore::new(config.token_ttl);

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        tokens,
        policy: ServePolicy::default(),
    });

    let app = routes::setup_routes(&config, state.clone());

    Ok((state, app))
}
