//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p parlor-api --test uploads_test`
//! or `cargo test -p parlor-api`.

// Not every test binary uses every helper.
#![allow(dead_code)]

pub mod fixtures;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use parlor_api::setup;
use parlor_api::state::AppState;
use parlor_core::Config;
use serde_json::Value;
use tempfile::TempDir;

/// Test application: server plus owned state and temp storage root.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Issue a live upload token the way the realtime channel would.
    pub async fn issue_token(&self, owner: &str) -> String {
        self.state.tokens.issue(owner).await
    }

    /// Absolute path of the upload root backing this app.
    pub fn upload_root(&self) -> PathBuf {
        self.state.store.base_path().to_path_buf()
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Build a test app on an isolated temp upload root, letting the caller
/// tweak the config first.
pub async fn setup_test_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

    let mut config = Config {
        server_port: 0,
        environment: "test".to_string(),
        upload_root: temp_dir.path().join("uploads"),
        max_upload_kb: 10_240,
        token_ttl: Duration::from_secs(60),
    };
    adjust(&mut config);

    let (state, app) = setup::initialize_app(config)
        .await
        .expect("Failed to initialize app");

    // Real HTTP transport so WebSocket upgrades work.
    let server = TestServer::builder()
        .http_transport()
        .build(app)
        .expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

/// Multipart form with a single file part, the way the web client sends it.
pub fn file_form(filename: &str, contents: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(contents)
            .file_name(filename)
            .mime_type("application/octet-stream"),
    )
}

/// Upload `contents` as `filename` for `owner`, returning the serve path.
pub async fn upload_file(app: &TestApp, owner: &str, filename: &str, contents: Vec<u8>) -> String {
    let token = app.issue_token(owner).await;
    let response = app
        .server
        .post(&format!("/uploads/new/{}", token))
        .multipart(file_form(filename, contents))
        .await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    format!("/{}", body["url"].as_str().expect("url field in response"))
}

/// Count regular files under the upload root, recursively.
pub fn stored_file_count(app: &TestApp) -> usize {
    fn walk(dir: &std::path::Path, count: &mut usize) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(&path, count);
            } else {
                *count += 1;
            }
        }
    }

    let mut count = 0;
    walk(&app.upload_root(), &mut count);
    count
}
