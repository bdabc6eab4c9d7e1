//! Application state shared across handlers.

use parlor_core::Config;
use parlor_processing::ServePolicy;
use parlor_storage::UploadStore;

use crate::tokens::UploadTokenStore;

/// Everything a request handler needs: configuration, the storage engine,
/// live upload tokens, and the serving policy. Shared as `Arc<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: UploadStore,
    pub tokens: UploadTokenStore,
    pub policy: ServePolicy,
}

#[allow(dead_code)]
fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
