//! Parlor API Library
//!
//! HTTP surface for the upload service: the realtime channel that issues
//! single-use upload tokens, the multipart intake endpoint, and hardened
//! retrieval of stored files.

pub mod error;
pub mod handlers;
pub mod realtime;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod tokens;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
