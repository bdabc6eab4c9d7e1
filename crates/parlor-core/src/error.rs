//! Error types module
//!
//! This module provides the core error types used throughout the Parlor
//! application. All errors are unified under the `AppError` enum; the HTTP
//! layer maps them to responses through the `ErrorMetadata` trait so that
//! client-facing messages stay decoupled from internal detail.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "INVALID_TOKEN")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Upload token was never issued, already spent, or expired.
    #[error("Invalid upload token")]
    InvalidToken,

    /// Token entry exists but carries no usable owner identity.
    #[error("Upload token has no associated user")]
    MissingOwner,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Static metadata for each variant: (http_status, error_code, log_level).
/// Client messages stay per-variant below since some carry dynamic content.
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, LogLevel) {
    match err {
        AppError::InvalidToken => (400, "INVALID_TOKEN", LogLevel::Debug),
        AppError::MissingOwner => (400, "MISSING_OWNER", LogLevel::Warn),
        AppError::BadRequest(_) => (400, "BAD_REQUEST", LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", LogLevel::Debug),
        AppError::PayloadTooLarge { .. } => (413, "PAYLOAD_TOO_LARGE", LogLevel::Debug),
        AppError::Storage(_) => (500, "STORAGE_ERROR", LogLevel::Error),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", LogLevel::Error),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidToken => "Invalid upload token".to_string(),
            AppError::MissingOwner => "Upload token has no associated user".to_string(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::PayloadTooLarge { .. } => "File size limit reached".to_string(),
            // Storage failures surface as a generic upload error; the detail
            // goes to the log, never to the client.
            AppError::Storage(_) => "File upload error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: "Unhandled internal error".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_invalid_token() {
        let err = AppError::InvalidToken;
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_TOKEN");
        assert_eq!(err.client_message(), "Invalid upload token");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_missing_owner() {
        let err = AppError::MissingOwner;
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.client_message(), "Upload token has no associated user");
    }

    #[test]
    fn test_error_metadata_storage_hides_detail() {
        let err = AppError::Storage("disk fell off".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.client_message(), "File upload error");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_payload_too_large() {
        let err = AppError::PayloadTooLarge { limit: 1024 };
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.client_message(), "File size limit reached");
    }
}
