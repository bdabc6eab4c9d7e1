//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`. Every failure funnels through
//! [`AppError`] so status codes, client-visible messages, and log levels stay
//! consistent across the API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parlor_core::{AppError, ErrorMetadata, LogLevel};
use parlor_storage::StorageError;
use serde::Serialize;

/// JSON body for every error response: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Wrapper type for AppError to implement IntoResponse
///
/// Necessary because of Rust's orphan rules: IntoResponse is an external
/// trait and AppError lives in parlor-core.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app_error = match err {
            StorageError::TooLarge { limit } => AppError::PayloadTooLarge { limit },
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            // Unsafe keys get the same answer as missing files.
            StorageError::InvalidKey(_) => AppError::NotFound("File not found".to_string()),
            StorageError::UploadFailed(msg) => AppError::Storage(msg),
            StorageError::Transform(e) => AppError::Storage(format!("Transform failed: {}", e)),
            StorageError::IoError(e) => AppError::Storage(format!("IO error: {}", e)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        };
        HttpAppError(app_error)
    }
}

/// Log the error at the level its metadata asks for. The full error text
/// lands here; the client only ever sees `client_message()`.
fn log_error(error: &AppError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, code, "Request failed"),
        LogLevel::Warn => tracing::warn!(error = %error, code, "Request failed"),
        LogLevel::Error => tracing::error!(error = %error, code, "Request failed"),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        log_error(app_error);

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ErrorResponse {
            error: app_error.client_message(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_error_metadata() {
        let cases = [
            (AppError::InvalidToken, StatusCode::BAD_REQUEST),
            (AppError::MissingOwner, StatusCode::BAD_REQUEST),
            (
                AppError::NotFound("x".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::PayloadTooLarge { limit: 1024 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                AppError::Storage("disk on fire".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let response = HttpAppError(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_storage_too_large_maps_to_payload_too_large() {
        let err = HttpAppError::from(StorageError::TooLarge { limit: 2048 });
        assert!(matches!(
            err.0,
            AppError::PayloadTooLarge { limit: 2048 }
        ));
    }

    #[test]
    fn test_storage_invalid_key_answers_not_found() {
        let err = HttpAppError::from(StorageError::InvalidKey(
            "path traversal attempt".to_string(),
        ));
        match err.0 {
            AppError::NotFound(msg) => assert!(!msg.contains("traversal")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_storage_failure_hides_detail_from_client() {
        let err = HttpAppError::from(StorageError::UploadFailed(
            "/var/data/uploads: permission denied".to_string(),
        ));
        assert_eq!(err.0.client_message(), "File upload error");
    }

    #[test]
    fn test_error_response_wire_shape() {
        let body = ErrorResponse {
            error: "Invalid upload token".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"Invalid upload token"}"#
        );
    }
}
