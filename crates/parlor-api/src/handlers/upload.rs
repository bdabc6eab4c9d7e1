//! Upload intake: `POST /uploads/new/{token}`.

use std::io;
use std::sync::Arc;

use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;

use parlor_core::AppError;
use parlor_storage::StoredFile;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Owner identity recovered from a spent token.
///
/// Constructing one is the only path into storage, so a token bound to no
/// usable identity is rejected before any body bytes are read.
#[derive(Debug, Clone)]
pub struct UploadContext {
    owner: String,
}

impl UploadContext {
    pub fn from_owner(owner: String) -> Result<Self, AppError> {
        if owner.trim().is_empty() {
            return Err(AppError::MissingOwner);
        }
        Ok(UploadContext { owner })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// The one multipart field an upload request may carry.
const FILE_FIELD: &str = "file";

/// Accept one file against a single-use token.
///
/// The token is spent before the body is touched; whatever happens to the
/// upload afterwards, the same token never opens the door again. The body
/// must be exactly one file part named `file`; anything else is a protocol
/// violation, and a violation detected after the file was written rolls the
/// write back.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let owner = state
        .tokens
        .consume(&token)
        .await
        .ok_or(AppError::InvalidToken)?;
    let context = UploadContext::from_owner(owner)?;

    let field = match next_field(&mut multipart).await? {
        Some(field) => field,
        None => return Err(protocol_violation("multipart body carries no parts")),
    };
    if field.name() != Some(FILE_FIELD) {
        return Err(protocol_violation("unexpected field name"));
    }
    let original_filename = match field.file_name() {
        Some(name) => name.to_string(),
        None => return Err(protocol_violation("file field carries no filename")),
    };

    let plan = state.store.plan(context.owner(), &original_filename);
    let reader = Box::pin(StreamReader::new(field.map_err(io::Error::other)));
    let stored = state
        .store
        .store(&plan, reader, state.config.max_upload_bytes())
        .await?;

    match next_field(&mut multipart).await {
        Ok(None) => {}
        Ok(Some(_)) => {
            rollback(&state, &stored).await;
            return Err(protocol_violation("more than one part in upload"));
        }
        Err(err) => {
            rollback(&state, &stored).await;
            return Err(err);
        }
    }

    tracing::info!(
        owner = %context.owner(),
        path = %stored.relative_path,
        size_bytes = stored.size_bytes,
        "File uploaded"
    );

    Ok(Json(UploadResponse {
        url: format!("uploads/{}", stored.relative_path),
    }))
}

async fn next_field(multipart: &mut Multipart) -> Result<Option<Field<'_>>, HttpAppError> {
    multipart.next_field().await.map_err(|e| {
        tracing::debug!(error = %e, "Malformed multipart body");
        HttpAppError(AppError::BadRequest("Invalid upload request".to_string()))
    })
}

fn protocol_violation(detail: &str) -> HttpAppError {
    tracing::debug!(detail, "Rejected malformed upload request");
    HttpAppError(AppError::BadRequest("Invalid upload request".to_string()))
}

/// Best effort; the client gets the protocol error either way.
async fn rollback(state: &AppState, stored: &StoredFile) {
    if let Err(e) = state.store.remove(stored).await {
        tracing::warn!(
            path = %stored.relative_path,
            error = %e,
            "Failed to roll back stored file"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_context_requires_an_owner() {
        assert!(matches!(
            UploadContext::from_owner(String::new()),
            Err(AppError::MissingOwner)
        ));
        assert!(matches!(
            UploadContext::from_owner("   ".to_string()),
            Err(AppError::MissingOwner)
        ));

        let context = UploadContext::from_owner("alice".to_string()).unwrap();
        assert_eq!(context.owner(), "alice");
    }
}
