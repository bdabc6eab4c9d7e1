//! File retrieval: `GET /uploads/{owner}/{name}` plus the display-name
//! variant with a trailing slug.
//!
//! Responses never trust the stored name. The content type comes from
//! sniffing the leading bytes, the disposition from the serving policy, and
//! every failure on this surface answers with the same plain 404.

use std::io::SeekFrom;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use parlor_processing::{detect_content_type, SNIFF_LENGTH};
use parlor_storage::StorageError;

use crate::state::AppState;

const CACHE_CONTROL_VALUE: &str = "max-age=86400";
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// `GET /uploads/{owner}/{name}`.
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    serve_upload(&state, &headers, &owner, &name, None).await
}

/// `GET /uploads/{owner}/{name}/{*slug}`. The slug suggests a download
/// filename and has no say in where the bytes come from or how they render.
pub async fn serve_file_named(
    State(state): State<Arc<AppState>>,
    Path((owner, name, slug)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    serve_upload(&state, &headers, &owner, &name, Some(&slug)).await
}

async fn serve_upload(
    state: &AppState,
    headers: &HeaderMap,
    owner: &str,
    name: &str,
    display_name: Option<&str>,
) -> Response {
    let path = match state.store.resolve_existing(owner, name).await {
        Ok(path) => path,
        Err(err) => {
            if matches!(err, StorageError::InvalidKey(_)) {
                tracing::warn!(owner, name, "Rejected unsafe file path");
            }
            // Hostile paths and missing files get the same answer.
            return not_found();
        }
    };

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(_) => return not_found(),
    };
    let metadata = match file.metadata().await {
        Ok(metadata) => metadata,
        Err(_) => return not_found(),
    };
    if !metadata.is_file() {
        return not_found();
    }

    let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

    if let (Some(modified), Some(since)) = (modified, if_modified_since(headers)) {
        // The header only carries whole seconds.
        if modified.timestamp() <= since.timestamp() {
            return not_modified(modified);
        }
    }

    let (head, truncated) = match read_head(&mut file, metadata.len()).await {
        Ok(head) => head,
        Err(e) => {
            // Unreadable files get the same answer as missing ones.
            tracing::error!(error = %e, path = %path.display(), "Failed to read file for serving");
            return not_found();
        }
    };

    let detected = detect_content_type(&head, truncated);
    let decision = state.policy.decide(detected, display_name);

    tracing::debug!(
        owner,
        name,
        content_type = %decision.content_type,
        disposition = %decision.disposition,
        "Serving file"
    );

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, decision.content_type.as_str())
        .header(header::CONTENT_DISPOSITION, decision.disposition.as_str())
        .header(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .header(header::CONTENT_LENGTH, metadata.len());
    if let Some(modified) = modified {
        builder = builder.header(header::LAST_MODIFIED, http_date(modified));
    }

    match builder.body(Body::from_stream(ReaderStream::new(file))) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build file response");
            internal_error()
        }
    }
}

/// Read the sniff window, then rewind so the response body starts at byte
/// zero.
async fn read_head(
    file: &mut tokio::fs::File,
    file_len: u64,
) -> std::io::Result<(Vec<u8>, bool)> {
    let mut head = vec![0u8; SNIFF_LENGTH];
    let mut filled = 0;
    while filled < head.len() {
        let n = file.read(&mut head[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    head.truncate(filled);

    file.seek(SeekFrom::Start(0)).await?;

    let truncated = file_len > filled as u64;
    Ok((head, truncated))
}

fn if_modified_since(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let value = headers.get(header::IF_MODIFIED_SINCE)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

fn not_modified(modified: DateTime<Utc>) -> Response {
    match Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)
        .header(header::LAST_MODIFIED, http_date(modified))
        .body(Body::empty())
    {
        Ok(response) => response,
        Err(_) => StatusCode::NOT_MODIFIED.into_response(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

fn internal_error() -> Response {
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_http_date_is_imf_fixdate() {
        let epoch = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        assert_eq!(http_date(epoch), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn test_if_modified_since_parses_http_dates() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_MODIFIED_SINCE,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );

        let parsed = if_modified_since(&headers).unwrap();
        let expected = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_if_modified_since_rejects_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_MODIFIED_SINCE, "last tuesday".parse().unwrap());
        assert_eq!(if_modified_since(&headers), None);

        assert_eq!(if_modified_since(&HeaderMap::new()), None);
    }
}
