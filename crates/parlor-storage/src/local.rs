//! Local filesystem upload store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::names;
use crate::transform::{MediaTransform, TranscodePolicy, TransformError};

const WRITE_CHUNK_SIZE: usize = 64 * 1024;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Upload exceeds the size limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Where an upload will land, decided before any byte is read.
///
/// The relative path is final as soon as the plan exists, so callers may hand
/// it out even while the write is still in flight.
#[derive(Clone)]
pub struct UploadPlan {
    owner_dir: String,
    stored_name: String,
    transform: Option<Arc<dyn MediaTransform>>,
}

impl UploadPlan {
    pub fn owner_dir(&self) -> &str {
        &self.owner_dir
    }

    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    /// Path relative to the upload root, `{owner}/{name}`.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.owner_dir, self.stored_name)
    }

    pub fn will_transcode(&self) -> bool {
        self.transform.is_some()
    }
}

/// A file persisted by [`UploadStore::store`].
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Path relative to the upload root, `{owner}/{name}`.
    pub relative_path: String,
    pub absolute_path: PathBuf,
    /// Bytes on disk, which after a transcode differ from the bytes received.
    pub size_bytes: u64,
}

/// Local filesystem storage for uploads.
///
/// Files are laid out as `{root}/{owner}/{random name}`. All writes go
/// through [`UploadStore::store`], which enforces the size limit and removes
/// partial output on failure. All reads go through
/// [`UploadStore::resolve_existing`], which confines resolved paths to the
/// upload root.
#[derive(Clone)]
pub struct UploadStore {
    base_path: PathBuf,
    base_canonical: PathBuf,
    transcodes: TranscodePolicy,
}

impl UploadStore {
    /// Create a new store rooted at `base_path`, creating the directory if
    /// missing.
    pub async fn new(
        base_path: impl Into<PathBuf>,
        transcodes: TranscodePolicy,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create upload root {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let base_canonical = fs::canonicalize(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to canonicalize upload root {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(UploadStore {
            base_path,
            base_canonical,
            transcodes,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Decide destination directory, stored name, and transform for an
    /// upload. Pure; no filesystem access happens here.
    pub fn plan(&self, owner_identity: &str, original_filename: &str) -> UploadPlan {
        let owner_dir = names::owner_directory(owner_identity);
        let ext = names::sanitized_extension(original_filename);

        let transform = ext
            .as_deref()
            .and_then(|e| self.transcodes.transform_for(e))
            .cloned();

        let stored_name = match &transform {
            Some(t) => names::generated_name(Some(t.output_extension())),
            None => names::generated_name(ext.as_deref()),
        };

        UploadPlan {
            owner_dir,
            stored_name,
            transform,
        }
    }

    /// Stream an upload to disk according to `plan`.
    ///
    /// `max_bytes` caps the bytes *received*; a transcoded file may end up
    /// larger or smaller than what the client sent. Any failure past file
    /// creation removes the partial output before returning.
    pub async fn store<R>(
        &self,
        plan: &UploadPlan,
        reader: R,
        max_bytes: Option<u64>,
    ) -> StorageResult<StoredFile>
    where
        R: AsyncRead + Send + Unpin,
    {
        let dir = self.base_path.join(plan.owner_dir());
        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create upload directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let path = dir.join(plan.stored_name());
        let start = std::time::Instant::now();

        let result = match plan.transform.as_deref() {
            None => write_passthrough(&path, reader, max_bytes).await,
            Some(transform) => write_transcoded(&path, reader, transform, max_bytes).await,
        };

        match result {
            Ok(size_bytes) => {
                tracing::info!(
                    path = %path.display(),
                    size_bytes,
                    transcoded = plan.will_transcode(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Upload stored"
                );

                Ok(StoredFile {
                    relative_path: plan.relative_path(),
                    absolute_path: path,
                    size_bytes,
                })
            }
            Err(err) => {
                // Never leave partial output behind a failed upload.
                if let Err(cleanup_err) = fs::remove_file(&path).await {
                    if cleanup_err.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            path = %path.display(),
                            error = %cleanup_err,
                            "Failed to remove partial upload"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    /// Roll back a completed write. Used when a stage after storage decides
    /// the upload as a whole must fail.
    pub async fn remove(&self, stored: &StoredFile) -> StorageResult<()> {
        fs::remove_file(&stored.absolute_path).await?;
        tracing::debug!(
            path = %stored.absolute_path.display(),
            "Rolled back stored file"
        );
        Ok(())
    }

    /// Resolve `{owner}/{name}` to a canonical path inside the upload root.
    ///
    /// Both segments are validated before touching the filesystem, then the
    /// joined path is canonicalized and checked against the root so symlinks
    /// cannot escape either. Callers should surface every failure here as a
    /// plain not-found; the distinction between a missing file and a hostile
    /// path is for logs only.
    pub async fn resolve_existing(&self, owner_dir: &str, name: &str) -> StorageResult<PathBuf> {
        if !names::is_safe_segment(owner_dir) || !names::is_safe_segment(name) {
            return Err(StorageError::InvalidKey(
                "Path segment contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(owner_dir).join(name);

        let canonical = match fs::canonicalize(&path).await {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!("{}/{}", owner_dir, name)));
            }
            Err(e) => return Err(StorageError::IoError(e)),
        };

        if canonical.strip_prefix(&self.base_canonical).is_err() {
            return Err(StorageError::InvalidKey(
                "Path resolves outside the upload root".to_string(),
            ));
        }

        Ok(canonical)
    }
}

async fn write_passthrough<R>(
    path: &Path,
    mut reader: R,
    max_bytes: Option<u64>,
) -> StorageResult<u64>
where
    R: AsyncRead + Send + Unpin,
{
    let mut file = fs::File::create(path).await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
    })?;

    let mut buf = vec![0u8; WRITE_CHUNK_SIZE];
    let mut written: u64 = 0;

    loop {
        let n = reader.read(&mut buf).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read upload stream: {}", e))
        })?;
        if n == 0 {
            break;
        }

        written += n as u64;
        if let Some(limit) = max_bytes {
            if written > limit {
                return Err(StorageError::TooLarge { limit });
            }
        }

        file.write_all(&buf[..n]).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;
    }

    file.sync_all().await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
    })?;

    Ok(written)
}

async fn write_transcoded<R>(
    path: &Path,
    mut reader: R,
    transform: &dyn MediaTransform,
    max_bytes: Option<u64>,
) -> StorageResult<u64>
where
    R: AsyncRead + Send + Unpin,
{
    // The limit applies to received bytes, so enforce it while buffering the
    // input rather than on the transformed output.
    let mut input = Vec::new();
    let mut buf = vec![0u8; WRITE_CHUNK_SIZE];
    let mut received: u64 = 0;

    loop {
        let n = reader.read(&mut buf).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read upload stream: {}", e))
        })?;
        if n == 0 {
            break;
        }

        received += n as u64;
        if let Some(limit) = max_bytes {
            if received > limit {
                return Err(StorageError::TooLarge { limit });
            }
        }

        input.extend_from_slice(&buf[..n]);
    }

    let output = transform.apply(Bytes::from(input)).await?;

    let mut file = fs::File::create(path).await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
    })?;

    file.write_all(&output).await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
    })?;

    file.sync_all().await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
    })?;

    Ok(output.len() as u64)
}
