//! Media transform seam.
//!
//! A transform rewrites an upload's bytes before they reach disk. Which
//! transform runs is decided purely by the extension of the client-supplied
//! filename, so the storage engine stays ignorant of media formats.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Transform operation errors
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Failed to decode media: {0}")]
    Decode(String),

    #[error("Failed to encode media: {0}")]
    Encode(String),

    #[error("Transform task failed: {0}")]
    TaskFailed(String),
}

/// A whole-body rewrite applied between upload and disk.
///
/// Transforms receive the complete upload because formats like HEIC cannot be
/// converted incrementally. Implementations should push CPU-heavy work onto a
/// blocking thread.
#[async_trait]
pub trait MediaTransform: Send + Sync {
    /// Extension the transformed output carries, without the leading dot.
    fn output_extension(&self) -> &'static str;

    /// Consume the full upload body and produce the bytes to persist.
    async fn apply(&self, input: Bytes) -> Result<Bytes, TransformError>;
}

/// Maps incoming filename extensions to the transform applied before the
/// bytes reach disk. Extensions match case-insensitively.
#[derive(Clone, Default)]
pub struct TranscodePolicy {
    transforms: HashMap<String, Arc<dyn MediaTransform>>,
}

impl TranscodePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transform(mut self, extension: &str, transform: Arc<dyn MediaTransform>) -> Self {
        self.transforms
            .insert(extension.to_ascii_lowercase(), transform);
        self
    }

    pub fn transform_for(&self, extension: &str) -> Option<&Arc<dyn MediaTransform>> {
        self.transforms.get(&extension.to_ascii_lowercase())
    }
}
