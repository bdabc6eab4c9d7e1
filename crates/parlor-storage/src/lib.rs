//! Parlor Storage Library
//!
//! Streaming local-filesystem storage for uploaded files.
//!
//! Files live under a single upload root, one directory per owner:
//! `{root}/{owner}/{uuid}.{ext}`. Client-supplied filenames never reach the
//! filesystem; retrieval paths are validated and canonicalized before any
//! file is opened.

pub mod local;
pub mod names;
pub mod transform;

// Re-export commonly used types
pub use local::{StorageError, StorageResult, StoredFile, UploadPlan, UploadStore};
pub use transform::{MediaTransform, TranscodePolicy, TransformError};
