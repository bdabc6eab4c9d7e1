//! Parlor Processing Library
//!
//! Content inspection and media normalization: magic-byte content-type
//! detection for served files, the serving policy tables, and the image
//! normalizer that converts camera formats to JPEG on upload.

pub mod normalize;
pub mod policy;
pub mod sniff;

// Re-export commonly used types
pub use normalize::ImageNormalizer;
pub use policy::{ServeDecision, ServePolicy};
pub use sniff::{detect_content_type, SNIFF_LENGTH};
