//! Naming rules for stored files.
//!
//! Uploaded files never keep their client-supplied names. Each file is stored
//! under a random UUID with a sanitized copy of the original extension, inside
//! a directory derived from the owner's identity.

use std::path::Path;

use uuid::Uuid;

const MAX_OWNER_SEGMENT_LEN: usize = 64;
const MAX_EXTENSION_LEN: usize = 16;

/// Flatten an owner identity into a single safe directory segment.
///
/// The mapping is deterministic so repeat uploads from the same owner land in
/// the same directory. Anything outside `[A-Za-z0-9._-]` becomes `_`, leading
/// dots are stripped (they would allow hidden directories and `..`), and the
/// result is capped at 64 characters.
pub fn owner_directory(identity: &str) -> String {
    let mut segment: String = identity
        .chars()
        .take(MAX_OWNER_SEGMENT_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    while segment.starts_with('.') {
        segment.remove(0);
    }

    if segment.is_empty() {
        segment.push('_');
    }

    segment
}

/// Extract the extension of a client-supplied filename, if it is safe to
/// reuse. Extensions longer than 16 characters or containing anything other
/// than ASCII alphanumerics are dropped entirely.
pub fn sanitized_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;

    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(ext.to_string())
}

/// Generate a random stored filename, appending the extension when present.
pub fn generated_name(extension: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match extension {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

/// Whether a client-supplied path segment may be joined onto the upload root.
///
/// Empty segments, `.`, `..`, and anything containing a path separator or NUL
/// are rejected.
pub fn is_safe_segment(segment: &str) -> bool {
    if segment.is_empty() || segment == "." || segment == ".." {
        return false;
    }
    !segment.chars().any(|c| matches!(c, '/' | '\\' | '\0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_directory_passes_simple_identities() {
        assert_eq!(owner_directory("alice"), "alice");
        assert_eq!(owner_directory("bob-2_x.y"), "bob-2_x.y");
    }

    #[test]
    fn test_owner_directory_flattens_separators() {
        assert_eq!(owner_directory("a/b"), "a_b");
        assert_eq!(owner_directory("a\\b"), "a_b");
        assert_eq!(owner_directory("sp ace"), "sp_ace");
    }

    #[test]
    fn test_owner_directory_strips_leading_dots() {
        assert_eq!(owner_directory(".."), "_");
        assert_eq!(owner_directory(".hidden"), "hidden");
        assert_eq!(owner_directory("..."), "_");
    }

    #[test]
    fn test_owner_directory_never_empty() {
        assert_eq!(owner_directory(""), "_");
        assert_eq!(owner_directory("///"), "___");
    }

    #[test]
    fn test_owner_directory_caps_length() {
        let long = "x".repeat(200);
        assert_eq!(owner_directory(&long).len(), 64);
    }

    #[test]
    fn test_sanitized_extension() {
        assert_eq!(sanitized_extension("photo.jpg"), Some("jpg".to_string()));
        assert_eq!(sanitized_extension("photo.HEIC"), Some("HEIC".to_string()));
        assert_eq!(sanitized_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(sanitized_extension("noext"), None);
        assert_eq!(sanitized_extension(".bashrc"), None);
        assert_eq!(sanitized_extension("weird.j pg"), None);
        assert_eq!(sanitized_extension("weird.jp/g"), None);
        let long = format!("f.{}", "e".repeat(40));
        assert_eq!(sanitized_extension(&long), None);
    }

    #[test]
    fn test_generated_name_appends_extension() {
        let name = generated_name(Some("jpg"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 36 + 4);

        let bare = generated_name(None);
        assert_eq!(bare.len(), 36);
    }

    #[test]
    fn test_generated_names_are_unique() {
        assert_ne!(generated_name(None), generated_name(None));
    }

    #[test]
    fn test_is_safe_segment() {
        assert!(is_safe_segment("file.txt"));
        assert!(is_safe_segment("a..b"));
        assert!(!is_safe_segment(""));
        assert!(!is_safe_segment("."));
        assert!(!is_safe_segment(".."));
        assert!(!is_safe_segment("a/b"));
        assert!(!is_safe_segment("a\\b"));
        assert!(!is_safe_segment("a\0b"));
    }
}
