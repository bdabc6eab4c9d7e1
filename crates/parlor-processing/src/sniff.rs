//! Content-type detection from leading file bytes.
//!
//! Stored filename extensions are never trusted when serving. The first few
//! KB of the file are inspected instead: magic-byte signatures first, then a
//! UTF-8 check for plain text, falling back to `application/octet-stream`.

/// How many leading bytes the detector inspects.
pub const SNIFF_LENGTH: usize = 5120;

/// Detect the content type of a file from its leading bytes.
///
/// `truncated` tells the detector that `head` is a prefix of a larger file,
/// which matters for the plain-text check below.
pub fn detect_content_type(head: &[u8], truncated: bool) -> &'static str {
    if let Some(kind) = infer::get(head) {
        return kind.mime_type();
    }

    if is_probably_text(head, truncated) {
        return "text/plain";
    }

    "application/octet-stream"
}

/// Valid UTF-8 with no NUL bytes counts as text. A multibyte sequence cut
/// off at the sniff boundary still counts when the buffer was truncated,
/// since the remainder of the character lives past the prefix.
fn is_probably_text(head: &[u8], truncated: bool) -> bool {
    if head.contains(&0) {
        return false;
    }

    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => truncated && e.error_len().is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
    const GIF_MAGIC: &[u8] = b"GIF89a___________";

    #[test]
    fn test_detects_magic_bytes() {
        assert_eq!(detect_content_type(PNG_MAGIC, false), "image/png");
        assert_eq!(detect_content_type(GIF_MAGIC, false), "image/gif");
    }

    #[test]
    fn test_ascii_is_text_plain() {
        assert_eq!(detect_content_type(b"hello world\n", false), "text/plain");
    }

    #[test]
    fn test_multibyte_utf8_is_text_plain() {
        assert_eq!(detect_content_type("héllo wörld ✓".as_bytes(), false), "text/plain");
    }

    #[test]
    fn test_empty_file_is_text_plain() {
        assert_eq!(detect_content_type(b"", false), "text/plain");
    }

    #[test]
    fn test_nul_byte_is_binary() {
        assert_eq!(
            detect_content_type(b"almost text\0but not", false),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_invalid_utf8_is_binary() {
        assert_eq!(
            detect_content_type(&[b'a', 0xFF, 0xFE, b'b'], false),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_multibyte_split_at_boundary() {
        // "é" is two bytes; keep only the first one, as if the sniff window
        // ended mid-character.
        let mut head = b"text ".to_vec();
        head.push(0xC3);

        assert_eq!(detect_content_type(&head, true), "text/plain");
        // The same bytes as a complete file are just invalid UTF-8.
        assert_eq!(detect_content_type(&head, false), "application/octet-stream");
    }
}
