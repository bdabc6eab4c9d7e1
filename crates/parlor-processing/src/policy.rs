//! Serving policy: how a detected content type turns into response headers.

use std::collections::HashMap;

/// Headers chosen for one served file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeDecision {
    /// Value for `Content-Type`.
    pub content_type: String,
    /// Full value for `Content-Disposition`.
    pub disposition: String,
}

/// Policy tables driving retrieval responses.
///
/// `remaps` rewrites detector output to the form browsers handle better.
/// `inline` lists the only content types ever rendered in the browser; every
/// entry carries the filename suggested when the request has no display name.
/// Anything not in `inline` is always served as an attachment, whatever the
/// client asked for.
#[derive(Debug, Clone)]
pub struct ServePolicy {
    remaps: HashMap<String, String>,
    inline: HashMap<String, String>,
}

impl Default for ServePolicy {
    fn default() -> Self {
        let policy = ServePolicy {
            remaps: HashMap::new(),
            inline: HashMap::new(),
        };

        policy
            .with_remap("audio/vnd.wave", "audio/wav")
            .with_remap("audio/x-wav", "audio/wav")
            .with_remap("audio/x-flac", "audio/flac")
            .with_remap("audio/m4a", "audio/mp4")
            .with_remap("video/quicktime", "video/mp4")
            .with_inline("application/ogg", "media.ogg")
            .with_inline("audio/midi", "audio.midi")
            .with_inline("audio/mp4", "audio.m4a")
            .with_inline("audio/mpeg", "audio.mp3")
            .with_inline("audio/ogg", "audio.ogg")
            .with_inline("audio/wav", "audio.wav")
            .with_inline("audio/flac", "audio.flac")
            .with_inline("image/avif", "image.avif")
            .with_inline("image/bmp", "image.bmp")
            .with_inline("image/gif", "image.gif")
            .with_inline("image/jpeg", "image.jpg")
            .with_inline("image/png", "image.png")
            .with_inline("image/webp", "image.webp")
            .with_inline("text/plain", "text.txt")
            .with_inline("video/mp4", "video.mp4")
            .with_inline("video/ogg", "video.ogg")
            .with_inline("video/webm", "video.webm")
    }
}

impl ServePolicy {
    pub fn with_remap(mut self, from: &str, to: &str) -> Self {
        self.remaps.insert(from.to_string(), to.to_string());
        self
    }

    pub fn with_inline(mut self, content_type: &str, default_filename: &str) -> Self {
        self.inline
            .insert(content_type.to_string(), default_filename.to_string());
        self
    }

    /// Canonical form of a detected content type.
    pub fn normalize<'a>(&'a self, detected: &'a str) -> &'a str {
        self.remaps.get(detected).map(String::as_str).unwrap_or(detected)
    }

    /// Decide the response headers for a file of the detected type.
    ///
    /// A client-supplied display name only ever changes the suggested
    /// filename. Whether the file renders inline is decided by the content
    /// type alone.
    pub fn decide(&self, detected: &str, display_name: Option<&str>) -> ServeDecision {
        let content_type = self.normalize(detected);
        let requested = display_name.and_then(sanitize_display_name);

        let disposition = match self.inline.get(content_type) {
            Some(default_filename) => {
                let filename = requested.unwrap_or_else(|| default_filename.clone());
                format!("inline; filename=\"{}\"", filename)
            }
            None => match requested {
                Some(filename) => format!("attachment; filename=\"{}\"", filename),
                None => "attachment".to_string(),
            },
        };

        ServeDecision {
            content_type: content_type.to_string(),
            disposition,
        }
    }
}

/// Trim the requested display name and strip anything that could break out
/// of the quoted filename parameter.
fn sanitize_display_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .trim()
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .take(255)
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
