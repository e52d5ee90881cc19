//! Video file naming rules.

use crate::error::{ModelError, ModelResult};

/// Extensions accepted as gameplay videos (lowercase, without the dot).
pub const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Check whether a filename has one of the recognized video extensions.
pub fn is_allowed_video(filename: &str) -> bool {
    extension(filename)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// MIME type sent to the remote service for a video filename.
pub fn video_mime_type(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some("mp4") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("wmv") => "video/x-ms-wmv",
        Some("flv") => "video/x-flv",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Reduce a client-supplied filename to a safe flat name.
///
/// Drops any directory components, turns whitespace into underscores, keeps
/// only ASCII alphanumerics plus `.`, `_` and `-`, and trims leading and
/// trailing dots and underscores.
pub fn sanitize_filename(name: &str) -> ModelResult<String> {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        return Err(ModelError::invalid_filename(format!("'{}' has no usable characters", name)));
    }

    Ok(cleaned.to_string())
}
