//! Filename derivation for saved downloads.
//!
//! Prefers the name a server suggests via `Content-Disposition`, falls back
//! to the last URL path segment (query stripped), then to `"download"`.
//! Every candidate goes through the same sanitation rule before it touches
//! the filesystem.

mod content_disposition;
mod sanitize;

pub use content_disposition::filename_from_content_disposition;
pub use sanitize::sanitize_filename;

/// Name used when neither the headers nor the URL yield anything usable.
pub const DEFAULT_FILENAME: &str = "download";

/// Derives the sanitized filename for saving a download.
pub fn derive_filename(url: &str, content_disposition: Option<&str>) -> String {
    let candidate = content_disposition
        .and_then(filename_from_content_disposition)
        .or_else(|| filename_from_url_path(url));

    match candidate {
        Some(raw) => sanitize_filename(&raw),
        None => DEFAULT_FILENAME.to_string(),
    }
}

/// Last non-empty path segment of the URL, query and fragment stripped.
fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    Some(segment.to_string())
}
