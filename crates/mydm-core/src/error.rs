//! Error types for the download engine.
//!
//! `FetchError` covers one HTTP transfer; `DownloadError` is the terminal
//! outcome of a whole download, with the display text that surfaces in
//! `error` events on the wire.

use thiserror::Error;

/// Error from a single HTTP transfer (probe, segment GET, or single GET).
#[derive(Debug, Error)]
pub enum FetchError {
    /// libcurl reported a transport error (timeout, connection, TLS, ...).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// The response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Writing the body to disk failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The connection closed before the full range arrived.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    Partial { expected: u64, received: u64 },
    /// The transfer was aborted because the download's cancel flag was set.
    #[error("cancelled")]
    Cancelled,
}

/// Terminal failure of a download. The `Display` text is what the controller
/// sees in the `error` field of an `error` event.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to get file info: {0}")]
    Probe(String),
    #[error("Segment {index} failed: {reason}")]
    Segment { index: usize, reason: String },
    #[error("Download cancelled")]
    Cancelled,
    #[error("Failed to merge segments: {0}")]
    Merge(String),
}

impl DownloadError {
    /// Folds a segment-level failure into the download-level taxonomy.
    pub(crate) fn from_segment(index: usize, err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => DownloadError::Cancelled,
            other => DownloadError::Segment {
                index,
                reason: other.to_string(),
            },
        }
    }
}
