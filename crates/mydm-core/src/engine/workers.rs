//! Bounded worker pool for one segmented download.
//!
//! Spawns one fetch thread per segment, drains completions as they arrive,
//! and aggregates progress at segment boundaries. The pool belongs to a
//! single download; concurrent downloads each get their own.

use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use crate::error::{DownloadError, FetchError};
use crate::fetch;
use crate::registry::ControlFlags;
use crate::segmenter::Segment;

use super::part_path;
use super::reporter::ProgressReporter;

/// Fetches every segment into its sidecar. Returns the total bytes written
/// once all workers finish, or the first failure.
///
/// On failure the remaining in-flight segments are still drained (they
/// abort on their own when the failure was a cancel); the caller owns
/// sidecar cleanup. Cancellation is re-checked at every completion
/// boundary.
pub(super) fn run_segmented(
    url: &str,
    referer: Option<&str>,
    output_path: &Path,
    segments: &[Segment],
    flags: &Arc<ControlFlags>,
    reporter: &mut ProgressReporter,
) -> Result<u64, DownloadError> {
    let (tx, rx) = mpsc::channel::<(usize, Result<u64, FetchError>)>();
    let mut handles = Vec::with_capacity(segments.len());

    for segment in segments {
        let tx = tx.clone();
        let url = url.to_string();
        let referer = referer.map(str::to_string);
        let part = part_path(output_path, segment.index);
        let flags = Arc::clone(flags);
        let segment = *segment;
        handles.push(thread::spawn(move || {
            let res = fetch::fetch_segment(&url, referer.as_deref(), &segment, &part, &flags);
            let _ = tx.send((segment.index, res));
        }));
    }
    drop(tx);

    let mut total: u64 = 0;
    let mut first_error: Option<DownloadError> = None;
    while let Ok((index, res)) = rx.recv() {
        match res {
            Ok(bytes) => {
                total += bytes;
                if first_error.is_none() {
                    reporter.report(total);
                }
            }
            Err(e) => {
                tracing::warn!(segment = index, error = %e, "segment failed");
                if first_error.is_none() {
                    first_error = Some(DownloadError::from_segment(index, e));
                }
            }
        }
        if first_error.is_none() && flags.is_cancelled() {
            first_error = Some(DownloadError::Cancelled);
        }
    }

    for handle in handles {
        if handle.join().is_err() && first_error.is_none() {
            first_error = Some(DownloadError::Segment {
                index: 0,
                reason: "segment worker panicked".to_string(),
            });
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(total),
    }
}
