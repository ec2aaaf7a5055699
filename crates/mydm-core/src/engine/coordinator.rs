//! Per-download lifecycle: probe, partition, fetch, merge, terminal event.

use std::path::Path;
use std::sync::Arc;

use tokio::task;

use crate::error::{DownloadError, FetchError};
use crate::events::Event;
use crate::fetch;
use crate::id::DownloadId;
use crate::probe::{self, FileInfo};
use crate::registry::{ControlFlags, DownloadStatus};
use crate::segmenter::{self, Segment};

use super::merge;
use super::reporter::ProgressReporter;
use super::workers;
use super::ManagerInner;

/// Drives one download from probe to a terminal state. Spawned per
/// `download` command; all blocking work runs on the blocking pool so the
/// dispatcher keeps reading commands.
pub(super) async fn run(
    inner: Arc<ManagerInner>,
    id: DownloadId,
    url: String,
    referer: Option<String>,
) {
    let info = {
        let url = url.clone();
        let referer = referer.clone();
        let joined = task::spawn_blocking(move || probe::probe(&url, referer.as_deref())).await;
        match joined {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                fail(&inner, &id, DownloadError::Probe(e.to_string()));
                return;
            }
            Err(e) => {
                fail(&inner, &id, DownloadError::Probe(e.to_string()));
                return;
            }
        }
    };

    let output_path = inner.download_dir.join(&info.filename);
    let single = segmenter::use_single_fetch(info.size, info.resumable);
    let num_segments = if single { 1 } else { inner.segments };
    inner.registry.set_file_info(
        &id,
        info.filename.clone(),
        output_path.clone(),
        info.size,
        num_segments,
    );
    tracing::debug!(
        id = %id,
        filename = %info.filename,
        size = info.size,
        resumable = info.resumable,
        segments = num_segments,
        "probe complete"
    );

    // A finished copy from an earlier run satisfies the request outright.
    if info.size > 0 && file_len(&output_path) == Some(info.size) {
        inner.registry.set_downloaded(&id, info.size);
        inner.registry.set_status(&id, DownloadStatus::Complete);
        tracing::info!(id = %id, path = %output_path.display(), "already on disk, skipping fetch");
        inner.events.send(Event::complete(
            id,
            info.filename,
            output_path.display().to_string(),
        ));
        return;
    }

    let Some(flags) = inner.registry.flags(&id) else {
        return;
    };
    if flags.is_cancelled() {
        // Cancelled during the probe; nothing on disk yet and the
        // dispatcher already emitted the terminal ack.
        return;
    }
    if !flags.is_paused() {
        inner.registry.set_status(&id, DownloadStatus::Downloading);
    }

    let started_at = match inner.registry.snapshot(&id) {
        Some(record) => record.started_at,
        None => return,
    };

    let result = {
        let inner = Arc::clone(&inner);
        let id = id.clone();
        let info = info.clone();
        let output_path = output_path.clone();
        let flags = Arc::clone(&flags);
        task::spawn_blocking(move || {
            let mut reporter = ProgressReporter::new(
                Arc::clone(&inner),
                id,
                info.filename.clone(),
                info.size,
                started_at,
                Arc::clone(&flags),
            );
            if single {
                run_single(&url, referer.as_deref(), &output_path, &info, &flags, &mut reporter)
            } else {
                run_multi(
                    &url,
                    referer.as_deref(),
                    &output_path,
                    &info,
                    inner.segments,
                    &flags,
                    &mut reporter,
                )
            }
        })
        .await
        .unwrap_or_else(|e| {
            Err(DownloadError::Segment {
                index: 0,
                reason: format!("download task panicked: {e}"),
            })
        })
    };

    match result {
        Ok(bytes) => {
            let downloaded = if info.size > 0 { info.size } else { bytes };
            inner.registry.set_downloaded(&id, downloaded);
            inner.registry.set_status(&id, DownloadStatus::Complete);
            tracing::info!(id = %id, path = %output_path.display(), bytes, "download complete");
            inner.events.send(Event::complete(
                id,
                info.filename,
                output_path.display().to_string(),
            ));
        }
        Err(DownloadError::Cancelled) => {
            merge::cleanup_sidecars(&output_path, num_segments);
            inner.registry.set_status(&id, DownloadStatus::Cancelled);
            tracing::info!(id = %id, "download cancelled, sidecars removed");
            // The dispatcher's `cancelled` ack is the terminal event.
        }
        Err(e) => {
            merge::cleanup_sidecars(&output_path, num_segments);
            fail(&inner, &id, e);
        }
    }
}

/// Single plain GET straight to the final path, with per-chunk progress.
fn run_single(
    url: &str,
    referer: Option<&str>,
    output_path: &Path,
    info: &FileInfo,
    flags: &ControlFlags,
    reporter: &mut ProgressReporter,
) -> Result<u64, DownloadError> {
    let bytes = fetch::fetch_single(url, referer, output_path, flags, |n| reporter.report(n))
        .map_err(|e| DownloadError::from_segment(0, e))?;
    if info.size > 0 && bytes != info.size {
        return Err(DownloadError::from_segment(
            0,
            FetchError::Partial {
                expected: info.size,
                received: bytes,
            },
        ));
    }
    Ok(bytes)
}

/// Partition, worker pool, merge.
fn run_multi(
    url: &str,
    referer: Option<&str>,
    output_path: &Path,
    info: &FileInfo,
    segment_count: usize,
    flags: &Arc<ControlFlags>,
    reporter: &mut ProgressReporter,
) -> Result<u64, DownloadError> {
    let segments: Vec<Segment> = segmenter::plan_segments(info.size, segment_count);
    let total = workers::run_segmented(url, referer, output_path, &segments, flags, reporter)?;
    merge::merge_segments(output_path, segments.len(), info.size)?;
    Ok(total)
}

/// Marks the download failed and emits its `error` event.
fn fail(inner: &ManagerInner, id: &str, err: DownloadError) {
    inner.registry.set_status(id, DownloadStatus::Error);
    tracing::warn!(id, error = %err, "download failed");
    inner.events.send(Event::error(id.to_string(), err.to_string()));
}

fn file_len(path: &Path) -> Option<u64> {
    let meta = std::fs::metadata(path).ok()?;
    meta.is_file().then(|| meta.len())
}
