//! Process-wide table of downloads.
//!
//! One mutex serializes every access; the command rate is human-scale and a
//! single critical section avoids lock ordering questions entirely. The
//! pause/cancel flags live in an `Arc<ControlFlags>` that fetch loops clone
//! out of the record, so the hot path reads atomics and never touches the
//! table lock, and the lock is never held across I/O or sleeps.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::id::DownloadId;

/// Pause/cancel signals for one download. Written by the command dispatcher,
/// polled by fetch loops between chunks.
#[derive(Debug, Default)]
pub struct ControlFlags {
    paused: AtomicBool,
    cancelled: AtomicBool,
}

impl ControlFlags {
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    fn set_cancelled(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Paused,
    Complete,
    Cancelled,
    Error,
}

impl DownloadStatus {
    /// Terminal states never transition further.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DownloadStatus::Complete | DownloadStatus::Cancelled | DownloadStatus::Error
        )
    }

    /// Active downloads block a second `download` command for the same URL.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

/// State of one download, active or finished. Records are kept for the
/// lifetime of the process so late status queries stay answerable.
#[derive(Clone)]
pub struct DownloadRecord {
    pub id: DownloadId,
    pub url: String,
    pub referer: Option<String>,
    pub filename: String,
    pub output_path: PathBuf,
    pub size: u64,
    pub downloaded: u64,
    pub status: DownloadStatus,
    pub started_at: Instant,
    pub num_segments: usize,
    pub flags: Arc<ControlFlags>,
}

impl DownloadRecord {
    /// Fresh record for a just-received `download` command. Filename, path
    /// and size are filled in once the probe answers.
    pub fn new(id: DownloadId, url: String, referer: Option<String>) -> Self {
        Self {
            id,
            url,
            referer,
            filename: String::new(),
            output_path: PathBuf::new(),
            size: 0,
            downloaded: 0,
            status: DownloadStatus::Pending,
            started_at: Instant::now(),
            num_segments: 1,
            flags: Arc::new(ControlFlags::default()),
        }
    }
}

/// Thread-safe id → record table.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<HashMap<DownloadId, DownloadRecord>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new download. Returns `false` (and changes nothing) when
    /// an active record already holds this id; a finished record is
    /// replaced, which is what re-downloading the same URL means.
    pub fn begin(&self, record: DownloadRecord) -> bool {
        let mut map = self.inner.lock().unwrap();
        if let Some(existing) = map.get(&record.id) {
            if existing.status.is_active() {
                return false;
            }
        }
        map.insert(record.id.clone(), record);
        true
    }

    /// By-value copy of a record.
    pub fn snapshot(&self, id: &str) -> Option<DownloadRecord> {
        self.inner.lock().unwrap().get(id).cloned()
    }

    /// The control flags shared with this download's fetch loops.
    pub fn flags(&self, id: &str) -> Option<Arc<ControlFlags>> {
        self.inner
            .lock()
            .unwrap()
            .get(id)
            .map(|r| Arc::clone(&r.flags))
    }

    /// Sets the lifecycle status. Terminal states are sticky: once a record
    /// is complete, cancelled, or errored it stays that way.
    pub fn set_status(&self, id: &str, status: DownloadStatus) {
        if let Some(record) = self.inner.lock().unwrap().get_mut(id) {
            if !record.status.is_terminal() {
                record.status = status;
            }
        }
    }

    /// Fills in what the probe learned about the file.
    pub fn set_file_info(
        &self,
        id: &str,
        filename: String,
        output_path: PathBuf,
        size: u64,
        num_segments: usize,
    ) {
        if let Some(record) = self.inner.lock().unwrap().get_mut(id) {
            record.filename = filename;
            record.output_path = output_path;
            record.size = size;
            record.num_segments = num_segments;
        }
    }

    /// Updates the aggregate byte count.
    pub fn set_downloaded(&self, id: &str, downloaded: u64) {
        if let Some(record) = self.inner.lock().unwrap().get_mut(id) {
            record.downloaded = downloaded;
        }
    }

    /// Pause or unpause. Adjusts the status alongside the flag unless the
    /// download already reached a terminal state.
    pub fn set_paused(&self, id: &str, paused: bool) {
        if let Some(record) = self.inner.lock().unwrap().get_mut(id) {
            record.flags.set_paused(paused);
            if !record.status.is_terminal() {
                record.status = if paused {
                    DownloadStatus::Paused
                } else {
                    DownloadStatus::Downloading
                };
            }
        }
    }

    /// Requests cancellation. The fetch loops observe the flag at their
    /// next chunk or completion boundary.
    pub fn set_cancelled(&self, id: &str) {
        if let Some(record) = self.inner.lock().unwrap().get_mut(id) {
            record.flags.set_cancelled();
            if !record.status.is_terminal() {
                record.status = DownloadStatus::Cancelled;
            }
        }
    }

    /// Cancels every active download. Used at shutdown so in-flight
    /// transfers abort and their coordinators can clean up sidecars.
    pub fn cancel_all(&self) {
        for record in self.inner.lock().unwrap().values_mut() {
            if record.status.is_active() {
                record.flags.set_cancelled();
                record.status = DownloadStatus::Cancelled;
            }
        }
    }
}
