//! The download engine: per-URL lifecycle behind a small command API.
//!
//! `DownloadManager` is what the host talks to. `start_download` mints the
//! id, registers the record, and spawns a coordinator task; `pause`,
//! `resume`, and `cancel` flip registry flags that the running fetch loops
//! observe. Every externally visible effect leaves through the event
//! channel, in per-download order: `started`, then progress/pause/resume
//! traffic, then exactly one terminal event.

mod coordinator;
mod merge;
mod reporter;
mod workers;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::events::{Event, EventSender};
use crate::id::{download_id, DownloadId};
use crate::registry::{DownloadRecord, Registry};

/// Shared state behind the manager handle.
pub(crate) struct ManagerInner {
    pub(crate) download_dir: PathBuf,
    pub(crate) segments: usize,
    pub(crate) registry: Registry,
    pub(crate) events: EventSender,
}

/// Cloneable handle to the engine.
#[derive(Clone)]
pub struct DownloadManager {
    inner: Arc<ManagerInner>,
}

impl DownloadManager {
    /// Creates the engine, ensuring the download directory exists.
    /// `segments` is the per-download worker count for range-capable files.
    pub fn new(download_dir: PathBuf, segments: usize, events: EventSender) -> Result<Self> {
        fs::create_dir_all(&download_dir).with_context(|| {
            format!("failed to create download dir {}", download_dir.display())
        })?;
        Ok(Self {
            inner: Arc::new(ManagerInner {
                download_dir,
                segments: segments.max(1),
                registry: Registry::new(),
                events,
            }),
        })
    }

    /// Starts (or re-acknowledges) a download and returns its id.
    ///
    /// If the URL's id is already active the existing transfer keeps
    /// running and only a fresh `started` ack is emitted. Otherwise a new
    /// record is registered and a coordinator task takes over; this call
    /// never waits for network. Must be called from within a tokio runtime.
    pub fn start_download(&self, url: &str, referer: Option<String>) -> DownloadId {
        let id = download_id(url);
        let record = DownloadRecord::new(id.clone(), url.to_string(), referer.clone());
        let fresh = self.inner.registry.begin(record);
        self.inner.events.send(Event::Started { id: id.clone() });
        if !fresh {
            tracing::debug!(id = %id, url, "download already active");
            return id;
        }

        tracing::info!(id = %id, url, "starting download");
        let inner = Arc::clone(&self.inner);
        let task_id = id.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            coordinator::run(inner, task_id, url, referer).await;
        });
        id
    }

    /// Pauses a download and acks. Fetch loops stop consuming within
    /// ~100 ms; connections stay open.
    pub fn pause(&self, id: &str) {
        self.inner.registry.set_paused(id, true);
        self.inner.events.send(Event::Paused { id: id.to_string() });
        tracing::info!(id, "paused");
    }

    /// Clears a pause and acks; the in-flight requests pick up where they
    /// stopped.
    pub fn resume(&self, id: &str) {
        self.inner.registry.set_paused(id, false);
        self.inner.events.send(Event::Resumed { id: id.to_string() });
        tracing::info!(id, "resumed");
    }

    /// Requests cancellation and acks. The ack is the terminal event for
    /// this id; the coordinator cleans up sidecars silently once its
    /// workers notice the flag.
    pub fn cancel(&self, id: &str) {
        self.inner.registry.set_cancelled(id);
        self.inner.events.send(Event::Cancelled { id: id.to_string() });
        tracing::info!(id, "cancelled");
    }

    /// By-value view of a download's current state, kept valid after the
    /// transfer finishes.
    pub fn status(&self, id: &str) -> Option<DownloadRecord> {
        self.inner.registry.snapshot(id)
    }

    /// Cancels everything still running. Called when the inbound stream
    /// closes so coordinators wind down (removing their sidecars) instead
    /// of holding the process open on in-flight transfers.
    pub fn shutdown(&self) {
        self.inner.registry.cancel_all();
    }

    /// Directory downloads are saved into.
    pub fn download_dir(&self) -> &Path {
        &self.inner.download_dir
    }
}

/// Sidecar path for one segment: `<final>.partN`.
pub(crate) fn part_path(output_path: &Path, index: usize) -> PathBuf {
    let mut os = output_path.as_os_str().to_os_string();
    os.push(format!(".part{index}"));
    PathBuf::from(os)
}
