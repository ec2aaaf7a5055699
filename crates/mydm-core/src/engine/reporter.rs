//! Progress aggregation for one running download.

use std::sync::Arc;
use std::time::Instant;

use crate::events::Event;
use crate::id::DownloadId;
use crate::progress::{self, ProgressThrottle};
use crate::registry::ControlFlags;

use super::ManagerInner;

/// Turns byte counts from the fetch loops into registry updates and
/// throttled `progress` events. One reporter per coordinator, so the
/// per-download throttle state lives right here.
pub(super) struct ProgressReporter {
    inner: Arc<ManagerInner>,
    id: DownloadId,
    filename: String,
    size: u64,
    started_at: Instant,
    flags: Arc<ControlFlags>,
    throttle: ProgressThrottle,
}

impl ProgressReporter {
    pub(super) fn new(
        inner: Arc<ManagerInner>,
        id: DownloadId,
        filename: String,
        size: u64,
        started_at: Instant,
        flags: Arc<ControlFlags>,
    ) -> Self {
        Self {
            inner,
            id,
            filename,
            size,
            started_at,
            flags,
            throttle: ProgressThrottle::default(),
        }
    }

    /// Records `downloaded` total bytes and maybe emits a `progress` event.
    /// With an unknown size there is no meaningful percentage, so only the
    /// registry is updated. Once cancellation is requested the `cancelled`
    /// ack is this download's last word, so nothing is emitted.
    pub(super) fn report(&mut self, downloaded: u64) {
        self.inner.registry.set_downloaded(&self.id, downloaded);
        if self.size == 0 || self.flags.is_cancelled() || !self.throttle.allow() {
            return;
        }
        self.inner.events.send(Event::Progress {
            id: self.id.clone(),
            filename: self.filename.clone(),
            percent: progress::percent(downloaded, self.size),
            speed: progress::format_speed(downloaded, self.started_at.elapsed()),
            size: self.size,
            downloaded,
        });
    }
}
