//! Outbound protocol events and the channel they travel on.
//!
//! The engine never writes to the outbound stream itself: coordinators and
//! the command dispatcher push `Event` values into a single unbounded
//! channel, and the host's emitter task drains it onto stdout. Keeping the
//! side-effect path out of the engine means no event is ever produced while
//! the registry lock is held.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::id::DownloadId;

/// One outbound event frame, serialized with an `"event"` tag.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Event {
    Started {
        id: DownloadId,
    },
    Progress {
        id: DownloadId,
        filename: String,
        percent: u32,
        speed: String,
        size: u64,
        downloaded: u64,
    },
    Complete {
        id: DownloadId,
        filename: String,
        file: String,
        percent: u32,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<DownloadId>,
        error: String,
    },
    Paused {
        id: DownloadId,
    },
    Resumed {
        id: DownloadId,
    },
    Cancelled {
        id: DownloadId,
    },
}

impl Event {
    /// Completion event; `percent` is always 100 on the wire.
    pub fn complete(id: DownloadId, filename: String, file: String) -> Self {
        Event::Complete {
            id,
            filename,
            file,
            percent: 100,
        }
    }

    /// Error event for a failure that happened before an id was minted.
    pub fn pre_id_error(error: String) -> Self {
        Event::Error { id: None, error }
    }

    /// Error event for a known download.
    pub fn error(id: DownloadId, error: String) -> Self {
        Event::Error {
            id: Some(id),
            error,
        }
    }
}

/// Cloneable sending half of the event channel.
///
/// Sends never block; if the emitter has shut down the event is dropped,
/// which only happens while the process is already exiting.
#[derive(Clone)]
pub struct EventSender(mpsc::UnboundedSender<Event>);

impl EventSender {
    pub fn send(&self, event: Event) {
        if self.0.send(event).is_err() {
            tracing::debug!("event channel closed, dropping event");
        }
    }
}

/// Creates the process-wide event channel.
pub fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender(tx), rx)
}
