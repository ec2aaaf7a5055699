//! Command routing: one inbound frame to one engine call.

use mydm_core::engine::DownloadManager;
use mydm_core::events::{Event, EventSender};
use serde::Deserialize;

/// Inbound frame shape. Everything is optional so field validation can
/// produce protocol `error` events instead of parse failures.
#[derive(Debug, Deserialize)]
pub(crate) struct IncomingCommand {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    referer: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

/// Parses and routes one frame.
///
/// Malformed JSON is a per-message problem: the frame is dropped with no
/// response and the loop keeps going. Missing fields and unknown commands
/// answer with an `error` event and change no state.
pub(crate) fn handle_frame(manager: &DownloadManager, events: &EventSender, payload: &[u8]) {
    let cmd: IncomingCommand = match serde_json::from_slice(payload) {
        Ok(cmd) => cmd,
        Err(e) => {
            tracing::warn!(error = %e, "dropping malformed frame");
            return;
        }
    };
    tracing::debug!(command = cmd.command.as_deref().unwrap_or("<missing>"), "received command");

    match cmd.command.as_deref() {
        Some("download") => match cmd.url {
            Some(url) => {
                manager.start_download(&url, cmd.referer);
            }
            None => events.send(Event::pre_id_error("No URL provided".to_string())),
        },
        Some("pause") => with_id(events, cmd.id, |id| manager.pause(id)),
        Some("resume") => with_id(events, cmd.id, |id| manager.resume(id)),
        Some("cancel") => with_id(events, cmd.id, |id| manager.cancel(id)),
        // A missing command reports as "None" on the wire; controllers
        // already match on that exact text.
        other => events.send(Event::pre_id_error(format!(
            "Unknown command: {}",
            other.unwrap_or("None")
        ))),
    }
}

fn with_id(events: &EventSender, id: Option<String>, action: impl FnOnce(&str)) {
    match id {
        Some(id) => action(&id),
        None => events.send(Event::pre_id_error("No download ID provided".to_string())),
    }
}
