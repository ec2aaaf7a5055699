//! Drains the event channel onto the outbound stream.

use mydm_core::events::Event;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc::UnboundedReceiver;

use super::framing;

/// Serializes events to frames, one at a time, flushing after each.
///
/// This task is the only writer on the outbound stream, which is what makes
/// frames atomic. Runs until every `EventSender` is gone or the stream
/// rejects a write (controller went away).
pub(crate) async fn run_emitter<W>(mut writer: W, mut events: UnboundedReceiver<Event>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.recv().await {
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize event");
                continue;
            }
        };
        if let Err(e) = framing::write_frame(&mut writer, &payload).await {
            tracing::warn!(error = %e, "outbound stream closed, stopping emitter");
            break;
        }
    }
}
