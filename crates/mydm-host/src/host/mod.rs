//! The native messaging session: framed commands in, framed events out.

pub(crate) mod dispatch;
pub(crate) mod emitter;
pub(crate) mod framing;


use mydm_core::engine::DownloadManager;
use mydm_core::events::EventSender;
use tokio::io::AsyncRead;

/// Reads command frames until the inbound stream ends.
///
/// Dispatch is synchronous and cheap (downloads run on their own tasks),
/// so a command is picked up as soon as the previous frame is parsed.
/// Returns `Ok(())` on clean end of stream.
pub async fn run<R>(
    mut input: R,
    manager: &DownloadManager,
    events: &EventSender,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    while let Some(payload) = framing::read_frame(&mut input).await? {
        dispatch::handle_frame(manager, events, &payload);
    }
    tracing::info!("inbound stream closed");
    Ok(())
}
