//! Length-prefixed frames on the native messaging streams.
//!
//! Each frame is a 4-byte unsigned length in host byte order followed by
//! that many bytes of UTF-8 JSON. The browser-side convention is
//! host-endian, so the prefix is written with `to_ne_bytes` and must never
//! be normalized to network order.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on an inbound frame. A length beyond this is stream
/// desync, not a real message; the codec cannot resync past it.
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Reads one frame. `Ok(None)` means the stream ended, cleanly or with a
/// short read on the length or payload; both end the session.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_bytes).await {
        return eof_as_none(e);
    }

    let len = u32::from_ne_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        tracing::warn!(len, "frame length out of range, closing stream");
        return Ok(None);
    }

    let mut payload = vec![0u8; len];
    if let Err(e) = reader.read_exact(&mut payload).await {
        return eof_as_none(e);
    }
    Ok(Some(payload))
}

/// Writes one frame and flushes. Length and payload go out back to back;
/// the single emitter task is the only writer, so frames never interleave.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = payload.len() as u32;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

fn eof_as_none(e: io::Error) -> io::Result<Option<Vec<u8>>> {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Ok(None)
    } else {
        Err(e)
    }
}
