//! Blocking HTTP fetchers for segment and whole-file GETs.
//!
//! Both fetchers stream the body through a curl write callback straight to
//! disk and poll the download's control flags between chunks: a set cancel
//! flag aborts the transfer, a set pause flag parks the worker in a 100 ms
//! sleep loop without dropping the connection. Everything here blocks; the
//! coordinator drives it from worker threads or `spawn_blocking`.

mod segment;
mod single;

pub use segment::fetch_segment;
pub use single::fetch_single;

use std::io;
use std::time::Duration;

use crate::error::FetchError;
use crate::registry::ControlFlags;

/// User agent presented on every request, probe included.
pub const USER_AGENT: &str = "MyDM/1.0";

/// Per-connection deadline for establishing a transfer.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// curl receive buffer; bounds the chunk size handed to the write callback.
const CHUNK_SIZE: usize = 8 * 1024;

/// How often a paused worker re-checks its flags.
const PAUSE_POLL: Duration = Duration::from_millis(100);

/// Common GET handle setup shared by the segment and single fetchers.
fn new_get_easy(url: &str, referer: Option<&str>) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.useragent(USER_AGENT)?;
    if let Some(referer) = referer {
        easy.referer(referer)?;
    }
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(CONNECT_TIMEOUT)?;
    easy.buffer_size(CHUNK_SIZE)?;
    // 4xx/5xx fail the transfer before the error body reaches the write
    // callback, so nothing of it lands on disk.
    easy.fail_on_error(true)?;
    easy.progress(true)?;
    Ok(easy)
}

/// Blocks while the download is paused. Returns `false` when the transfer
/// should abort because cancel was requested.
fn wait_while_paused(flags: &ControlFlags) -> bool {
    while flags.is_paused() && !flags.is_cancelled() {
        std::thread::sleep(PAUSE_POLL);
    }
    !flags.is_cancelled()
}

/// Maps a finished transfer onto `FetchError`, distinguishing cancellation
/// and stashed disk errors from genuine transport failures.
fn check_transfer(
    easy: &mut curl::easy::Easy,
    result: Result<(), curl::Error>,
    flags: &ControlFlags,
    write_err: Option<io::Error>,
) -> Result<(), FetchError> {
    if let Err(e) = result {
        if flags.is_cancelled() && (e.is_write_error() || e.is_aborted_by_callback()) {
            return Err(FetchError::Cancelled);
        }
        if e.is_write_error() {
            if let Some(io_err) = write_err {
                return Err(FetchError::Io(io_err));
            }
        }
        if e.is_http_returned_error() {
            let code = easy.response_code().unwrap_or(0);
            return Err(FetchError::Http(code));
        }
        return Err(FetchError::Curl(e));
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }
    Ok(())
}
