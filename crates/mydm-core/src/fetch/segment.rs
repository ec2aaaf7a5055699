//! One range GET streamed into a `.partN` sidecar file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::FetchError;
use crate::registry::ControlFlags;
use crate::segmenter::Segment;

use super::{check_transfer, new_get_easy, wait_while_paused};

/// Fetches `segment` of `url` into `part_path`.
///
/// Issues `GET` with `Range: bytes=start-end` and writes the body
/// sequentially. Returns the number of bytes physically written. No
/// retries; the coordinator aborts the whole download on failure and the
/// sidecar is left in place for its cleanup pass.
pub fn fetch_segment(
    url: &str,
    referer: Option<&str>,
    segment: &Segment,
    part_path: &Path,
    flags: &ControlFlags,
) -> Result<u64, FetchError> {
    let file = File::create(part_path)?;
    let mut out = BufWriter::new(file);
    let mut written: u64 = 0;
    let mut write_err: Option<io::Error> = None;

    let mut easy = new_get_easy(url, referer)?;
    easy.range(&segment.range_value())?;

    let result = {
        let mut transfer = easy.transfer();
        // Fires even when no data flows, so cancel reaches a stalled
        // connection too.
        transfer.progress_function(|_, _, _, _| !flags.is_cancelled())?;
        transfer.write_function(|data| {
            if !wait_while_paused(flags) {
                return Ok(0);
            }
            match out.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    write_err = Some(e);
                    Ok(0)
                }
            }
        })?;
        transfer.perform()
    };

    check_transfer(&mut easy, result, flags, write_err)?;
    out.flush()?;

    let expected = segment.len();
    if written != expected {
        return Err(FetchError::Partial {
            expected,
            received: written,
        });
    }
    Ok(written)
}
