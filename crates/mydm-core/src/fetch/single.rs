//! Whole-file GET for servers without range support and for small files.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::FetchError;
use crate::registry::ControlFlags;

use super::{check_transfer, new_get_easy, wait_while_paused};

/// Fetches `url` with one plain GET straight into the final path.
///
/// Unlike the segmented path there is no completion boundary to hook, so
/// `on_chunk` is invoked with the cumulative byte count after every chunk;
/// the caller throttles how many of those become progress events. Returns
/// the number of bytes written.
pub fn fetch_single(
    url: &str,
    referer: Option<&str>,
    dest: &Path,
    flags: &ControlFlags,
    mut on_chunk: impl FnMut(u64),
) -> Result<u64, FetchError> {
    let file = File::create(dest)?;
    let mut out = BufWriter::new(file);
    let mut written: u64 = 0;
    let mut write_err: Option<io::Error> = None;

    let mut easy = new_get_easy(url, referer)?;

    let result = {
        let mut transfer = easy.transfer();
        transfer.progress_function(|_, _, _, _| !flags.is_cancelled())?;
        transfer.write_function(|data| {
            if !wait_while_paused(flags) {
                return Ok(0);
            }
            match out.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    on_chunk(written);
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
    Ok(written)
}
