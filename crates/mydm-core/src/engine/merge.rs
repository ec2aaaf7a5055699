//! Reassembly of segment sidecars into the final file, and failure cleanup.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::DownloadError;

use super::part_path;

/// Concatenates `<final>.part0 .. .part(count-1)` into the final path,
/// strictly by index, unlinking each sidecar right after its bytes are
/// appended. The output is preallocated to `total_size` up front.
pub(super) fn merge_segments(
    output_path: &Path,
    count: usize,
    total_size: u64,
) -> Result<(), DownloadError> {
    concat_parts(output_path, count, total_size).map_err(|e| DownloadError::Merge(e.to_string()))
}

fn concat_parts(output_path: &Path, count: usize, total_size: u64) -> io::Result<()> {
    let file = File::create(output_path)?;
    preallocate(&file, total_size);
    let mut out = BufWriter::new(file);
    for index in 0..count {
        let part = part_path(output_path, index);
        let mut input = File::open(&part)?;
        io::copy(&mut input, &mut out)?;
        drop(input);
        let _ = fs::remove_file(&part);
    }
    out.flush()?;
    Ok(())
}

/// Reserves blocks for the merged file. `posix_fallocate` gets real
/// allocation on Unix; anywhere else (or on failure) `set_len` is enough.
fn preallocate(file: &File, size: u64) {
    if size == 0 {
        return;
    }
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let r = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, size as libc::off_t) };
        if r == 0 {
            return;
        }
        tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
    }
    let _ = file.set_len(size);
}

/// Removes every sidecar of an aborted or failed download. Unlink errors
/// are swallowed; nothing useful can be done with them at this point.
pub(super) fn cleanup_sidecars(output_path: &Path, count: usize) {
    for index in 0..count {
        let _ = fs::remove_file(part_path(output_path, index));
    }
}
