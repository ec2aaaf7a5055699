//! Download IDs: stable 12-hex handles derived from the request URL.

/// External handle for one download across the wire protocol.
pub type DownloadId = String;

/// Derives the DownloadId for a URL: hex of the first 6 bytes of `md5(url)`.
///
/// The same URL always yields the same id, so a repeated `download` command
/// resolves to the already-running transfer. Collision resistance is not a
/// goal; the id is an opaque handle, not an integrity check.
pub fn download_id(url: &str) -> DownloadId {
    let digest = md5::compute(url.as_bytes());
    let mut out = String::with_capacity(12);
    for byte in &digest.0[..6] {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
