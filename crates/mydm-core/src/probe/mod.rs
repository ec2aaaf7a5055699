//! HTTP HEAD probing: size, suggested filename, range support.
//!
//! One metadata-only request up front decides everything about how a
//! download runs: whether it can be split, how many bytes to expect, and
//! what the file should be called.

mod parse;

use std::str;
use std::time::Duration;

use crate::error::FetchError;
use crate::fetch::USER_AGENT;
use crate::naming;

/// Whole-probe deadline, redirects included.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// What the probe learned about the resource.
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Sanitized filename to save under.
    pub filename: String,
    /// Total size in bytes; 0 when `Content-Length` is absent.
    pub size: u64,
    /// True when the server advertises byte-range requests.
    pub resumable: bool,
}

/// Issues the HEAD request and derives `FileInfo`.
///
/// Follows redirects, 10 second deadline. Blocking; call from
/// `spawn_blocking` when driving it from async code.
pub fn probe(url: &str, referer: Option<&str>) -> Result<FileInfo, FetchError> {
    let mut header_lines: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?; // HEAD
    easy.useragent(USER_AGENT)?;
    if let Some(referer) = referer {
        easy.referer(referer)?;
    }
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.timeout(PROBE_TIMEOUT)?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                header_lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    let headers = parse::parse_headers(&header_lines);
    let filename = naming::derive_filename(url, headers.content_disposition.as_deref());

    Ok(FileInfo {
        filename,
        size: headers.content_length.unwrap_or(0),
        resumable: headers.accept_ranges,
    })
}
