//! Minimal HTTP/1.1 server for integration tests: HEAD metadata, Range GET
//! with 206, optional response throttling, and a request log so tests can
//! assert how many GETs were issued and with which ranges.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Send `Accept-Ranges: bytes` on responses.
    pub advertise_ranges: bool,
    /// Status returned to HEAD (and GET) when not 200, e.g. 404.
    pub status: u16,
    /// Extra `Content-Disposition` header value for HEAD responses.
    pub content_disposition: Option<String>,
    /// Stream GET bodies in pieces of this many bytes with a sleep between
    /// them, to give tests time to pause or cancel mid-flight.
    pub throttle: Option<(usize, Duration)>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            advertise_ranges: true,
            status: 200,
            content_disposition: None,
            throttle: None,
        }
    }
}

/// One request the server saw.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub range: Option<String>,
}

/// Handle to a running test server.
pub struct TestServer {
    /// URL of the single file the server serves.
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.eq_ignore_ascii_case("GET"))
            .collect()
    }

    pub fn heads(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.eq_ignore_ascii_case("HEAD"))
            .collect()
    }
}

/// Starts a server in a background thread serving `body` at `/file.bin`.
/// Runs until the process exits.
pub fn start(body: Vec<u8>) -> TestServer {
    start_with_options(body, ServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: ServerOptions) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = opts.clone();
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &body, &opts, &log));
        }
    });

    TestServer {
        url: format!("http://127.0.0.1:{}/file.bin", port),
        requests,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    body: &[u8],
    opts: &ServerOptions,
    log: &Mutex<Vec<RecordedRequest>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    log.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        range: range.clone(),
    });

    if opts.status != 200 {
        let _ = write!(stream, "HTTP/1.1 {} Oops\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", opts.status);
        return;
    }

    let accept_ranges = if opts.advertise_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };
    let disposition = opts
        .content_disposition
        .as_deref()
        .map(|v| format!("Content-Disposition: {}\r\n", v))
        .unwrap_or_default();
    let total = body.len() as u64;

    if method.eq_ignore_ascii_case("HEAD") {
        let _ = write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}{}Connection: close\r\n\r\n",
            total, accept_ranges, disposition
        );
        return;
    }

    if method.eq_ignore_ascii_case("GET") {
        let (status, slice) = match parse_range(range.as_deref(), total) {
            Some((start, end_incl)) => (
                "206 Partial Content",
                &body[start as usize..=end_incl as usize],
            ),
            None => ("200 OK", body),
        };
        let _ = write!(
            stream,
            "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
            status,
            slice.len(),
            accept_ranges
        );
        match opts.throttle {
            Some((piece, delay)) => {
                for chunk in slice.chunks(piece.max(1)) {
                    if stream.write_all(chunk).is_err() {
                        return;
                    }
                    let _ = stream.flush();
                    thread::sleep(delay);
                }
            }
            None => {
                let _ = stream.write_all(slice);
            }
        }
        return;
    }

    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
}

/// Returns (method, raw value of the Range header if present).
fn parse_request(request: &str) -> (&str, Option<String>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                range = Some(value.trim().to_string());
            }
        }
    }
    (method, range)
}

/// Parses `bytes=S-E` into clamped inclusive offsets.
fn parse_range(range: Option<&str>, total: u64) -> Option<(u64, u64)> {
    let range = range?;
    let value = range.strip_prefix("bytes=")?;
    let (start, end) = value.split_once('-')?;
    let start: u64 = start.trim().parse().ok()?;
    let end_incl: u64 = match end.trim() {
        "" => total.saturating_sub(1),
        s => s.parse().ok()?,
    };
    if start > end_incl || start >= total {
        return None;
    }
    Some((start, end_incl.min(total.saturating_sub(1))))
}
