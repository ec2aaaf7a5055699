//! Logging setup for the host process.
//!
//! stdout carries the framed wire protocol, so log output may only ever go
//! to a file or to stderr; a single stray log line on stdout would
//! desynchronize the controller. `init` tries the state-dir log file first
//! and falls back to stderr on its own.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// One open log file shared by every fmt worker. Lines are written under
/// the lock, so concurrent coordinator and dispatcher logs never interleave
/// mid-line.
#[derive(Clone)]
struct SharedLogFile(Arc<Mutex<File>>);

impl Write for SharedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mydm_core=debug,mydm_host=debug"))
}

/// Opens `~/.local/state/mydm/host.log` for appending.
fn open_log_file() -> Result<(PathBuf, File)> {
    let dir = xdg::BaseDirectories::with_prefix("mydm")?.get_state_home();
    fs::create_dir_all(&dir)?;
    let path = dir.join("host.log");
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Initializes tracing exactly once, picking the destination itself: the
/// XDG state-dir log file when it can be opened, stderr otherwise.
pub fn init() {
    match open_log_file() {
        Ok((path, file)) => {
            let sink = SharedLogFile(Arc::new(Mutex::new(file)));
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(move || sink.clone())
                .with_ansi(false)
                .init();
            tracing::info!("logging to {}", path.display());
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(io::stderr)
                .with_ansi(false)
                .init();
            tracing::warn!(error = %e, "log file unavailable, logging to stderr");
        }
    }
}
