//! Progress throttling and human-readable rate formatting.

use std::time::{Duration, Instant};

/// Minimum spacing between `progress` events for one download.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Rate-limits progress reports for a single download.
///
/// Only `progress` events go through the throttle; terminal events and
/// command acks bypass it entirely.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emitted_at: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emitted_at: None,
        }
    }

    /// True if enough time has passed since the last allowed report.
    /// A `true` return counts as an emission.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        match self.last_emitted_at {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_emitted_at = Some(now);
                true
            }
        }
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(PROGRESS_INTERVAL)
    }
}

/// Integer percentage in [0, 100]; 0 when the total size is unknown.
pub fn percent(downloaded: u64, size: u64) -> u32 {
    if size == 0 {
        return 0;
    }
    ((downloaded.saturating_mul(100)) / size).min(100) as u32
}

/// Average transfer rate as `B/s`, `KB/s`, or `MB/s` (powers of 1024,
/// one decimal place).
pub fn format_speed(downloaded: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return "0 B/s".to_string();
    }
    let rate = downloaded as f64 / secs;
    if rate < 1024.0 {
        format!("{:.1} B/s", rate)
    } else if rate < 1024.0 * 1024.0 {
        format!("{:.1} KB/s", rate / 1024.0)
    } else {
        format!("{:.1} MB/s", rate / (1024.0 * 1024.0))
    }
}
