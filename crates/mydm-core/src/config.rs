use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Workers per segmented download when the config does not say otherwise.
pub const DEFAULT_SEGMENTS: usize = 8;

/// Host configuration from `~/.config/mydm/config.toml`.
///
/// Everything has a default and a broken or unreadable file never stops the
/// host; at worst it runs with defaults and a warning in the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Where finished files land. Defaults to the user's Downloads folder.
    pub download_dir: Option<PathBuf>,
    /// Number of parallel range workers per download.
    pub segments: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            segments: DEFAULT_SEGMENTS,
        }
    }
}

impl HostConfig {
    /// Loads the config file. On the very first run the file does not
    /// exist yet, so the defaults are written out to make the knobs
    /// discoverable; every failure mode degrades to defaults.
    pub fn load() -> Self {
        let path = match config_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "cannot locate config dir, using defaults");
                return Self::default();
            }
        };
        match fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "bad config file, using defaults");
                Self::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default().written_to(&path),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read config, using defaults");
                Self::default()
            }
        }
    }

    /// Effective download directory: config override, the platform Downloads
    /// folder, or `~/Downloads` when the lookup has nothing better.
    pub fn resolve_download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download_dir {
            return dir.clone();
        }
        dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
            .unwrap_or_else(|| PathBuf::from("Downloads"))
    }

    /// Best-effort write of this config to `path`, returning `self` either
    /// way so first-run setup cannot fail the host.
    fn written_to(self, path: &Path) -> Self {
        match toml::to_string_pretty(&self) {
            Ok(raw) => {
                if let Err(e) = fs::write(path, raw) {
                    tracing::warn!(path = %path.display(), error = %e, "could not write default config");
                } else {
                    tracing::info!("created default config at {}", path.display());
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not serialize default config"),
        }
        self
    }
}

/// `~/.config/mydm/config.toml`; the XDG lookup creates the parent
/// directories as a side effect of placing the file.
fn config_path() -> Result<PathBuf> {
    Ok(xdg::BaseDirectories::with_prefix("mydm")?.place_config_file("config.toml")?)
}
