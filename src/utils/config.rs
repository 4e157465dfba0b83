//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Download location
    pub download_dir: PathBuf,

    /// Retry count passed through to the download engine
    pub engine_retries: u32,

    /// Thumbnail fetch timeout in seconds
    pub thumbnail_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            engine_retries: 3,
            thumbnail_timeout_secs: 5,
        }
    }
}

impl AppSettings {
    /// Load settings from the platform config directory, falling back to
    /// defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        let path = settings_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppSettings>(&contents) {
                Ok(mut settings) => {
                    if !settings.download_dir.is_dir() {
                        settings.download_dir = default_download_dir();
                    }
                    settings
                }
                Err(e) => {
                    warn!("Ignoring malformed settings file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist settings as JSON in the platform config directory.
    pub fn save(&self) -> std::io::Result<()> {
        let path = settings_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Update the download directory and remember it for the next run.
    pub fn set_download_dir(&mut self, dir: &Path) -> std::io::Result<()> {
        self.download_dir = dir.to_path_buf();
        self.save()
    }
}

/// Returns the default download directory (~/Downloads, else cwd)
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tubequeue")
        .join("settings.json")
}
