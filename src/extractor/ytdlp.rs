//! yt-dlp metadata extraction
//!
//! Runs yt-dlp to analyze a single video URL before it is queued. Supports
//! a binary placed next to the executable as well as system installs.

use crate::extractor::models::VideoInfo;
use crate::utils::error::TubequeueError;
use anyhow::Result;
use std::path::PathBuf;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info, warn};

/// Metadata analyzer backed by yt-dlp
pub struct MediaAnalyzer {
    ytdlp_path: PathBuf,
}

impl MediaAnalyzer {
    /// Initialize the analyzer and verify yt-dlp availability
    pub fn new() -> Result<Self> {
        let ytdlp_path = match find_ytdlp() {
            Some(path) => {
                info!("Found yt-dlp at: {}", path.display());
                path
            }
            None => {
                error!("yt-dlp not found anywhere!");
                return Err(TubequeueError::YtDlpNotFound.into());
            }
        };

        Ok(Self { ytdlp_path })
    }

    /// Use a specific yt-dlp binary without probing the system.
    pub fn with_path(ytdlp_path: PathBuf) -> Self {
        Self { ytdlp_path }
    }

    /// Extract video information without downloading.
    /// Uses: yt-dlp --dump-json --no-download --no-playlist
    ///
    /// Playlist URLs are rejected up front; each queue entry must be a
    /// single video.
    pub async fn analyze(&self, url: &str) -> Result<VideoInfo> {
        if url.contains("playlist?list=") {
            return Err(TubequeueError::PlaylistUrl.into());
        }

        debug!("Analyzing URL: {}", url);

        let output = AsyncCommand::new(&self.ytdlp_path)
            .arg("--dump-json")
            .arg("--no-download")
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg(url)
            .output()
            .await?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp analysis failed: {}", error_msg.trim());
            return Err(TubequeueError::AnalysisFailed(error_msg.trim().to_string()).into());
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        let video_info: VideoInfo = serde_json::from_str(&json_str)?;

        Ok(video_info)
    }

    /// Path of the yt-dlp binary in use
    pub fn ytdlp_path(&self) -> &PathBuf {
        &self.ytdlp_path
    }
}

// ============================================================
// Binary discovery
// ============================================================

/// Find yt-dlp with priority: next to the executable, system PATH,
/// common installation paths.
pub fn find_ytdlp() -> Option<PathBuf> {
    if let Some(adjacent) = find_adjacent("yt-dlp") {
        info!("Using adjacent yt-dlp: {}", adjacent.display());
        return Some(adjacent);
    }

    if let Ok(system) = which::which("yt-dlp") {
        info!("Using system yt-dlp: {}", system.display());
        return Some(system);
    }

    if let Some(common) = find_in_common_paths() {
        info!("Using yt-dlp from common path: {}", common.display());
        return Some(common);
    }

    warn!("yt-dlp not found anywhere");
    None
}

/// Find ffmpeg the same way; `None` leaves the engine to rely on PATH.
pub fn find_ffmpeg() -> Option<PathBuf> {
    find_adjacent("ffmpeg").or_else(|| which::which("ffmpeg").ok())
}

/// Check next to the current executable (portable installs, dev builds)
fn find_adjacent(name: &str) -> Option<PathBuf> {
    let binary = if cfg!(target_os = "windows") {
        format!("{name}.exe")
    } else {
        name.to_string()
    };
    let exe_dir = std::env::current_exe().ok()?.parent()?.to_path_buf();
    let candidate = exe_dir.join(binary);
    candidate.is_file().then_some(candidate)
}

fn find_in_common_paths() -> Option<PathBuf> {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp",
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
    ];

    for path_str in common_paths {
        let path = PathBuf::from(path_str);
        if path.is_file() {
            return Some(path);
        }
    }

    // pip --user installs
    if let Some(home) = dirs::home_dir() {
        let user_bin = home.join(".local/bin/yt-dlp");
        if user_bin.is_file() {
            return Some(user_bin);
        }
    }

    None
}
