//! Data structures for video metadata reported by yt-dlp

use serde::{Deserialize, Serialize};

/// Video information parsed from `yt-dlp --dump-json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(alias = "webpage_url", default)]
    pub url: String,
    #[serde(default)]
    pub formats: Vec<FormatInfo>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

fn untitled() -> String {
    "untitled".to_string()
}

/// A single encoded stream entry from the formats list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatInfo {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub abr: Option<f64>,
}

impl FormatInfo {
    fn is_audio_only(&self) -> bool {
        matches!(self.vcodec.as_deref(), Some("none") | None)
            && !matches!(self.acodec.as_deref(), Some("none") | None)
    }
}

/// An audio download choice derived from the available formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioOption {
    /// Container extension, e.g. "m4a"
    pub ext: String,
    /// Normalized codec name, e.g. "aac"
    pub codec: String,
}

impl AudioOption {
    pub fn label(&self) -> String {
        format!("{} ({})", self.ext, self.codec)
    }
}

impl VideoInfo {
    /// Sorted distinct video heights available for this video.
    pub fn available_heights(&self) -> Vec<u32> {
        let mut heights: Vec<u32> = self.formats.iter().filter_map(|f| f.height).collect();
        heights.sort_unstable();
        heights.dedup();
        heights
    }

    /// Distinct (ext, codec) audio choices, with an m4a/aac fallback when
    /// the format list carries no audio-only entries.
    pub fn audio_options(&self) -> Vec<AudioOption> {
        let mut options: Vec<AudioOption> = Vec::new();
        for f in self.formats.iter().filter(|f| f.is_audio_only()) {
            let option = AudioOption {
                ext: f.ext.clone(),
                codec: normalize_acodec(f.acodec.as_deref().unwrap_or_default()),
            };
            if !options.contains(&option) {
                options.push(option);
            }
        }
        if options.is_empty() {
            options.push(AudioOption {
                ext: "m4a".to_string(),
                codec: "aac".to_string(),
            });
        }
        options
    }
}

/// Map RFC 6381 audio codec tags to the short names yt-dlp's
/// FFmpegExtractAudio understands.
pub fn normalize_acodec(acodec: &str) -> String {
    if acodec.starts_with("mp4a.40.") {
        "aac".to_string()
    } else {
        acodec.to_string()
    }
}
