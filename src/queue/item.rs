//! Queue entries and queue-key derivation

use crate::format::FormatSelection;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One queued download request
///
/// Immutable once queued except for `checked`; changing download options in
/// the UI only affects the next item added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadItem {
    pub url: String,
    pub title: String,
    pub video_id: String,
    pub is_audio_only: bool,
    pub format_param: Option<String>,
    pub ext_param: String,
    pub queue_key: String,
    pub checked: bool,
}

impl DownloadItem {
    /// Build a queue entry from an analyzed video and a format selection.
    /// New entries start checked.
    pub fn new(url: &str, title: Option<&str>, video_id: &str, selection: &FormatSelection) -> Self {
        Self {
            url: url.to_string(),
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or("untitled")
                .to_string(),
            video_id: video_id.to_string(),
            is_audio_only: selection.audio_only,
            format_param: selection.format_param.clone(),
            ext_param: selection.ext_param.clone(),
            queue_key: compute_key(
                video_id,
                selection.audio_only,
                selection.format_param.as_deref(),
                &selection.ext_param,
            ),
            checked: true,
        }
    }

    /// The stored quality choice, for re-resolving the engine instruction.
    pub fn selection(&self) -> FormatSelection {
        FormatSelection {
            audio_only: self.is_audio_only,
            format_param: self.format_param.clone(),
            ext_param: self.ext_param.clone(),
        }
    }

    /// List/log label: title plus quality
    pub fn display_label(&self) -> String {
        format!("{} | {}", self.title, self.selection().display_label())
    }
}

/// Derive the identity key for a (video, mode, format) combination.
///
/// Audio mode: `{id}|audio|{ext}`. Video mode: `{id}|{height}p|{ext}`,
/// or `{id}|best|{ext}` when no height was chosen.
pub fn compute_key(
    video_id: &str,
    audio_only: bool,
    format_param: Option<&str>,
    ext_param: &str,
) -> String {
    if audio_only {
        format!("{video_id}|audio|{ext_param}")
    } else {
        match format_param {
            Some(height) => format!("{video_id}|{height}p|{ext_param}"),
            None => format!("{video_id}|best|{ext_param}"),
        }
    }
}

/// Extract a video id from a watch/short/embed URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN
        .get_or_init(|| Regex::new(r"(?:v=|youtu\.be/|embed/)([A-Za-z0-9_-]+)").expect("valid regex"));
    re.captures(url).map(|c| c[1].to_string())
}

/// Replace filesystem-illegal characters in a title with underscores.
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

/// Plausible keys for an item that predates the current key scheme or has
/// only partial metadata, in probe order. Best-effort identity matching for
/// removal.
pub fn candidate_keys(item: &DownloadItem) -> Vec<String> {
    let video_id = if !item.video_id.is_empty() {
        Some(item.video_id.clone())
    } else {
        extract_video_id(&item.url)
    };
    let Some(video_id) = video_id else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    if item.is_audio_only {
        let audio_ext = if !item.ext_param.is_empty() {
            item.ext_param.clone()
        } else {
            item.format_param.clone().unwrap_or_else(|| "m4a".to_string())
        };
        candidates.push(format!("{video_id}|audio|{audio_ext}"));
        if let Some(codec) = &item.format_param {
            if *codec != audio_ext {
                candidates.push(format!("{video_id}|audio|{codec}"));
            }
        }
    } else {
        let container = if !item.ext_param.is_empty() {
            item.ext_param.clone()
        } else {
            "mp4".to_string()
        };
        if let Some(height) = &item.format_param {
            candidates.push(format!("{video_id}|{height}p|{container}"));
        }
        candidates.push(format!("{video_id}|best|{container}"));
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatSelection;

    #[test]
    fn test_audio_key_scheme() {
        assert_eq!(
            compute_key("abc123", true, Some("opus"), "webm"),
            "abc123|audio|webm"
        );
    }

    #[test]
    fn test_video_key_scheme() {
        assert_eq!(
            compute_key("abc123", false, Some("720"), "mp4"),
            "abc123|720p|mp4"
        );
        assert_eq!(compute_key("abc123", false, None, "mkv"), "abc123|best|mkv");
    }

    #[test]
    fn test_compute_key_deterministic() {
        for _ in 0..3 {
            assert_eq!(
                compute_key("id9", true, Some("aac"), "m4a"),
                compute_key("id9", true, Some("aac"), "m4a")
            );
        }
    }

    #[test]
    fn test_item_holds_computed_key_and_starts_checked() {
        let item = DownloadItem::new(
            "https://youtu.be/abc123",
            Some("My Video"),
            "abc123",
            &FormatSelection::video(Some(720), "mp4"),
        );
        assert_eq!(item.queue_key, "abc123|720p|mp4");
        assert!(item.checked);
        assert_eq!(item.display_label(), "My Video | 720p | mp4");
    }

    #[test]
    fn test_missing_title_defaults_to_untitled() {
        let item = DownloadItem::new(
            "https://youtu.be/abc123",
            None,
            "abc123",
            &FormatSelection::audio("aac", "m4a"),
        );
        assert_eq!(item.title, "untitled");
    }

    #[test]
    fn test_extract_video_id_variants() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_video_id(url).as_deref(), Some("dQw4w9WgXcQ"));
        }
        assert_eq!(extract_video_id("https://example.com/video"), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename(r#"a\b/c:d*e?f"g<h>i|j"#),
            "a_b_c_d_e_f_g_h_i_j"
        );
        assert_eq!(sanitize_filename("Plain title 2"), "Plain title 2");
    }

    #[test]
    fn test_candidate_keys_audio_order() {
        let mut item = DownloadItem::new(
            "https://youtu.be/abc123",
            Some("t"),
            "abc123",
            &FormatSelection::audio("opus", "webm"),
        );
        item.queue_key.clear();
        assert_eq!(
            candidate_keys(&item),
            vec!["abc123|audio|webm".to_string(), "abc123|audio|opus".to_string()]
        );
    }

    #[test]
    fn test_candidate_keys_video_from_url_only() {
        let item = DownloadItem {
            url: "https://www.youtube.com/watch?v=zz9aa".to_string(),
            title: "legacy".to_string(),
            video_id: String::new(),
            is_audio_only: false,
            format_param: Some("480".to_string()),
            ext_param: String::new(),
            queue_key: String::new(),
            checked: true,
        };
        assert_eq!(
            candidate_keys(&item),
            vec!["zz9aa|480p|mp4".to_string(), "zz9aa|best|mp4".to_string()]
        );
    }
}
