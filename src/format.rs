//! Format resolution
//!
//! Turns a user-chosen quality (resolution / audio codec / container /
//! audio-only flag) into a yt-dlp format selector plus the postprocessing
//! the engine must run. The resolver always produces a valid instruction:
//! unknown audio targets fall back through a whitelist to "best".

use serde::{Deserialize, Serialize};

/// Audio target formats FFmpegExtractAudio accepts
pub const AUDIO_FORMAT_WHITELIST: &[&str] = &[
    "best", "aac", "flac", "mp3", "m4a", "opus", "vorbis", "wav", "alac",
];

/// The user's quality choice for one queue entry, stored alongside it.
///
/// `format_param` holds the resolution height in video mode or a codec hint
/// in audio mode; `None` means "best available". `ext_param` is the target
/// container or audio extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSelection {
    pub audio_only: bool,
    pub format_param: Option<String>,
    pub ext_param: String,
}

impl FormatSelection {
    /// Audio-only selection: `codec` hint plus target extension.
    pub fn audio(codec: &str, ext: &str) -> Self {
        Self {
            audio_only: true,
            format_param: (!codec.is_empty()).then(|| codec.to_string()),
            ext_param: ext.to_string(),
        }
    }

    /// Video selection: optional height cap plus merge container.
    pub fn video(height: Option<u32>, container: &str) -> Self {
        Self {
            audio_only: false,
            format_param: height.map(|h| h.to_string()),
            ext_param: container.to_string(),
        }
    }

    /// Human-readable quality label ("720p", "best available", "audio (m4a)")
    pub fn display_label(&self) -> String {
        if self.audio_only {
            format!("audio ({})", self.ext_param)
        } else {
            match &self.format_param {
                Some(res) => format!("{res}p | {}", self.ext_param),
                None => format!("best available | {}", self.ext_param),
            }
        }
    }
}

/// Postprocessing the engine must perform after the raw stream download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Postprocessing {
    /// Container passthrough, nothing to do
    None,
    /// FFmpegExtractAudio transcode to `codec` at best quality
    ExtractAudio { codec: String },
    /// Copy the video stream, re-encode audio to AAC 192k. Applied for mp4
    /// merges so players that reject opus-in-mp4 still get a playable file.
    ReencodeAudioTrack,
}

/// A resolved engine instruction for one selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFormat {
    /// yt-dlp `-f` expression
    pub selector: String,
    /// `--merge-output-format` container, video mode only
    pub merge_output_format: Option<String>,
    pub postprocessing: Postprocessing,
}

/// Resolve a selection into an engine instruction. Never fails.
pub fn resolve(selection: &FormatSelection) -> ResolvedFormat {
    if selection.audio_only {
        resolve_audio(selection.format_param.as_deref(), &selection.ext_param)
    } else {
        resolve_video(selection.format_param.as_deref(), &selection.ext_param)
    }
}

fn resolve_audio(codec: Option<&str>, ext: &str) -> ResolvedFormat {
    // webm/opus stays in its original container, no transcode
    if codec == Some("opus") && ext == "webm" {
        return ResolvedFormat {
            selector: "bestaudio[ext=webm]/bestaudio".to_string(),
            merge_output_format: None,
            postprocessing: Postprocessing::None,
        };
    }

    let target = if AUDIO_FORMAT_WHITELIST.contains(&ext) {
        ext
    } else {
        match codec {
            Some(c) if AUDIO_FORMAT_WHITELIST.contains(&c) => c,
            _ => "best",
        }
    };

    ResolvedFormat {
        selector: "bestaudio/best".to_string(),
        merge_output_format: None,
        postprocessing: Postprocessing::ExtractAudio {
            codec: target.to_string(),
        },
    }
}

fn resolve_video(height: Option<&str>, container: &str) -> ResolvedFormat {
    let selector = match height {
        Some(h) => format!("bestvideo[height<={h}]+bestaudio/best"),
        None => "bestvideo+bestaudio/best".to_string(),
    };

    ResolvedFormat {
        selector,
        merge_output_format: Some(container.to_string()),
        postprocessing: if container == "mp4" {
            Postprocessing::ReencodeAudioTrack
        } else {
            Postprocessing::None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_webm_opus_passthrough() {
        let resolved = resolve(&FormatSelection::audio("opus", "webm"));
        assert_eq!(resolved.selector, "bestaudio[ext=webm]/bestaudio");
        assert_eq!(resolved.postprocessing, Postprocessing::None);
        assert_eq!(resolved.merge_output_format, None);
    }

    #[test]
    fn test_audio_extract_uses_extension_first() {
        let resolved = resolve(&FormatSelection::audio("aac", "m4a"));
        assert_eq!(resolved.selector, "bestaudio/best");
        assert_eq!(
            resolved.postprocessing,
            Postprocessing::ExtractAudio {
                codec: "m4a".to_string()
            }
        );
    }

    #[test]
    fn test_audio_extract_falls_back_to_codec() {
        // "weba" is not a known audio target, opus is
        let resolved = resolve(&FormatSelection::audio("opus", "weba"));
        assert_eq!(
            resolved.postprocessing,
            Postprocessing::ExtractAudio {
                codec: "opus".to_string()
            }
        );
    }

    #[test]
    fn test_audio_extract_final_fallback_is_best() {
        let resolved = resolve(&FormatSelection::audio("ec-3", "weba"));
        assert_eq!(
            resolved.postprocessing,
            Postprocessing::ExtractAudio {
                codec: "best".to_string()
            }
        );
    }

    #[test]
    fn test_video_with_height_cap() {
        let resolved = resolve(&FormatSelection::video(Some(720), "mp4"));
        assert_eq!(resolved.selector, "bestvideo[height<=720]+bestaudio/best");
        assert_eq!(resolved.merge_output_format.as_deref(), Some("mp4"));
        assert_eq!(resolved.postprocessing, Postprocessing::ReencodeAudioTrack);
    }

    #[test]
    fn test_video_best_available() {
        let resolved = resolve(&FormatSelection::video(None, "mkv"));
        assert_eq!(resolved.selector, "bestvideo+bestaudio/best");
        assert_eq!(resolved.merge_output_format.as_deref(), Some("mkv"));
        assert_eq!(resolved.postprocessing, Postprocessing::None);
        assert!(FormatSelection::video(None, "mkv")
            .display_label()
            .starts_with("best available"));
    }

    proptest! {
        #[test]
        fn prop_resolver_always_yields_valid_instruction(
            audio_only in any::<bool>(),
            height in proptest::option::of(1u32..=4320),
            codec in "[a-z0-9.-]{0,8}",
            container in "[a-z0-9]{1,5}",
        ) {
            let selection = if audio_only {
                FormatSelection::audio(&codec, &container)
            } else {
                FormatSelection::video(height, &container)
            };
            let resolved = resolve(&selection);

            prop_assert!(!resolved.selector.is_empty());
            if let Postprocessing::ExtractAudio { codec } = &resolved.postprocessing {
                prop_assert!(AUDIO_FORMAT_WHITELIST.contains(&codec.as_str()));
            }
        }
    }
}
