//! Output verification
//!
//! The engine does not always report the literal final path (a transcode
//! rename can invalidate it), so after every item the artifact's identity
//! is re-derived from the deterministic output base plus an ordered guess
//! list of extensions.

use crate::utils::fs_times;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const AUDIO_FALLBACK_EXTS: &[&str] = &["m4a", "aac", "mp3", "flac", "opus", "wav", "webm"];
const VIDEO_FALLBACK_EXTS: &[&str] = &["mp4", "mkv", "webm"];

/// Ordered, de-duplicated candidate extensions: declared extension first,
/// then (audio mode) the codec hint, then the fixed fallback list.
pub fn candidate_extensions(
    is_audio_only: bool,
    format_param: Option<&str>,
    ext_param: &str,
) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();

    if !ext_param.is_empty() {
        candidates.push(ext_param.to_string());
    }
    if is_audio_only {
        if let Some(codec) = format_param {
            if !candidates.iter().any(|c| c == codec) {
                candidates.push(codec.to_string());
            }
        }
    }

    let fallback = if is_audio_only {
        AUDIO_FALLBACK_EXTS
    } else {
        VIDEO_FALLBACK_EXTS
    };
    for ext in fallback {
        if !candidates.iter().any(|c| c == ext) {
            candidates.push(ext.to_string());
        }
    }
    candidates
}

/// Confirm a real output file exists for a finished item.
///
/// Prefers the engine-reported path; otherwise probes
/// `expected_base.<ext>` for each candidate extension in order. The first
/// file found gets its timestamps normalized. Returns the verified path,
/// or `None` when nothing was found; never errors.
pub fn verify(
    reported_path: Option<&Path>,
    expected_base: &Path,
    is_audio_only: bool,
    format_param: Option<&str>,
    ext_param: &str,
) -> Option<PathBuf> {
    if let Some(reported) = reported_path {
        if !reported.as_os_str().is_empty() && reported.exists() {
            fs_times::stamp(reported, None);
            return Some(reported.to_path_buf());
        }
    }

    info!(
        "No usable reported path for {}, probing candidate extensions",
        expected_base.display()
    );

    for ext in candidate_extensions(is_audio_only, format_param, ext_param) {
        let candidate = append_extension(expected_base, &ext);
        if candidate.exists() {
            fs_times::stamp(&candidate, None);
            info!("Found output file: {}", candidate.display());
            return Some(candidate);
        }
    }

    warn!("No output file found for {}", expected_base.display());
    None
}

/// `base` + "." + `ext` without clobbering dots inside the title.
fn append_extension(base: &Path, ext: &str) -> PathBuf {
    let mut os = OsString::from(base.as_os_str());
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use tempfile::TempDir;

    #[test]
    fn test_candidates_video_order() {
        assert_eq!(
            candidate_extensions(false, Some("720"), "mkv"),
            vec!["mkv", "mp4", "webm"]
        );
    }

    #[test]
    fn test_candidates_audio_codec_inserted_after_ext() {
        assert_eq!(
            candidate_extensions(true, Some("opus"), "m4a"),
            vec!["m4a", "opus", "aac", "mp3", "flac", "wav", "webm"]
        );
    }

    #[test]
    fn test_candidates_no_duplicates() {
        let candidates = candidate_extensions(true, Some("m4a"), "m4a");
        assert_eq!(candidates.iter().filter(|c| *c == "m4a").count(), 1);
    }

    #[test]
    fn test_verify_prefers_reported_path() {
        let dir = TempDir::new().unwrap();
        let reported = dir.path().join("Exact Name.webm");
        std::fs::write(&reported, b"x").unwrap();

        let found = verify(
            Some(&reported),
            &dir.path().join("Other Base"),
            false,
            None,
            "mp4",
        );
        assert_eq!(found, Some(reported));
    }

    #[test]
    fn test_verify_probe_finds_fallback_extension_and_stamps() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("My Video");
        let on_disk = dir.path().join("My Video.mp4");
        std::fs::write(&on_disk, b"x").unwrap();

        let old = FileTime::from_unix_time(946_684_800, 0); // year 2000
        filetime::set_file_times(&on_disk, old, old).unwrap();

        // Engine reported nothing; declared container was mkv
        let found = verify(None, &base, false, Some("720"), "mkv");
        assert_eq!(found, Some(on_disk.clone()));

        let meta = std::fs::metadata(&on_disk).unwrap();
        let mtime = FileTime::from_last_modification_time(&meta);
        assert!(mtime.unix_seconds() > 946_684_800, "file should be restamped");
    }

    #[test]
    fn test_verify_missing_everything_returns_none() {
        let dir = TempDir::new().unwrap();
        let found = verify(None, &dir.path().join("Nothing Here"), true, Some("aac"), "m4a");
        assert_eq!(found, None);
    }

    #[test]
    fn test_verify_stale_reported_path_falls_through_to_probe() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("Clip");
        let real = dir.path().join("Clip.opus");
        std::fs::write(&real, b"x").unwrap();

        let stale = dir.path().join("Clip.part");
        let found = verify(Some(&stale), &base, true, Some("opus"), "weba");
        assert_eq!(found, Some(real));
    }

    #[test]
    fn test_append_extension_preserves_dotted_titles() {
        let p = append_extension(Path::new("/d/Episode 1.5 Final"), "mp4");
        assert_eq!(p, PathBuf::from("/d/Episode 1.5 Final.mp4"));
    }
}
