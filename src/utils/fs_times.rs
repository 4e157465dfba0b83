//! Filesystem timestamp normalization
//!
//! Downloaded files frequently inherit server-side or temp-file timestamps;
//! consumers expect "downloaded now" semantics, so finished artifacts get
//! their access/modify times rewritten. On Windows the creation time is
//! rewritten too, best effort.

use filetime::FileTime;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// Set access and modification time of `path` to `when` (default: now).
///
/// Silently no-ops when the path does not exist. Creation-time stamping is
/// cosmetic metadata only, so its failures are swallowed as well.
pub fn stamp<P: AsRef<Path>>(path: P, when: Option<SystemTime>) {
    let path = path.as_ref();
    if !path.exists() {
        return;
    }
    let when = when.unwrap_or_else(SystemTime::now);
    let ft = FileTime::from_system_time(when);
    if let Err(e) = filetime::set_file_times(path, ft, ft) {
        debug!("Failed to update timestamps on {}: {}", path.display(), e);
        return;
    }
    set_creation_time(path, when);
}

/// Stamp every path in a sequence, skipping missing ones.
pub fn stamp_all<P: AsRef<Path>>(paths: &[P], when: Option<SystemTime>) {
    let when = when.unwrap_or_else(SystemTime::now);
    for path in paths {
        stamp(path, Some(when));
    }
}

/// Best-effort creation-time update via `SetFileTime`.
#[cfg(windows)]
fn set_creation_time(path: &Path, when: SystemTime) {
    use std::os::windows::ffi::OsStrExt;
    use winapi::shared::minwindef::FILETIME;
    use winapi::um::fileapi::{CreateFileW, SetFileTime, OPEN_EXISTING};
    use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
    use winapi::um::winbase::FILE_FLAG_BACKUP_SEMANTICS;
    use winapi::um::winnt::GENERIC_WRITE;

    // Windows FILETIME counts 100ns intervals since 1601-01-01
    let unix_secs = match when.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d,
        Err(_) => return,
    };
    let intervals = (unix_secs.as_secs() + 11_644_473_600) as u128 * 10_000_000
        + (unix_secs.subsec_nanos() as u128) / 100;
    let ft = FILETIME {
        dwLowDateTime: (intervals & 0xFFFF_FFFF) as u32,
        dwHighDateTime: (intervals >> 32) as u32,
    };

    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    unsafe {
        let handle = CreateFileW(
            wide.as_ptr(),
            GENERIC_WRITE,
            0,
            std::ptr::null_mut(),
            OPEN_EXISTING,
            FILE_FLAG_BACKUP_SEMANTICS,
            std::ptr::null_mut(),
        );
        if handle == INVALID_HANDLE_VALUE {
            return;
        }
        SetFileTime(handle, &ft, std::ptr::null(), std::ptr::null());
        CloseHandle(handle);
    }
}

#[cfg(not(windows))]
fn set_creation_time(_path: &Path, _when: SystemTime) {
    // No separate creation-time metadata on this platform.
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_stamp_updates_mtime() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("out.mp4");
        std::fs::write(&file, b"data").unwrap();

        let old = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_times(&file, old, old).unwrap();

        stamp(&file, None);

        let meta = std::fs::metadata(&file).unwrap();
        let mtime = FileTime::from_last_modification_time(&meta);
        assert!(
            mtime.unix_seconds() > 1_000_000_000,
            "mtime should have been rewritten to roughly now"
        );
    }

    #[test]
    fn test_stamp_with_explicit_instant() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("clip.webm");
        std::fs::write(&file, b"data").unwrap();

        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        stamp(&file, Some(when));

        let meta = std::fs::metadata(&file).unwrap();
        let mtime = FileTime::from_last_modification_time(&meta);
        assert_eq!(mtime.unix_seconds(), 1_600_000_000);
    }

    #[test]
    fn test_stamp_missing_path_is_noop() {
        let dir = TempDir::new().unwrap();
        // Must not panic or create the file
        let ghost = dir.path().join("missing.mp4");
        stamp(&ghost, None);
        assert!(!ghost.exists());
    }

    #[test]
    fn test_stamp_all_applies_single_instant() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.mp3");
        let b = dir.path().join("b.mp3");
        std::fs::write(&a, b"x").unwrap();
        std::fs::write(&b, b"y").unwrap();

        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        stamp_all(&[&a, &b], Some(when));

        for file in [&a, &b] {
            let meta = std::fs::metadata(file).unwrap();
            let mtime = FileTime::from_last_modification_time(&meta);
            assert_eq!(mtime.unix_seconds(), 1_700_000_000);
        }
    }
}
