//! Filesystem writability check.
//!
//! Every critical directory is checked in turn and problems accumulate as
//! human-readable issue strings; one bad directory does not stop the others
//! from being examined.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::PROBE_FILE_PREFIX;
use crate::report::CheckResult;

pub const CHECK_NAME: &str = "filesystem";

pub fn check_filesystem(critical_dirs: &[PathBuf]) -> CheckResult {
    check_filesystem_with(critical_dirs, has_write_access)
}

/// Same as [`check_filesystem`], with the writability test supplied by the caller.
pub fn check_filesystem_with<F>(critical_dirs: &[PathBuf], writable: F) -> CheckResult
where
    F: Fn(&Path) -> bool,
{
    let issues: Vec<String> = critical_dirs
        .iter()
        .filter_map(|dir| inspect_dir(dir, &writable))
        .collect();

    if issues.is_empty() {
        CheckResult::healthy(CHECK_NAME, "All critical directories accessible")
            .with_checked_directories(critical_dirs.len())
    } else {
        tracing::warn!(issues = ?issues, "Filesystem issues detected");
        CheckResult::unhealthy(CHECK_NAME, "File system issues detected").with_issues(issues)
    }
}

/// Whether the current process may create entries in `path`.
///
/// Asks the kernel on behalf of the calling user, so ownership, group
/// membership and read-only mounts are all taken into account.
#[cfg(unix)]
pub fn has_write_access(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: `path` is a valid NUL-terminated string that outlives the call
    unsafe { libc::access(path.as_ptr(), libc::W_OK) == 0 }
}

#[cfg(not(unix))]
pub fn has_write_access(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| !metadata.permissions().readonly())
}

/// Returns the first problem found with `dir`, if any.
fn inspect_dir(dir: &Path, writable: &impl Fn(&Path) -> bool) -> Option<String> {
    match fs::metadata(dir) {
        Ok(metadata) if metadata.is_dir() => {}
        _ => return Some(format!("Directory missing: {}", dir.display())),
    }

    if !writable(dir) {
        return Some(format!("Directory not writable: {}", dir.display()));
    }

    let probe = dir.join(format!("{}{}", PROBE_FILE_PREFIX, Uuid::new_v4().simple()));
    match OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(file) => {
            drop(file);
            // Best-effort cleanup; a leftover probe file is not a failure
            let _ = fs::remove_file(&probe);
            None
        }
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Probe file creation failed");
            Some(format!("Cannot create files in: {}", dir.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CheckStatus;

    fn leftover_probe_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with(PROBE_FILE_PREFIX)
            })
            .count()
    }

    #[test]
    fn test_writable_dirs_are_healthy() {
        let root = tempfile::tempdir().unwrap();
        let cache = root.path().join("tmp/cache");
        fs::create_dir_all(&cache).unwrap();
        let dirs = vec![root.path().to_path_buf(), root.path().join("tmp"), cache];

        let result = check_filesystem(&dirs);
        assert_eq!(result.status, CheckStatus::Healthy);
        assert_eq!(result.checked_directories, Some(3));
        assert!(result.issues.is_none());
    }

    #[test]
    fn test_probe_files_are_removed() {
        let root = tempfile::tempdir().unwrap();
        let dirs = vec![root.path().to_path_buf()];

        check_filesystem(&dirs);
        check_filesystem(&dirs);
        assert_eq!(leftover_probe_files(root.path()), 0);
    }

    #[test]
    fn test_missing_dir_reported_without_stopping() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("config");
        let dirs = vec![missing.clone(), root.path().to_path_buf()];

        let result = check_filesystem(&dirs);
        assert_eq!(result.status, CheckStatus::Unhealthy);
        let issues = result.issues.unwrap();
        assert_eq!(issues, vec![format!("Directory missing: {}", missing.display())]);
        // The healthy directory was still probed and cleaned up
        assert_eq!(leftover_probe_files(root.path()), 0);
    }

    #[test]
    fn test_regular_file_counts_as_missing_dir() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("config");
        fs::write(&file, b"not a dir").unwrap();

        let result = check_filesystem(&[file.clone()]);
        assert_eq!(
            result.issues.unwrap(),
            vec![format!("Directory missing: {}", file.display())]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_dir_is_unhealthy() {
        use std::os::unix::fs::PermissionsExt;

        // root bypasses mode bits
        if unsafe { libc::geteuid() } == 0 {
            return;
        }

        let root = tempfile::tempdir().unwrap();
        let locked = root.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let result = check_filesystem(&[root.path().to_path_buf(), locked.clone()]);

        // Restore so the tempdir can be removed
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(result.status, CheckStatus::Unhealthy);
        let issues = result.issues.unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains(&locked.display().to_string()));
        assert!(issues[0].starts_with("Directory not writable"));
    }

    #[test]
    fn test_denied_access_reported_as_not_writable() {
        // An existing directory the process has no write access to, such as a
        // root-owned 0755 directory checked by an unprivileged user
        let root = tempfile::tempdir().unwrap();
        let owned = root.path().join("tmp");
        fs::create_dir(&owned).unwrap();
        let dirs = vec![root.path().to_path_buf(), owned.clone()];

        let result = check_filesystem_with(&dirs, |dir| dir != owned.as_path());

        assert_eq!(result.status, CheckStatus::Unhealthy);
        assert_eq!(
            result.issues.unwrap(),
            vec![format!("Directory not writable: {}", owned.display())]
        );
        // No probe file was attempted in the denied directory
        assert_eq!(leftover_probe_files(&owned), 0);
    }

    #[test]
    fn test_write_access_on_own_tempdir() {
        let root = tempfile::tempdir().unwrap();
        assert!(has_write_access(root.path()));
        assert!(!has_write_access(&root.path().join("absent")));
    }

    #[test]
    fn test_empty_list_is_healthy() {
        let result = check_filesystem(&[]);
        assert_eq!(result.status, CheckStatus::Healthy);
        assert_eq!(result.checked_directories, Some(0));
    }
}
