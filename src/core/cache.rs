//! Local artifact cache check.
//!
//! Existence is the only criterion: a present path (file or directory) is
//! reused as-is with no freshness check.

use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::credentials;
use crate::error::{Error, Result};
use crate::lock::LOCK_DIR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    FetchNeeded,
    Present,
}

impl CacheStatus {
    pub fn needs_fetch(self) -> bool {
        self == CacheStatus::FetchNeeded
    }
}

/// Report whether `path` already holds a working copy.
pub fn check(path: &Path) -> Result<CacheStatus> {
    match fs::symlink_metadata(path) {
        Ok(_) => {
            log_status!("cache", "{} exists, skipping clone", path.display());
            Ok(CacheStatus::Present)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log_status!("cache", "Directory {} does not exist", path.display());
            Ok(CacheStatus::FetchNeeded)
        }
        Err(e) => Err(Error::filesystem(path.display().to_string(), e.to_string())),
    }
}

/// Deterministic local directory for a repository identifier.
pub fn artifact_dir(artifacts_root: &Path, repo: &str) -> Result<PathBuf> {
    let name = credentials::repo_name(repo)
        .filter(|name| *name != LOCK_DIR)
        .ok_or_else(|| {
            Error::validation_invalid_argument(
                "repo",
                format!("Cannot derive a directory name from '{}'", repo),
            )
        })?;
    Ok(artifacts_root.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_path_needs_fetch() {
        let dir = TempDir::new().unwrap();
        let status = check(&dir.path().join("bp")).unwrap();
        assert_eq!(status, CacheStatus::FetchNeeded);
        assert!(status.needs_fetch());
    }

    #[test]
    fn existing_directory_is_present() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("bp")).unwrap();
        assert_eq!(check(&dir.path().join("bp")).unwrap(), CacheStatus::Present);
    }

    #[test]
    fn existing_file_is_present() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bp"), "not a repo").unwrap();
        assert_eq!(check(&dir.path().join("bp")).unwrap(), CacheStatus::Present);
    }

    #[cfg(unix)]
    #[test]
    fn stat_failure_is_filesystem_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, "x").unwrap();

        // A path below a regular file fails with ENOTDIR rather than ENOENT.
        let err = check(&file.join("bp")).unwrap_err();
        assert_eq!(err.code.as_str(), "filesystem.error");
    }

    #[test]
    fn artifact_dir_keys_on_trailing_segment() {
        let root = Path::new("tmp");
        assert_eq!(
            artifact_dir(root, "github.com/org/bp").unwrap(),
            PathBuf::from("tmp/bp")
        );
        assert!(artifact_dir(root, "github.com/org/..").is_err());
    }

    #[test]
    fn artifact_dir_never_collides_with_locks() {
        let root = Path::new("tmp");
        assert!(artifact_dir(root, "github.com/org/.locks").is_err());
        assert_eq!(
            artifact_dir(root, "github.com/org/bp.lock").unwrap(),
            PathBuf::from("tmp/bp.lock")
        );
        assert_ne!(
            artifact_dir(root, "github.com/org/bp.lock").unwrap(),
            crate::lock::FetchLock::path_for(Path::new("tmp/bp"))
        );
    }
}
