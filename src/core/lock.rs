//! Advisory lock guarding the cache-check-and-fetch sequence.
//!
//! Two invocations targeting the same repository would otherwise race on the
//! same local directory. Each repository gets a lock file under
//! `<artifacts_root>/.locks/`, held with an OS exclusive lock. The kernel drops
//! the lock when the holder exits, so a file left behind by a killed run never
//! blocks later runs. The file itself is kept.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Directory under the artifacts root holding lock files.
pub const LOCK_DIR: &str = ".locks";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct FetchLock {
    file: File,
}

impl FetchLock {
    /// Lock path for an artifact directory: `tmp/bp` locks via `tmp/.locks/bp.lock`.
    pub fn path_for(artifact_dir: &Path) -> PathBuf {
        let mut name = artifact_dir
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        artifact_dir.with_file_name(LOCK_DIR).join(name)
    }

    /// Block until the lock for `artifact_dir` is held or `timeout` elapses.
    pub fn acquire(artifact_dir: &Path, timeout: Duration) -> Result<Self> {
        let path = Self::path_for(artifact_dir);
        let display = path.display().to_string();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::filesystem_lock(&display, format!("create {}: {}", parent.display(), e))
            })?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::filesystem_lock(&display, e.to_string()))?;

        let started = Instant::now();
        let mut announced = false;

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(e) if is_contended(&e) => {
                    if started.elapsed() >= timeout {
                        return Err(Error::filesystem_lock(
                            &display,
                            format!("timed out after {:?} waiting for lock", timeout),
                        )
                        .with_hint("Another deploy of this repository is still running"));
                    }
                    if !announced {
                        log_status!("lock", "Waiting for {}", display);
                        announced = true;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(Error::filesystem_lock(&display, e.to_string())),
            }
        }

        file.set_len(0).ok();
        writeln!(file, "{}", std::process::id()).ok();

        Ok(Self { file })
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for FetchLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
