//! Advisory per-repository lock file
//!
//! The in-process mutex in `Tracker` only serializes callers sharing one
//! tracker. Separate CLI processes on the same data directory meet here
//! instead: every mutating operation holds an exclusive `flock` on
//! `<data>/<slug>/.lock` until its guard drops.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::paths;
use crate::error::{validate_key, TrackerResult};

/// Held lock. Released when dropped.
pub struct RepoLock {
    path: PathBuf,
    #[cfg(unix)]
    _flock: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl RepoLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RepoLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoLock").field("path", &self.path).finish()
    }
}

/// Block until the exclusive lock of `slug` is ours.
pub fn lock_repo(data_dir: &Path, slug: &str) -> TrackerResult<RepoLock> {
    validate_key("repository slug", slug)?;
    let path = paths::lock_path(data_dir, slug);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = open_lock_file(&path)?;

    #[cfg(unix)]
    {
        #[allow(deprecated)]
        let flock = nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusive)
            .map_err(|(_file, errno)| std::io::Error::from(errno))?;
        debug!(repo = slug, path = %path.display(), "Acquired repository lock");
        Ok(RepoLock {
            path,
            _flock: flock,
        })
    }

    #[cfg(not(unix))]
    {
        debug!(repo = slug, path = %path.display(), "Opened repository lock file (advisory locking unavailable)");
        Ok(RepoLock { path, _file: file })
    }
}

#[cfg(unix)]
fn open_lock_file(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_lock_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_lock_file_created_under_repo_dir() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_repo(dir.path(), "repo-a").unwrap();
        assert_eq!(lock.path(), dir.path().join("repo-a").join(".lock"));
        assert!(lock.path().exists());
        assert!(lock_repo(dir.path(), "../escape").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_second_holder_waits_for_release() {
        let dir = tempfile::tempdir().unwrap();
        let held = lock_repo(dir.path(), "repo-a").unwrap();

        let (tx, rx) = mpsc::channel();
        let data_dir = dir.path().to_path_buf();
        let waiter = std::thread::spawn(move || {
            let _lock = lock_repo(&data_dir, "repo-a").unwrap();
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(held);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_other_repositories_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let _a = lock_repo(dir.path(), "repo-a").unwrap();
        let (tx, rx) = mpsc::channel();
        let data_dir = dir.path().to_path_buf();
        std::thread::spawn(move || {
            let _b = lock_repo(&data_dir, "repo-b").unwrap();
            tx.send(()).unwrap();
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}
