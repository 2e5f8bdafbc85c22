//! Advisory exclusive file locks (`flock`).
//!
//! Two kinds of exclusion share this module: the per-file lock the downloader
//! holds while writing a target, and the process-wide run lock that keeps two
//! scheduled invocations from overlapping. Both are non-blocking: contention
//! is reported immediately instead of waiting.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Name of the run lock file inside the temp directory.
pub const RUN_LOCK_FILENAME: &str = "hltv.lock";

/// Lock acquisition failure.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another open descriptor already holds the lock.
    #[error("{} is already locked", path.display())]
    Contended { path: PathBuf },
    /// Opening the file or calling flock failed.
    #[error("cannot lock {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An open file holding an exclusive `flock`. The lock is released (and the
/// descriptor closed) when the guard is dropped.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Takes an exclusive, non-blocking lock on an already opened file.
    /// On contention the file is closed and `LockError::Contended` returned.
    pub fn try_acquire(file: File, path: &Path) -> Result<Self, LockError> {
        match try_lock_exclusive(&file) {
            Ok(()) => Ok(FileLock {
                file,
                path: path.to_path_buf(),
            }),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(LockError::Contended {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(LockError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), "unlock failed: {}", e);
        }
    }
}

/// Process-wide lock held for the lifetime of one pipeline invocation.
#[derive(Debug)]
pub struct RunLock {
    _lock: FileLock,
}

impl RunLock {
    /// Default location: `<temp dir>/hltv.lock`.
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(RUN_LOCK_FILENAME)
    }

    /// Opens (creating if needed) and locks `path`. Fails fast if another
    /// process is running.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| LockError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let lock = FileLock::try_acquire(file, path)?;
        tracing::debug!(path = %path.display(), "run lock acquired");
        Ok(RunLock { _lock: lock })
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
    let r = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if r == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn unlock(file: &File) -> io::Result<()> {
    let r = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if r == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Stub for non-Unix: no advisory locking available.
#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn unlock(_file: &File) -> io::Result<()> {
    Ok(())
}
