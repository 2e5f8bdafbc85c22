//! Resumable single-stream HTTP downloader.
//!
//! Appends to whatever is already on disk under the target name (the current
//! length is the resume offset), holds an exclusive `flock` on the file while
//! writing, waits through `503` queues as long as the server asks, and finally
//! renames the file if the server announced an attachment filename.

mod error;
mod headers;
mod result;
mod transfer;

pub use error::DownloadError;
pub use headers::{parse_retry_after, HeaderAccumulator};
pub use result::TransferResult;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::lock::FileLock;
use crate::retry::QueuePolicy;
use crate::url_model::{attachment_filename, filename_for_url};

/// Default permission bits for downloaded files (`rw-r--r--`).
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Largest accepted permission value (setuid/setgid/sticky + rwx triplets).
pub const MAX_FILE_MODE: u32 = 0o7777;

/// What to download and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub url: String,
    pub directory: PathBuf,
    /// Explicit filename; `None` derives it from the URL and allows a
    /// Content-Disposition rename after the transfer.
    pub filename: Option<String>,
    /// Permission bits applied to the final file.
    pub mode: u32,
}

impl DownloadTarget {
    pub fn new(url: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            directory: directory.into(),
            filename: None,
            mode: DEFAULT_FILE_MODE,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Path written during the transfer (before any rename).
    pub fn candidate_path(&self) -> PathBuf {
        match &self.filename {
            Some(name) => self.directory.join(name),
            None => self.directory.join(filename_for_url(&self.url)),
        }
    }

    fn validate(&self) -> Result<(), DownloadError> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| DownloadError::Validation(format!("bad URL {:?}: {}", self.url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(DownloadError::Validation(format!(
                "unsupported URL scheme {:?}",
                parsed.scheme()
            )));
        }
        if self.directory.as_os_str().is_empty() {
            return Err(DownloadError::Validation("empty directory".into()));
        }
        if !self.directory.is_dir() {
            return Err(DownloadError::Validation(format!(
                "{} is not a directory",
                self.directory.display()
            )));
        }
        if let Some(name) = &self.filename {
            if name.is_empty() || name == "." || name == ".." || name.contains('/') {
                return Err(DownloadError::Validation(format!("bad filename {:?}", name)));
            }
        }
        if self.mode > MAX_FILE_MODE {
            return Err(DownloadError::Validation(format!(
                "mode {:o} exceeds {:o}",
                self.mode, MAX_FILE_MODE
            )));
        }
        Ok(())
    }
}

/// Transport settings shared by all downloads of one run.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub user_agent: String,
    /// Connect timeout per attempt (`None` = libcurl default).
    pub connect_timeout: Option<Duration>,
    /// Whole-attempt timeout, independent of the 503 loop (`None` = no limit).
    pub attempt_timeout: Option<Duration>,
    pub max_redirections: u32,
    /// How long to keep waiting in a 503 queue.
    pub queue: QueuePolicy,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("hltv/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: None,
            attempt_timeout: None,
            max_redirections: 10,
            queue: QueuePolicy::unbounded(),
        }
    }
}

/// Anything that can turn a `DownloadTarget` into a `TransferResult`.
/// The pipeline talks to this seam so tests can script outcomes.
pub trait Fetcher {
    fn fetch(&self, target: &DownloadTarget) -> Result<TransferResult, DownloadError>;
}

/// Blocking libcurl downloader. One `download` call owns its file descriptor
/// and lock from open to return.
#[derive(Debug, Clone, Default)]
pub struct Downloader {
    options: DownloadOptions,
}

impl Downloader {
    pub fn new(options: DownloadOptions) -> Self {
        Self { options }
    }

    /// Downloads `target.url` into `target.directory`, resuming any partial
    /// file. HTTP and transport failures are reported inside the returned
    /// `TransferResult`; `Err` means the transfer could not run or the file
    /// could not be finalized.
    pub fn download(&self, target: &DownloadTarget) -> Result<TransferResult, DownloadError> {
        target.validate()?;
        check_writable(&target.directory)?;

        let path = target.candidate_path();
        let file = File::options()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| DownloadError::io(format!("cannot open {}", path.display()), e))?;
        let resume_offset = file
            .metadata()
            .map_err(|e| DownloadError::io(format!("cannot stat {}", path.display()), e))?
            .len();
        let lock = FileLock::try_acquire(file, &path)?;
        tracing::debug!(url = %target.url, path = %path.display(), resume_offset, "download starting");

        let transferred = transfer::run(&target.url, lock.file(), resume_offset, &self.options);
        // Unlock and close before the file is stat'ed, renamed or chmod'ed.
        drop(lock);
        let (mut result, headers) = transferred?;

        result.filepath = path;
        result.bytes_downloaded = file_len(&result.filepath)?;

        if target.filename.is_none() && result.is_success() {
            if let Some(name) = headers.content_disposition().and_then(attachment_filename) {
                let renamed = target.directory.join(&name);
                if renamed != result.filepath {
                    fs::rename(&result.filepath, &renamed).map_err(|e| {
                        DownloadError::io(
                            format!(
                                "cannot rename {} to {}",
                                result.filepath.display(),
                                renamed.display()
                            ),
                            e,
                        )
                    })?;
                    tracing::debug!(from = %result.filepath.display(), to = %renamed.display(), "renamed from Content-Disposition");
                    result.filepath = renamed;
                }
            }
        }

        set_mode(&result.filepath, target.mode)?;

        if result.is_success() {
            tracing::info!(
                path = %result.filepath.display(),
                bytes = result.bytes_downloaded,
                attempts = result.attempts,
                "download finished"
            );
        } else {
            tracing::warn!(
                url = %target.url,
                status = result.http_status,
                code = result.transport_error_code,
                "download failed: {}",
                result.transport_error_message
            );
        }
        Ok(result)
    }
}

impl Fetcher for Downloader {
    fn fetch(&self, target: &DownloadTarget) -> Result<TransferResult, DownloadError> {
        self.download(target)
    }
}

fn file_len(path: &Path) -> Result<u64, DownloadError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| DownloadError::io(format!("cannot stat {}", path.display()), e))
}

#[cfg(unix)]
fn check_writable(dir: &Path) -> Result<(), DownloadError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(dir.as_os_str().as_bytes())
        .map_err(|_| DownloadError::Validation(format!("NUL in {}", dir.display())))?;
    let r = unsafe { libc::access(c_path.as_ptr(), libc::W_OK) };
    if r != 0 {
        return Err(DownloadError::io(
            format!("directory {} is not writable", dir.display()),
            std::io::Error::last_os_error(),
        ));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_writable(dir: &Path) -> Result<(), DownloadError> {
    let meta = fs::metadata(dir)
        .map_err(|e| DownloadError::io(format!("cannot stat {}", dir.display()), e))?;
    if meta.permissions().readonly() {
        return Err(DownloadError::io(
            format!("directory {} is not writable", dir.display()),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), DownloadError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| DownloadError::io(format!("cannot chmod {}", path.display()), e))
}

/// Stub for non-Unix: only the owner-write bit maps to anything.
#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> Result<(), DownloadError> {
    let mut perms = fs::metadata(path)
        .map_err(|e| DownloadError::io(format!("cannot stat {}", path.display()), e))?
        .permissions();
    perms.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, perms)
        .map_err(|e| DownloadError::io(format!("cannot chmod {}", path.display()), e))
}
