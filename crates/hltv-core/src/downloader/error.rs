//! Errors returned by `Downloader::download`.
//!
//! HTTP and transport failures after the transfer ran are not errors here:
//! they are recorded in `TransferResult`. These variants cover what stops a
//! transfer from running at all.

use std::io;

use crate::lock::LockError;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Malformed caller input (URL, directory, filename, mode). Never retried.
    #[error("invalid download target: {0}")]
    Validation(String),
    /// Filesystem failure: open, stat, rename or chmod.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    /// The target file is locked by another download.
    #[error(transparent)]
    Lock(#[from] LockError),
    /// libcurl rejected the transfer configuration.
    #[error("cannot initialise transfer for {url}: {source}")]
    TransferInit {
        url: String,
        #[source]
        source: curl::Error,
    },
}

impl DownloadError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        DownloadError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_lock_contention(&self) -> bool {
        matches!(self, DownloadError::Lock(LockError::Contended { .. }))
    }
}
