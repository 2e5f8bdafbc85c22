//! Transfer telemetry returned by the downloader.

use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one `download` call (all attempts of the 503 loop).
///
/// `transport_error_code` is libcurl's `CURLcode` of the last attempt; zero
/// means the transfer succeeded. The size is re-read from disk after the file
/// is closed, so it covers resumed bytes from earlier runs too.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferResult {
    /// Requested URL.
    pub url: String,
    /// Final path of the file (after any Content-Disposition rename).
    pub filepath: PathBuf,
    /// File length before this transfer started.
    pub resume_offset: u64,
    /// File length after the transfer.
    pub bytes_downloaded: u64,
    /// Body bytes written by the last attempt divided by its duration.
    pub average_speed: f64,
    /// Last HTTP status received (0 if none).
    pub http_status: u32,
    pub transport_error_code: i32,
    pub transport_error_message: String,
    /// URL after redirects.
    pub effective_url: Option<String>,
    pub content_type: Option<String>,
    /// Duration of the last attempt in seconds.
    pub total_time_secs: f64,
    pub redirect_count: u32,
    /// Total bytes of headers received in the last attempt.
    pub header_size: u64,
    /// Number of attempts, counting every 503 answer.
    pub attempts: u32,
    /// Seconds slept in the 503 queue.
    pub queue_wait_secs: u64,
    /// The queue wait budget ran out while the server still answered 503.
    pub queue_exhausted: bool,
}

impl TransferResult {
    pub fn is_success(&self) -> bool {
        self.transport_error_code == 0
    }

    pub fn is_client_error(&self) -> bool {
        (400..=499).contains(&self.http_status)
    }

    /// Failed for a reason a later pass will not fix: neither a 4xx answer
    /// nor an exhausted 503 queue.
    pub fn is_unrecoverable(&self) -> bool {
        !self.is_success() && !self.is_client_error() && !self.queue_exhausted
    }

    /// Final filename without directory.
    pub fn filename(&self) -> String {
        self.filepath
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File size in KiB, truncated.
    pub fn size_kib(&self) -> u64 {
        self.bytes_downloaded / 1024
    }

    /// Average speed in kbit/s (`bytes * 8 / 1000`), truncated.
    ///
    /// The HomeloadTV API labels its `speed` field KiloBit/s, though some
    /// clients send `bytes / 1024` (KiB/s) under that label.
    pub fn speed_kbit(&self) -> u64 {
        (self.average_speed * 8.0 / 1000.0) as u64
    }
}
