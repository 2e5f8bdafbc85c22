//! Per-attempt response header accumulation.
//!
//! libcurl hands header lines to a callback one at a time (including those of
//! redirect hops). The accumulator collects them for one attempt so the
//! downloader can read `Retry-After` after a 503, and `Content-Disposition`
//! once the body is on disk.

use std::time::{Duration, SystemTime};

/// Header lines received during one transfer attempt.
#[derive(Debug, Clone, Default)]
pub struct HeaderAccumulator {
    lines: Vec<String>,
}

impl HeaderAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; called at the start of every attempt.
    pub fn reset(&mut self) {
        self.lines.clear();
    }

    /// Append one raw header line as delivered by libcurl.
    pub fn push_raw(&mut self, data: &[u8]) {
        let line = String::from_utf8_lossy(data);
        let line = line.trim_end();
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
    }

    /// Value of the last header named `name` (case-insensitive). With
    /// redirects the last occurrence belongs to the final response.
    pub fn last_value(&self, name: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }

    /// Delay requested by `Retry-After`, if present and parseable.
    pub fn retry_after(&self) -> Option<Duration> {
        self.last_value("retry-after").and_then(parse_retry_after)
    }

    pub fn content_disposition(&self) -> Option<&str> {
        self.last_value("content-disposition")
    }
}

/// `Some(code)` if `line` is an HTTP status line (`HTTP/1.1 503 ...`).
pub(crate) fn status_line_code(line: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(line).ok()?;
    let rest = line.strip_prefix("HTTP/")?;
    rest.split_whitespace().nth(1)?.parse().ok()
}

/// Parse a `Retry-After` value: delay-seconds, or an HTTP-date (a date in
/// the past means "now").
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = httpdate::parse_http_date(value).ok()?;
    Some(at.duration_since(SystemTime::now()).unwrap_or(Duration::ZERO))
}
