//! The libcurl side of a download: configure one Easy handle, run the 503
//! queue loop over it, and read transfer info afterwards.

use curl::easy::Easy;
use std::cell::Cell;
use std::fs::File;
use std::io::Write;

use super::error::DownloadError;
use super::headers::{status_line_code, HeaderAccumulator};
use super::result::TransferResult;
use super::DownloadOptions;
use crate::retry::{classify_attempt, run_queue_loop, AttemptOutcome};

/// Runs all attempts for `url`, appending the body to `file`. Returns the
/// partially filled result (path and size are set by the caller) and the
/// headers of the last attempt.
pub(super) fn run(
    url: &str,
    file: &File,
    resume_offset: u64,
    options: &DownloadOptions,
) -> Result<(TransferResult, HeaderAccumulator), DownloadError> {
    let mut easy = Easy::new();
    configure(&mut easy, url, resume_offset, options).map_err(|source| {
        DownloadError::TransferInit {
            url: url.to_string(),
            source,
        }
    })?;

    let mut headers = HeaderAccumulator::new();
    let mut last_error: Option<curl::Error> = None;
    let written = Cell::new(0u64);

    let summary = run_queue_loop(
        &options.queue,
        |attempt| {
            headers.reset();
            written.set(0);
            let performed = perform(&mut easy, file, &mut headers, &written);
            let status = easy.response_code().unwrap_or(0);
            let outcome = match performed {
                Ok(()) => {
                    last_error = None;
                    AttemptOutcome::Success
                }
                // Resuming a file that is already complete: the server has no
                // bytes past the offset.
                Err(_) if status == 416 && resume_offset > 0 => {
                    tracing::debug!(url, resume_offset, "range not satisfiable, file already complete");
                    last_error = None;
                    AttemptOutcome::Success
                }
                Err(e) => {
                    let outcome = classify_attempt(false, status, headers.retry_after());
                    last_error = Some(e);
                    outcome
                }
            };
            tracing::debug!(url, attempt, status, ?outcome, "attempt finished");
            outcome
        },
        std::thread::sleep,
    );

    let mut result = collect_info(&mut easy, url, resume_offset, last_error.as_ref());
    result.average_speed = average_speed(written.get(), result.total_time_secs);
    result.attempts = summary.attempts;
    result.queue_wait_secs = summary.waited.as_secs();
    result.queue_exhausted = matches!(summary.outcome, AttemptOutcome::Throttled(_));
    Ok((result, headers))
}

fn configure(
    easy: &mut Easy,
    url: &str,
    resume_offset: u64,
    options: &DownloadOptions,
) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.resume_from(resume_offset)?;
    easy.follow_location(true)?;
    easy.max_redirections(options.max_redirections)?;
    easy.useragent(&options.user_agent)?;
    if let Some(t) = options.connect_timeout {
        easy.connect_timeout(t)?;
    }
    if let Some(t) = options.attempt_timeout {
        easy.timeout(t)?;
    }
    Ok(())
}

/// libcurl's `CURLE_HTTP_RETURNED_ERROR`.
const HTTP_RETURNED_ERROR: u32 = 22;

/// One attempt: body goes straight to the (locked, append-mode) file,
/// header lines into the accumulator. A final status >= 400 is an error
/// whose body is discarded, never written to the file. `written` counts the
/// body bytes that reached the file.
fn perform(
    easy: &mut Easy,
    file: &File,
    headers: &mut HeaderAccumulator,
    written: &Cell<u64>,
) -> Result<(), curl::Error> {
    let status = Cell::new(0u32);
    let mut transfer = easy.transfer();
    transfer.header_function(|data| {
        if let Some(code) = status_line_code(data) {
            status.set(code);
        }
        headers.push_raw(data);
        true
    })?;
    transfer.write_function(|data| {
        if status.get() >= 400 {
            return Ok(data.len());
        }
        let mut out = file;
        match out.write_all(data) {
            Ok(()) => {
                written.set(written.get() + data.len() as u64);
                Ok(data.len())
            }
            Err(e) => {
                tracing::warn!("download write failed: {}", e);
                Ok(0) // abort transfer
            }
        }
    })?;
    transfer.perform()?;
    drop(transfer);

    if easy.response_code()? >= 400 {
        return Err(curl::Error::new(HTTP_RETURNED_ERROR));
    }
    Ok(())
}

fn collect_info(
    easy: &mut Easy,
    url: &str,
    resume_offset: u64,
    last_error: Option<&curl::Error>,
) -> TransferResult {
    let effective_url = easy.effective_url().ok().flatten().map(str::to_string);
    let content_type = easy.content_type().ok().flatten().map(str::to_string);
    TransferResult {
        url: url.to_string(),
        resume_offset,
        http_status: easy.response_code().unwrap_or(0),
        transport_error_code: last_error.map(|e| e.code() as i32).unwrap_or(0),
        transport_error_message: last_error.map(|e| e.to_string()).unwrap_or_default(),
        effective_url,
        content_type,
        total_time_secs: easy.total_time().map(|d| d.as_secs_f64()).unwrap_or(0.0),
        redirect_count: easy.redirect_count().unwrap_or(0),
        header_size: easy.header_size().unwrap_or(0),
        ..TransferResult::default()
    }
}

/// Bytes per second written by the last attempt.
fn average_speed(bytes: u64, secs: f64) -> f64 {
    if bytes == 0 || secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 / secs
}
