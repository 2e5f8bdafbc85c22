//! Classify one transfer attempt into what the queue loop should do next.

use std::time::Duration;

/// High-level classification of an HTTP status for the queue loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorKind {
    /// 503: the server queues us; wait and try again.
    Throttled,
    /// 4xx: the request itself is wrong; never retried.
    ClientError,
    /// Anything else (5xx other than 503, transport failures).
    Other,
}

/// Result of a single attempt as seen by the queue loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Transport reported success; the only success exit.
    Success,
    /// Terminal client error with its status code.
    ClientError(u32),
    /// 503 with the delay the server asked for (zero when absent).
    Throttled(Duration),
    /// Unrecoverable failure; the loop stops and the error is recorded.
    Failed,
}

impl AttemptOutcome {
    pub fn is_success(self) -> bool {
        self == AttemptOutcome::Success
    }
}

/// Classify an HTTP status code.
fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        503 => ErrorKind::Throttled,
        400..=499 => ErrorKind::ClientError,
        _ => ErrorKind::Other,
    }
}

/// Classify a finished attempt. `succeeded` is the transport verdict; any
/// final status >= 400 makes it `false`.
pub fn classify_attempt(
    succeeded: bool,
    http_status: u32,
    retry_after: Option<Duration>,
) -> AttemptOutcome {
    if succeeded {
        return AttemptOutcome::Success;
    }
    match classify_http_status(http_status) {
        ErrorKind::ClientError => AttemptOutcome::ClientError(http_status),
        ErrorKind::Throttled => AttemptOutcome::Throttled(retry_after.unwrap_or(Duration::ZERO)),
        ErrorKind::Other => AttemptOutcome::Failed,
    }
}
