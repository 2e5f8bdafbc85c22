//! What a pass produced: outcome, per-link states and failures.

use serde::Serialize;

use crate::downloader::TransferResult;
use crate::link_source::LinkState;

/// How the pass ended; maps to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Batch was smaller than the limit.
    Completed,
    /// No new links.
    Empty,
    /// Batch filled the limit; more links are probably waiting.
    LimitReached,
}

impl Outcome {
    pub fn for_batch(len: usize, limit: u32) -> Self {
        if len == 0 {
            Outcome::Empty
        } else if len == limit as usize {
            Outcome::LimitReached
        } else {
            Outcome::Completed
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Completed => 0,
            Outcome::Empty => 1,
            Outcome::LimitReached => 2,
        }
    }
}

/// Maps a transfer to the state reported for its link: 4xx is `damaged`,
/// an exhausted 503 queue is `new` (try again next pass), and any other
/// failure closes the link as `finished` like a successful one.
pub fn classify_transfer(result: &TransferResult) -> LinkState {
    if result.is_client_error() && !result.is_success() {
        LinkState::Damaged
    } else if result.queue_exhausted && !result.is_success() {
        LinkState::New
    } else {
        LinkState::Finished
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The download could not run, or failed beyond retrying; reported as
    /// `BrokenLink`.
    BrokenLink,
    /// The transfer ended with a 4xx answer or an exhausted 503 queue.
    Transfer,
    Thumbnail(char),
    /// The API rejected or did not acknowledge a state report.
    StateReport,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::BrokenLink => f.write_str("broken link"),
            FailureKind::Transfer => f.write_str("transfer failed"),
            FailureKind::Thumbnail(key) => write!(f, "thumbnail {} failed", key),
            FailureKind::StateReport => f.write_str("state report failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkFailure {
    pub link_id: i64,
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
    pub transfer: Option<TransferResult>,
}

/// State reported for one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub link_id: i64,
    pub state: LinkState,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub outcome: Outcome,
    /// Links in the fetched batch.
    pub batch_len: usize,
    /// Links whose transfer was classified and reported (BrokenLink excluded).
    pub processed: Vec<LinkReport>,
    pub failures: Vec<LinkFailure>,
}

impl RunReport {
    pub fn new(outcome: Outcome, batch_len: usize) -> Self {
        Self {
            outcome,
            batch_len,
            processed: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Notification text for one link: a line per failure, each followed by the
/// transfer telemetry as JSON when there is one.
pub(crate) fn notification_body(failures: &[LinkFailure]) -> String {
    let mut body = String::new();
    for failure in failures {
        body.push_str(&format!("{} ({}): {}\n", failure.kind, failure.url, failure.message));
        if let Some(transfer) = &failure.transfer {
            match serde_json::to_string_pretty(transfer) {
                Ok(json) => {
                    body.push_str(&json);
                    body.push('\n');
                }
                Err(e) => tracing::warn!("cannot serialise transfer result: {}", e),
            }
        }
    }
    body
}
