use std::time::Duration;

/// Decision returned by the queue policy after a 503.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop waiting; the last 503 becomes the final result.
    NoRetry,
    /// Sleep for the given delay, then try again.
    RetryAfter(Duration),
}

/// How long we are willing to sit in a server's 503 queue.
///
/// With `max_wait: None` (the default) the loop waits as long as the server
/// keeps asking: the queue is expected to drain eventually.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueuePolicy {
    /// Upper bound on the total time slept across all 503 answers.
    pub max_wait: Option<Duration>,
}

impl QueuePolicy {
    pub fn unbounded() -> Self {
        Self { max_wait: None }
    }

    pub fn with_max_wait(max_wait: Duration) -> Self {
        Self {
            max_wait: Some(max_wait),
        }
    }

    /// `waited` is the time already slept in this transfer; `retry_after` is
    /// the delay the server asked for this time.
    pub fn decide(&self, waited: Duration, retry_after: Duration) -> RetryDecision {
        match self.max_wait {
            Some(max) if waited.saturating_add(retry_after) > max => RetryDecision::NoRetry,
            _ => RetryDecision::RetryAfter(retry_after),
        }
    }
}
