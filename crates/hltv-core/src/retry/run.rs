//! Queue loop: repeat an attempt while the server answers 503.

use std::time::Duration;

use super::classify::AttemptOutcome;
use super::policy::{QueuePolicy, RetryDecision};

/// How the queue loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    /// Outcome of the last attempt.
    pub outcome: AttemptOutcome,
    /// Number of attempts made (>= 1).
    pub attempts: u32,
    /// Total time slept between attempts.
    pub waited: Duration,
}

/// Runs `attempt` until it returns anything but `Throttled`, sleeping the
/// server-requested delay between tries via `sleep`. `attempt` receives the
/// 1-based attempt number. Stops early only if `policy` says so.
pub fn run_queue_loop<F, S>(policy: &QueuePolicy, mut attempt: F, mut sleep: S) -> LoopSummary
where
    F: FnMut(u32) -> AttemptOutcome,
    S: FnMut(Duration),
{
    let mut attempts = 0u32;
    let mut waited = Duration::ZERO;
    loop {
        attempts += 1;
        let outcome = attempt(attempts);
        let retry_after = match outcome {
            AttemptOutcome::Throttled(d) => d,
            _ => {
                return LoopSummary {
                    outcome,
                    attempts,
                    waited,
                }
            }
        };
        match policy.decide(waited, retry_after) {
            RetryDecision::NoRetry => {
                tracing::warn!(
                    attempts,
                    waited_secs = waited.as_secs(),
                    "giving up on 503 queue"
                );
                return LoopSummary {
                    outcome,
                    attempts,
                    waited,
                };
            }
            RetryDecision::RetryAfter(d) => {
                tracing::info!(attempt = attempts, delay_secs = d.as_secs(), "HTTP 503, waiting");
                sleep(d);
                waited += d;
            }
        }
    }
}
