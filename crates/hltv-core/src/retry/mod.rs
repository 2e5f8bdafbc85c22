//! 503 queue handling.
//!
//! A server under load answers `503 Service Unavailable` with a `Retry-After`
//! hint. This is admission control, not a failure: the client waits the
//! requested time and asks again, with no attempt cap. Client errors (4xx)
//! and every other failure end the loop at once. An optional wall-clock
//! budget (`QueuePolicy::max_wait`) bounds the total time spent waiting.

mod classify;
mod policy;
mod run;

pub use classify::{classify_attempt, AttemptOutcome};
pub use policy::{QueuePolicy, RetryDecision};
pub use run::{run_queue_loop, LoopSummary};
