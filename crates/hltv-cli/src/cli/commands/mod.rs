//! CLI command handlers.

mod fetch;
mod processing;
mod run;

pub use fetch::{run_fetch, FetchArgs};
pub use processing::run_processing;
pub use run::{run_pass, RunOverrides};
