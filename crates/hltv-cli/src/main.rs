use hltv_core::logging;

mod cli;

use crate::cli::CliCommand;

/// Exit code for any error that ends a run.
const EXIT_ERROR: i32 = 99;

fn main() {
    // Initialize logging as early as possible; stderr if the state dir is unusable.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    match CliCommand::run_from_args() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("hltv error: {:#}", err);
            std::process::exit(EXIT_ERROR);
        }
    }
}
