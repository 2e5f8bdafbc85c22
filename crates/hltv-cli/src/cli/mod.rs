//! CLI for the HLTV download manager.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hltv_core::config::{self, HltvConfig};
use std::path::{Path, PathBuf};

use commands::{run_fetch, run_pass, run_processing, FetchArgs, RunOverrides};

/// Top-level CLI for the HLTV download manager.
#[derive(Debug, Parser)]
#[command(name = "hltv")]
#[command(about = "HLTV: download the HomeloadTV link queue", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/hltv/config.toml, created if missing).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run one pass over the link queue (for cron).
    ///
    /// Exit status: 0 done, 1 no new links, 2 link limit reached, 99 error.
    Run {
        /// Download directory (overrides config).
        #[arg(long, value_name = "DIR")]
        directory: Option<PathBuf>,
        /// Maximum links in this pass (overrides config).
        #[arg(long, value_name = "N")]
        limit: Option<u32>,
        /// Fetch links outside Happy Hour too.
        #[arg(long)]
        all_hours: bool,
        /// Skip recording thumbnails.
        #[arg(long)]
        no_thumbnails: bool,
    },

    /// Download a single URL with resume and 503 queue handling.
    Fetch {
        /// Direct HTTP/HTTPS URL to download.
        url: String,
        /// Target directory (default: current directory).
        #[arg(long, value_name = "DIR")]
        directory: Option<PathBuf>,
        /// Save as this name instead of deriving it from the URL.
        #[arg(long)]
        filename: Option<String>,
        /// Permission bits in octal, e.g. 640.
        #[arg(long, value_name = "OCTAL", value_parser = parse_mode)]
        mode: Option<u32>,
    },

    /// Tell the API that a link list is being processed.
    Processing {
        /// List ID as announced in the `LIST` field of a link batch.
        #[arg(value_parser = clap::value_parser!(i64).range(0..))]
        list: i64,
    },
}

/// Octal permission bits, with or without a `0o`/`0` prefix.
pub(crate) fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    let mode = u32::from_str_radix(digits, 8).map_err(|_| format!("not an octal mode: {}", s))?;
    if mode > 0o7777 {
        return Err(format!("mode {} exceeds 7777", s));
    }
    Ok(mode)
}

/// Explicit path, else the XDG config file. `create_default` writes a
/// default file when there is none; otherwise defaults stay in memory.
fn load_config(path: Option<&Path>, create_default: bool) -> Result<HltvConfig> {
    let cfg = match path {
        Some(p) => config::load_from_path(p)?,
        None if create_default => config::load_or_init()?,
        None => config::load_or_default()?,
    };
    tracing::debug!(
        directory = %cfg.directory.display(),
        limit = cfg.limit,
        happy_hour_only = cfg.happy_hour_only,
        "loaded config"
    );
    Ok(cfg)
}

impl CliCommand {
    /// Parses arguments, runs the command and returns the process exit code.
    pub fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let config_path = cli.config.as_deref();

        match cli.command {
            CliCommand::Run {
                directory,
                limit,
                all_hours,
                no_thumbnails,
            } => {
                let overrides = RunOverrides {
                    directory,
                    limit,
                    all_hours,
                    no_thumbnails,
                };
                let cfg = load_config(config_path, true)?;
                let outcome = run_pass(overrides.apply(cfg))?;
                Ok(outcome.exit_code())
            }
            CliCommand::Fetch {
                url,
                directory,
                filename,
                mode,
            } => {
                let cfg = load_config(config_path, false)?;
                let directory = match directory {
                    Some(d) => d,
                    None => std::env::current_dir()?,
                };
                run_fetch(
                    &cfg,
                    FetchArgs {
                        url,
                        directory,
                        filename,
                        mode,
                    },
                )
            }
            CliCommand::Processing { list } => {
                let cfg = load_config(config_path, true)?;
                run_processing(&cfg, list)
            }
        }
    }
}
