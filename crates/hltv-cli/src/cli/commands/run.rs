//! `hltv run` – one pass over the link queue.

use anyhow::{Context, Result};
use hltv_core::config::HltvConfig;
use hltv_core::downloader::Downloader;
use hltv_core::link_source::HomeloadTvClient;
use hltv_core::lock::RunLock;
use hltv_core::notify::{LogFileNotifier, Notifier, Notifiers, SendmailNotifier};
use hltv_core::pipeline::{Outcome, Pipeline, RunReport};
use std::path::PathBuf;

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub directory: Option<PathBuf>,
    pub limit: Option<u32>,
    pub all_hours: bool,
    pub no_thumbnails: bool,
}

impl RunOverrides {
    pub fn apply(self, mut cfg: HltvConfig) -> HltvConfig {
        if let Some(d) = self.directory {
            cfg.directory = d;
        }
        if let Some(n) = self.limit {
            cfg.limit = n;
        }
        if self.all_hours {
            cfg.happy_hour_only = false;
        }
        if self.no_thumbnails {
            cfg.thumbnails = false;
        }
        cfg
    }
}

/// Log file in the download directory, plus mail when a sender is configured.
fn notifiers(cfg: &HltvConfig) -> Notifiers {
    let mut all = Notifiers::new();
    if cfg.directory.is_dir() {
        all.push(LogFileNotifier::in_directory(&cfg.directory));
    }
    if let Some(from) = cfg.email_from.as_deref().filter(|f| !f.is_empty()) {
        all.push(SendmailNotifier::new(from, cfg.email.as_str()));
    }
    all
}

/// Runs one pass. Any error is notified before it is returned.
pub fn run_pass(cfg: HltvConfig) -> Result<Outcome> {
    let notifier = notifiers(&cfg);
    match pass(&cfg, &notifier) {
        Ok(report) => {
            print_summary(&report);
            Ok(report.outcome)
        }
        Err(err) => {
            notifier.notify(None, &format!("{:#}", err));
            Err(err)
        }
    }
}

fn pass(cfg: &HltvConfig, notifier: &dyn Notifier) -> Result<RunReport> {
    cfg.validate().context("invalid configuration")?;
    let lock_path = RunLock::default_path();
    let _run_lock = RunLock::acquire(&lock_path).context("cannot start run")?;

    let options = cfg.download_options();
    let mut api = HomeloadTvClient::new(&cfg.api_url, &cfg.email, &cfg.password)
        .with_user_agent(options.user_agent.clone());
    let downloader = Downloader::new(options);

    let report = Pipeline::new(&mut api, &downloader, notifier, cfg.pipeline_settings()).run()?;
    tracing::info!(
        outcome = ?report.outcome,
        links = report.batch_len,
        failures = report.failures.len(),
        "pass finished"
    );
    Ok(report)
}

fn print_summary(report: &RunReport) {
    match report.outcome {
        Outcome::Empty => println!("No new links."),
        outcome => {
            for link in &report.processed {
                println!("{:>10}  {:<8}  {}", link.link_id, link.state, link.filename);
            }
            for failure in &report.failures {
                println!("{:>10}  {}: {}", failure.link_id, failure.kind, failure.message);
            }
            if outcome == Outcome::LimitReached {
                println!("Link limit reached; remaining links are fetched next time.");
            }
        }
    }
}
