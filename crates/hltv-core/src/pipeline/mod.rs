//! One pass over the link queue.
//!
//! fetch batch → per link: recording name → download → classify → report
//! state → thumbnails → notify. A failing link is reported and recorded but
//! never stops the pass; only a failed batch fetch does. Links that cannot be
//! downloaded, or whose transfer failed beyond retrying, are closed as
//! `finished` with error `BrokenLink`.

mod report;
mod thumbnails;


pub use report::{classify_transfer, FailureKind, LinkFailure, LinkReport, Outcome, RunReport};

use report::notification_body;

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::downloader::{DownloadTarget, Fetcher, TransferResult, DEFAULT_FILE_MODE};
use crate::link_source::{Link, LinkSource, StateReport};
use crate::notify::Notifier;
use crate::recording::{Recording, DEFAULT_THUMBNAIL_PREFIX};

/// Default permission bits for thumbnails (`rw-rw----`).
pub const DEFAULT_THUMBNAIL_MODE: u32 = 0o660;

/// Per-pass knobs, usually built from `HltvConfig::pipeline_settings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub directory: PathBuf,
    pub limit: u32,
    pub happy_hour_only: bool,
    pub thumbnails: bool,
    /// Links with errors that get a notification; the rest are summarised.
    pub max_errors_notified: usize,
    pub file_mode: u32,
    pub thumbnail_mode: u32,
    pub thumbnail_prefix: String,
}

impl PipelineSettings {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            limit: 100,
            happy_hour_only: true,
            thumbnails: true,
            max_errors_notified: 10,
            file_mode: DEFAULT_FILE_MODE,
            thumbnail_mode: DEFAULT_THUMBNAIL_MODE,
            thumbnail_prefix: DEFAULT_THUMBNAIL_PREFIX.to_string(),
        }
    }
}

pub struct Pipeline<'a, S, F> {
    source: &'a mut S,
    fetcher: &'a F,
    notifier: &'a dyn Notifier,
    settings: PipelineSettings,
}

impl<'a, S: LinkSource, F: Fetcher> Pipeline<'a, S, F> {
    pub fn new(
        source: &'a mut S,
        fetcher: &'a F,
        notifier: &'a dyn Notifier,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            fetcher,
            notifier,
            settings,
        }
    }

    /// Runs one pass. Errors only when the batch cannot be fetched.
    pub fn run(&mut self) -> Result<RunReport> {
        let limit = self.settings.limit;
        let batch = self
            .source
            .fetch_batch(limit, true, self.settings.happy_hour_only)
            .context("fetching link batch")?;

        if batch.is_empty() {
            tracing::info!("no new links");
            return Ok(RunReport::new(Outcome::Empty, 0));
        }
        tracing::info!(
            links = batch.len(),
            list = ?batch.list_id,
            waiting = ?batch.link_count,
            hh_start = ?batch.happy_hour_start,
            hh_end = ?batch.happy_hour_end,
            "processing link batch"
        );

        let outcome = Outcome::for_batch(batch.len(), limit);
        let mut report = RunReport::new(outcome, batch.len());
        let mut notified = 0usize;
        let mut suppressed = 0usize;

        for link in &batch.links {
            let failures = self.process_link(link, &mut report);
            if failures.is_empty() {
                continue;
            }
            if notified < self.settings.max_errors_notified {
                self.notifier
                    .notify(Some(link.id), &notification_body(&failures));
                notified += 1;
            } else {
                suppressed += 1;
            }
            report.failures.extend(failures);
        }

        if suppressed > 0 {
            self.notifier.notify(
                None,
                &format!("{} more links with errors were not notified", suppressed),
            );
        }
        if outcome == Outcome::LimitReached {
            tracing::info!(limit, "link limit reached; remaining links are fetched next time");
        }
        Ok(report)
    }

    fn process_link(&mut self, link: &Link, report: &mut RunReport) -> Vec<LinkFailure> {
        let mut failures = Vec::new();
        let recording = recording_for(link);

        let mut target =
            DownloadTarget::new(&link.url, &self.settings.directory).with_mode(self.settings.file_mode);
        if let Some(rec) = &recording {
            target = target.with_filename(&rec.filename);
        }

        tracing::debug!(id = link.id, url = %link.url, "downloading link");
        let video = match self.fetcher.fetch(&target) {
            Ok(video) => video,
            Err(e) => {
                tracing::error!(id = link.id, url = %link.url, "download failed: {}", e);
                return self.close_broken(link, e.to_string(), None);
            }
        };

        if video.is_unrecoverable() {
            tracing::error!(
                id = link.id,
                url = %link.url,
                status = video.http_status,
                "transfer failed: {}",
                video.transport_error_message
            );
            return self.close_broken(link, transfer_message(&video), Some(video));
        }

        let state = classify_transfer(&video);
        tracing::info!(
            id = link.id,
            state = %state,
            kib = video.size_kib(),
            kbit_s = video.speed_kbit(),
            attempts = video.attempts,
            "transfer finished"
        );
        if !video.is_success() {
            failures.push(LinkFailure {
                link_id: link.id,
                url: link.url.clone(),
                kind: FailureKind::Transfer,
                message: transfer_message(&video),
                transfer: Some(video.clone()),
            });
        }

        let state_report = StateReport {
            id: link.id,
            state,
            size_kib: video.size_kib(),
            speed_kbit: video.speed_kbit(),
            error: video.transport_error_message.clone(),
            filename: video.filename(),
        };
        if let Some(f) = self.report_state(link, &state_report) {
            failures.push(f);
        }
        report.processed.push(LinkReport {
            link_id: link.id,
            state,
            filename: state_report.filename,
        });

        if self.settings.thumbnails && video.is_success() {
            if let Some(rec) = &recording {
                failures.extend(self.fetch_thumbnails(link, rec));
            }
        }
        failures
    }

    /// Reports `link` as `finished` / `BrokenLink`.
    fn close_broken(
        &mut self,
        link: &Link,
        message: String,
        transfer: Option<TransferResult>,
    ) -> Vec<LinkFailure> {
        let mut failures = vec![LinkFailure {
            link_id: link.id,
            url: link.url.clone(),
            kind: FailureKind::BrokenLink,
            message,
            transfer,
        }];
        if let Some(f) = self.report_state(link, &StateReport::broken_link(link.id)) {
            failures.push(f);
        }
        failures
    }

    fn report_state(&mut self, link: &Link, state: &StateReport) -> Option<LinkFailure> {
        let message = match self.source.report_state(state) {
            Ok(true) => return None,
            Ok(false) => "state report not acknowledged".to_string(),
            Err(e) => e.to_string(),
        };
        tracing::warn!(id = link.id, state = %state.state, "{}", message);
        Some(LinkFailure {
            link_id: link.id,
            url: link.url.clone(),
            kind: FailureKind::StateReport,
            message,
            transfer: None,
        })
    }
}

/// The API's derived name when it sent one, else the URL's last segment.
fn recording_for(link: &Link) -> Option<Recording> {
    match &link.derived_name {
        Some(name) => Recording::from_name(name),
        None => Recording::from_url(&link.url),
    }
}

fn transfer_message(result: &TransferResult) -> String {
    if result.http_status > 0 {
        format!("HTTP {}: {}", result.http_status, result.transport_error_message)
    } else {
        result.transport_error_message.clone()
    }
}
