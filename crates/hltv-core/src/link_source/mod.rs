//! Where links come from and where their state goes.
//!
//! The pipeline only needs two calls: fetch a bounded batch of pending links,
//! and report what happened to each one. `HomeloadTvClient` implements them
//! against the HomeloadTV HTTP API.

mod client;
mod parse;

use serde::Serialize;

pub use client::{HomeloadTvClient, DEFAULT_API_URL};
pub use parse::parse_links_response;

/// Error text reported for links whose download could not run at all.
pub const BROKEN_LINK: &str = "BrokenLink";

/// One pending remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: i64,
    pub url: String,
    /// Last URL segment without the API's `<digits>_` queue prefix.
    pub derived_name: Option<String>,
}

/// Links returned by one `fetch_batch`, plus queue metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkBatch {
    pub links: Vec<Link>,
    /// Seconds the server wants between API polls.
    pub interval: Option<u64>,
    pub list_id: Option<i64>,
    /// Links still waiting on the server.
    pub link_count: Option<u64>,
    /// Happy Hour start hour (CET/CEST).
    pub happy_hour_start: Option<u32>,
    pub happy_hour_end: Option<u32>,
}

impl LinkBatch {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// State a link is moved to after processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Not done; picked up again on a later pass.
    New,
    Finished,
    /// The server refused the file (4xx).
    Damaged,
}

impl LinkState {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkState::New => "new",
            LinkState::Finished => "finished",
            LinkState::Damaged => "damaged",
        }
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Arguments of a state report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateReport {
    pub id: i64,
    pub state: LinkState,
    pub size_kib: u64,
    pub speed_kbit: u64,
    /// Empty on success.
    pub error: String,
    pub filename: String,
}

impl StateReport {
    /// Report for a link whose download failed before any transfer result.
    pub fn broken_link(id: i64) -> Self {
        StateReport {
            id,
            state: LinkState::Finished,
            size_kib: 0,
            speed_kbit: 0,
            error: BROKEN_LINK.to_string(),
            filename: String::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no result from API request")]
    EmptyResponse,
    /// The API answered with an error message instead of data.
    #[error("API error: {0}")]
    Server(String),
    #[error("malformed API response: {0}")]
    Malformed(String),
    #[error("API returned HTTP {0}")]
    Http(u32),
    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("API request failed: {0}")]
    Transport(#[from] curl::Error),
}

/// Supplier of link batches and sink of state reports.
pub trait LinkSource {
    /// Up to `limit` pending links. "No new links" is an empty batch, not an
    /// error. `mark_active_as_new` asks the server to requeue links left
    /// active by an interrupted run; `happy_hour_only` returns links only
    /// inside the Happy Hour window.
    fn fetch_batch(
        &mut self,
        limit: u32,
        mark_active_as_new: bool,
        happy_hour_only: bool,
    ) -> Result<LinkBatch, ApiError>;

    /// Records the new state of a link. `Ok(false)` means the server did not
    /// acknowledge it.
    fn report_state(&mut self, report: &StateReport) -> Result<bool, ApiError>;
}
