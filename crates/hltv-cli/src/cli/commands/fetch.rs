//! `hltv fetch` – download one URL and print the transfer result.

use anyhow::{Context, Result};
use hltv_core::config::HltvConfig;
use hltv_core::downloader::{DownloadTarget, Downloader};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub url: String,
    pub directory: PathBuf,
    pub filename: Option<String>,
    pub mode: Option<u32>,
}

impl FetchArgs {
    fn target(&self, cfg: &HltvConfig) -> DownloadTarget {
        let mut target = DownloadTarget::new(&self.url, &self.directory)
            .with_mode(self.mode.unwrap_or(cfg.file_mode));
        if let Some(name) = &self.filename {
            target = target.with_filename(name);
        }
        target
    }
}

/// Returns 0 when the transfer succeeded, 1 otherwise.
pub fn run_fetch(cfg: &HltvConfig, args: FetchArgs) -> Result<i32> {
    let target = args.target(cfg);
    let downloader = Downloader::new(cfg.download_options());
    let result = downloader
        .download(&target)
        .with_context(|| format!("download {}", args.url))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(if result.is_success() { 0 } else { 1 })
}
