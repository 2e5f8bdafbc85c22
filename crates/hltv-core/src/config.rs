use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::downloader::{DownloadOptions, DEFAULT_FILE_MODE, MAX_FILE_MODE};
use crate::link_source::DEFAULT_API_URL;
use crate::pipeline::{PipelineSettings, DEFAULT_THUMBNAIL_MODE};
use crate::recording::DEFAULT_THUMBNAIL_PREFIX;
use crate::retry::QueuePolicy;

/// Transport parameters (optional `[download]` section in config.toml).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// User-Agent header; `None` = `hltv/<version>`.
    pub user_agent: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    /// Limit for one attempt; the 503 wait between attempts is not counted.
    pub attempt_timeout_secs: Option<u64>,
    /// Give up on a 503 queue after this much total waiting (None = wait forever).
    pub max_queue_wait_secs: Option<u64>,
}

impl DownloadConfig {
    pub fn to_options(&self) -> DownloadOptions {
        let mut options = DownloadOptions::default();
        if let Some(ua) = &self.user_agent {
            options.user_agent = ua.clone();
        }
        options.connect_timeout = self.connect_timeout_secs.map(Duration::from_secs);
        options.attempt_timeout = self.attempt_timeout_secs.map(Duration::from_secs);
        options.queue = match self.max_queue_wait_secs {
            Some(secs) => QueuePolicy::with_max_wait(Duration::from_secs(secs)),
            None => QueuePolicy::unbounded(),
        };
        options
    }
}

/// Global configuration loaded from `~/.config/hltv/config.toml`.
///
/// Modes may be written as TOML octal literals (`file_mode = 0o640`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HltvConfig {
    /// HomeloadTV account (email address); also the notification recipient.
    pub email: String,
    pub password: String,
    /// Download directory; also holds the notification log.
    pub directory: PathBuf,
    /// Only fetch links during Happy Hour.
    pub happy_hour_only: bool,
    /// Maximum links per pass.
    pub limit: u32,
    pub thumbnails: bool,
    /// Sender address for notification mails; no mail without it.
    pub email_from: Option<String>,
    pub max_errors_notified: usize,
    pub file_mode: u32,
    pub thumbnail_mode: u32,
    pub api_url: String,
    pub thumbnail_prefix: String,
    pub download: DownloadConfig,
}

impl Default for HltvConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            directory: PathBuf::new(),
            happy_hour_only: true,
            limit: 100,
            thumbnails: true,
            email_from: None,
            max_errors_notified: 10,
            file_mode: DEFAULT_FILE_MODE,
            thumbnail_mode: DEFAULT_THUMBNAIL_MODE,
            api_url: DEFAULT_API_URL.to_string(),
            thumbnail_prefix: DEFAULT_THUMBNAIL_PREFIX.to_string(),
            download: DownloadConfig::default(),
        }
    }
}

impl HltvConfig {
    /// Rejects settings that would make every pass fail.
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            anyhow::bail!("email must not be empty");
        }
        if self.password.is_empty() {
            anyhow::bail!("password must not be empty");
        }
        if self.directory.as_os_str().is_empty() {
            anyhow::bail!("directory must not be empty");
        }
        if self.limit == 0 {
            anyhow::bail!("limit must be greater than zero");
        }
        for (name, mode) in [("file_mode", self.file_mode), ("thumbnail_mode", self.thumbnail_mode)] {
            if mode > MAX_FILE_MODE {
                anyhow::bail!("{} {:o} exceeds {:o}", name, mode, MAX_FILE_MODE);
            }
        }
        url::Url::parse(&self.api_url).with_context(|| format!("bad api_url {:?}", self.api_url))?;
        Ok(())
    }

    pub fn download_options(&self) -> DownloadOptions {
        self.download.to_options()
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            directory: self.directory.clone(),
            limit: self.limit,
            happy_hour_only: self.happy_hour_only,
            thumbnails: self.thumbnails,
            max_errors_notified: self.max_errors_notified,
            file_mode: self.file_mode,
            thumbnail_mode: self.thumbnail_mode,
            thumbnail_prefix: self.thumbnail_prefix.clone(),
        }
    }
}

const CONFIG_FILE: &str = "config.toml";

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hltv")?;
    Ok(xdg_dirs.place_config_file(CONFIG_FILE)?)
}

/// Load the config file if one exists, else defaults. Creates nothing.
pub fn load_or_default() -> Result<HltvConfig> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hltv")?;
    load_if_present(xdg_dirs.find_config_file(CONFIG_FILE).as_deref())
}

fn load_if_present(path: Option<&Path>) -> Result<HltvConfig> {
    match path {
        Some(p) => load_from_path(p),
        None => Ok(HltvConfig::default()),
    }
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HltvConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HltvConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<HltvConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: HltvConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
