//! Blocking HomeloadTV API client over libcurl.

use base64::{engine::general_purpose, Engine as _};
use curl::easy::Easy;
use std::time::Duration;

use super::parse::parse_links_response;
use super::{ApiError, LinkBatch, LinkSource, StateReport};

/// Default HomeloadTV API endpoint.
pub const DEFAULT_API_URL: &str = "http://www.homeloadtv.com/api/";

/// Acknowledgement body of `setstate`.
const OK: &str = "OK";

/// HomeloadTV account bound to an API endpoint.
#[derive(Debug, Clone)]
pub struct HomeloadTvClient {
    api_url: String,
    email: String,
    password: String,
    user_agent: String,
}

impl HomeloadTvClient {
    pub fn new(
        api_url: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            email: email.into(),
            password: password.into(),
            user_agent: concat!("hltv/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Marks a whole list as being processed.
    pub fn set_processing(&self, list_id: i64) -> Result<bool, ApiError> {
        let url = self.request_url(&[
            ("do", "setstate".to_string()),
            ("state", "processing".to_string()),
            ("uid", self.email.clone()),
            ("list", list_id.to_string()),
        ])?;
        Ok(self.get(&url)?.trim() == OK)
    }

    pub(crate) fn getlinks_url(
        &self,
        limit: u32,
        mark_active_as_new: bool,
        happy_hour_only: bool,
    ) -> Result<url::Url, ApiError> {
        self.request_url(&[
            ("do", "getlinks".to_string()),
            ("uid", self.email.clone()),
            ("password", self.password.clone()),
            ("limit", limit.to_string()),
            ("protocnew", mark_active_as_new.to_string()),
            ("onlyhh", happy_hour_only.to_string()),
        ])
    }

    pub(crate) fn setstate_url(&self, report: &StateReport) -> Result<url::Url, ApiError> {
        self.request_url(&[
            ("do", "setstate".to_string()),
            ("uid", self.email.clone()),
            ("id", report.id.to_string()),
            ("state", report.state.as_str().to_string()),
            ("error", report.error.clone()),
            ("filesize", report.size_kib.to_string()),
            ("speed", report.speed_kbit.to_string()),
            ("file", general_purpose::STANDARD.encode(report.filename.as_bytes())),
        ])
    }

    fn request_url(&self, params: &[(&str, String)]) -> Result<url::Url, ApiError> {
        Ok(url::Url::parse_with_params(
            &self.api_url,
            params.iter().map(|(k, v)| (*k, v.as_str())),
        )?)
    }

    /// GET `url` and return the body as text.
    fn get(&self, url: &url::Url) -> Result<String, ApiError> {
        let mut body: Vec<u8> = Vec::new();

        let mut easy = Easy::new();
        easy.url(url.as_str())?;
        easy.follow_location(true)?;
        easy.useragent(&self.user_agent)?;
        easy.connect_timeout(Duration::from_secs(30))?;
        easy.timeout(Duration::from_secs(120))?;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(ApiError::Http(code));
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl LinkSource for HomeloadTvClient {
    fn fetch_batch(
        &mut self,
        limit: u32,
        mark_active_as_new: bool,
        happy_hour_only: bool,
    ) -> Result<LinkBatch, ApiError> {
        let url = self.getlinks_url(limit, mark_active_as_new, happy_hour_only)?;
        tracing::debug!(limit, happy_hour_only, "requesting link list");
        let batch = parse_links_response(&self.get(&url)?)?;
        tracing::info!(
            links = batch.len(),
            list = ?batch.list_id,
            remaining = ?batch.link_count,
            "link list received"
        );
        Ok(batch)
    }

    fn report_state(&mut self, report: &StateReport) -> Result<bool, ApiError> {
        let url = self.setstate_url(report)?;
        let acknowledged = self.get(&url)?.trim() == OK;
        tracing::debug!(id = report.id, state = %report.state, acknowledged, "state reported");
        Ok(acknowledged)
    }
}
