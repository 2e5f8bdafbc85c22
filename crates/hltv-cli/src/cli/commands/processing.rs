//! `hltv processing` – mark a link list as being processed.

use anyhow::{Context, Result};
use hltv_core::config::HltvConfig;
use hltv_core::link_source::HomeloadTvClient;

/// Returns 0 when the API acknowledged, 1 otherwise.
pub fn run_processing(cfg: &HltvConfig, list_id: i64) -> Result<i32> {
    cfg.validate().context("invalid configuration")?;
    let client = HomeloadTvClient::new(&cfg.api_url, &cfg.email, &cfg.password)
        .with_user_agent(cfg.download_options().user_agent);
    let acknowledged = client
        .set_processing(list_id)
        .with_context(|| format!("mark list {} as processing", list_id))?;
    if acknowledged {
        tracing::info!(list = list_id, "list marked as processing");
        println!("List {} marked as processing.", list_id);
        Ok(0)
    } else {
        tracing::warn!(list = list_id, "processing state not acknowledged");
        println!("List {}: not acknowledged.", list_id);
        Ok(1)
    }
}
