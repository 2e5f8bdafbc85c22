pub mod config;
pub mod logging;

pub mod downloader;
pub mod link_source;
pub mod lock;
pub mod notify;
pub mod pipeline;
pub mod recording;
pub mod retry;
pub mod url_model;
