use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} answered with status {status}")]
    Status { url: Url, status: StatusCode },
    #[error("timed out fetching {url}")]
    Timeout { url: Url },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write download to disk: {0}")]
    Io(#[from] io::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FetcherPort: Send + Sync {
    /// Stream the body behind `url` into `dest`, returning the bytes written.
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<u64, FetchError>;
}
