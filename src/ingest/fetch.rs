use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::model::ChainPayload;

pub const FETCH_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure on every attempt. The inner error is the
    /// last one observed.
    #[error("feed unreachable after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        source: reqwest::Error,
    },
    /// The feed answered but the body is not a chain payload. Retrying a
    /// data-shape problem cannot help, so this fails immediately.
    #[error("feed payload is not valid chain data: {0}")]
    BadPayload(#[from] serde_json::Error),
}

/// HTTP client for the chain feed. Retry pacing lives on the struct so
/// tests can shrink it to milliseconds.
pub struct Fetcher {
    client: reqwest::Client,
    feed_url: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("gexflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building feed http client")?;

        Ok(Fetcher {
            client,
            feed_url: feed_url(&settings.feed_base_url, &settings.symbol),
            max_attempts: FETCH_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        })
    }

    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Fetch one chain snapshot, defaulting to the configured feed URL.
    pub async fn fetch(&self, url: Option<&str>) -> Result<ChainPayload, FetchError> {
        let url = url.unwrap_or(&self.feed_url);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(attempt, max_attempts = self.max_attempts, url, "requesting chain snapshot");
            match self.request(url).await {
                Ok(body) => return serde_json::from_str(&body).map_err(FetchError::from),
                Err(source) if attempt >= self.max_attempts => {
                    return Err(FetchError::RetriesExhausted { attempts: attempt, source });
                }
                Err(source) => {
                    warn!(attempt, error = %source, "feed request failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn request(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// Default feed URL: base joined with the symbol, `.json` appended when
/// the symbol lacks it.
pub fn feed_url(base: &str, symbol: &str) -> String {
    let mut url = String::from(base);
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(symbol);
    if !url.ends_with(".json") {
        url.push_str(".json");
    }
    url
}
