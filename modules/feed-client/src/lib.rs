pub mod error;
pub mod types;

pub use error::{FeedError, Result};
pub use types::{FeedArea, FeedEntry};

use std::time::Duration;

use fieldcheck_common::RetryPolicy;
use serde::de::DeserializeOwned;
use types::ApiResponse;

const DEFAULT_BASE_URL: &str = "https://apigo.afetharita.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

pub struct FeedClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    retry: RetryPolicy,
}

impl FeedClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            retry: RetryPolicy::new(3, Duration::from_millis(500)),
        }
    }

    /// Client pointed at the public feed with no credentials.
    pub fn public() -> Self {
        Self::new(DEFAULT_BASE_URL, None)
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch every geolocated entry the feed currently knows about.
    pub async fn fetch_areas(&self) -> Result<Vec<FeedArea>> {
        let url = format!("{}/feeds/areas", self.base_url);
        let resp: ApiResponse<Vec<FeedArea>> = self.get_json(&url).await?;
        tracing::debug!(count = resp.results.len(), "Fetched feed areas");
        Ok(resp.results)
    }

    /// Fetch the full message behind one entry.
    pub async fn fetch_entry(&self, entry_id: i64) -> Result<FeedEntry> {
        let url = format!("{}/feeds/{}", self.base_url, entry_id);
        match self.get_json::<FeedEntry>(&url).await {
            Err(FeedError::Api { status: 404, .. }) => Err(FeedError::NotFound(entry_id)),
            other => other,
        }
    }

    /// GET with exponential backoff on transient failures.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.retry
            .run(url, FeedError::is_transient, || self.get_once(url))
            .await
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut req = self.client.get(url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
