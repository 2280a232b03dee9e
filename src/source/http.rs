//! HTTP client for the paginated status dump endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{FetchedPage, RecordSource};
use crate::error::SourceError;

pub const USER_AGENT: &str = concat!("status-sync/", env!("CARGO_PKG_VERSION"));

/// Response envelope: `{ok, data, count}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(default)]
    count: u64,
    #[serde(default)]
    error: Option<String>,
}

/// Fetches pages of status records over HTTP.
#[derive(Clone)]
pub struct HttpRecordSource {
    client: Client,
    endpoint: Url,
}

impl HttpRecordSource {
    /// Create a source for an endpoint with a per-request timeout.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch(&self, limit: usize, offset: usize) -> Result<FetchedPage, SourceError> {
        debug!(
            "Fetching {} (limit={}, offset={})",
            self.endpoint, limit, offset
        );

        let start = Instant::now();
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let envelope: Envelope = serde_json::from_str(&body)?;
        debug!(
            "Page at offset {} returned {} items in {}ms",
            offset,
            envelope.data.len(),
            start.elapsed().as_millis()
        );

        if !envelope.ok {
            return Err(SourceError::Rejected(
                envelope.error.unwrap_or_else(|| "ok=false".to_string()),
            ));
        }

        Ok(FetchedPage::from_items(&envelope.data, envelope.count))
    }
}
