use async_trait::async_trait;
use bikesnap_core::{Result, SnapshotError};
use reqwest::Client;
use tracing::info;

/// Source of raw feed payloads
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the response body verbatim. Transport failures and non-2xx
    /// statuses are `SnapshotError::Fetch`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Plain unauthenticated GET, no retries
#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        info!("Fetching feed from: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SnapshotError::Fetch(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SnapshotError::Fetch(format!(
                "{} responded with {}",
                url, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SnapshotError::Fetch(format!("Failed to read body of {}: {}", url, e)))?;

        info!(bytes = body.len(), "Obtained response successfully");
        Ok(body.to_vec())
    }
}
