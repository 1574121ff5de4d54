//! HTTP fetcher for raw feed documents

use std::time::Duration;

use gamefeed_core::FeedSource;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::error::NewsError;

/// Several legacy feeds refuse requests without a desktop browser agent
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.3; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/67.0.3396.99 Safari/537.36";

/// Configuration for FeedFetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Accept invalid or mismatched TLS certificates
    pub accept_invalid_certs: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            accept_invalid_certs: false,
        }
    }
}

/// Fetches raw feed documents
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, NewsError> {
        if config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for feed fetches");
        }

        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| NewsError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET the source URL and return the body bytes
    #[instrument(skip(self, source), fields(source = %source.name))]
    pub async fn fetch(&self, source: &FeedSource) -> Result<Vec<u8>, NewsError> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| map_request_error(e, &source.url))?;

        if !response.status().is_success() {
            return Err(NewsError::HttpStatus {
                status: response.status().as_u16(),
                url: source.url.clone(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| map_request_error(e, &source.url))?;

        debug!("Fetched {} bytes", body.len());
        Ok(body.to_vec())
    }
}

fn map_request_error(error: reqwest::Error, url: &str) -> NewsError {
    if error.is_timeout() {
        NewsError::Timeout(url.to_string())
    } else {
        NewsError::RequestFailed(format!("{}: {}", url, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamefeed_core::LinkField;

    fn source_for(url: String) -> FeedSource {
        FeedSource::new("test", &url, LinkField::Link, crate::sources::RFC822_FORMAT)
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rss")
            .match_header("user-agent", BROWSER_USER_AGENT)
            .with_status(200)
            .with_body("<rss></rss>")
            .create_async()
            .await;

        let fetcher = FeedFetcher::new(&FetcherConfig::default()).unwrap();
        let body = fetcher
            .fetch(&source_for(format!("{}/rss", server.url())))
            .await
            .unwrap();

        assert_eq!(body, b"<rss></rss>".to_vec());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rss")
            .with_status(503)
            .create_async()
            .await;

        let fetcher = FeedFetcher::new(&FetcherConfig::default()).unwrap();
        let result = fetcher
            .fetch(&source_for(format!("{}/rss", server.url())))
            .await;

        assert!(matches!(
            result,
            Err(NewsError::HttpStatus { status: 503, .. })
        ));
    }
}
