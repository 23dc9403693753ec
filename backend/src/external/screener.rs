use std::time::Duration;

use async_trait::async_trait;

use crate::external::market_source::{PageFetcher, ProviderError};

/// Fetches Screener.in company pages, which are keyed by BSE scrip code.
pub struct ScreenerClient {
    client: reqwest::Client,
    base_url: String,
}

impl ScreenerClient {
    pub fn new(request_timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_base_url("https://www.screener.in", request_timeout)
    }

    pub fn with_base_url(base_url: &str, request_timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PageFetcher for ScreenerClient {
    async fn fetch_company_page(&self, code: &str) -> Result<String, ProviderError> {
        let url = format!("{}/company/{}/", self.base_url, code);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(format!("no Screener page for {}", code)));
        }
        if !status.is_success() {
            return Err(ProviderError::BadResponse(format!("Screener returned status: {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read response: {}", e)))
    }
}
