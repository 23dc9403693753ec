use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::models::{FundamentalsResult, QuoteResult, QuoteVariant};

/// Raw quote fields as returned by an upstream provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalQuote {
    pub price: Option<BigDecimal>,
    pub pe_ratio: Option<String>,
    pub trailing_eps: Option<String>,
}

impl ExternalQuote {
    pub fn new(price: Option<BigDecimal>, statistics: QuoteStatistics) -> Self {
        Self {
            price,
            pe_ratio: statistics.pe_ratio,
            trailing_eps: statistics.trailing_eps,
        }
    }
}

/// Valuation fields served separately from the price.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteStatistics {
    pub pe_ratio: Option<String>,
    pub trailing_eps: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited,
}

impl ProviderError {
    /// Errors worth a second attempt after backing off.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Network(_) | ProviderError::RateLimited)
    }
}

/// Talks to a quote API. Errors are surfaced as-is; caching and
/// timeouts live in the adapter that wraps it.
///
/// Price and statistics are separate calls so a slow statistics endpoint
/// can be bounded on its own without losing the price.
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<Option<BigDecimal>, ProviderError>;

    async fn fetch_statistics(&self, symbol: &str) -> Result<QuoteStatistics, ProviderError>;
}

/// Downloads the HTML company page for a numeric exchange code.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_company_page(&self, code: &str) -> Result<String, ProviderError>;
}

/// Price source for ticker-market holdings. Implementations never fail:
/// every problem is reported inside the returned `QuoteResult`.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn get_quote(&self, symbol: &str, variant: QuoteVariant) -> QuoteResult;
}

/// Price and fundamentals source for numeric-code holdings. Same no-fail
/// contract as `QuoteSource`.
#[async_trait]
pub trait FundamentalsSource: Send + Sync {
    async fn get_fundamentals(&self, code: &str) -> FundamentalsResult;
}
