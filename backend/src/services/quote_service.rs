use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::config::QuoteAdapterConfig;
use crate::external::market_source::{
    ExternalQuote, ProviderError, QuoteFetcher, QuoteSource, QuoteStatistics,
};
use crate::models::{QuoteResult, QuoteVariant, NOT_AVAILABLE};
use crate::services::ttl_cache::{Clock, TtlCache};

/// Wraps a quote fetcher with a short-lived cache and a hard timeout, and
/// turns every failure into a `QuoteResult` carrying the error message.
pub struct QuoteAdapter<F> {
    fetcher: F,
    cache: TtlCache<(String, QuoteVariant), QuoteResult>,
    timeout: Duration,
}

impl<F: QuoteFetcher> QuoteAdapter<F> {
    pub fn new(fetcher: F, config: &QuoteAdapterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            fetcher,
            cache: TtlCache::new(config.cache_ttl, clock),
            timeout: config.timeout,
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    // Gets its own timeout; a missing P/E never costs the price.
    async fn lookup_statistics(&self, symbol: &str) -> QuoteStatistics {
        match tokio::time::timeout(self.timeout, self.fetcher.fetch_statistics(symbol)).await {
            Ok(Ok(statistics)) => statistics,
            Ok(Err(e)) => {
                debug!("Extended fields unavailable for {}: {}", symbol, e);
                QuoteStatistics::default()
            }
            Err(_) => {
                warn!("Extended fields for {} timed out after {:?}", symbol, self.timeout);
                QuoteStatistics::default()
            }
        }
    }
}

impl From<ExternalQuote> for QuoteResult {
    fn from(quote: ExternalQuote) -> Self {
        Self {
            price: quote.price,
            error: None,
            pe_ratio: quote.pe_ratio.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            latest_earnings: quote.trailing_eps.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}

#[async_trait]
impl<F: QuoteFetcher> QuoteSource for QuoteAdapter<F> {
    async fn get_quote(&self, symbol: &str, variant: QuoteVariant) -> QuoteResult {
        if symbol.trim().is_empty() {
            return QuoteResult::failed("Symbol is required");
        }

        let key = (symbol.to_string(), variant);
        if let Some(cached) = self.cache.get(&key) {
            debug!("Quote cache hit for {} ({:?})", symbol, variant);
            return cached;
        }

        let price = match tokio::time::timeout(self.timeout, self.fetcher.fetch_price(symbol)).await {
            Ok(Ok(price)) => price,
            Ok(Err(e)) => {
                error!("✗ Quote lookup failed for {}: {}", symbol, e);
                return QuoteResult::failed(e.to_string());
            }
            Err(_) => {
                let e = ProviderError::Timeout(self.timeout);
                warn!("Quote lookup for {} timed out after {:?}", symbol, self.timeout);
                return QuoteResult::failed(e.to_string());
            }
        };

        let statistics = match variant {
            QuoteVariant::PriceOnly => QuoteStatistics::default(),
            QuoteVariant::Extended => self.lookup_statistics(symbol).await,
        };

        let result = QuoteResult::from(ExternalQuote::new(price, statistics));
        self.cache.insert(key, result.clone());
        result
    }
}
