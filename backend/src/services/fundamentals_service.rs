use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::FundamentalsAdapterConfig;
use crate::external::market_source::{FundamentalsSource, PageFetcher, ProviderError};
use crate::models::{FundamentalsResult, NOT_AVAILABLE};
use crate::services::fundamentals_extraction::{self, Extraction};
use crate::services::ttl_cache::{Clock, TtlCache};

/// Scraped fundamentals for numeric exchange codes.
///
/// Every cache miss pays a fixed cold-call delay before the first request,
/// then transient failures are retried with a linear backoff. Results are
/// cached for much longer than quotes since they rarely change.
pub struct FundamentalsAdapter<F> {
    fetcher: F,
    cache: TtlCache<String, FundamentalsResult>,
    timeout: Duration,
    cold_call_delay: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl<F: PageFetcher> FundamentalsAdapter<F> {
    pub fn new(fetcher: F, config: &FundamentalsAdapterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            fetcher,
            cache: TtlCache::new(config.cache_ttl, clock),
            timeout: config.timeout,
            cold_call_delay: config.cold_call_delay,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        }
    }

    async fn fetch_page(&self, code: &str) -> Result<String, ProviderError> {
        let mut attempt = 0;

        loop {
            let outcome =
                tokio::time::timeout(self.timeout, self.fetcher.fetch_company_page(code)).await;

            match outcome {
                Ok(Ok(page)) => return Ok(page),
                Ok(Err(e)) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.retry_backoff * attempt;
                    warn!(
                        "Fundamentals fetch for {} failed ({}), retrying in {:?} (attempt {}/{})",
                        code, e, delay, attempt, self.max_retries
                    );
                    sleep(delay).await;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(ProviderError::Timeout(self.timeout)),
            }
        }
    }
}

impl From<Extraction> for FundamentalsResult {
    fn from(extraction: Extraction) -> Self {
        Self {
            price: extraction.price,
            pe_ratio: extraction.pe_ratio.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            latest_earnings: extraction
                .latest_earnings
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            error: None,
            ratios: extraction.ratios,
        }
    }
}

#[async_trait]
impl<F: PageFetcher> FundamentalsSource for FundamentalsAdapter<F> {
    async fn get_fundamentals(&self, code: &str) -> FundamentalsResult {
        let code = code.trim();
        if code.is_empty() {
            return FundamentalsResult::failed("Code is required");
        }

        if let Some(cached) = self.cache.get(&code.to_string()) {
            debug!("Fundamentals cache hit for {}", code);
            return cached;
        }

        if !self.cold_call_delay.is_zero() {
            debug!("Waiting {:?} before cold fundamentals call for {}", self.cold_call_delay, code);
            sleep(self.cold_call_delay).await;
        }

        let page = match self.fetch_page(code).await {
            Ok(page) => page,
            Err(e) => {
                error!("✗ Fundamentals fetch failed for {}: {}", code, e);
                return FundamentalsResult::failed(e.to_string());
            }
        };

        match fundamentals_extraction::extract(&page) {
            Ok(extraction) => {
                let result = FundamentalsResult::from(extraction);
                info!(
                    "✓ Fundamentals for {}: price={:?} P/E={} earnings={}",
                    code, result.price, result.pe_ratio, result.latest_earnings
                );
                // Valueless pages are not cached
                if result.price.is_some() {
                    self.cache.insert(code.to_string(), result.clone());
                }
                result
            }
            Err(e) => {
                warn!("No fundamentals extracted for {}: {}", code, e);
                FundamentalsResult::failed(format!("no fundamentals found: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ttl_cache::ManualClock;
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    const PAGE: &str = r#"
        <ul id="top-ratios">
          <li><span class="name">Current Price</span><span class="value">₹ <span class="number">245.6</span></span></li>
          <li><span class="name">Stock P/E</span><span class="value"><span class="number">12.3</span></span></li>
        </ul>
        <section id="profit-loss"><table>
          <tr><td>EPS in Rs</td><td>18.1</td><td>19.9</td></tr>
        </table></section>
    "#;

    struct ScriptedFetcher {
        calls: AtomicUsize,
        responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_company_page(&self, code: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::NotFound(code.to_string())))
        }
    }

    fn quick_config() -> FundamentalsAdapterConfig {
        FundamentalsAdapterConfig {
            cache_ttl: Duration::from_secs(600),
            timeout: Duration::from_secs(5),
            cold_call_delay: Duration::ZERO,
            max_retries: 1,
            retry_backoff: Duration::ZERO,
        }
    }

    fn adapter_with(
        responses: Vec<Result<String, ProviderError>>,
        config: FundamentalsAdapterConfig,
    ) -> (FundamentalsAdapter<ScriptedFetcher>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let adapter = FundamentalsAdapter::new(ScriptedFetcher::new(responses), &config, clock.clone());
        (adapter, clock)
    }

    #[tokio::test]
    async fn test_extracts_price_and_ratios() {
        let (adapter, _) = adapter_with(vec![Ok(PAGE.to_string())], quick_config());

        let result = adapter.get_fundamentals("532174").await;

        assert_eq!(result.error, None);
        assert_eq!(result.price, Some(BigDecimal::from_str("245.6").unwrap()));
        assert_eq!(result.pe_ratio, "12.3");
        assert_eq!(result.latest_earnings, "19.9");
    }

    #[tokio::test]
    async fn test_cached_until_ttl_expires() {
        let (adapter, clock) = adapter_with(
            vec![Ok(PAGE.to_string()), Ok(PAGE.to_string())],
            quick_config(),
        );

        adapter.get_fundamentals("532174").await;
        clock.advance(Duration::from_secs(599));
        adapter.get_fundamentals("532174").await;
        assert_eq!(adapter.fetcher.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(2));
        adapter.get_fundamentals("532174").await;
        assert_eq!(adapter.fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cold_delay_only_on_cache_miss() {
        let config = FundamentalsAdapterConfig {
            cold_call_delay: Duration::from_millis(120),
            ..quick_config()
        };
        let (adapter, _) = adapter_with(vec![Ok(PAGE.to_string())], config);

        let start = Instant::now();
        adapter.get_fundamentals("500325").await;
        assert!(start.elapsed() >= Duration::from_millis(120), "cold call should wait");

        let start = Instant::now();
        adapter.get_fundamentals("500325").await;
        assert!(start.elapsed() < Duration::from_millis(100), "cached call should not wait");
    }

    #[tokio::test]
    async fn test_transient_error_is_retried() {
        let (adapter, _) = adapter_with(
            vec![Err(ProviderError::RateLimited), Ok(PAGE.to_string())],
            quick_config(),
        );

        let result = adapter.get_fundamentals("532174").await;

        assert_eq!(result.error, None);
        assert_eq!(adapter.fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried_or_cached() {
        let (adapter, _) = adapter_with(
            vec![Err(ProviderError::NotFound("999999".into()))],
            quick_config(),
        );

        let result = adapter.get_fundamentals("999999").await;

        assert!(result.is_failure());
        assert_eq!(result.price, None);
        assert_eq!(result.pe_ratio, NOT_AVAILABLE);
        assert_eq!(adapter.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.cache.len(), 0);
    }

    #[tokio::test]
    async fn test_unrecognised_page_is_an_error_result() {
        let (adapter, _) = adapter_with(
            vec![Ok("<html><body><p>Too many requests</p></body></html>".to_string())],
            quick_config(),
        );

        let result = adapter.get_fundamentals("532174").await;

        assert!(result.error.unwrap().starts_with("no fundamentals found"));
    }

    #[tokio::test]
    async fn test_page_without_price_is_valueless_not_failed() {
        let page = r#"<ul id="top-ratios"><li><span class="name">Stock P/E</span><span class="value">--</span></li></ul>"#;
        let (adapter, _) = adapter_with(
            vec![Ok(page.to_string()), Ok(PAGE.to_string())],
            quick_config(),
        );

        let result = adapter.get_fundamentals("532174").await;

        assert_eq!(result.price, None);
        assert_eq!(result.error, None);
        assert_eq!(adapter.cache.len(), 0);

        let retried = adapter.get_fundamentals("532174").await;
        assert_eq!(retried.price, Some(BigDecimal::from_str("245.6").unwrap()));
        assert_eq!(adapter.fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cold_delay_is_not_repeated_on_retry() {
        let config = FundamentalsAdapterConfig {
            cold_call_delay: Duration::from_millis(120),
            retry_backoff: Duration::ZERO,
            ..quick_config()
        };
        let (adapter, _) = adapter_with(
            vec![Err(ProviderError::RateLimited), Ok(PAGE.to_string())],
            config,
        );

        let start = Instant::now();
        let result = adapter.get_fundamentals("500325").await;
        let elapsed = start.elapsed();

        assert_eq!(result.error, None);
        assert_eq!(adapter.fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(elapsed >= Duration::from_millis(120), "cold call should wait once");
        assert!(elapsed < Duration::from_millis(240), "retry should not wait again: {:?}", elapsed);
    }
}
