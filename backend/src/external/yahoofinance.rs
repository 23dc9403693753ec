use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::external::market_source::{ProviderError, QuoteFetcher, QuoteStatistics};

/// Yahoo Finance client. No API key required; NSE tickers use the `.NS`
/// suffix and BSE codes `.BO`.
pub struct YahooFinanceClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new(request_timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_base_url("https://query1.finance.yahoo.com", request_timeout)
    }

    pub fn with_base_url(base_url: &str, request_timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; FolioPulse/0.1)")
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn chart_price(&self, symbol: &str) -> Result<Option<BigDecimal>, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        match resp.status() {
            s if s == reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            s if s == reqwest::StatusCode::NOT_FOUND => {
                return Err(ProviderError::NotFound(symbol.to_string()))
            }
            s if !s.is_success() => return Err(ProviderError::BadResponse(format!("HTTP {}", s))),
            _ => {}
        }

        let body: YahooChartResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(error) = body.chart.error {
            if error.description.contains("No data found") {
                return Err(ProviderError::NotFound(symbol.to_string()));
            }
            return Err(ProviderError::BadResponse(error.description));
        }

        let meta = body
            .chart
            .result
            .and_then(|mut r| r.pop())
            .map(|r| r.meta)
            .ok_or_else(|| ProviderError::BadResponse("missing result".into()))?;

        meta.regular_market_price.map(decimal_from_f64).transpose()
    }

    // quoteSummary is stricter about cookies than the chart endpoint, so
    // callers treat a failure here as "no extended fields".
    async fn quote_summary(&self, symbol: &str) -> Result<QuoteStatistics, ProviderError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .query(&[("modules", "summaryDetail,defaultKeyStatistics")])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(ProviderError::BadResponse(format!("HTTP {}", resp.status())));
        }

        let body: QuoteSummaryResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let summary = body
            .quote_summary
            .result
            .and_then(|mut r| r.pop())
            .ok_or_else(|| ProviderError::BadResponse("missing quoteSummary result".into()))?;

        let pe_ratio = summary
            .summary_detail
            .and_then(|d| d.trailing_pe)
            .and_then(|v| v.fmt);
        let trailing_eps = summary
            .default_key_statistics
            .and_then(|d| d.trailing_eps)
            .and_then(|v| v.fmt);

        Ok(QuoteStatistics { pe_ratio, trailing_eps })
    }
}

fn decimal_from_f64(value: f64) -> Result<BigDecimal, ProviderError> {
    BigDecimal::from_str(&value.to_string()).map_err(|e| ProviderError::Parse(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    meta: YahooChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Deserialize)]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<FormattedValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    trailing_eps: Option<FormattedValue>,
}

#[derive(Debug, Deserialize)]
struct FormattedValue {
    fmt: Option<String>,
}

#[async_trait]
impl QuoteFetcher for YahooFinanceClient {
    async fn fetch_price(&self, symbol: &str) -> Result<Option<BigDecimal>, ProviderError> {
        self.chart_price(symbol).await
    }

    async fn fetch_statistics(&self, symbol: &str) -> Result<QuoteStatistics, ProviderError> {
        self.quote_summary(symbol).await
    }
}
