use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use futures::future::join_all;
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::external::market_source::{FundamentalsSource, QuoteSource};
use crate::models::{
    EnrichedHolding, Exchange, FundamentalsResult, Holding, QuoteResult, QuoteVariant,
    NOT_AVAILABLE,
};
use crate::services::concurrency_limiter::{ConcurrencyLimiter, LimiterStatus};
use crate::services::symbol_classifier::{self, Classification};

/// Live values resolved for one holding, whichever source supplied them.
#[derive(Debug, Clone, PartialEq)]
struct LiveData {
    price: Option<BigDecimal>,
    error: Option<String>,
    pe_ratio: String,
    latest_earnings: String,
}

impl LiveData {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            price: None,
            error: Some(message.into()),
            pe_ratio: NOT_AVAILABLE.to_string(),
            latest_earnings: NOT_AVAILABLE.to_string(),
        }
    }
}

impl From<QuoteResult> for LiveData {
    fn from(r: QuoteResult) -> Self {
        Self { price: r.price, error: r.error, pe_ratio: r.pe_ratio, latest_earnings: r.latest_earnings }
    }
}

impl From<FundamentalsResult> for LiveData {
    fn from(r: FundamentalsResult) -> Self {
        Self { price: r.price, error: r.error, pe_ratio: r.pe_ratio, latest_earnings: r.latest_earnings }
    }
}

/// Fans holdings out to the authoritative source for their exchange.
///
/// Each source sits behind its own `ConcurrencyLimiter`, so portfolio size
/// never changes how hard a single upstream is hit. A lookup that fails, or
/// even panics, only marks that holding unsupported.
pub struct EnrichmentService {
    quotes: Arc<dyn QuoteSource>,
    fundamentals: Arc<dyn FundamentalsSource>,
    quote_limiter: ConcurrencyLimiter,
    fundamentals_limiter: ConcurrencyLimiter,
}

impl EnrichmentService {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        fundamentals: Arc<dyn FundamentalsSource>,
        quote_concurrency: usize,
        fundamentals_concurrency: usize,
    ) -> Self {
        Self {
            quotes,
            fundamentals,
            quote_limiter: ConcurrencyLimiter::new("quotes", quote_concurrency),
            fundamentals_limiter: ConcurrencyLimiter::new("fundamentals", fundamentals_concurrency),
        }
    }

    pub fn quote_source(&self) -> &dyn QuoteSource {
        self.quotes.as_ref()
    }

    pub fn fundamentals_source(&self) -> &dyn FundamentalsSource {
        self.fundamentals.as_ref()
    }

    pub fn limiter_status(&self) -> [LimiterStatus; 2] {
        [self.quote_limiter.status(), self.fundamentals_limiter.status()]
    }

    /// Enrich every holding that has a name and symbol.
    ///
    /// Output order follows input order. `portfolio_percent` is relative to the
    /// investment of the whole input, including rows that are dropped here.
    pub async fn enrich(&self, holdings: &[Holding]) -> Vec<EnrichedHolding> {
        let total = total_investment(holdings);

        let tasks = holdings
            .iter()
            .filter(|h| h.is_enrichable())
            .map(|h| self.enrich_one(h, &total));

        let enriched = join_all(tasks).await;

        let unsupported = enriched.iter().filter(|h| !h.supported).count();
        info!(
            "Enriched {} of {} holdings ({} unsupported)",
            enriched.len(),
            holdings.len(),
            unsupported
        );
        enriched
    }

    async fn enrich_one(&self, holding: &Holding, total_investment: &BigDecimal) -> EnrichedHolding {
        let classification = symbol_classifier::classify(&holding.raw_symbol);

        let live = match classification.exchange {
            Exchange::Nse => self.lookup_quote(&classification.lookup_symbol).await,
            Exchange::Bse => self.lookup_fundamentals(&classification.lookup_symbol).await,
        };

        build_enriched(holding, classification, live, total_investment)
    }

    async fn lookup_quote(&self, symbol: &str) -> LiveData {
        let _guard = match self.quote_limiter.acquire().await {
            Ok(guard) => guard,
            Err(e) => return LiveData::failed(format!("{} limiter closed: {}", self.quote_limiter.name(), e)),
        };

        let call = self.quotes.get_quote(symbol, QuoteVariant::Extended);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result.into(),
            Err(panic) => {
                let message = panic_message(panic);
                error!("Quote source panicked for {}: {}", symbol, message);
                LiveData::failed(message)
            }
        }
    }

    async fn lookup_fundamentals(&self, code: &str) -> LiveData {
        let _guard = match self.fundamentals_limiter.acquire().await {
            Ok(guard) => guard,
            Err(e) => {
                return LiveData::failed(format!("{} limiter closed: {}", self.fundamentals_limiter.name(), e))
            }
        };

        let call = self.fundamentals.get_fundamentals(code);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result.into(),
            Err(panic) => {
                let message = panic_message(panic);
                error!("Fundamentals source panicked for {}: {}", code, message);
                LiveData::failed(message)
            }
        }
    }
}

/// Sum of `quantity * purchase_price` across all holdings, live data or not.
pub fn total_investment(holdings: &[Holding]) -> BigDecimal {
    holdings
        .iter()
        .fold(BigDecimal::zero(), |acc, h| acc + h.investment())
}

/// Share of the total, rounded to two decimals; `"0"` for an empty portfolio.
pub fn portfolio_percent(investment: &BigDecimal, total_investment: &BigDecimal) -> String {
    if total_investment.is_zero() {
        return "0".to_string();
    }
    let hundred = BigDecimal::from(100);
    let percent = (investment * &hundred) / total_investment;
    percent.round(2).with_scale(2).to_string()
}

fn build_enriched(
    holding: &Holding,
    classification: Classification,
    live: LiveData,
    total_investment: &BigDecimal,
) -> EnrichedHolding {
    let investment = holding.investment();
    let present_value = live.price.as_ref().map(|price| price * &holding.quantity);
    let gain_loss = present_value.as_ref().map(|value| value - &investment);

    let supported = live.price.is_some();
    let unsupported_reason = if supported {
        String::new()
    } else {
        warn!(
            "{} ({}) unsupported: {}",
            holding.name,
            classification.resolved_symbol,
            live.error.as_deref().unwrap_or("source returned no price")
        );
        classification.exchange.unsupported_reason().to_string()
    };

    EnrichedHolding {
        holding: holding.clone(),
        resolved_symbol: classification.resolved_symbol,
        market: classification.exchange,
        portfolio_percent: portfolio_percent(&investment, total_investment),
        investment,
        price: live.price,
        price_error: live.error,
        present_value,
        gain_loss,
        pe_ratio: live.pe_ratio,
        latest_earnings: live.latest_earnings,
        supported,
        unsupported_reason,
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("lookup panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("lookup panicked: {}", s)
    } else {
        "lookup panicked".to_string()
    }
}
