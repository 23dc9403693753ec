use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Display sentinel for text-valued metrics the source could not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// Which fields a quote lookup should include. Part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteVariant {
    PriceOnly,
    Extended,
}

/// Outcome of a quote lookup.
///
/// `price = None` with an `error` is a failed lookup. `price = None` without
/// an error means the source answered but had no value for the symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    pub price: Option<BigDecimal>,
    pub error: Option<String>,
    pub pe_ratio: String,
    pub latest_earnings: String,
}

impl QuoteResult {
    pub fn priced(price: Option<BigDecimal>) -> Self {
        Self {
            price,
            error: None,
            pe_ratio: NOT_AVAILABLE.to_string(),
            latest_earnings: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            price: None,
            error: Some(message.into()),
            pe_ratio: NOT_AVAILABLE.to_string(),
            latest_earnings: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Secondary ratios scraped alongside P/E when the page exposes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxiliaryRatios {
    pub market_cap: Option<String>,
    pub book_value: Option<String>,
    pub dividend_yield: Option<String>,
    pub roe: Option<String>,
    pub roce: Option<String>,
    pub face_value: Option<String>,
}

impl AuxiliaryRatios {
    /// Keeps existing values, takes the other side's only where this one is empty.
    pub fn fill_missing_from(&mut self, other: AuxiliaryRatios) {
        if self.market_cap.is_none() {
            self.market_cap = other.market_cap;
        }
        if self.book_value.is_none() {
            self.book_value = other.book_value;
        }
        if self.dividend_yield.is_none() {
            self.dividend_yield = other.dividend_yield;
        }
        if self.roe.is_none() {
            self.roe = other.roe;
        }
        if self.roce.is_none() {
            self.roce = other.roce;
        }
        if self.face_value.is_none() {
            self.face_value = other.face_value;
        }
    }
}

/// Outcome of a fundamentals lookup for a numeric exchange code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundamentalsResult {
    pub price: Option<BigDecimal>,
    pub pe_ratio: String,
    pub latest_earnings: String,
    pub error: Option<String>,
    pub ratios: AuxiliaryRatios,
}

impl FundamentalsResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            price: None,
            pe_ratio: NOT_AVAILABLE.to_string(),
            latest_earnings: NOT_AVAILABLE.to_string(),
            error: Some(message.into()),
            ratios: AuxiliaryRatios::default(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}
