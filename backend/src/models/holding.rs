use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_SECTOR: &str = "Unknown";

// A single row of the user's portfolio sheet after normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub name: String,
    pub raw_symbol: String,
    pub purchase_price: BigDecimal,
    pub quantity: BigDecimal,
    pub sector: String,
}

impl Holding {
    pub fn new(
        name: impl Into<String>,
        raw_symbol: impl Into<String>,
        purchase_price: BigDecimal,
        quantity: BigDecimal,
        sector: impl Into<String>,
    ) -> Self {
        let sector = sector.into();
        Self {
            name: name.into(),
            raw_symbol: raw_symbol.into(),
            purchase_price,
            quantity,
            sector: if sector.trim().is_empty() { UNKNOWN_SECTOR.to_string() } else { sector },
        }
    }

    /// Cost basis of the position; never depends on live data.
    pub fn investment(&self) -> BigDecimal {
        &self.quantity * &self.purchase_price
    }

    /// Rows without a name or symbol never reach the enrichment pipeline.
    pub fn is_enrichable(&self) -> bool {
        !self.name.trim().is_empty() && !self.raw_symbol.trim().is_empty()
    }
}

/// Exchange a holding trades on, derived from the shape of its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// Alphabetic tickers, priced through the quote source.
    #[serde(rename = "NSE")]
    Nse,
    /// Numeric scrip codes, priced through the fundamentals source.
    #[serde(rename = "BSE")]
    Bse,
}

impl Exchange {
    pub fn suffix(&self) -> &'static str {
        match self {
            Exchange::Nse => ".NS",
            Exchange::Bse => ".BO",
        }
    }

    pub fn unsupported_reason(&self) -> &'static str {
        match self {
            Exchange::Nse => "Unsupported symbol: Not available on Yahoo Finance.",
            Exchange::Bse => "Unsupported symbol: BSE code not found on Screener.",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exchange::Nse => write!(f, "NSE"),
            Exchange::Bse => write!(f, "BSE"),
        }
    }
}

// A holding joined with whatever live data could be resolved for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedHolding {
    #[serde(flatten)]
    pub holding: Holding,
    pub resolved_symbol: String,
    pub market: Exchange,
    pub investment: BigDecimal,
    pub price: Option<BigDecimal>,
    pub price_error: Option<String>,
    pub present_value: Option<BigDecimal>,
    pub gain_loss: Option<BigDecimal>,
    pub pe_ratio: String,
    pub latest_earnings: String,
    pub portfolio_percent: String,
    pub supported: bool,
    pub unsupported_reason: String,
}
