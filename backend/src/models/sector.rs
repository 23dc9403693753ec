use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::EnrichedHolding;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorSummary {
    pub sector: String,
    pub total_investment: BigDecimal,
    pub total_present_value: BigDecimal,
    pub total_gain_loss: BigDecimal,
    pub holdings: Vec<EnrichedHolding>,
}

/// Which enriched holdings feed the sector totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryScope {
    #[default]
    Supported,
    All,
}

impl std::str::FromStr for SummaryScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "supported" => Ok(SummaryScope::Supported),
            "all" => Ok(SummaryScope::All),
            other => Err(format!("unknown scope '{}', expected 'supported' or 'all'", other)),
        }
    }
}

// Body of GET /api/portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub data: Vec<EnrichedHolding>,
    pub sector_summaries: Vec<SectorSummary>,
}
