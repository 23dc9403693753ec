mod holding;
mod market_data;
mod sector;

pub use holding::{EnrichedHolding, Exchange, Holding, UNKNOWN_SECTOR};
pub use market_data::{
    AuxiliaryRatios, FundamentalsResult, QuoteResult, QuoteVariant, NOT_AVAILABLE,
};
pub use sector::{PortfolioSnapshot, SectorSummary, SummaryScope};
