pub mod market_source;
pub mod screener;
pub mod yahoofinance;
