pub mod concurrency_limiter;
pub mod enrichment_service;
pub mod fundamentals_extraction;
pub mod fundamentals_service;
pub mod holdings_loader;
pub mod portfolio_service;
pub mod quote_service;
pub mod sector_aggregator;
pub mod symbol_classifier;
pub mod ttl_cache;
