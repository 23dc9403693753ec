use std::sync::Arc;

use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{PortfolioSnapshot, SummaryScope};
use crate::services::enrichment_service::EnrichmentService;
use crate::services::holdings_loader::HoldingsLoader;
use crate::services::sector_aggregator;

/// One request's worth of work: load, enrich, roll up by sector.
///
/// Only a loader failure aborts; lookup failures come back as unsupported
/// holdings inside the snapshot.
pub async fn build_snapshot(
    loader: Arc<dyn HoldingsLoader>,
    enricher: &EnrichmentService,
    scope: SummaryScope,
) -> Result<PortfolioSnapshot, AppError> {
    // Spreadsheet parsing is blocking file I/O
    let holdings = tokio::task::spawn_blocking(move || loader.load_holdings())
        .await
        .map_err(|e| {
            error!("Holdings loader task failed: {}", e);
            AppError::Internal(e.to_string())
        })?
        .map_err(|e| {
            error!("Failed to load holdings: {}", e);
            AppError::Loader(e)
        })?;
    info!("Loaded {} holdings", holdings.len());

    let data = enricher.enrich(&holdings).await;

    let sector_summaries = match scope {
        SummaryScope::All => sector_aggregator::summarize(&data),
        SummaryScope::Supported => {
            let supported: Vec<_> = data.iter().filter(|h| h.supported).cloned().collect();
            sector_aggregator::summarize(&supported)
        }
    };

    Ok(PortfolioSnapshot { data, sector_summaries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::market_source::{FundamentalsSource, QuoteSource};
    use crate::models::{FundamentalsResult, Holding, QuoteResult, QuoteVariant};
    use crate::services::holdings_loader::LoaderError;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    struct FixedLoader(Vec<Holding>);

    impl HoldingsLoader for FixedLoader {
        fn load_holdings(&self) -> Result<Vec<Holding>, LoaderError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenLoader;

    impl HoldingsLoader for BrokenLoader {
        fn load_holdings(&self) -> Result<Vec<Holding>, LoaderError> {
            Err(LoaderError::UnsupportedFormat("portfolio.txt".into()))
        }
    }

    struct OnlyTcs;

    #[async_trait]
    impl QuoteSource for OnlyTcs {
        async fn get_quote(&self, symbol: &str, _variant: QuoteVariant) -> QuoteResult {
            if symbol == "TCS.NS" {
                QuoteResult::priced(Some(BigDecimal::from(3500)))
            } else {
                QuoteResult::failed("unknown")
            }
        }
    }

    struct NoFundamentals;

    #[async_trait]
    impl FundamentalsSource for NoFundamentals {
        async fn get_fundamentals(&self, _code: &str) -> FundamentalsResult {
            FundamentalsResult::failed("not found")
        }
    }

    fn enricher() -> EnrichmentService {
        EnrichmentService::new(Arc::new(OnlyTcs), Arc::new(NoFundamentals), 2, 2)
    }

    fn holding(symbol: &str, qty: i32, cost: i32, sector: &str) -> Holding {
        Holding::new(symbol, symbol, BigDecimal::from(cost), BigDecimal::from(qty), sector)
    }

    #[tokio::test]
    async fn test_empty_portfolio() {
        let snapshot = build_snapshot(Arc::new(FixedLoader(vec![])), &enricher(), SummaryScope::Supported)
            .await
            .unwrap();

        assert!(snapshot.data.is_empty());
        assert!(snapshot.sector_summaries.is_empty());
    }

    #[tokio::test]
    async fn test_supported_scope_excludes_unsupported_from_totals() {
        let loader = FixedLoader(vec![
            holding("TCS", 1, 3000, "Tech"),
            holding("532174", 5, 100, "Tech"),
            holding("MISSING", 2, 50, "Energy"),
        ]);

        let snapshot = build_snapshot(Arc::new(loader), &enricher(), SummaryScope::Supported)
            .await
            .unwrap();

        assert_eq!(snapshot.data.len(), 3);
        assert_eq!(snapshot.sector_summaries.len(), 1);
        let tech = &snapshot.sector_summaries[0];
        assert_eq!(tech.total_investment, BigDecimal::from(3000));
        assert_eq!(tech.total_gain_loss, BigDecimal::from_str("500").unwrap());
    }

    #[tokio::test]
    async fn test_all_scope_includes_every_holding() {
        let loader = FixedLoader(vec![
            holding("TCS", 1, 3000, "Tech"),
            holding("532174", 5, 100, "Tech"),
        ]);

        let snapshot = build_snapshot(Arc::new(loader), &enricher(), SummaryScope::All)
            .await
            .unwrap();

        let tech = &snapshot.sector_summaries[0];
        assert_eq!(tech.total_investment, BigDecimal::from(3500));
        assert_eq!(tech.total_present_value, BigDecimal::from(3500));
        assert_eq!(tech.holdings.len(), 2);
    }

    #[tokio::test]
    async fn test_loader_failure_is_structural() {
        let err = build_snapshot(Arc::new(BrokenLoader), &enricher(), SummaryScope::Supported)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Loader(_)));
    }
}
