use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use folio_pulse_backend::app;
use folio_pulse_backend::config::AppConfig;
use folio_pulse_backend::external::screener::ScreenerClient;
use folio_pulse_backend::external::yahoofinance::YahooFinanceClient;
use folio_pulse_backend::logging::{init_logging, LoggingConfig};
use folio_pulse_backend::services::enrichment_service::EnrichmentService;
use folio_pulse_backend::services::fundamentals_service::FundamentalsAdapter;
use folio_pulse_backend::services::holdings_loader::SpreadsheetHoldingsLoader;
use folio_pulse_backend::services::quote_service::QuoteAdapter;
use folio_pulse_backend::services::ttl_cache::{Clock, SystemClock};
use folio_pulse_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    let logging = LoggingConfig::from_env()?;
    init_logging(&logging)?;

    let config = AppConfig::from_env().context("invalid configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let yahoo = YahooFinanceClient::new(config.quote.timeout)?;
    let screener = ScreenerClient::new(config.fundamentals.timeout)?;

    let quotes = QuoteAdapter::new(yahoo, &config.quote, clock.clone());
    let fundamentals = FundamentalsAdapter::new(screener, &config.fundamentals, clock);

    let enricher = EnrichmentService::new(
        Arc::new(quotes),
        Arc::new(fundamentals),
        config.quote_concurrency,
        config.fundamentals_concurrency,
    );

    tracing::info!(
        path = %config.portfolio_path.display(),
        quote_concurrency = config.quote_concurrency,
        fundamentals_concurrency = config.fundamentals_concurrency,
        "📁 Serving holdings from spreadsheet"
    );

    let state = AppState {
        loader: Arc::new(SpreadsheetHoldingsLoader::new(config.portfolio_path.clone())),
        enricher: Arc::new(enricher),
    };
    let app = app::create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("🚀 Folio Pulse backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
