use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::errors::AppError;
use crate::external::market_source::{FundamentalsSource, QuoteSource};
use crate::models::{Exchange, FundamentalsResult, QuoteResult, QuoteVariant};
use crate::services::symbol_classifier;
use crate::state::AppState;

/// Direct access to each source, bypassing the portfolio. Useful for
/// checking whether a symbol resolves at all.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quote/:symbol", get(get_quote))
        .route("/fundamentals/:code", get(get_fundamentals))
}

pub async fn get_quote(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
) -> Json<QuoteResult> {
    info!("GET /api/test/quote/{} - Direct quote lookup", symbol);
    let lookup = symbol_classifier::classify(&symbol);
    // Numeric codes are still sent to the quote source here, as NNNNNN.BO
    let result = state
        .enricher
        .quote_source()
        .get_quote(&lookup.resolved_symbol, QuoteVariant::PriceOnly)
        .await;
    Json(result)
}

pub async fn get_fundamentals(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<FundamentalsResult>, AppError> {
    info!("GET /api/test/fundamentals/{} - Direct fundamentals lookup", code);
    let lookup = symbol_classifier::classify(&code);
    if lookup.exchange != Exchange::Bse {
        return Err(AppError::Validation(format!(
            "{} is not a numeric exchange code",
            code
        )));
    }
    let result = state
        .enricher
        .fundamentals_source()
        .get_fundamentals(&lookup.lookup_symbol)
        .await;
    Ok(Json(result))
}
