use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{PortfolioSnapshot, SummaryScope};
use crate::services::portfolio_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_portfolio))
}

#[derive(Debug, Default, Deserialize)]
pub struct PortfolioQuery {
    pub scope: Option<String>,
}

pub async fn get_portfolio(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
) -> Result<Json<PortfolioSnapshot>, AppError> {
    let scope = match query.scope.as_deref() {
        Some(raw) => raw.parse::<SummaryScope>().map_err(AppError::Validation)?,
        None => SummaryScope::default(),
    };

    info!("GET /api/portfolio - Building snapshot (scope {:?})", scope);
    let snapshot = portfolio_service::build_snapshot(
        state.loader.clone(),
        state.enricher.as_ref(),
        scope,
    )
    .await
    .map_err(|e| {
        error!("💥 Error building portfolio snapshot: {}", e);
        e
    })?;
    Ok(Json(snapshot))
}
