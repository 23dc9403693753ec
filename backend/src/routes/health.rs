use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tracing::debug;

use crate::services::concurrency_limiter::LimiterStatus;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub limiters: [LimiterStatus; 2],
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    debug!("GET /health - Health check");
    Json(HealthReport {
        status: "OK",
        limiters: state.enricher.limiter_status(),
    })
}
