use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::services::holdings_loader::LoaderError;

/// Message returned for any structural failure; details stay in the logs.
pub const GENERIC_FAILURE: &str = "Something went wrong while fetching portfolio data.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Holdings loader error: {0}")]
    Loader(#[from] LoaderError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::Loader(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": GENERIC_FAILURE })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_errors_do_not_leak_detail() {
        let err = AppError::Loader(LoaderError::Spreadsheet("secret path /home/me/portfolio.xlsx".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_is_bad_request() {
        let response = AppError::Validation("bad scope".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
