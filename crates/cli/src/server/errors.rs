//! API error type mapped to HTTP status codes.
//!
//! Responses carry a JSON body `{"error": "message"}`. Internal failures
//! are reported with a generic message; the detail goes to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use civic_core::AppError;
use serde_json::json;

/// Message returned when every downstream service failed.
pub const UNAVAILABLE_MESSAGE: &str =
    "The answering service is temporarily unavailable. Please try again later.";

#[derive(Debug)]
pub enum ApiError {
    /// Invalid request parameters (400).
    BadRequest(String),
    /// Unexpected server error (500).
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        tracing::error!("Request failed: {}", err);
        match err {
            AppError::AllBranchesFailed(_) => ApiError::Internal(UNAVAILABLE_MESSAGE.to_string()),
            _ => ApiError::Internal("Internal server error".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_failure_is_generic_500() {
        let err: ApiError = AppError::AllBranchesFailed("secret upstream detail".to_string()).into();
        match err {
            ApiError::Internal(msg) => {
                assert_eq!(msg, UNAVAILABLE_MESSAGE);
                assert!(!msg.contains("secret"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        let response = ApiError::Internal("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bad_request_status() {
        let response = ApiError::BadRequest("empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
