use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// API error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Requested resource does not exist.
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
