//! Shared API types
//!
//! Error responses and validation limits used across all endpoints.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use validator::ValidationError;

use crate::core::constants::MAX_MIN_WIDTH_PERCENT;
use crate::domain::IngestError;

/// Maximum ID length (call_id, provider and model names)
pub const MAX_ID_LENGTH: usize = 256;

/// Upper bound for the `window_secs` override (one hour)
pub const MAX_WINDOW_SECS: f64 = 3600.0;

/// Validator function for the turn matching window override
pub fn validate_window_secs(value: f64) -> Result<(), ValidationError> {
    if !(value > 0.0 && value <= MAX_WINDOW_SECS) {
        return Err(ValidationError::new("window_secs_range").with_message(
            format!("window_secs must be in (0, {}]", MAX_WINDOW_SECS).into(),
        ));
    }
    Ok(())
}

/// Validator function for the waterfall minimum bar width override
pub fn validate_min_width_percent(value: f64) -> Result<(), ValidationError> {
    if !(value > 0.0 && value <= MAX_MIN_WIDTH_PERCENT) {
        return Err(ValidationError::new("min_width_percent_range").with_message(
            format!("min_width_percent must be in (0, {}]", MAX_MIN_WIDTH_PERCENT).into(),
        ));
    }
    Ok(())
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn from_data(e: crate::data::DataError) -> Self {
        tracing::error!(error = %e, "Data error");
        Self::internal("Database operation failed")
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        tracing::debug!(error = %e, code = e.code(), "Rejected call payload");
        Self::bad_request(e.code(), e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = ApiError::not_found("CALL_NOT_FOUND", "Call not found: c1").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["code"], "CALL_NOT_FOUND");
        assert_eq!(body["message"], "Call not found: c1");
    }

    #[tokio::test]
    async fn test_ingest_error_maps_to_bad_request() {
        let response = ApiError::from(IngestError::MissingField("call_id")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "MISSING_FIELD");

        let response =
            ApiError::from(IngestError::InvalidJson("eof".to_string())).into_response();
        let body = body_json(response).await;
        assert_eq!(body["code"], "INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn test_internal_hides_details() {
        let response = ApiError::internal("Database operation failed").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["code"], "INTERNAL");
    }

    #[test]
    fn test_validate_window_secs() {
        assert!(validate_window_secs(30.0).is_ok());
        assert!(validate_window_secs(MAX_WINDOW_SECS).is_ok());
        assert!(validate_window_secs(0.0).is_err());
        assert!(validate_window_secs(-1.0).is_err());
        assert!(validate_window_secs(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_min_width_percent() {
        assert!(validate_min_width_percent(0.5).is_ok());
        assert!(validate_min_width_percent(5.0).is_ok());
        assert!(validate_min_width_percent(5.01).is_err());
        assert!(validate_min_width_percent(0.0).is_err());
    }
}
