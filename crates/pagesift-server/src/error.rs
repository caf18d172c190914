use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use pagesift_core::error::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.0 {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::ExternalApi { .. } => (StatusCode::BAD_GATEWAY, "external_api_error"),
            AppError::Network(_) => (StatusCode::BAD_GATEWAY, "network_error"),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Service { .. } | AppError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "service_error")
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.0.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                AppError::external_api("openai", "down"),
                StatusCode::BAD_GATEWAY,
            ),
            (AppError::Timeout(15000), StatusCode::GATEWAY_TIMEOUT),
            (AppError::service("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
