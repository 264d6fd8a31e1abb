use crate::error::StorefrontError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

impl ResponseError for StorefrontError {
    fn status_code(&self) -> StatusCode {
        match self {
            StorefrontError::Validation(_) => StatusCode::BAD_REQUEST,
            StorefrontError::NotFound(_) => StatusCode::NOT_FOUND,
            StorefrontError::Unauthenticated => StatusCode::UNAUTHORIZED,
            StorefrontError::Unauthorized(_) => StatusCode::FORBIDDEN,
            StorefrontError::Conflict(_) => StatusCode::CONFLICT,
            StorefrontError::TransientIo(_) => StatusCode::SERVICE_UNAVAILABLE,
            StorefrontError::Encode(_)
            | StorefrontError::Decode(_)
            | StorefrontError::Credential(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(application_error = %self, "Responding with error");
        } else {
            tracing::debug!(application_error = %self, %status, "Request rejected");
        }

        // internal details stay in the log
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "An internal error occurred".to_string(),
            _ => self.to_string(),
        };
        HttpResponse::build(status).json(json!({
            "success": false,
            "error": message,
            "retryable": self.is_retryable(),
        }))
    }
}
