//! Error types for erpdash-api

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use erpdash_core::{CoreError, ErrorCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Please confirm: {action}. Repeat the request with confirm=true.")]
    ConfirmationRequired { action: String },

    #[error("{0}")]
    Core(#[from] CoreError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::ConfirmationRequired { .. } => StatusCode::CONFLICT,
            ApiError::Core(error) => core_status(error),
        }
    }

    fn code(&self) -> String {
        match self {
            ApiError::NotFound { .. } => ErrorCode::NotFound.to_string(),
            ApiError::BadRequest { .. } => ErrorCode::InvalidQuery.to_string(),
            ApiError::ConfirmationRequired { .. } => "CONFIRMATION_REQUIRED".to_string(),
            ApiError::Core(error) => error.code().to_string(),
        }
    }
}

/// HTTP status for a core error
pub fn core_status(error: &CoreError) -> StatusCode {
    match error {
        CoreError::Validation { .. } | CoreError::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::Api { status, .. } if (400..500).contains(status) => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        CoreError::Api { .. } | CoreError::Network { .. } | CoreError::Decode { .. } => {
            StatusCode::BAD_GATEWAY
        }
        CoreError::MalformedInput { .. }
        | CoreError::DuplicateId { .. }
        | CoreError::CycleDetected { .. }
        | CoreError::OrphanParent { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{} -> {}", self, status);
        } else {
            log::debug!("{} -> {}", self, status);
        }
        let body = serde_json::json!({
            "success": false,
            "code": self.code(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let validation = ApiError::from(CoreError::Validation { message: "x".to_string() });
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);

        let upstream_client = ApiError::from(CoreError::Api { status: 404, message: "Not found.".to_string() });
        assert_eq!(upstream_client.status(), StatusCode::NOT_FOUND);

        let upstream_server = ApiError::from(CoreError::Api { status: 500, message: "boom".to_string() });
        assert_eq!(upstream_server.status(), StatusCode::BAD_GATEWAY);

        let network = ApiError::from(CoreError::Network { message: "refused".to_string() });
        assert_eq!(network.status(), StatusCode::BAD_GATEWAY);

        assert_eq!(ApiError::from(CoreError::Cancelled).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::ConfirmationRequired { action: "delete journal 3".to_string() }.status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_upstream_message_passes_through() {
        let error = ApiError::from(CoreError::Api { status: 400, message: "Journal is not balanced".to_string() });
        assert_eq!(error.to_string(), "Journal is not balanced");
    }
}
