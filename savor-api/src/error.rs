use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use savor_core::CoreError;
use savor_order::OrderError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Order(err.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Order(err) => match err {
                OrderError::Validation(_)
                | OrderError::IllegalTransition { .. }
                | OrderError::DuplicatePayment(_)
                | OrderError::ItemUnavailable(_)
                | OrderError::InvalidItem(_) => StatusCode::BAD_REQUEST,
                OrderError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                OrderError::NotAuthorized(_) => StatusCode::FORBIDDEN,
                OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderError::Upstream(_) | OrderError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationError(_) => StatusCode::FORBIDDEN,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFoundError(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = if status.is_server_error() {
            tracing::error!("Internal Server Error: {}", self);
            "Server Error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
