use savor_core::CoreError;

use crate::models::OrderStatus;
use crate::repository::RepositoryError;

/// Failures of the order and payment workflow. Every variant is reported to
/// the caller; none is retried.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotAuthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Cannot transition from {from} to {to}")]
    IllegalTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Payment already exists for this order")]
    DuplicatePayment(uuid::Uuid),

    #[error("Menu item {0} is not available")]
    ItemUnavailable(String),

    #[error("Invalid menu item ID: {0}")]
    InvalidItem(String),

    #[error("Upstream service failed: {0}")]
    Upstream(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<RepositoryError> for OrderError {
    fn from(err: RepositoryError) -> Self {
        OrderError::Storage(err.to_string())
    }
}

impl From<CoreError> for OrderError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unauthenticated(msg) => OrderError::Unauthenticated(msg),
            CoreError::NotFound(msg) => OrderError::NotFound(msg),
            CoreError::Upstream(msg) | CoreError::InvalidResponse(msg) => OrderError::Upstream(msg),
        }
    }
}
