pub mod identity;
pub mod payment;

pub use identity::{Actor, IdentityProvider, Principal, RestaurantDirectory, Role};
pub use payment::{IntentRequest, PaymentIntent, PaymentMethod, PaymentProcessor, PaymentStatus};

/// Errors reported by the external collaborators (auth, restaurant and
/// payment services).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not authorized to access this route: {0}")]
    Unauthenticated(String),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Upstream service failed: {0}")]
    Upstream(String),
    #[error("Invalid collaborator response: {0}")]
    InvalidResponse(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
