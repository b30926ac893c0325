pub mod builder;
pub mod error;
pub mod manager;
pub mod models;
pub mod orchestrator;
pub mod rating;
pub mod repository;
pub mod webhook;

#[cfg(test)]
mod fakes;

pub use builder::{NewOrderRequest, OrderBuilder};
pub use error::OrderError;
pub use manager::OrderManager;
pub use models::{Order, OrderItem, OrderStatus, Payment};
pub use orchestrator::{
    CardPaymentSession, MockPaymentProcessor, OrderSummary, PaymentOrchestrator, PaymentRecord, ReconcileOutcome,
};
pub use rating::RatingRequest;
pub use repository::{
    OrderPage, OrderQuery, OrderRepository, OrderSort, PageRequest, PaymentRepository, RepoResult, RepositoryError,
};
pub use webhook::{PaymentEvent, WebhookError, WebhookVerifier};
