pub mod app_config;
pub mod database;
pub mod http_clients;
pub mod memory;
pub mod order_repo;
pub mod payment_repo;
pub mod stripe;

pub use app_config::Config;
pub use database::DbClient;
pub use http_clients::{AuthServiceIdentity, HttpCatalogClient, HttpRestaurantDirectory};
pub use memory::{InMemoryOrderRepository, InMemoryPaymentRepository, StaticCatalog, StaticRestaurantDirectory};
pub use order_repo::StoreOrderRepository;
pub use payment_repo::StorePaymentRepository;
pub use stripe::StripeProcessor;
