pub mod menu;
pub mod pricing;

pub use menu::{CatalogClient, CatalogError, MenuItem};
pub use pricing::{OrderTotals, PricingEngine, PricingPolicy};
