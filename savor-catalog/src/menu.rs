use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A menu item as the menu service reports it at lookup time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Catalog lookup errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Menu item not found: {0}")]
    NotFound(String),

    #[error("Menu service request failed: {0}")]
    Upstream(String),
}

/// Resolves menu item ids against the menu service.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn menu_item(&self, id: &str) -> Result<MenuItem, CatalogError>;
}
