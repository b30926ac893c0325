use async_trait::async_trait;
use std::cmp::Ordering;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{Order, OrderStatus, Payment};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A uniqueness rule of the store rejected the write
    #[error("Conflicting record: {0}")]
    Conflict(String),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        RepositoryError::Backend(err.to_string())
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Field an order listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSortKey {
    CreatedAt,
    Total,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSort {
    pub key: OrderSortKey,
    pub descending: bool,
}

impl Default for OrderSort {
    /// Newest first
    fn default() -> Self {
        Self {
            key: OrderSortKey::CreatedAt,
            descending: true,
        }
    }
}

impl OrderSort {
    pub fn compare(&self, a: &Order, b: &Order) -> Ordering {
        let ordering = match self.key {
            OrderSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            OrderSortKey::Total => a.total.total_cmp(&b.total),
            OrderSortKey::Status => a.order_status.as_str().cmp(b.order_status.as_str()),
        };

        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl FromStr for OrderSort {
    type Err = String;

    /// Parses `createdAt`, `-total`, ... (a leading `-` means descending).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, field) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let key = match field {
            "createdAt" => OrderSortKey::CreatedAt,
            "total" => OrderSortKey::Total,
            "orderStatus" | "status" => OrderSortKey::Status,
            other => return Err(format!("cannot sort orders by '{}'", other)),
        };

        Ok(Self { key, descending })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// Filter, sort and page selection for order listings.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub user_id: Option<String>,
    pub restaurant_id: Option<String>,
    pub sort: OrderSort,
    /// `None` returns every match
    pub page: Option<PageRequest>,
}

impl OrderQuery {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn for_restaurant(restaurant_id: impl Into<String>) -> Self {
        Self {
            restaurant_id: Some(restaurant_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |s| order.order_status == s)
            && self.user_id.as_deref().map_or(true, |u| order.user_id == u)
            && self.restaurant_id.as_deref().map_or(true, |r| order.restaurant_id == r)
    }
}

/// One page of an order listing plus the number of matches overall.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
}

/// Repository trait for order documents
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert_order(&self, order: &Order) -> RepoResult<()>;

    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>>;

    /// Overwrites the stored document (last writer wins).
    async fn save_order(&self, order: &Order) -> RepoResult<()>;

    async fn list_orders(&self, query: &OrderQuery) -> RepoResult<OrderPage>;
}

/// Repository trait for payment records
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Fails with `RepositoryError::Conflict` when the order already has a
    /// pending or completed payment and the store can tell.
    async fn insert_payment(&self, payment: &Payment) -> RepoResult<()>;

    async fn save_payment(&self, payment: &Payment) -> RepoResult<()>;

    async fn find_active_for_order(&self, order_id: Uuid) -> RepoResult<Option<Payment>>;

    async fn find_by_intent_id(&self, intent_id: &str) -> RepoResult<Option<Payment>>;

    /// Newest first
    async fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<Payment>>;
}
