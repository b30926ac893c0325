//! Process-local stores for development runs and tests. State is lost on
//! restart.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use savor_catalog::{CatalogClient, CatalogError, MenuItem};
use savor_core::{CoreResult, Principal, RestaurantDirectory};
use savor_order::{
    Order, OrderPage, OrderQuery, OrderRepository, Payment, PaymentRepository, RepoResult, RepositoryError,
};

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert_order(&self, order: &Order) -> RepoResult<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(RepositoryError::Conflict(format!("order {} exists", order.id)));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn save_order(&self, order: &Order) -> RepoResult<()> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn list_orders(&self, query: &OrderQuery) -> RepoResult<OrderPage> {
        let mut matches: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|order| query.matches(order))
            .cloned()
            .collect();
        matches.sort_by(|a, b| query.sort.compare(a, b));

        let total = matches.len() as u64;
        let orders = match query.page {
            Some(page) => matches
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.limit as usize)
                .collect(),
            None => matches,
        };

        Ok(OrderPage { orders, total })
    }
}

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: RwLock<Vec<Payment>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert_payment(&self, payment: &Payment) -> RepoResult<()> {
        // check and insert under one write lock
        let mut payments = self.payments.write().await;
        if payment.status.is_active()
            && payments
                .iter()
                .any(|p| p.order_id == payment.order_id && p.status.is_active())
        {
            return Err(RepositoryError::Conflict(format!(
                "order {} already has an active payment",
                payment.order_id
            )));
        }
        payments.push(payment.clone());
        Ok(())
    }

    async fn save_payment(&self, payment: &Payment) -> RepoResult<()> {
        let mut payments = self.payments.write().await;
        match payments.iter_mut().find(|p| p.id == payment.id) {
            Some(existing) => *existing = payment.clone(),
            None => payments.push(payment.clone()),
        }
        Ok(())
    }

    async fn find_active_for_order(&self, order_id: Uuid) -> RepoResult<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .find(|p| p.order_id == order_id && p.status.is_active())
            .cloned())
    }

    async fn find_by_intent_id(&self, intent_id: &str) -> RepoResult<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .find(|p| p.payment_intent_id.as_deref() == Some(intent_id))
            .cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}

/// Fixed menu, for running without a menu service.
#[derive(Default)]
pub struct StaticCatalog {
    items: HashMap<String, MenuItem>,
}

impl StaticCatalog {
    pub fn new(items: impl IntoIterator<Item = MenuItem>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id.clone(), item)).collect(),
        }
    }
}

#[async_trait]
impl CatalogClient for StaticCatalog {
    async fn menu_item(&self, id: &str) -> Result<MenuItem, CatalogError> {
        self.items
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }
}

/// Fixed user id to restaurant id mapping.
#[derive(Default)]
pub struct StaticRestaurantDirectory {
    owners: HashMap<String, String>,
}

impl StaticRestaurantDirectory {
    pub fn new<I, U, R>(owners: I) -> Self
    where
        I: IntoIterator<Item = (U, R)>,
        U: Into<String>,
        R: Into<String>,
    {
        Self {
            owners: owners.into_iter().map(|(u, r)| (u.into(), r.into())).collect(),
        }
    }
}

#[async_trait]
impl RestaurantDirectory for StaticRestaurantDirectory {
    async fn restaurant_for(&self, principal: &Principal, _token: &str) -> CoreResult<Option<String>> {
        Ok(self.owners.get(&principal.user_id).cloned())
    }
}
