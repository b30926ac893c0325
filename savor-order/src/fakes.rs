//! Deterministic collaborators for unit tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use savor_catalog::{CatalogClient, CatalogError, MenuItem};
use savor_core::{CoreError, CoreResult, IntentRequest, PaymentIntent, PaymentMethod, PaymentProcessor, PaymentStatus};
use savor_shared::Masked;

use crate::models::{DeliveryAddress, Order, OrderItem, OrderStatus, Payment, PaymentDetails};
use crate::repository::{OrderPage, OrderQuery, OrderRepository, PaymentRepository, RepoResult, RepositoryError};

/// A pending order for 2 x 500 + 1 x 1200, priced with the default policy.
pub fn sample_order(user_id: &str, restaurant_id: &str) -> Order {
    let now = Utc::now();
    Order {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        restaurant_id: restaurant_id.to_string(),
        items: vec![
            OrderItem {
                menu_item_id: "kottu".into(),
                name: "Chicken Kottu".into(),
                price: 500.0,
                quantity: 2,
                special_instructions: None,
            },
            OrderItem {
                menu_item_id: "biryani".into(),
                name: "Lamb Biryani".into(),
                price: 1200.0,
                quantity: 1,
                special_instructions: Some("extra raita".into()),
            },
        ],
        payment_details: PaymentDetails {
            method: PaymentMethod::Cash,
            payment_id: None,
            status: PaymentStatus::Pending,
        },
        order_status: OrderStatus::Pending,
        delivery_address: DeliveryAddress {
            street: "12 Galle Road".into(),
            city: "Colombo".into(),
            state: "Western".into(),
            zip_code: "00300".into(),
            country: "Sri Lanka".into(),
            coordinates: None,
        },
        delivery_instructions: String::new(),
        contact_phone: Masked::new("0771234567".into()),
        subtotal: 2200.0,
        delivery_fee: 100.0,
        tax: 110.0,
        total: 2410.0,
        estimated_delivery_time: None,
        actual_delivery_time: None,
        delivery_person: None,
        ratings: None,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    items: Mutex<HashMap<String, MenuItem>>,
    outages: Vec<String>,
    lookups: Mutex<HashMap<String, usize>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(self, id: &str, name: &str, price: f64, is_available: bool) -> Self {
        self.items.lock().unwrap().insert(
            id.to_string(),
            MenuItem {
                id: id.to_string(),
                name: name.to_string(),
                price,
                is_available,
            },
        );
        self
    }

    /// Lookups of `id` fail as if the menu service were down.
    pub fn with_outage(mut self, id: &str) -> Self {
        self.outages.push(id.to_string());
        self
    }

    pub fn set_price(&self, id: &str, price: f64) {
        if let Some(item) = self.items.lock().unwrap().get_mut(id) {
            item.price = price;
        }
    }

    pub fn lookups(&self, id: &str) -> usize {
        self.lookups.lock().unwrap().get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn menu_item(&self, id: &str) -> Result<MenuItem, CatalogError> {
        *self.lookups.lock().unwrap().entry(id.to_string()).or_default() += 1;

        if self.outages.iter().any(|o| o == id) {
            return Err(CatalogError::Upstream("connection refused".into()));
        }

        self.items
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }
}

#[derive(Default)]
pub struct MemoryOrders {
    orders: Mutex<HashMap<Uuid, Order>>,
    fail_saves: AtomicBool,
}

impl MemoryOrders {
    /// Every `save_order` fails until `restore_saves`.
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    pub fn restore_saves(&self) {
        self.fail_saves.store(false, Ordering::SeqCst);
    }

    pub fn put(&self, order: Order) {
        self.orders.lock().unwrap().insert(order.id, order);
    }

    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.orders.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.orders.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrders {
    async fn insert_order(&self, order: &Order) -> RepoResult<()> {
        self.put(order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        Ok(self.get(id))
    }

    async fn save_order(&self, order: &Order) -> RepoResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend("connection reset".into()));
        }
        self.put(order.clone());
        Ok(())
    }

    async fn list_orders(&self, query: &OrderQuery) -> RepoResult<OrderPage> {
        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|o| query.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| query.sort.compare(a, b));

        Ok(OrderPage {
            total: orders.len() as u64,
            orders,
        })
    }
}

#[derive(Default)]
pub struct MemoryPayments {
    payments: Mutex<Vec<Payment>>,
}

impl MemoryPayments {
    pub fn len(&self) -> usize {
        self.payments.lock().unwrap().len()
    }

    pub fn by_intent(&self, intent_id: &str) -> Option<Payment> {
        self.payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.payment_intent_id.as_deref() == Some(intent_id))
            .cloned()
    }
}

#[async_trait]
impl PaymentRepository for MemoryPayments {
    async fn insert_payment(&self, payment: &Payment) -> RepoResult<()> {
        let mut payments = self.payments.lock().unwrap();
        if payments
            .iter()
            .any(|p| p.order_id == payment.order_id && p.status.is_active())
        {
            return Err(RepositoryError::Conflict(payment.order_id.to_string()));
        }
        payments.push(payment.clone());
        Ok(())
    }

    async fn save_payment(&self, payment: &Payment) -> RepoResult<()> {
        let mut payments = self.payments.lock().unwrap();
        match payments.iter_mut().find(|p| p.id == payment.id) {
            Some(existing) => *existing = payment.clone(),
            None => payments.push(payment.clone()),
        }
        Ok(())
    }

    async fn find_active_for_order(&self, order_id: Uuid) -> RepoResult<Option<Payment>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.order_id == order_id && p.status.is_active())
            .cloned())
    }

    async fn find_by_intent_id(&self, intent_id: &str) -> RepoResult<Option<Payment>> {
        Ok(self.by_intent(intent_id))
    }

    async fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}

/// Processor that records every request and issues `pi_test_<n>` intents.
#[derive(Default)]
pub struct RecordingProcessor {
    requests: Mutex<Vec<IntentRequest>>,
    fail_next: AtomicBool,
    issued: AtomicUsize,
}

impl RecordingProcessor {
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<IntentRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentProcessor for RecordingProcessor {
    async fn create_intent(&self, request: IntentRequest) -> CoreResult<PaymentIntent> {
        self.requests.lock().unwrap().push(request);

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CoreError::Upstream("card processor unavailable".into()));
        }

        let id = format!("pi_test_{}", self.issued.fetch_add(1, Ordering::SeqCst));
        Ok(PaymentIntent {
            client_secret: Masked::new(format!("{}_secret", id)),
            id,
        })
    }
}
