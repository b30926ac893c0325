use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use savor_core::{PaymentMethod, PaymentStatus};
use savor_shared::Masked;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// Created, waiting for the restaurant
    Pending,
    Confirmed,
    Preparing,
    /// Ready for pickup by the delivery person
    Ready,
    InTransit,
    Delivered,
    Cancelled,
    /// Refused by the restaurant
    Rejected,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::InTransit => "in-transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
        }
    }

    /// Statuses reachable from `self` without administrative privilege.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Rejected, Cancelled],
            Confirmed => &[Preparing, Cancelled],
            Preparing => &[Ready, Cancelled],
            Ready => &[InTransit, Cancelled],
            InTransit => &[Delivered, Cancelled],
            Delivered | Cancelled | Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status '{}'", s))
    }
}

/// Snapshot of a menu item taken when the order was placed. Later catalog
/// changes never touch it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub menu_item_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

/// Payment sub-record embedded in the order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    /// Id of the local `Payment` record backing this order
    #[serde(default)]
    pub payment_id: Option<Uuid>,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// Post-delivery feedback, written once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub food: Option<u8>,
    pub delivery: Option<u8>,
    #[serde(default)]
    pub review: String,
    pub created_at: DateTime<Utc>,
}

/// A customer's food order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: String,
    pub restaurant_id: String,
    pub items: Vec<OrderItem>,
    pub payment_details: PaymentDetails,
    pub order_status: OrderStatus,
    pub delivery_address: DeliveryAddress,
    #[serde(default)]
    pub delivery_instructions: String,
    pub contact_phone: Masked<String>,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub tax: f64,
    pub total: f64,
    #[serde(default)]
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_delivery_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_person: Option<String>,
    #[serde(default)]
    pub ratings: Option<Rating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Update order status, stamping the delivery time on `Delivered`.
    pub fn update_status(&mut self, new_status: OrderStatus) {
        let now = Utc::now();
        self.order_status = new_status;
        if new_status == OrderStatus::Delivered {
            self.actual_delivery_time = Some(now);
        }
        self.updated_at = now;
    }

    /// Point the payment sub-record at a newly created payment.
    pub fn attach_payment(&mut self, payment: &Payment) {
        self.payment_details.payment_id = Some(payment.id);
        self.payment_details.method = payment.method;
        self.updated_at = Utc::now();
    }

    pub fn set_payment_status(&mut self, status: PaymentStatus) {
        self.payment_details.status = status;
        self.updated_at = Utc::now();
    }
}

/// One attempt at paying for an order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: String,
    pub amount: f64,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub refund_id: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// New pending payment for the full order total.
    pub fn for_order(order: &Order, method: PaymentMethod, currency: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id: order.id,
            user_id: order.user_id.clone(),
            amount: order.total,
            currency: currency.to_string(),
            method,
            status: PaymentStatus::Pending,
            payment_intent_id: None,
            payment_method_id: None,
            receipt_url: None,
            refund_id: None,
            metadata: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_status(&mut self, status: PaymentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
