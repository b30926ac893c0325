use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use savor_shared::Masked;

use crate::CoreResult;

/// Settlement state of a payment (and of an order's payment sub-record).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Pending and completed payments block a new attempt for the same order.
    pub fn is_active(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    #[default]
    Cash,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Wallet => "wallet",
        }
    }
}

/// Request to open a payment intent with the processor.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    /// Amount in minor units (cents)
    pub amount: i64,
    /// ISO currency code, lowercase as the processor expects
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

/// The processor's handle for an in-progress charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Masked<String>,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a payment intent with the provider
    async fn create_intent(&self, request: IntentRequest) -> CoreResult<PaymentIntent>;
}
