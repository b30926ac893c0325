use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use savor_core::{Actor, CoreResult, IntentRequest, PaymentIntent, PaymentMethod, PaymentProcessor, PaymentStatus};
use savor_shared::money::to_minor_units;
use savor_shared::Masked;

use crate::error::OrderError;
use crate::models::{Order, OrderStatus, Payment};
use crate::repository::{OrderRepository, PaymentRepository, RepositoryError};
use crate::webhook::PaymentEvent;

/// What the customer needs to finish a card payment client-side.
#[derive(Debug, Clone)]
pub struct CardPaymentSession {
    pub client_secret: Masked<String>,
    pub payment: Payment,
}

/// Result of applying one processor event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    /// The payment already had the event's status
    AlreadyApplied,
    /// The payment settled the other way; the event was dropped
    Stale,
    /// No payment carries the event's intent id
    Unmatched,
    Ignored,
}

/// Order fields shown next to a payment in the payment history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    #[serde(flatten)]
    pub payment: Payment,
    pub order: Option<OrderSummary>,
}

/// Opens payments for orders and folds processor events back into them.
pub struct PaymentOrchestrator {
    processor: Arc<dyn PaymentProcessor>,
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    currency: String,
}

impl PaymentOrchestrator {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            processor,
            orders,
            payments,
            currency: currency.into(),
        }
    }

    /// Open a card payment intent for the full order total.
    pub async fn initiate_card_payment(&self, order_id: Uuid, actor: &Actor) -> Result<CardPaymentSession, OrderError> {
        let mut order = self.payable_order(order_id, actor).await?;

        let mut metadata = BTreeMap::new();
        metadata.insert("orderId".to_string(), order.id.to_string());
        metadata.insert("userId".to_string(), order.user_id.clone());

        let intent = self
            .processor
            .create_intent(IntentRequest {
                amount: to_minor_units(order.total),
                currency: self.currency.to_lowercase(),
                metadata,
            })
            .await?;

        let mut payment = Payment::for_order(&order, PaymentMethod::Card, &self.currency);
        payment.payment_intent_id = Some(intent.id.clone());
        payment
            .metadata
            .insert("clientSecret".to_string(), Value::String(intent.client_secret.expose().clone()));

        self.record_payment(&mut order, &payment).await?;

        info!(
            order_id = %order.id,
            payment_id = %payment.id,
            intent_id = %intent.id,
            amount = payment.amount,
            "Card payment initiated"
        );

        Ok(CardPaymentSession {
            client_secret: intent.client_secret,
            payment,
        })
    }

    /// Record a cash-on-delivery payment. No processor is involved.
    pub async fn initiate_cash_payment(&self, order_id: Uuid, actor: &Actor) -> Result<Payment, OrderError> {
        let mut order = self.payable_order(order_id, actor).await?;

        let payment = Payment::for_order(&order, PaymentMethod::Cash, &self.currency);
        self.record_payment(&mut order, &payment).await?;

        info!(order_id = %order.id, payment_id = %payment.id, "Cash payment recorded");
        Ok(payment)
    }

    /// Apply a verified processor event. Safe to call repeatedly with the
    /// same event.
    pub async fn reconcile(&self, event: &PaymentEvent) -> Result<ReconcileOutcome, OrderError> {
        let (intent_id, target) = match event {
            PaymentEvent::Succeeded { intent_id, .. } => (intent_id, PaymentStatus::Completed),
            PaymentEvent::Failed { intent_id, .. } => (intent_id, PaymentStatus::Failed),
            PaymentEvent::Unhandled { event_type } => {
                info!(event_type = %event_type, "Ignoring unhandled payment event");
                return Ok(ReconcileOutcome::Ignored);
            }
        };

        let Some(mut payment) = self.payments.find_by_intent_id(intent_id).await? else {
            warn!(intent_id = %intent_id, "No payment found for intent");
            return Ok(ReconcileOutcome::Unmatched);
        };

        if payment.status == target {
            self.sync_order(&payment).await?;
            return Ok(ReconcileOutcome::AlreadyApplied);
        }

        if payment.status != PaymentStatus::Pending {
            warn!(
                intent_id = %intent_id,
                payment_id = %payment.id,
                current = payment.status.as_str(),
                incoming = target.as_str(),
                "Dropping event for settled payment"
            );
            return Ok(ReconcileOutcome::Stale);
        }

        match event {
            PaymentEvent::Succeeded {
                receipt_url,
                payment_method,
                ..
            } => {
                payment.receipt_url = receipt_url.clone();
                payment.payment_method_id = payment_method.clone();
            }
            PaymentEvent::Failed { error_message, .. } => {
                payment
                    .metadata
                    .insert("error".to_string(), Value::String(error_message.clone()));
            }
            PaymentEvent::Unhandled { .. } => {}
        }

        payment.update_status(target);
        self.payments.save_payment(&payment).await?;
        self.sync_order(&payment).await?;

        info!(
            intent_id = %intent_id,
            payment_id = %payment.id,
            order_id = %payment.order_id,
            status = target.as_str(),
            "Payment reconciled"
        );

        Ok(ReconcileOutcome::Applied)
    }

    /// The caller's payments, newest first, each with a short order summary.
    pub async fn payment_history(&self, user_id: &str) -> Result<Vec<PaymentRecord>, OrderError> {
        let payments = self.payments.list_for_user(user_id).await?;

        let mut summaries: HashMap<Uuid, Option<OrderSummary>> = HashMap::new();
        let mut records = Vec::with_capacity(payments.len());
        for payment in payments {
            if !summaries.contains_key(&payment.order_id) {
                let summary = self.orders.get_order(payment.order_id).await?.map(|order| OrderSummary {
                    id: order.id,
                    order_status: order.order_status,
                    created_at: order.created_at,
                });
                summaries.insert(payment.order_id, summary);
            }

            let order = summaries.get(&payment.order_id).cloned().flatten();
            records.push(PaymentRecord { payment, order });
        }

        Ok(records)
    }

    /// Loads the order and applies the guards shared by both payment kinds.
    async fn payable_order(&self, order_id: Uuid, actor: &Actor) -> Result<Order, OrderError> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound("Order not found".to_string()))?;

        if !order.is_owned_by(&actor.user_id) {
            return Err(OrderError::NotAuthorized(
                "Not authorized to make payment for this order".to_string(),
            ));
        }

        if let Some(existing) = self.payments.find_active_for_order(order.id).await? {
            warn!(order_id = %order.id, payment_id = %existing.id, "Payment already exists");
            return Err(OrderError::DuplicatePayment(order.id));
        }

        Ok(order)
    }

    async fn record_payment(&self, order: &mut Order, payment: &Payment) -> Result<(), OrderError> {
        self.payments.insert_payment(payment).await.map_err(|err| match err {
            RepositoryError::Conflict(_) => OrderError::DuplicatePayment(order.id),
            other => other.into(),
        })?;

        order.attach_payment(payment);
        if let Err(err) = self.orders.save_order(order).await {
            // The order never points at this payment, so it must not block a retry
            let mut orphan = payment.clone();
            orphan
                .metadata
                .insert("error".to_string(), Value::String(format!("Order update failed: {}", err)));
            orphan.update_status(PaymentStatus::Failed);
            if let Err(release_err) = self.payments.save_payment(&orphan).await {
                warn!(payment_id = %orphan.id, "Failed to release orphaned payment: {}", release_err);
            }
            return Err(err.into());
        }
        Ok(())
    }

    async fn sync_order(&self, payment: &Payment) -> Result<(), OrderError> {
        let Some(mut order) = self.orders.get_order(payment.order_id).await? else {
            warn!(payment_id = %payment.id, order_id = %payment.order_id, "Payment references a missing order");
            return Ok(());
        };

        if order.payment_details.status != payment.status {
            order.set_payment_status(payment.status);
            self.orders.save_order(&order).await?;
        }

        Ok(())
    }
}

/// Processor stand-in for development setups without processor credentials.
pub struct MockPaymentProcessor;

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    async fn create_intent(&self, _request: IntentRequest) -> CoreResult<PaymentIntent> {
        let id = format!("mock_pi_{}", Uuid::new_v4().simple());
        Ok(PaymentIntent {
            client_secret: Masked::new(format!("{}_secret_mock", id)),
            id,
        })
    }
}
