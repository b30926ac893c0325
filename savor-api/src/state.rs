use std::sync::Arc;

use savor_core::{IdentityProvider, RestaurantDirectory};
use savor_order::{OrderBuilder, OrderManager, PaymentOrchestrator, WebhookVerifier};

#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub restaurants: Arc<dyn RestaurantDirectory>,
    pub order_builder: Arc<OrderBuilder>,
    pub order_manager: Arc<OrderManager>,
    pub payment_orchestrator: Arc<PaymentOrchestrator>,
    pub webhook_verifier: Arc<WebhookVerifier>,
}
