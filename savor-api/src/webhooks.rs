use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use savor_order::PaymentEvent;

use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/v1/payments/webhook
/// Receive payment status updates from the card processor. The raw body is
/// needed to check the signature, so no JSON extractor here.
pub async fn handle_payment_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok());

    if let Err(err) = state.webhook_verifier.verify(&body, signature, Utc::now()) {
        tracing::warn!("Webhook signature verification failed: {}", err);
        return (StatusCode::BAD_REQUEST, format!("Webhook Error: {}", err)).into_response();
    }

    let event = match PaymentEvent::parse(&body) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!("Undecodable webhook payload: {}", err);
            return (StatusCode::BAD_REQUEST, format!("Webhook Error: {}", err)).into_response();
        }
    };

    // Acknowledged whatever the outcome once the signature checks out
    match state.payment_orchestrator.reconcile(&event).await {
        Ok(outcome) => {
            tracing::info!(intent_id = ?event.intent_id(), ?outcome, "Processed payment webhook");
        }
        Err(err) => {
            tracing::error!(intent_id = ?event.intent_id(), "Webhook reconciliation failed: {}", err);
        }
    }

    Json(json!({ "received": true })).into_response()
}
