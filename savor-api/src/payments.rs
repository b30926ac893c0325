use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;

use savor_core::Actor;
use savor_order::{Payment, PaymentRecord};

use crate::envelope::ApiResponse;
use crate::error::AppError;
use crate::middleware::Authenticated;
use crate::orders::parse_order_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub order_id: Option<String>,
}

/// POST /api/v1/payments/create-payment-intent
/// Open a card payment for the caller's order
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    body: Result<Json<CreateIntentRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Payment>>, AppError> {
    let Json(request) = body?;
    let raw_id = request
        .order_id
        .ok_or_else(|| AppError::ValidationError("Please provide order ID".to_string()))?;
    let order_id = parse_order_id(&raw_id)?;

    let actor = Actor::from(auth.principal.clone());
    let session = state.payment_orchestrator.initiate_card_payment(order_id, &actor).await?;

    Ok(Json(
        ApiResponse::ok(session.payment).with_client_secret(session.client_secret.into_inner()),
    ))
}

/// PATCH /api/v1/payments/cash/{orderId}
pub async fn pay_with_cash(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<Payment>>, AppError> {
    let order_id = parse_order_id(&order_id)?;

    let actor = Actor::from(auth.principal.clone());
    let payment = state.payment_orchestrator.initiate_cash_payment(order_id, &actor).await?;

    Ok(Json(ApiResponse::ok(payment)))
}

/// GET /api/v1/payments/user
pub async fn user_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<ApiResponse<Vec<PaymentRecord>>>, AppError> {
    let records = state
        .payment_orchestrator
        .payment_history(&auth.principal.user_id)
        .await?;

    Ok(Json(ApiResponse::list(records)))
}
