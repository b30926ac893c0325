use axum::{
    http::Method,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod envelope;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod payments;
pub mod state;
pub mod webhooks;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let protected = Router::new()
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route("/orders/user", get(orders::user_orders))
        .route("/orders/restaurant", get(orders::restaurant_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/status", patch(orders::update_order_status))
        .route("/orders/{id}/rating", post(orders::add_order_rating))
        .route("/payments/create-payment-intent", post(payments::create_payment_intent))
        .route("/payments/cash/{order_id}", patch(payments::pay_with_cash))
        .route("/payments/user", get(payments::user_payments))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let api = Router::new()
        .merge(protected)
        // signed by the processor, no bearer token
        .route("/payments/webhook", post(webhooks::handle_payment_webhook));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "order-service" }))
}
