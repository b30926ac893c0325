//! Shared harness for the in-process route scenarios.
//!
//! The router is built over in-memory stores, a fixed menu and the mock
//! payment processor, and driven with `tower::ServiceExt::oneshot`; no
//! sockets and no external services.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot

use savor_api::{app, middleware::JwtIdentity, AppState};
use savor_catalog::{MenuItem, PricingEngine, PricingPolicy};
use savor_order::{MockPaymentProcessor, OrderBuilder, OrderManager, PaymentOrchestrator, WebhookVerifier};
use savor_store::{InMemoryOrderRepository, InMemoryPaymentRepository, StaticCatalog, StaticRestaurantDirectory};

pub const JWT_SECRET: &str = "scenario-jwt-secret";
pub const WEBHOOK_SECRET: &str = "whsec_scenario";

pub fn menu_item(id: &str, name: &str, price: f64, is_available: bool) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        name: name.to_string(),
        price,
        is_available,
    }
}

pub fn make_router() -> axum::Router {
    let orders = Arc::new(InMemoryOrderRepository::new());
    let payments = Arc::new(InMemoryPaymentRepository::new());
    let catalog = Arc::new(StaticCatalog::new([
        menu_item("kottu", "Chicken Kottu", 500.0, true),
        menu_item("biryani", "Lamb Biryani", 1200.0, true),
        menu_item("lamprais", "Lamprais", 950.0, false),
    ]));

    let state = AppState {
        identity: Arc::new(JwtIdentity::new(JWT_SECRET)),
        restaurants: Arc::new(StaticRestaurantDirectory::new([("owner-1", "rest-1"), ("owner-2", "rest-2")])),
        order_builder: Arc::new(OrderBuilder::new(
            catalog,
            orders.clone(),
            PricingEngine::new(PricingPolicy::default()),
        )),
        order_manager: Arc::new(OrderManager::new(orders.clone())),
        payment_orchestrator: Arc::new(PaymentOrchestrator::new(
            Arc::new(MockPaymentProcessor),
            orders,
            payments,
            "LKR",
        )),
        webhook_verifier: Arc::new(WebhookVerifier::new(WEBHOOK_SECRET, 300)),
    };

    app(state)
}

/// Bearer token as the auth service would issue it.
pub fn token(user_id: &str, role: &str) -> String {
    let claims = json!({
        "id": user_id,
        "role": role,
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).expect("token encoding")
}

pub fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Drive the router with a single request and return (status, body_bytes).
pub async fn call(router: &axum::Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = router.clone().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

pub async fn call_json(router: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = call(router, req).await;
    let json = serde_json::from_slice(&body).expect("body is not valid JSON");
    (status, json)
}

pub fn order_body(items: Value) -> Value {
    json!({
        "restaurantId": "rest-1",
        "items": items,
        "deliveryAddress": {
            "street": "12 Galle Road",
            "city": "Colombo",
            "state": "Western",
            "zipCode": "00300"
        },
        "contactPhone": "0771234567"
    })
}

/// Place the standard 2 x kottu + 1 x biryani order as `user_id`; returns its id.
pub async fn place_order(router: &axum::Router, user_id: &str) -> String {
    let body = order_body(json!([
        { "menuItemId": "kottu", "quantity": 2 },
        { "menuItemId": "biryani", "quantity": 1 }
    ]));
    let (status, json) = call_json(
        router,
        request("POST", "/api/v1/orders", Some(&token(user_id, "user")), Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "order creation failed: {}", json);
    json["data"]["id"].as_str().expect("order id").to_string()
}

pub async fn set_status(router: &axum::Router, order_id: &str, bearer: &str, status: &str) -> (StatusCode, Value) {
    call_json(
        router,
        request(
            "PATCH",
            &format!("/api/v1/orders/{}/status", order_id),
            Some(bearer),
            Some(json!({ "orderStatus": status })),
        ),
    )
    .await
}
