//! In-process scenario tests for the payment endpoints and the processor
//! webhook.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};

use common::*;
use savor_order::WebhookVerifier;

fn webhook_request(payload: &Value, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/payments/webhook")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("stripe-signature", sig);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

fn sign(payload: &Value) -> String {
    WebhookVerifier::new(WEBHOOK_SECRET, 300)
        .sign(payload.to_string().as_bytes(), chrono::Utc::now().timestamp())
        .unwrap()
}

fn intent_event(event_type: &str, intent_id: &str) -> Value {
    json!({
        "id": "evt_1",
        "type": event_type,
        "data": { "object": {
            "id": intent_id,
            "payment_method": "pm_card_visa",
            "charges": { "data": [ { "receipt_url": "https://pay.example/receipts/1" } ] },
            "last_payment_error": { "message": "Your card was declined." }
        }}
    })
}

async fn open_intent(router: &axum::Router, order_id: &str, user_id: &str) -> (StatusCode, Value) {
    call_json(
        router,
        request(
            "POST",
            "/api/v1/payments/create-payment-intent",
            Some(&token(user_id, "user")),
            Some(json!({ "orderId": order_id })),
        ),
    )
    .await
}

async fn order_json(router: &axum::Router, order_id: &str, user_id: &str) -> Value {
    let (status, json) = call_json(
        router,
        request(
            "GET",
            &format!("/api/v1/orders/{}", order_id),
            Some(&token(user_id, "user")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["data"].clone()
}

#[tokio::test]
async fn card_intent_is_opened_once() {
    let router = make_router();
    let order_id = place_order(&router, "user-1").await;

    let (status, json) = open_intent(&router, &order_id, "user-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json["clientSecret"].as_str().unwrap().ends_with("_secret_mock"));
    let payment = &json["data"];
    assert_eq!(payment["status"], "pending");
    assert_eq!(payment["method"], "card");
    assert_eq!(payment["amount"], 2410.0);
    assert_eq!(payment["currency"], "LKR");
    assert!(payment["paymentIntentId"].as_str().unwrap().starts_with("mock_pi_"));

    let order = order_json(&router, &order_id, "user-1").await;
    assert_eq!(order["paymentDetails"]["paymentId"], payment["id"]);
    assert_eq!(order["paymentDetails"]["method"], "card");

    let (status, json) = open_intent(&router, &order_id, "user-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Payment already exists for this order");

    let (status, _) = call_json(
        &router,
        request(
            "PATCH",
            &format!("/api/v1/payments/cash/{}", order_id),
            Some(&token("user-1", "user")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_the_customer_can_pay() {
    let router = make_router();
    let order_id = place_order(&router, "user-1").await;

    let (status, _) = open_intent(&router, &order_id, "user-2").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = call_json(
        &router,
        request(
            "POST",
            "/api/v1/payments/create-payment-intent",
            Some(&token("user-1", "user")),
            Some(json!({})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Please provide order ID");

    let (status, _) = open_intent(&router, "8b0f3c1e-3f61-4a8e-8d6e-5a3c2b1f0e9d", "user-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhook_rejects_bad_signatures_without_side_effects() {
    let router = make_router();
    let order_id = place_order(&router, "user-1").await;
    let (_, json) = open_intent(&router, &order_id, "user-1").await;
    let intent_id = json["data"]["paymentIntentId"].as_str().unwrap().to_string();

    let event = intent_event("payment_intent.succeeded", &intent_id);

    let (status, body) = call(&router, webhook_request(&event, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).starts_with("Webhook Error"));

    let forged = WebhookVerifier::new("whsec_attacker", 300)
        .sign(event.to_string().as_bytes(), chrono::Utc::now().timestamp())
        .unwrap();
    let (status, _) = call(&router, webhook_request(&event, Some(forged))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let order = order_json(&router, &order_id, "user-1").await;
    assert_eq!(order["paymentDetails"]["status"], "pending");
}

#[tokio::test]
async fn successful_payment_is_reconciled_idempotently() {
    let router = make_router();
    let order_id = place_order(&router, "user-1").await;
    let (_, json) = open_intent(&router, &order_id, "user-1").await;
    let intent_id = json["data"]["paymentIntentId"].as_str().unwrap().to_string();

    let succeeded = intent_event("payment_intent.succeeded", &intent_id);
    for _ in 0..2 {
        let (status, json) = call_json(&router, webhook_request(&succeeded, Some(sign(&succeeded)))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "received": true }));

        let order = order_json(&router, &order_id, "user-1").await;
        assert_eq!(order["paymentDetails"]["status"], "completed");
    }

    let failed = intent_event("payment_intent.payment_failed", &intent_id);
    let (status, _) = call_json(&router, webhook_request(&failed, Some(sign(&failed)))).await;
    assert_eq!(status, StatusCode::OK);
    let order = order_json(&router, &order_id, "user-1").await;
    assert_eq!(order["paymentDetails"]["status"], "completed");

    let (status, json) = call_json(
        &router,
        request("GET", "/api/v1/payments/user", Some(&token("user-1", "user")), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    let payment = &json["data"][0];
    assert_eq!(payment["status"], "completed");
    assert_eq!(payment["receiptUrl"], "https://pay.example/receipts/1");
    assert_eq!(payment["paymentMethodId"], "pm_card_visa");
    assert_eq!(payment["order"]["id"], order_id.as_str());
    assert_eq!(payment["order"]["orderStatus"], "pending");
}

#[tokio::test]
async fn failed_payment_frees_the_order_for_cash() {
    let router = make_router();
    let order_id = place_order(&router, "user-1").await;
    let (_, json) = open_intent(&router, &order_id, "user-1").await;
    let intent_id = json["data"]["paymentIntentId"].as_str().unwrap().to_string();

    let failed = intent_event("payment_intent.payment_failed", &intent_id);
    let (status, _) = call_json(&router, webhook_request(&failed, Some(sign(&failed)))).await;
    assert_eq!(status, StatusCode::OK);

    let order = order_json(&router, &order_id, "user-1").await;
    assert_eq!(order["paymentDetails"]["status"], "failed");

    let (status, json) = call_json(
        &router,
        request(
            "PATCH",
            &format!("/api/v1/payments/cash/{}", order_id),
            Some(&token("user-1", "user")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["method"], "cash");
    assert_eq!(json["data"]["status"], "pending");

    let order = order_json(&router, &order_id, "user-1").await;
    assert_eq!(order["paymentDetails"]["method"], "cash");
    assert_eq!(order["paymentDetails"]["paymentId"], json["data"]["id"]);
}

#[tokio::test]
async fn unknown_intents_and_events_are_acknowledged() {
    let router = make_router();

    let unknown = intent_event("payment_intent.succeeded", "pi_never_issued");
    let (status, json) = call_json(&router, webhook_request(&unknown, Some(sign(&unknown)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);

    let other = json!({ "type": "customer.created", "data": { "object": { "id": "cus_1" } } });
    let (status, _) = call_json(&router, webhook_request(&other, Some(sign(&other)))).await;
    assert_eq!(status, StatusCode::OK);
}
