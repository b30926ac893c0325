//! Payment processor webhooks: signature verification and event decoding.
//!
//! Signatures follow the `Stripe-Signature` scheme: the header carries
//! `t=<unix seconds>` and one or more `v1=<hex>` entries, each an
//! HMAC-SHA256 of `"{t}.{raw body}"` keyed by the endpoint secret.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECONDS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingHeader,

    #[error("Malformed signature header")]
    MalformedHeader,

    #[error("Timestamp outside the tolerance zone")]
    TimestampOutsideTolerance,

    #[error("No signatures found matching the expected signature for payload")]
    SignatureMismatch,

    #[error("Invalid webhook secret")]
    InvalidKey,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

/// Checks webhook signatures against the endpoint secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_seconds: i64,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_seconds,
        }
    }

    /// Verify `payload` against the raw signature header.
    pub fn verify(&self, payload: &[u8], header: Option<&str>, now: DateTime<Utc>) -> Result<(), WebhookError> {
        let header = header.ok_or(WebhookError::MissingHeader)?;

        let mut timestamp: Option<&str> = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
        let issued_at: i64 = timestamp.parse().map_err(|_| WebhookError::MalformedHeader)?;
        if signatures.is_empty() {
            return Err(WebhookError::MalformedHeader);
        }

        if now.timestamp().abs_diff(issued_at) > self.tolerance_seconds.unsigned_abs() {
            return Err(WebhookError::TimestampOutsideTolerance);
        }

        for signature in signatures {
            let Ok(expected) = hex::decode(signature) else {
                continue;
            };
            let mac = self.mac(timestamp, payload)?;
            if mac.verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }

        Err(WebhookError::SignatureMismatch)
    }

    /// Produce a header value for `payload`, as the processor would send it.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, WebhookError> {
        let mac = self.mac(&timestamp.to_string(), payload)?;
        Ok(format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes())))
    }

    fn mac(&self, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| WebhookError::InvalidKey)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

/// The payment events the service reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    Succeeded {
        intent_id: String,
        receipt_url: Option<String>,
        payment_method: Option<String>,
    },
    Failed {
        intent_id: String,
        error_message: String,
    },
    /// Any other event type; acknowledged and dropped.
    Unhandled { event_type: String },
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: Value,
}

impl PaymentEvent {
    /// Decode a processor event body.
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent =
            serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
        let object = &raw.data.object;

        let intent_id = || {
            object
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| WebhookError::InvalidPayload("payment intent id missing".to_string()))
        };

        match raw.event_type.as_str() {
            "payment_intent.succeeded" => Ok(PaymentEvent::Succeeded {
                intent_id: intent_id()?,
                receipt_url: object
                    .pointer("/charges/data/0/receipt_url")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                payment_method: object.get("payment_method").and_then(|pm| match pm {
                    Value::String(id) => Some(id.clone()),
                    other => other.get("id").and_then(Value::as_str).map(str::to_string),
                }),
            }),
            "payment_intent.payment_failed" => Ok(PaymentEvent::Failed {
                intent_id: intent_id()?,
                error_message: object
                    .pointer("/last_payment_error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("Payment failed")
                    .to_string(),
            }),
            _ => Ok(PaymentEvent::Unhandled {
                event_type: raw.event_type,
            }),
        }
    }

    pub fn intent_id(&self) -> Option<&str> {
        match self {
            PaymentEvent::Succeeded { intent_id, .. } | PaymentEvent::Failed { intent_id, .. } => Some(intent_id),
            PaymentEvent::Unhandled { .. } => None,
        }
    }
}
