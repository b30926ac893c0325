use async_trait::async_trait;
use serde::Deserialize;

use savor_core::{CoreError, CoreResult, IntentRequest, PaymentIntent, PaymentProcessor};
use savor_shared::Masked;

/// Card processor backed by the Stripe `payment_intents` API.
///
/// The secret key is passed in by the caller; do not log it.
#[derive(Clone)]
pub struct StripeProcessor {
    http: reqwest::Client,
    api_base: String,
    secret_key: Masked<String>,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(default)]
    message: String,
}

impl StripeProcessor {
    pub fn new(http: reqwest::Client, api_base: &str, secret_key: String) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: Masked::new(secret_key),
        }
    }

    fn form(request: &IntentRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.clone()),
        ];
        for (key, value) in &request.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }
        params
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn create_intent(&self, request: IntentRequest) -> CoreResult<PaymentIntent> {
        let resp = self
            .http
            .post(format!("{}/payment_intents", self.api_base))
            .basic_auth(self.secret_key.expose(), Option::<&str>::None)
            .form(&Self::form(&request))
            .send()
            .await
            .map_err(|e| CoreError::Upstream(format!("stripe request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_default();
            return Err(CoreError::Upstream(format!(
                "stripe http error status={} message={}",
                status.as_u16(),
                message
            )));
        }

        let intent: IntentResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::InvalidResponse(format!("stripe response decode failed: {}", e)))?;

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: Masked::new(intent.client_secret),
        })
    }
}
