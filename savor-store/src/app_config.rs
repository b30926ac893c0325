use serde::Deserialize;
use std::env;

use savor_catalog::PricingPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub services: ServicesConfig,
    pub payments: PaymentsConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub delivery_fee: f64,
    pub tax_rate: f64,
}

impl BusinessRules {
    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            delivery_fee: self.delivery_fee,
            tax_rate: self.tax_rate,
        }
    }
}

/// Where bearer credentials are resolved.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IdentitySource {
    /// Verify the JWT locally with `jwt_secret`
    #[default]
    Token,
    /// Ask the auth service (`GET /auth/me`)
    AuthService,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default)]
    pub identity_source: IdentitySource,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub auth_url: String,
    pub restaurant_url: String,
    pub menu_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    pub currency: String,
    pub webhook_secret: String,
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_seconds: i64,
    /// Without a key the mock processor is used
    pub stripe_secret_key: Option<String>,
    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,
}

fn default_webhook_tolerance() -> i64 {
    300
}

fn default_stripe_api_base() -> String {
    "https://api.stripe.com/v1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Unset means the in-memory store
    pub url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Developer overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `SAVOR__PAYMENTS__WEBHOOK_SECRET=whsec_...`
            .add_source(config::Environment::with_prefix("SAVOR").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
