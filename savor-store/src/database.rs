use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::BusinessRules;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overlay the `business_rules` table on the configured defaults.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, sqlx::Error> {
        let rows: Vec<(String, Value)> = sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        Ok(apply_rule_rows(defaults, rows))
    }
}

/// Rows carry `{"value": <number>}`; unknown keys and non-numeric values are
/// skipped.
fn apply_rule_rows(mut rules: BusinessRules, rows: Vec<(String, Value)>) -> BusinessRules {
    for (key, value) in rows {
        let Some(v) = value.get("value").and_then(Value::as_f64) else {
            continue;
        };

        match key.as_str() {
            "delivery_fee" => rules.delivery_fee = v,
            "tax_rate" => rules.tax_rate = v,
            _ => {}
        }
    }

    rules
}
