use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use savor_order::{Payment, PaymentRepository, RepoResult, RepositoryError};

pub struct StorePaymentRepository {
    pool: PgPool,
}

impl StorePaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique index hits become `Conflict`, everything else `Backend`.
fn map_write_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Conflict(db.message().to_string());
        }
    }
    RepositoryError::backend(err)
}

#[async_trait]
impl PaymentRepository for StorePaymentRepository {
    async fn insert_payment(&self, payment: &Payment) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, user_id, status, payment_intent_id, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.id)
        .bind(payment.order_id)
        .bind(&payment.user_id)
        .bind(payment.status.as_str())
        .bind(payment.payment_intent_id.as_deref())
        .bind(Json(payment))
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn save_payment(&self, payment: &Payment) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, payment_intent_id = $3, document = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(payment.id)
        .bind(payment.status.as_str())
        .bind(payment.payment_intent_id.as_deref())
        .bind(Json(payment))
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn find_active_for_order(&self, order_id: Uuid) -> RepoResult<Option<Payment>> {
        let row: Option<(Json<Payment>,)> = sqlx::query_as(
            "SELECT document FROM payments WHERE order_id = $1 AND status IN ('pending', 'completed') LIMIT 1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        Ok(row.map(|(Json(payment),)| payment))
    }

    async fn find_by_intent_id(&self, intent_id: &str) -> RepoResult<Option<Payment>> {
        let row: Option<(Json<Payment>,)> = sqlx::query_as("SELECT document FROM payments WHERE payment_intent_id = $1")
            .bind(intent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::backend)?;

        Ok(row.map(|(Json(payment),)| payment))
    }

    async fn list_for_user(&self, user_id: &str) -> RepoResult<Vec<Payment>> {
        let rows: Vec<(Json<Payment>,)> =
            sqlx::query_as("SELECT document FROM payments WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(RepositoryError::backend)?;

        Ok(rows.into_iter().map(|(Json(payment),)| payment).collect())
    }
}
