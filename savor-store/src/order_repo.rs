use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use savor_order::repository::OrderSortKey;
use savor_order::{Order, OrderPage, OrderQuery, OrderRepository, RepoResult, RepositoryError};

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &OrderQuery) {
    builder.push(" WHERE TRUE");
    if let Some(status) = query.status {
        builder.push(" AND order_status = ").push_bind(status.as_str());
    }
    if let Some(user_id) = &query.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.clone());
    }
    if let Some(restaurant_id) = &query.restaurant_id {
        builder.push(" AND restaurant_id = ").push_bind(restaurant_id.clone());
    }
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn insert_order(&self, order: &Order) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, restaurant_id, order_status, total, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id)
        .bind(&order.user_id)
        .bind(&order.restaurant_id)
        .bind(order.order_status.as_str())
        .bind(order.total)
        .bind(Json(order))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        let row: Option<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::backend)?;

        Ok(row.map(|(Json(order),)| order))
    }

    async fn save_order(&self, order: &Order) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $2, total = $3, document = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(order.id)
        .bind(order.order_status.as_str())
        .bind(order.total)
        .bind(Json(order))
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        Ok(())
    }

    async fn list_orders(&self, query: &OrderQuery) -> RepoResult<OrderPage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::backend)?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT document FROM orders");
        push_filters(&mut select, query);

        let column = match query.sort.key {
            OrderSortKey::CreatedAt => "created_at",
            OrderSortKey::Total => "total",
            OrderSortKey::Status => "order_status",
        };
        select.push(" ORDER BY ").push(column);
        select.push(if query.sort.descending { " DESC" } else { " ASC" });

        if let Some(page) = query.page {
            select.push(" LIMIT ").push_bind(i64::from(page.limit));
            select.push(" OFFSET ").push_bind(page.offset() as i64);
        }

        let rows: Vec<(Json<Order>,)> = select
            .build_query_as::<(Json<Order>,)>()
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::backend)?;

        Ok(OrderPage {
            orders: rows.into_iter().map(|(Json(order),)| order).collect(),
            total: total.max(0) as u64,
        })
    }
}
