use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use savor_core::{Actor, Role};
use savor_order::{NewOrderRequest, Order, OrderQuery, OrderSort, OrderStatus, PageRequest, RatingRequest};

use crate::envelope::{ApiResponse, Pagination};
use crate::error::AppError;
use crate::middleware::Authenticated;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersParams {
    #[serde(alias = "status")]
    pub order_status: Option<String>,
    pub restaurant: Option<String>,
    pub user: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListOrdersParams {
    fn into_query(self) -> Result<OrderQuery, AppError> {
        let status = self
            .order_status
            .map(|s| s.parse::<OrderStatus>())
            .transpose()
            .map_err(AppError::ValidationError)?;
        let sort = self
            .sort
            .map(|s| s.parse::<OrderSort>())
            .transpose()
            .map_err(AppError::ValidationError)?
            .unwrap_or_default();

        let defaults = PageRequest::default();
        let page = PageRequest {
            page: self.page.filter(|p| *p > 0).unwrap_or(defaults.page),
            limit: self.limit.filter(|l| *l > 0).unwrap_or(defaults.limit),
        };

        Ok(OrderQuery {
            status,
            user_id: self.user,
            restaurant_id: self.restaurant,
            sort,
            page: Some(page),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub order_status: Option<String>,
}

/// Unparseable ids can never match an order.
pub(crate) fn parse_order_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFoundError("Order not found".to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/orders
/// All orders, filtered, sorted and paginated (admin only)
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Order>>>, AppError> {
    auth.require_role(Role::Admin)?;

    let Query(params) = params.map_err(|e| AppError::ValidationError(e.body_text()))?;
    let query = params.into_query()?;
    let page = query.page.unwrap_or_default();

    let result = state.order_manager.list(&query).await?;
    let pagination = Pagination::new(page.page, page.limit, result.total);

    Ok(Json(ApiResponse::list(result.orders).with_pagination(pagination)))
}

/// GET /api/v1/orders/user
pub async fn user_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<ApiResponse<Vec<Order>>>, AppError> {
    let result = state
        .order_manager
        .list(&OrderQuery::for_user(auth.principal.user_id.clone()))
        .await?;

    Ok(Json(ApiResponse::list(result.orders)))
}

/// GET /api/v1/orders/restaurant
/// Orders received by the caller's restaurant
pub async fn restaurant_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<ApiResponse<Vec<Order>>>, AppError> {
    auth.require_role(Role::Restaurant)?;

    let restaurant_id = state
        .restaurants
        .restaurant_for(&auth.principal, &auth.token)
        .await?
        .ok_or_else(|| AppError::NotFoundError("No restaurant found for this user".to_string()))?;

    let result = state.order_manager.list(&OrderQuery::for_restaurant(restaurant_id)).await?;

    Ok(Json(ApiResponse::list(result.orders)))
}

/// GET /api/v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let order_id = parse_order_id(&id)?;

    // A failed ownership lookup only costs the restaurant its view access.
    let actor = match auth.actor(&state).await {
        Ok(actor) => actor,
        Err(err) => {
            tracing::warn!(user_id = %auth.principal.user_id, "Restaurant lookup failed: {}", err);
            Actor::from(auth.principal.clone())
        }
    };

    let order = state.order_manager.view_order(order_id, &actor).await?;
    Ok(Json(ApiResponse::ok(order)))
}

/// POST /api/v1/orders
pub async fn create_order(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    body: Result<Json<NewOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), AppError> {
    let Json(request) = body?;

    let order = state
        .order_builder
        .create_order(&auth.principal.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(order))))
}

/// PATCH /api/v1/orders/{id}/status
pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let Json(request) = body?;
    let requested = request
        .order_status
        .ok_or_else(|| AppError::ValidationError("Please provide order status".to_string()))?
        .parse::<OrderStatus>()
        .map_err(|_| AppError::ValidationError("Invalid order status".to_string()))?;

    let order_id = parse_order_id(&id)?;
    let actor = auth.actor(&state).await?;

    let order = state.order_manager.update_status(order_id, requested, &actor).await?;
    Ok(Json(ApiResponse::ok(order)))
}

/// POST /api/v1/orders/{id}/rating
pub async fn add_order_rating(
    State(state): State<AppState>,
    Extension(auth): Extension<Authenticated>,
    Path(id): Path<String>,
    body: Result<Json<RatingRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let Json(request) = body?;

    let order_id = parse_order_id(&id)?;
    let actor = Actor::from(auth.principal.clone());

    let order = state.order_manager.add_rating(order_id, &actor, request).await?;
    Ok(Json(ApiResponse::ok(order)))
}
