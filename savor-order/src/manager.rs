use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use savor_core::{Actor, Role};

use crate::error::OrderError;
use crate::models::{Order, OrderStatus};
use crate::rating::{apply_rating, RatingRequest};
use crate::repository::{OrderPage, OrderQuery, OrderRepository};

/// Manages order lifecycle and state transitions
pub struct OrderManager {
    orders: Arc<dyn OrderRepository>,
}

impl OrderManager {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    /// Get an order by ID
    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound("Order not found".to_string()))
    }

    /// Owners, the restaurant that received the order and admins may read it.
    pub fn can_view(order: &Order, actor: &Actor) -> bool {
        actor.is_admin() || order.is_owned_by(&actor.user_id) || actor.operates(&order.restaurant_id)
    }

    pub async fn view_order(&self, order_id: Uuid, actor: &Actor) -> Result<Order, OrderError> {
        let order = self.get_order(order_id).await?;

        if !Self::can_view(&order, actor) {
            return Err(OrderError::NotAuthorized("Not authorized to view this order".to_string()));
        }

        Ok(order)
    }

    /// Apply a requested status change to `order` in place.
    ///
    /// Admins bypass the transition table. Everyone else must request an
    /// edge of the table; restaurants may move their own orders along any
    /// edge while customers may only cancel.
    pub fn transition(order: &mut Order, requested: OrderStatus, actor: &Actor) -> Result<(), OrderError> {
        if actor.role != Role::Admin {
            let current = order.order_status;
            if !current.can_transition_to(requested) {
                return Err(OrderError::IllegalTransition {
                    from: current,
                    to: requested,
                });
            }

            if !actor.operates(&order.restaurant_id) {
                if !order.is_owned_by(&actor.user_id) {
                    return Err(OrderError::NotAuthorized(
                        "Not authorized to update this order".to_string(),
                    ));
                }
                if requested != OrderStatus::Cancelled {
                    return Err(OrderError::NotAuthorized(
                        "Users can only cancel their orders".to_string(),
                    ));
                }
            }
        }

        order.update_status(requested);
        Ok(())
    }

    /// Load, transition and persist an order.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        requested: OrderStatus,
        actor: &Actor,
    ) -> Result<Order, OrderError> {
        let mut order = self.get_order(order_id).await?;
        let previous = order.order_status;

        Self::transition(&mut order, requested, actor)?;
        self.orders.save_order(&order).await?;

        info!(
            order_id = %order.id,
            from = %previous,
            to = %requested,
            actor = %actor.user_id,
            role = %actor.role,
            "Order status updated"
        );

        Ok(order)
    }

    pub async fn add_rating(
        &self,
        order_id: Uuid,
        actor: &Actor,
        request: RatingRequest,
    ) -> Result<Order, OrderError> {
        let rating = request.validate()?;

        let mut order = self.get_order(order_id).await?;
        apply_rating(&mut order, &actor.user_id, rating)?;
        self.orders.save_order(&order).await?;

        info!(order_id = %order.id, user_id = %actor.user_id, "Order rated");
        Ok(order)
    }

    pub async fn list(&self, query: &OrderQuery) -> Result<OrderPage, OrderError> {
        Ok(self.orders.list_orders(query).await?)
    }
}
