use chrono::Utc;
use serde::Deserialize;

use crate::error::OrderError;
use crate::models::{Order, OrderStatus, Rating};

/// Customer feedback on a delivered order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRequest {
    pub food_rating: Option<i64>,
    pub delivery_rating: Option<i64>,
    #[serde(default)]
    pub review: Option<String>,
}

impl RatingRequest {
    /// At least one score, each between 1 and 5. Consumes the request so a
    /// `Rating` only ever exists in checked form.
    pub fn validate(self) -> Result<Rating, OrderError> {
        if self.food_rating.is_none() && self.delivery_rating.is_none() {
            return Err(OrderError::Validation(
                "Please provide at least one rating (food or delivery)".to_string(),
            ));
        }

        let score = |value: Option<i64>| -> Result<Option<u8>, OrderError> {
            match value {
                None => Ok(None),
                Some(v) if (1..=5).contains(&v) => Ok(Some(v as u8)),
                Some(_) => Err(OrderError::Validation("Ratings must be between 1 and 5".to_string())),
            }
        };

        Ok(Rating {
            food: score(self.food_rating)?,
            delivery: score(self.delivery_rating)?,
            review: self.review.unwrap_or_default(),
            created_at: Utc::now(),
        })
    }
}

/// Attach a checked rating to `order` on behalf of `user_id`.
pub fn apply_rating(order: &mut Order, user_id: &str, rating: Rating) -> Result<(), OrderError> {
    if order.order_status != OrderStatus::Delivered {
        return Err(OrderError::Validation("Can only rate delivered orders".to_string()));
    }

    if !order.is_owned_by(user_id) {
        return Err(OrderError::NotAuthorized("Not authorized to rate this order".to_string()));
    }

    if order.ratings.is_some() {
        return Err(OrderError::Validation("Order has already been rated".to_string()));
    }

    order.ratings = Some(rating);
    order.updated_at = Utc::now();
    Ok(())
}
