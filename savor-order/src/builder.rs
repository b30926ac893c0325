use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use savor_catalog::{CatalogClient, CatalogError, MenuItem, PricingEngine};
use savor_core::{PaymentMethod, PaymentStatus};
use savor_shared::Masked;

use crate::error::OrderError;
use crate::models::{Coordinates, DeliveryAddress, Order, OrderItem, OrderStatus, PaymentDetails};
use crate::repository::OrderRepository;

const DEFAULT_COUNTRY: &str = "Sri Lanka";

// ============================================================================
// Request Types
// ============================================================================

/// Order request as submitted by the customer. Every field is optional so
/// that missing data surfaces as a validation error instead of a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub restaurant_id: Option<String>,
    pub items: Option<Vec<RequestedItem>>,
    pub delivery_address: Option<AddressInput>,
    pub delivery_instructions: Option<String>,
    pub contact_phone: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedItem {
    pub menu_item_id: Option<String>,
    pub quantity: Option<i64>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// Request fields after the local checks, before any catalog lookup.
struct CheckedRequest {
    restaurant_id: String,
    lines: Vec<CheckedLine>,
    address: DeliveryAddress,
    instructions: String,
    phone: String,
    method: PaymentMethod,
}

struct CheckedLine {
    menu_item_id: String,
    quantity: u32,
    special_instructions: Option<String>,
}

// ============================================================================
// Builder
// ============================================================================

/// Turns order requests into priced, persisted orders.
pub struct OrderBuilder {
    catalog: Arc<dyn CatalogClient>,
    orders: Arc<dyn OrderRepository>,
    pricing: PricingEngine,
}

impl OrderBuilder {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        orders: Arc<dyn OrderRepository>,
        pricing: PricingEngine,
    ) -> Self {
        Self { catalog, orders, pricing }
    }

    /// Validate, price and persist a new `pending` order.
    ///
    /// Nothing is written unless every item resolves and is available.
    pub async fn create_order(&self, user_id: &str, request: NewOrderRequest) -> Result<Order, OrderError> {
        let checked = check_request(request)?;
        let items = self.resolve_items(&checked.lines).await?;

        let totals = self.pricing.quote(items.iter().map(|item| (item.price, item.quantity)));
        let now = Utc::now();

        let order = Order {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            restaurant_id: checked.restaurant_id,
            items,
            payment_details: PaymentDetails {
                method: checked.method,
                payment_id: None,
                status: PaymentStatus::Pending,
            },
            order_status: OrderStatus::Pending,
            delivery_address: checked.address,
            delivery_instructions: checked.instructions,
            contact_phone: Masked::new(checked.phone),
            subtotal: totals.subtotal,
            delivery_fee: totals.delivery_fee,
            tax: totals.tax,
            total: totals.total,
            estimated_delivery_time: None,
            actual_delivery_time: None,
            delivery_person: None,
            ratings: None,
            created_at: now,
            updated_at: now,
        };

        self.orders.insert_order(&order).await?;

        info!(
            order_id = %order.id,
            user_id = %order.user_id,
            restaurant_id = %order.restaurant_id,
            total = order.total,
            "Order created"
        );

        Ok(order)
    }

    /// Looks every line up in the catalog, once per distinct item id, and
    /// snapshots name and price in input order.
    async fn resolve_items(&self, lines: &[CheckedLine]) -> Result<Vec<OrderItem>, OrderError> {
        let mut resolved: HashMap<&str, MenuItem> = HashMap::new();
        let mut items = Vec::with_capacity(lines.len());

        for line in lines {
            let id = line.menu_item_id.as_str();

            if !resolved.contains_key(id) {
                let menu_item = match self.catalog.menu_item(id).await {
                    Ok(item) => item,
                    Err(CatalogError::NotFound(_)) => {
                        return Err(OrderError::InvalidItem(id.to_string()));
                    }
                    Err(CatalogError::Upstream(err)) => {
                        warn!(menu_item_id = %id, error = %err, "Menu item lookup failed");
                        return Err(OrderError::InvalidItem(id.to_string()));
                    }
                };
                resolved.insert(id, menu_item);
            }

            let Some(menu_item) = resolved.get(id) else {
                return Err(OrderError::InvalidItem(id.to_string()));
            };

            if !menu_item.is_available {
                return Err(OrderError::ItemUnavailable(menu_item.name.clone()));
            }

            items.push(OrderItem {
                menu_item_id: menu_item.id.clone(),
                name: menu_item.name.clone(),
                price: menu_item.price,
                quantity: line.quantity,
                special_instructions: line.special_instructions.clone(),
            });
        }

        Ok(items)
    }
}

fn check_request(request: NewOrderRequest) -> Result<CheckedRequest, OrderError> {
    let missing = || OrderError::Validation("Please provide all required fields".to_string());

    let restaurant_id = non_blank(request.restaurant_id).ok_or_else(missing)?;
    let requested = request.items.filter(|items| !items.is_empty()).ok_or_else(missing)?;
    let address = request.delivery_address.ok_or_else(missing)?;
    let phone = non_blank(request.contact_phone).ok_or_else(missing)?;

    let mut lines = Vec::with_capacity(requested.len());
    for item in requested {
        let invalid_item =
            || OrderError::Validation("Each order item must have menuItemId and quantity".to_string());

        let menu_item_id = non_blank(item.menu_item_id).ok_or_else(invalid_item)?;
        let quantity = item
            .quantity
            .filter(|q| *q >= 1)
            .and_then(|q| u32::try_from(q).ok())
            .ok_or_else(invalid_item)?;

        lines.push(CheckedLine {
            menu_item_id,
            quantity,
            special_instructions: non_blank(item.special_instructions),
        });
    }

    if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OrderError::Validation("Please add a valid phone number".to_string()));
    }

    Ok(CheckedRequest {
        restaurant_id,
        lines,
        address: check_address(address)?,
        instructions: request.delivery_instructions.unwrap_or_default(),
        phone,
        method: request.payment_method.unwrap_or_default(),
    })
}

fn check_address(input: AddressInput) -> Result<DeliveryAddress, OrderError> {
    let field = |value: Option<String>, name: &str| {
        non_blank(value).ok_or_else(|| OrderError::Validation(format!("Delivery address {} is required", name)))
    };

    Ok(DeliveryAddress {
        street: field(input.street, "street")?,
        city: field(input.city, "city")?,
        state: field(input.state, "state")?,
        zip_code: field(input.zip_code, "zipCode")?,
        country: non_blank(input.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        coordinates: input.coordinates,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeCatalog, MemoryOrders};
    use savor_catalog::PricingPolicy;

    fn address() -> AddressInput {
        AddressInput {
            street: Some("12 Galle Road".into()),
            city: Some("Colombo".into()),
            state: Some("Western".into()),
            zip_code: Some("00300".into()),
            country: None,
            coordinates: None,
        }
    }

    fn item(id: &str, quantity: i64) -> RequestedItem {
        RequestedItem {
            menu_item_id: Some(id.into()),
            quantity: Some(quantity),
            special_instructions: None,
        }
    }

    fn request(items: Vec<RequestedItem>) -> NewOrderRequest {
        NewOrderRequest {
            restaurant_id: Some("rest-1".into()),
            items: Some(items),
            delivery_address: Some(address()),
            delivery_instructions: None,
            contact_phone: Some("0771234567".into()),
            payment_method: None,
        }
    }

    fn builder(catalog: Arc<FakeCatalog>, orders: Arc<MemoryOrders>) -> OrderBuilder {
        OrderBuilder::new(catalog, orders, PricingEngine::new(PricingPolicy::default()))
    }

    fn catalog() -> Arc<FakeCatalog> {
        Arc::new(
            FakeCatalog::new()
                .with_item("kottu", "Chicken Kottu", 500.0, true)
                .with_item("biryani", "Lamb Biryani", 1200.0, true)
                .with_item("lamprais", "Lamprais", 950.0, false),
        )
    }

    #[tokio::test]
    async fn test_create_order_prices_and_persists() {
        let orders = Arc::new(MemoryOrders::default());
        let builder = builder(catalog(), orders.clone());

        let order = builder
            .create_order("user-1", request(vec![item("kottu", 2), item("biryani", 1)]))
            .await
            .unwrap();

        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.subtotal, 2200.0);
        assert_eq!(order.tax, 110.0);
        assert_eq!(order.delivery_fee, 100.0);
        assert_eq!(order.total, 2410.0);
        assert_eq!(order.payment_details.method, PaymentMethod::Cash);
        assert_eq!(order.payment_details.status, PaymentStatus::Pending);
        assert_eq!(order.delivery_address.country, "Sri Lanka");

        let names: Vec<&str> = order.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Chicken Kottu", "Lamb Biryani"]);

        let stored = orders.get(order.id).expect("order persisted");
        assert_eq!(stored.total, 2410.0);
    }

    #[tokio::test]
    async fn test_unavailable_item_persists_nothing() {
        let orders = Arc::new(MemoryOrders::default());
        let builder = builder(catalog(), orders.clone());

        let err = builder
            .create_order("user-1", request(vec![item("kottu", 1), item("lamprais", 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::ItemUnavailable(ref name) if name == "Lamprais"));
        assert_eq!(orders.len(), 0);
    }

    #[tokio::test]
    async fn test_unknown_item_is_invalid() {
        let orders = Arc::new(MemoryOrders::default());
        let builder = builder(catalog(), orders.clone());

        let err = builder
            .create_order("user-1", request(vec![item("kottu", 1), item("ghost", 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InvalidItem(ref id) if id == "ghost"));
        assert_eq!(orders.len(), 0);
    }

    #[tokio::test]
    async fn test_catalog_outage_is_invalid_item() {
        let orders = Arc::new(MemoryOrders::default());
        let catalog = Arc::new(FakeCatalog::new().with_outage("kottu"));
        let builder = builder(catalog, orders.clone());

        let err = builder
            .create_order("user-1", request(vec![item("kottu", 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InvalidItem(_)));
        assert_eq!(orders.len(), 0);
    }

    #[tokio::test]
    async fn test_repeated_item_is_looked_up_once() {
        let orders = Arc::new(MemoryOrders::default());
        let catalog = catalog();
        let builder = builder(catalog.clone(), orders);

        let order = builder
            .create_order("user-1", request(vec![item("kottu", 1), item("biryani", 1), item("kottu", 3)]))
            .await
            .unwrap();

        assert_eq!(order.items.len(), 3);
        assert_eq!(order.items[2].quantity, 3);
        assert_eq!(catalog.lookups("kottu"), 1);
        assert_eq!(catalog.lookups("biryani"), 1);
    }

    #[tokio::test]
    async fn test_catalog_price_changes_do_not_touch_existing_orders() {
        let orders = Arc::new(MemoryOrders::default());
        let catalog = catalog();
        let builder = builder(catalog.clone(), orders.clone());

        let order = builder.create_order("user-1", request(vec![item("kottu", 1)])).await.unwrap();
        catalog.set_price("kottu", 999.0);

        let stored = orders.get(order.id).unwrap();
        assert_eq!(stored.items[0].price, 500.0);
        assert_eq!(stored.subtotal, 500.0);
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected_before_lookup() {
        let orders = Arc::new(MemoryOrders::default());
        let catalog = catalog();
        let builder = builder(catalog.clone(), orders.clone());

        let mut no_phone = request(vec![item("kottu", 1)]);
        no_phone.contact_phone = None;
        let mut empty_items = request(vec![]);
        empty_items.restaurant_id = Some("rest-1".into());
        let zero_quantity = request(vec![item("kottu", 0)]);
        let mut bad_phone = request(vec![item("kottu", 1)]);
        bad_phone.contact_phone = Some("077-123456".into());
        let mut no_city = request(vec![item("kottu", 1)]);
        no_city.delivery_address.as_mut().unwrap().city = Some("  ".into());

        for req in [no_phone, empty_items, zero_quantity, bad_phone, no_city] {
            let err = builder.create_order("user-1", req).await.unwrap_err();
            assert!(matches!(err, OrderError::Validation(_)), "unexpected error {:?}", err);
        }

        assert_eq!(orders.len(), 0);
        assert_eq!(catalog.lookups("kottu"), 0);
    }

    #[tokio::test]
    async fn test_requested_payment_method_is_kept() {
        let orders = Arc::new(MemoryOrders::default());
        let builder = builder(catalog(), orders);

        let mut req = request(vec![item("biryani", 1)]);
        req.payment_method = Some(PaymentMethod::Card);
        req.delivery_instructions = Some("Leave at the gate".into());

        let order = builder.create_order("user-1", req).await.unwrap();
        assert_eq!(order.payment_details.method, PaymentMethod::Card);
        assert_eq!(order.delivery_instructions, "Leave at the gate");
    }
}
