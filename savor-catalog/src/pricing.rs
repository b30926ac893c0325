use serde::{Deserialize, Serialize};
use savor_shared::money::round_money;

/// Flat-fee and tax policy applied to every order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricingPolicy {
    /// Flat delivery fee in the major currency unit
    pub delivery_fee: f64,

    /// Tax rate as a decimal fraction (0.05 = 5%)
    pub tax_rate: f64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            delivery_fee: 100.0,
            tax_rate: 0.05,
        }
    }
}

/// Money breakdown of an order, every field rounded to 2 decimals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub delivery_fee: f64,
    pub total: f64,
}

/// Order pricing engine
pub struct PricingEngine {
    policy: PricingPolicy,
}

impl PricingEngine {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    /// Prices a sequence of `(unit_price, quantity)` lines.
    ///
    /// The total is summed from the already-rounded components, so
    /// `total == subtotal + tax + delivery_fee` holds exactly at 2 decimals.
    pub fn quote<I>(&self, lines: I) -> OrderTotals
    where
        I: IntoIterator<Item = (f64, u32)>,
    {
        let raw_subtotal: f64 = lines
            .into_iter()
            .map(|(price, quantity)| price * f64::from(quantity))
            .sum();

        let subtotal = round_money(raw_subtotal);
        let tax = round_money(subtotal * self.policy.tax_rate);
        let delivery_fee = round_money(self.policy.delivery_fee);
        let total = round_money(subtotal + tax + delivery_fee);

        OrderTotals {
            subtotal,
            tax,
            delivery_fee,
            total,
        }
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingPolicy::default())
    }
}
