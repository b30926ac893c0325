//! Money helpers. Amounts are decimal values in the major currency unit
//! (e.g. rupees) carried as `f64` and always stored rounded to 2 places.

/// Rounds to 2 decimal places, halves away from zero.
///
/// All amounts handled by the service are non-negative, so this is
/// round-half-up for every value that reaches it.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Converts a major-unit amount to the processor's minor units (cents).
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
