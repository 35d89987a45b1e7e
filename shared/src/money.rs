//! Money bounds shared by the catalog and the order workflow
//!
//! Amounts are stored as `NUMERIC(12,2)`: at most two decimal places and
//! ten integer digits. Values are checked here before they reach a store.

use rust_decimal::Decimal;

/// Decimal places kept for every stored amount
pub const DECIMAL_PLACES: u32 = 2;

/// Maximum unit price of a product (1,000,000.00)
pub const MAX_PRICE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, DECIMAL_PLACES);

/// Largest value a `NUMERIC(12,2)` column holds (9,999,999,999.99)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, DECIMAL_PLACES);

/// True when the value has no more than two significant decimal places
pub fn has_money_scale(value: Decimal) -> bool {
    value.normalize().scale() <= DECIMAL_PLACES
}

/// Rescale to exactly two decimal places. Callers check the scale first.
pub fn to_money(value: Decimal) -> Decimal {
    let mut v = value;
    v.rescale(DECIMAL_PLACES);
    v
}
