use anyhow::{Result, anyhow};
use rust_decimal::{Decimal, prelude::ToPrimitive};

const MINOR_UNIT_SCALE: u32 = 2;

/// Amount in cents, as stored in `amount_minor` columns.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| anyhow!("amount {amount} does not fit in minor units"))
}

pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}
