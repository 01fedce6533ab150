//! Final-price computation for display.
//!
//! Clamping happens here, not at validation time: a value that would push a
//! price below zero still validates but displays as `0.00`.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::discount::{DiscountRecord, DiscountType};

/// Parses a catalog price string such as `"19.99"`.
#[must_use]
pub fn parse_price(price: &str) -> Option<Decimal> {
    price.trim().parse::<Decimal>().ok()
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Price after discount, never negative, rounded half-up to cents.
///
/// Returns `None` when `discount_value` is not a finite number.
#[must_use]
pub fn final_price_of(
    price: Decimal,
    discount_type: DiscountType,
    discount_value: f64,
) -> Option<Decimal> {
    let value = Decimal::try_from(discount_value).ok()?;
    let discounted = match discount_type {
        DiscountType::Percentage => price * (Decimal::ONE - value / Decimal::ONE_HUNDRED),
        DiscountType::FixedAmount => price - value,
    };
    Some(round_money(discounted.max(Decimal::ZERO)))
}

/// Like [`final_price_of`] for a catalog price string. An absent or
/// unparseable price gives `None` ("unknown"), which is distinct from a
/// `0.00` final price.
#[must_use]
pub fn final_price(
    price: Option<&str>,
    discount_type: DiscountType,
    discount_value: f64,
) -> Option<Decimal> {
    final_price_of(parse_price(price?)?, discount_type, discount_value)
}

/// Amount taken off the price, capped at the price itself.
#[must_use]
pub fn savings(
    price: Option<&str>,
    discount_type: DiscountType,
    discount_value: f64,
) -> Option<Decimal> {
    let original = parse_price(price?)?;
    let discounted = final_price_of(original, discount_type, discount_value)?;
    Some(round_money(original - discounted))
}

/// Formats a money amount with exactly two decimals.
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

impl DiscountRecord {
    /// Display price after this record's discount; `None` when the record
    /// has no usable catalog price.
    #[must_use]
    pub fn final_price(&self) -> Option<Decimal> {
        final_price(self.price.as_deref(), self.discount_type, self.discount_value)
    }
}
