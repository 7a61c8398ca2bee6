//! Money helpers. Amounts are decimals with two fractional digits.
//!
//! Bounds follow the storage columns: unit prices are `decimal(10,2)`,
//! order totals `decimal(12,2)`. Anything larger is rejected up front.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::services::error::ServiceError;

/// Largest unit price a product or order line may carry
pub const MAX_PRICE: Decimal = dec!(99999999.99);

/// Largest line or order total that can be stored
pub const MAX_TOTAL: Decimal = dec!(9999999999.99);

/// Normalize an amount to exactly two fractional digits
pub fn money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Round a unit price and check it fits the price column
pub fn check_price(price: Decimal) -> Result<Decimal, ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::Validation("price cannot be negative".to_string()));
    }
    let price = money(price);
    if price > MAX_PRICE {
        return Err(ServiceError::Validation(format!(
            "price {} exceeds the maximum of {}",
            price, MAX_PRICE
        )));
    }
    Ok(price)
}

fn total_too_large(what: &str) -> ServiceError {
    ServiceError::Validation(format!("{} exceeds the maximum of {}", what, MAX_TOTAL))
}

pub fn line_total(quantity: i32, price_at_time: Decimal) -> Result<Decimal, ServiceError> {
    let total = Decimal::from(quantity)
        .checked_mul(price_at_time)
        .map(money)
        .ok_or_else(|| total_too_large("line total"))?;
    if total > MAX_TOTAL {
        return Err(total_too_large("line total"));
    }
    Ok(total)
}

/// Sum of quantity × price over `(quantity, price)` lines
pub fn order_total<I>(lines: I) -> Result<Decimal, ServiceError>
where
    I: IntoIterator<Item = (i32, Decimal)>,
{
    let mut total = Decimal::ZERO;
    for (quantity, price) in lines {
        total = total
            .checked_add(line_total(quantity, price)?)
            .ok_or_else(|| total_too_large("order total"))?;
        if total > MAX_TOTAL {
            return Err(total_too_large("order total"));
        }
    }
    Ok(money(total))
}
