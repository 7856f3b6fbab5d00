use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};

use super::errors::DomainError;

/// Flat sales tax applied to every cart, order and booking (5%).
pub fn tax_rate() -> BigDecimal {
    BigDecimal::new(5.into(), 2)
}

/// Round to cents, half-up.
pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

/// Render an amount at exactly two decimal places, e.g. `0.00` or `-12.50`.
pub fn format_money(value: &BigDecimal) -> String {
    let rounded = round_money(value);
    match (&rounded * BigDecimal::from(100)).to_i64() {
        Some(cents) => {
            let sign = if cents < 0 { "-" } else { "" };
            let cents = cents.unsigned_abs();
            format!("{sign}{}.{:02}", cents / 100, cents % 100)
        }
        None => rounded.to_string(),
    }
}

pub fn line_total(unit_price: &BigDecimal, quantity: i32) -> BigDecimal {
    round_money(&(unit_price * BigDecimal::from(quantity)))
}

/// Convert a decimal amount into the vendor's minor units (cents).
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, DomainError> {
    round_money(&(amount * BigDecimal::from(100)))
        .to_i64()
        .ok_or_else(|| DomainError::invalid(format!("amount {amount} is out of range")))
}

pub fn from_minor_units(minor: i64) -> BigDecimal {
    BigDecimal::new(minor.into(), 2)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total_amount: BigDecimal,
}

impl Totals {
    pub fn zero() -> Self {
        Self::from_subtotal(BigDecimal::zero())
    }

    pub fn from_subtotal(subtotal: BigDecimal) -> Self {
        let subtotal = round_money(&subtotal);
        let tax = round_money(&(&subtotal * tax_rate()));
        let total_amount = &subtotal + &tax;
        Self {
            subtotal,
            tax,
            total_amount,
        }
    }

    /// subtotal = sum(line totals), tax = 5% of subtotal, total = subtotal + tax.
    pub fn from_line_totals<'a, I>(line_totals: I) -> Self
    where
        I: IntoIterator<Item = &'a BigDecimal>,
    {
        let subtotal = line_totals
            .into_iter()
            .fold(BigDecimal::zero(), |acc, t| acc + t);
        Self::from_subtotal(subtotal)
    }
}
