use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::money::Totals;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartStatus {
    Open,
    Closed,
    Abandoned,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Open => "open",
            CartStatus::Closed => "closed",
            CartStatus::Abandoned => "abandoned",
        }
    }
}

impl FromStr for CartStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(CartStatus::Open),
            "closed" => Ok(CartStatus::Closed),
            "abandoned" => Ok(CartStatus::Abandoned),
            other => Err(DomainError::Internal(format!("unknown cart status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CartItemView {
    pub id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub service_slug: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub total_price: BigDecimal,
    pub booking_date: Option<NaiveDate>,
    pub booking_time: Option<NaiveTime>,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: CartStatus,
    pub totals: Totals,
    pub items: Vec<CartItemView>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CartView {
    /// Total number of units across all lines.
    pub fn items_count(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AddCartItem {
    pub service_id: Uuid,
    pub quantity: i32,
    pub booking_date: Option<NaiveDate>,
    pub booking_time: Option<NaiveTime>,
    pub special_requests: Option<String>,
}

impl AddCartItem {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_quantity(self.quantity)
    }

    /// Lines are merged when service and schedule are identical.
    pub fn same_line(&self, service_id: Uuid, date: Option<NaiveDate>, time: Option<NaiveTime>) -> bool {
        self.service_id == service_id && self.booking_date == date && self.booking_time == time
    }
}

#[derive(Debug, Clone, Default)]
pub struct CartItemPatch {
    pub quantity: Option<i32>,
    pub booking_date: Option<NaiveDate>,
    pub booking_time: Option<NaiveTime>,
    pub special_requests: Option<String>,
}

impl CartItemPatch {
    pub fn validate(&self) -> Result<(), DomainError> {
        match self.quantity {
            Some(q) => validate_quantity(q),
            None => Ok(()),
        }
    }
}

fn validate_quantity(quantity: i32) -> Result<(), DomainError> {
    if quantity <= 0 {
        return Err(DomainError::invalid("Quantity must be greater than 0"));
    }
    Ok(())
}
