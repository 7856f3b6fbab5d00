use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use super::booking::BookingView;
use super::errors::DomainError;
use super::money::Totals;
use super::payment::SettlementStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Processing,
    Confirmed,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::Internal(format!("unknown order status '{other}'"))),
        }
    }
}

/// Contact details captured on the checkout form.
#[derive(Debug, Clone)]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub booking_date: Option<NaiveDate>,
    pub booking_time: Option<NaiveTime>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub cart_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub status: OrderStatus,
    pub payment_status: SettlementStatus,
    pub totals: Totals,
    pub checkout_date: DateTime<Utc>,
    pub fulfillment_date: Option<DateTime<Utc>>,
    pub special_instructions: Option<String>,
    pub items: Vec<OrderItemView>,
    pub created_at: DateTime<Utc>,
}

impl OrderView {
    pub fn items_count(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }
}

/// Everything the local half of checkout wrote, before the vendor is called.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: OrderView,
    pub booking: BookingView,
    pub payment_id: Uuid,
}
