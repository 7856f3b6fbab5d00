pub mod auth;
pub mod bookings;
pub mod cart;
pub mod contacts;
pub mod health;
pub mod orders;
pub mod payments;
pub mod services;

use actix_web::web;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::money::{format_money, Totals};
use crate::errors::AppError;

// ── Shared DTOs ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Page number and size from the query string.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PageParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Items per page. Each listing applies its own default and maximum.
    pub limit: Option<i64>,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TotalsResponse {
    /// Decimal amounts as strings, e.g. "105.00"
    pub subtotal: String,
    pub tax: String,
    pub total_amount: String,
}

impl From<&Totals> for TotalsResponse {
    fn from(t: &Totals) -> Self {
        Self {
            subtotal: format_money(&t.subtotal),
            tax: format_money(&t.tax),
            total_amount: format_money(&t.total_amount),
        }
    }
}

/// Mounts every resource under the caller's scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .configure(health::configure)
    .configure(auth::configure)
    .configure(services::configure)
    .configure(cart::configure)
    .configure(orders::configure)
    .configure(bookings::configure)
    .configure(payments::configure)
    .configure(contacts::configure);
}
