use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::money::format_money;
use crate::domain::order::{OrderItemView, OrderView};
use crate::errors::AppError;
use crate::handlers::{PageParams, TotalsResponse};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub quantity: i32,
    /// Decimal price as a string, e.g. "9.99"
    pub unit_price: String,
    pub total_price: String,
    pub booking_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "14:30:00")]
    pub booking_time: Option<NaiveTime>,
    pub special_requests: Option<String>,
}

impl From<OrderItemView> for OrderItemResponse {
    fn from(i: OrderItemView) -> Self {
        Self {
            id: i.id,
            service_id: i.service_id,
            service_name: i.service_name,
            quantity: i.quantity,
            unit_price: format_money(&i.unit_price),
            total_price: format_money(&i.total_price),
            booking_date: i.booking_date,
            booking_time: i.booking_time,
            special_requests: i.special_requests,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub status: String,
    pub payment_status: String,
    #[serde(flatten)]
    pub totals: TotalsResponse,
    pub items_count: i64,
    pub checkout_date: DateTime<Utc>,
    pub fulfillment_date: Option<DateTime<Utc>>,
    pub special_instructions: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        Self {
            totals: TotalsResponse::from(&o.totals),
            items_count: o.items_count(),
            id: o.id,
            order_number: o.order_number,
            customer_name: o.customer_name,
            customer_email: o.customer_email,
            customer_phone: o.customer_phone,
            status: o.status.as_str().to_string(),
            payment_status: o.payment_status.as_str().to_string(),
            checkout_date: o.checkout_date,
            fulfillment_date: o.fulfillment_date,
            special_instructions: o.special_instructions,
            items: o.items.into_iter().map(Into::into).collect(),
            created_at: o.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "The caller's orders, newest first", body = ListOrdersResponse),
        (status = 401, description = "Not signed in", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let page = state.checkout.orders(principal.id, params.page, limit).await?;
    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: page.items.into_iter().map(Into::into).collect(),
        total: page.total,
        page: params.page.max(1),
        limit: limit.clamp(1, 100),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order = state.checkout.order(principal.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::get().to(list_orders))
            .route("/{id}", web::get().to(get_order)),
    );
}
