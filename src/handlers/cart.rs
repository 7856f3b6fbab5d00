use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::domain::cart::{AddCartItem, CartItemPatch, CartItemView, CartView};
use crate::domain::money::format_money;
use crate::domain::order::CustomerContact;
use crate::errors::AppError;
use crate::handlers::orders::OrderResponse;
use crate::handlers::TotalsResponse;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCartItemRequest {
    pub service_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub booking_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "14:30:00")]
    pub booking_time: Option<NaiveTime>,
    #[validate(length(max = 500))]
    pub special_requests: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub booking_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "14:30:00")]
    pub booking_time: Option<NaiveTime>,
    #[validate(length(max = 500))]
    pub special_requests: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 200))]
    pub customer_name: String,
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(min = 1, max = 20))]
    pub customer_phone: String,
    #[validate(length(max = 1000))]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub service_slug: String,
    pub unit_price: String,
    pub quantity: i32,
    pub total_price: String,
    pub booking_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "14:30:00")]
    pub booking_time: Option<NaiveTime>,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CartItemView> for CartItemResponse {
    fn from(i: CartItemView) -> Self {
        Self {
            id: i.id,
            service_id: i.service_id,
            service_name: i.service_name,
            service_slug: i.service_slug,
            unit_price: format_money(&i.unit_price),
            quantity: i.quantity,
            total_price: format_money(&i.total_price),
            booking_date: i.booking_date,
            booking_time: i.booking_time,
            special_requests: i.special_requests,
            created_at: i.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub status: String,
    #[serde(flatten)]
    pub totals: TotalsResponse,
    pub items_count: i64,
    pub items: Vec<CartItemResponse>,
    pub last_activity: DateTime<Utc>,
}

impl From<CartView> for CartResponse {
    fn from(c: CartView) -> Self {
        Self {
            totals: TotalsResponse::from(&c.totals),
            items_count: c.items_count(),
            id: c.id,
            status: c.status.as_str().to_string(),
            items: c.items.into_iter().map(Into::into).collect(),
            last_activity: c.last_activity,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub booking_number: String,
    pub payment_id: Uuid,
    /// Hosted payment page to redirect the customer to.
    pub checkout_url: String,
    pub session_id: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "The caller's open cart", body = CartResponse),
        (status = 401, description = "Not signed in", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<HttpResponse, AppError> {
    let cart = state.carts.active_cart(principal.id).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[utoipa::path(
    post,
    path = "/api/v1/cart/items",
    request_body = AddCartItemRequest,
    responses(
        (status = 201, description = "Item added or merged", body = CartResponse),
        (status = 400, description = "Validation failed", body = crate::handlers::ErrorResponse),
        (status = 404, description = "Service not found", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    body: web::Json<AddCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let cart = state
        .carts
        .add_item(
            principal.id,
            AddCartItem {
                service_id: body.service_id,
                quantity: body.quantity,
                booking_date: body.booking_date,
                booking_time: body.booking_time,
                special_requests: body.special_requests,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(CartResponse::from(cart)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/cart/items/{id}",
    params(("id" = Uuid, Path, description = "Cart item ID")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Item updated", body = CartItemResponse),
        (status = 404, description = "Item not in the caller's cart", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn update_item(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let item = state
        .carts
        .update_item(
            principal.id,
            path.into_inner(),
            CartItemPatch {
                quantity: body.quantity,
                booking_date: body.booking_date,
                booking_time: body.booking_time,
                special_requests: body.special_requests,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(CartItemResponse::from(item)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/{id}",
    params(("id" = Uuid, Path, description = "Cart item ID")),
    responses(
        (status = 200, description = "Item removed", body = CartResponse),
        (status = 404, description = "Item not in the caller's cart", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let cart = state.carts.remove_item(principal.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cart",
    responses((status = 200, description = "Cart emptied", body = CartResponse)),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn clear_cart(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<HttpResponse, AppError> {
    let cart = state.carts.clear(principal.id).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[utoipa::path(
    post,
    path = "/api/v1/cart/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed, checkout session opened", body = CheckoutResponse),
        (status = 400, description = "Empty cart or invalid contact", body = crate::handlers::ErrorResponse),
        (status = 502, description = "Payment vendor unavailable", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn checkout(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let outcome = state
        .checkout
        .checkout(
            principal.id,
            CustomerContact {
                name: body.customer_name,
                email: body.customer_email,
                phone: body.customer_phone,
                special_instructions: body.special_instructions,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(CheckoutResponse {
        order: outcome.order.into(),
        booking_number: outcome.booking_number,
        payment_id: outcome.payment_id,
        checkout_url: outcome.checkout_url,
        session_id: outcome.session_id,
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cart")
            .route("", web::get().to(get_cart))
            .route("", web::delete().to(clear_cart))
            .route("/items", web::post().to(add_item))
            .route("/items/{id}", web::patch().to(update_item))
            .route("/items/{id}", web::delete().to(remove_item))
            .route("/checkout", web::post().to(checkout)),
    );
}
