use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::booking_service::BookingDraft;
use crate::auth::{AuthUser, MaybeUser};
use crate::domain::booking::{BookingLineInput, BookingLineView, BookingView, PaymentSummary, Requester};
use crate::domain::money::format_money;
use crate::domain::payment::{PaymentMethod, PaymentRecord, PaymentStatus, PaymentView};
use crate::errors::AppError;
use crate::handlers::{PageParams, TotalsResponse};
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookingLineRequest {
    pub service_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    /// Optional for signed-in users, whose profile fills the gap.
    #[validate(length(max = 200))]
    pub guest_name: Option<String>,
    #[validate(email)]
    pub guest_email: Option<String>,
    #[validate(length(max = 20))]
    pub guest_phone: Option<String>,
    pub booking_date: NaiveDate,
    #[schema(value_type = Option<String>, example = "14:30:00")]
    pub booking_time: Option<NaiveTime>,
    #[validate(range(min = 1))]
    pub number_of_guests: i32,
    #[validate(length(max = 1000))]
    pub special_requests: Option<String>,
    #[validate(length(min = 1), nested)]
    pub services: Vec<BookingLineRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GuestEmailParams {
    /// Guest email the booking was made with. Required for anonymous access.
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GuestEmailBody {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of pending, confirmed, in_progress, completed, cancelled.
    pub status: String,
    #[validate(length(max = 2000))]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentRequest {
    /// Decimal amount as a string, e.g. "50.00"
    pub amount: String,
    /// One of cash, credit_card, debit_card, bank_transfer, online.
    pub payment_method: String,
    /// Defaults to completed.
    pub status: Option<String>,
    #[validate(length(max = 100))]
    pub transaction_id: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingLineResponse {
    pub service_id: Uuid,
    pub service_name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub total_price: String,
    pub notes: Option<String>,
}

impl From<BookingLineView> for BookingLineResponse {
    fn from(l: BookingLineView) -> Self {
        Self {
            service_id: l.service_id,
            service_name: l.service_name,
            quantity: l.quantity,
            unit_price: format_money(&l.unit_price),
            total_price: format_money(&l.total_price),
            notes: l.notes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub amount: String,
    pub payment_method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub session_id: Option<String>,
    pub notes: Option<String>,
    pub payment_date: DateTime<Utc>,
}

impl From<PaymentView> for PaymentResponse {
    fn from(p: PaymentView) -> Self {
        Self {
            id: p.id,
            amount: format_money(&p.amount),
            payment_method: p.method.as_str().to_string(),
            status: p.status.as_str().to_string(),
            transaction_id: p.transaction_id,
            session_id: p.session_id,
            notes: p.notes,
            payment_date: p.payment_date,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingResponse {
    pub id: Uuid,
    pub booking_number: String,
    pub order_id: Option<Uuid>,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub booking_date: NaiveDate,
    #[schema(value_type = Option<String>, example = "14:30:00")]
    pub booking_time: Option<NaiveTime>,
    pub number_of_guests: i32,
    pub status: String,
    pub payment_status: String,
    #[serde(flatten)]
    pub totals: TotalsResponse,
    pub total_paid: String,
    pub special_requests: Option<String>,
    pub services: Vec<BookingLineResponse>,
    pub payments: Vec<PaymentResponse>,
    /// Present while the booking still accepts online payment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookingView> for BookingResponse {
    fn from(b: BookingView) -> Self {
        let checkout_url = b
            .accepts_payment()
            .then(|| format!("/api/v1/bookings/{}/checkout-session", b.booking_number));
        Self {
            totals: TotalsResponse::from(&b.totals),
            total_paid: format_money(&b.total_paid()),
            checkout_url,
            id: b.id,
            booking_number: b.booking_number,
            order_id: b.order_id,
            guest_name: b.guest_name,
            guest_email: b.guest_email,
            guest_phone: b.guest_phone,
            booking_date: b.booking_date,
            booking_time: b.booking_time,
            number_of_guests: b.number_of_guests,
            status: b.status.as_str().to_string(),
            payment_status: b.payment_status.as_str().to_string(),
            special_requests: b.special_requests,
            services: b.lines.into_iter().map(Into::into).collect(),
            payments: b.payments.into_iter().map(Into::into).collect(),
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListBookingsResponse {
    pub items: Vec<BookingResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentSummaryResponse {
    pub booking_number: String,
    pub status: String,
    pub payment_status: String,
    pub total_amount: String,
    pub total_paid: String,
    pub remaining: String,
    pub payments: Vec<PaymentResponse>,
}

impl From<PaymentSummary> for PaymentSummaryResponse {
    fn from(s: PaymentSummary) -> Self {
        Self {
            booking_number: s.booking_number,
            status: s.status.as_str().to_string(),
            payment_status: s.payment_status.as_str().to_string(),
            total_amount: format_money(&s.total_amount),
            total_paid: format_money(&s.total_paid),
            remaining: format_money(&s.remaining),
            payments: s.payments.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordPaymentResponse {
    pub payment_id: Uuid,
    pub booking: BookingResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSessionResponse {
    pub booking_number: String,
    pub session_id: String,
    pub checkout_url: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = BookingResponse),
        (status = 400, description = "Validation failed", body = crate::handlers::ErrorResponse),
        (status = 404, description = "Service not found", body = crate::handlers::ErrorResponse),
    ),
    tag = "bookings"
)]
pub async fn create_booking(
    state: web::Data<AppState>,
    MaybeUser(principal): MaybeUser,
    body: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let draft = BookingDraft {
        guest_name: body.guest_name,
        guest_email: body.guest_email,
        guest_phone: body.guest_phone,
        booking_date: body.booking_date,
        booking_time: body.booking_time,
        number_of_guests: body.number_of_guests,
        special_requests: body.special_requests,
        services: body
            .services
            .into_iter()
            .map(|s| BookingLineInput {
                service_id: s.service_id,
                quantity: s.quantity,
                notes: s.notes,
            })
            .collect(),
    };
    let booking = state.bookings.create(principal, draft).await?;
    Ok(HttpResponse::Created().json(BookingResponse::from(booking)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/mine",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 10, max 100)"),
    ),
    responses(
        (status = 200, description = "The caller's bookings, newest first", body = ListBookingsResponse),
        (status = 401, description = "Not signed in", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "bookings"
)]
pub async fn my_bookings(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = state
        .bookings
        .my_bookings(principal.id, params.page, params.limit)
        .await?;
    let limit = params
        .limit
        .unwrap_or(crate::application::booking_service::DEFAULT_PAGE_SIZE)
        .clamp(1, crate::application::booking_service::MAX_PAGE_SIZE);
    Ok(HttpResponse::Ok().json(ListBookingsResponse {
        items: page.items.into_iter().map(Into::into).collect(),
        total: page.total,
        page: params.page.max(1),
        limit,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{booking_number}",
    params(
        ("booking_number" = String, Path, description = "Booking reference"),
        ("email" = Option<String>, Query, description = "Guest email for anonymous access"),
    ),
    responses(
        (status = 200, description = "Booking found", body = BookingResponse),
        (status = 403, description = "Not the owner", body = crate::handlers::ErrorResponse),
        (status = 404, description = "Booking not found", body = crate::handlers::ErrorResponse),
    ),
    tag = "bookings"
)]
pub async fn get_booking(
    state: web::Data<AppState>,
    MaybeUser(principal): MaybeUser,
    path: web::Path<String>,
    query: web::Query<GuestEmailParams>,
) -> Result<HttpResponse, AppError> {
    let requester = Requester {
        principal,
        email: query.into_inner().email,
    };
    let booking = state.bookings.detail(path.into_inner(), &requester).await?;
    Ok(HttpResponse::Ok().json(BookingResponse::from(booking)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/bookings/{booking_number}/status",
    params(("booking_number" = String, Path, description = "Booking reference")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = BookingResponse),
        (status = 403, description = "Staff only", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "bookings"
)]
pub async fn update_status(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let booking = state
        .bookings
        .update_status(&principal, path.into_inner(), &body.status, body.admin_notes)
        .await?;
    Ok(HttpResponse::Ok().json(BookingResponse::from(booking)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_number}/cancel",
    params(("booking_number" = String, Path, description = "Booking reference")),
    request_body(content = GuestEmailBody, description = "Guest email for anonymous access"),
    responses(
        (status = 200, description = "Booking cancelled", body = BookingResponse),
        (status = 400, description = "Already completed or cancelled", body = crate::handlers::ErrorResponse),
        (status = 403, description = "Not the owner", body = crate::handlers::ErrorResponse),
    ),
    tag = "bookings"
)]
pub async fn cancel_booking(
    state: web::Data<AppState>,
    MaybeUser(principal): MaybeUser,
    path: web::Path<String>,
    body: Option<web::Json<GuestEmailBody>>,
) -> Result<HttpResponse, AppError> {
    let requester = Requester {
        principal,
        email: body.map(|b| b.into_inner()).unwrap_or_default().email,
    };
    let booking = state.bookings.cancel(path.into_inner(), &requester).await?;
    Ok(HttpResponse::Ok().json(BookingResponse::from(booking)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_number}/payments",
    params(("booking_number" = String, Path, description = "Booking reference")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = RecordPaymentResponse),
        (status = 400, description = "Invalid amount, method or status", body = crate::handlers::ErrorResponse),
        (status = 403, description = "Staff only", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "bookings"
)]
pub async fn record_payment(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    path: web::Path<String>,
    body: web::Json<RecordPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let amount = BigDecimal::from_str(&body.amount)
        .map_err(|e| AppError::BadRequest(format!("Invalid amount '{}': {}", body.amount, e)))?;
    let method = PaymentMethod::from_str(&body.payment_method)?;
    let status = match body.status.as_deref() {
        Some(s) => PaymentStatus::from_str(s)?,
        None => PaymentStatus::Completed,
    };
    let settlement = state
        .bookings
        .record_payment(
            &principal,
            path.into_inner(),
            PaymentRecord {
                amount,
                method,
                status,
                transaction_id: body.transaction_id,
                session_id: None,
                notes: body.notes,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(RecordPaymentResponse {
        payment_id: settlement.payment_id,
        booking: settlement.booking.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_number}/checkout-session",
    params(("booking_number" = String, Path, description = "Booking reference")),
    request_body(content = GuestEmailBody, description = "Guest email for anonymous access"),
    responses(
        (status = 201, description = "Vendor checkout opened", body = CheckoutSessionResponse),
        (status = 400, description = "Already paid or cancelled", body = crate::handlers::ErrorResponse),
        (status = 502, description = "Payment vendor unavailable", body = crate::handlers::ErrorResponse),
    ),
    tag = "bookings"
)]
pub async fn create_checkout_session(
    state: web::Data<AppState>,
    MaybeUser(principal): MaybeUser,
    path: web::Path<String>,
    body: Option<web::Json<GuestEmailBody>>,
) -> Result<HttpResponse, AppError> {
    let requester = Requester {
        principal,
        email: body.map(|b| b.into_inner()).unwrap_or_default().email,
    };
    let checkout = state
        .bookings
        .checkout_session(path.into_inner(), &requester)
        .await?;
    Ok(HttpResponse::Created().json(CheckoutSessionResponse {
        booking_number: checkout.booking_number,
        session_id: checkout.session.id,
        checkout_url: checkout.session.url,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{booking_number}/payment-status",
    params(("booking_number" = String, Path, description = "Booking reference")),
    responses(
        (status = 200, description = "Payment summary", body = PaymentSummaryResponse),
        (status = 404, description = "Booking not found", body = crate::handlers::ErrorResponse),
    ),
    tag = "bookings"
)]
pub async fn payment_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let summary = state.bookings.payment_status(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(PaymentSummaryResponse::from(summary)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::post().to(create_booking))
            .route("/mine", web::get().to(my_bookings))
            .route("/{booking_number}", web::get().to(get_booking))
            .route("/{booking_number}/status", web::patch().to(update_status))
            .route("/{booking_number}/cancel", web::post().to(cancel_booking))
            .route("/{booking_number}/payments", web::post().to(record_payment))
            .route(
                "/{booking_number}/checkout-session",
                web::post().to(create_checkout_session),
            )
            .route("/{booking_number}/payment-status", web::get().to(payment_status)),
    );
}
