use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::payment_service::WebhookOutcome;
use crate::domain::money::format_money;
use crate::errors::AppError;
use crate::handlers::bookings::BookingResponse;
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1))]
    pub session_id: String,
    /// Rejected when the vendor session belongs to a different booking.
    pub booking_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub booking_number: String,
    pub payment_id: uuid::Uuid,
    /// Amount the vendor reports as captured.
    pub amount: String,
    pub vendor_status: String,
    pub customer_email: Option<String>,
    /// False when this session had already been recorded.
    pub newly_recorded: bool,
    pub booking: BookingResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    pub received: bool,
    /// settled, awaiting_funds, payment_failed or ignored
    pub outcome: String,
}

impl From<&WebhookOutcome> for WebhookResponse {
    fn from(outcome: &WebhookOutcome) -> Self {
        let outcome = match outcome {
            WebhookOutcome::Settled { .. } => "settled",
            WebhookOutcome::AwaitingFunds { .. } => "awaiting_funds",
            WebhookOutcome::PaymentFailed { .. } => "payment_failed",
            WebhookOutcome::Ignored { .. } => "ignored",
        };
        Self {
            received: true,
            outcome: outcome.to_string(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment confirmed and recorded", body = VerifyPaymentResponse),
        (status = 400, description = "Session unpaid or for another booking", body = crate::handlers::ErrorResponse),
        (status = 502, description = "Payment vendor unavailable", body = crate::handlers::ErrorResponse),
    ),
    tag = "payments"
)]
pub async fn verify_payment(
    state: web::Data<AppState>,
    body: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let verified = state
        .payments
        .verify(&body.session_id, body.booking_number)
        .await?;
    let settlement = verified.settlement;
    Ok(HttpResponse::Ok().json(VerifyPaymentResponse {
        booking_number: settlement.booking.booking_number.clone(),
        payment_id: settlement.payment_id,
        amount: format_money(&verified.paid_amount),
        vendor_status: verified.vendor_status,
        customer_email: verified.customer_email,
        newly_recorded: settlement.newly_recorded,
        booking: settlement.booking.into(),
    }))
}

/// The body is taken as raw bytes: the signature covers the exact payload.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body(content = String, description = "Vendor event JSON", content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "Vendor signature header")),
    responses(
        (status = 200, description = "Event accepted", body = WebhookResponse),
        (status = 400, description = "Missing or invalid signature", body = crate::handlers::ErrorResponse),
    ),
    tag = "payments"
)]
pub async fn webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;
    let outcome = state.payments.handle_webhook(&payload, signature).await?;
    Ok(HttpResponse::Ok().json(WebhookResponse::from(&outcome)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("/verify", web::post().to(verify_payment))
            .route("/webhook", web::post().to(webhook)),
    );
}
