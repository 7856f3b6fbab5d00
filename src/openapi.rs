use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Azure Horizon Resort API",
        version = "1.0.0",
        description = "Service catalog, carts, bookings and payments for the resort front end."
    ),
    tags(
        (name = "auth", description = "Accounts and tokens"),
        (name = "services", description = "Service catalog and reviews"),
        (name = "cart", description = "Shopping cart and checkout"),
        (name = "orders", description = "Order history"),
        (name = "bookings", description = "Bookings and manual payments"),
        (name = "payments", description = "Vendor payment reconciliation"),
        (name = "contacts", description = "Enquiries"),
        (name = "health", description = "Liveness"),
    ),
    paths(
        handlers::health::healthz,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::profile,
        handlers::auth::update_profile,
        handlers::auth::user_check,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::services::list_services,
        handlers::services::featured_services,
        handlers::services::get_service,
        handlers::services::create_service,
        handlers::services::list_reviews,
        handlers::services::create_review,
        handlers::cart::get_cart,
        handlers::cart::add_item,
        handlers::cart::update_item,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::cart::checkout,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::bookings::create_booking,
        handlers::bookings::my_bookings,
        handlers::bookings::get_booking,
        handlers::bookings::update_status,
        handlers::bookings::cancel_booking,
        handlers::bookings::record_payment,
        handlers::bookings::create_checkout_session,
        handlers::bookings::payment_status,
        handlers::payments::verify_payment,
        handlers::payments::webhook,
        handlers::contacts::submit_contact,
    ),
    components(schemas(
        handlers::ErrorResponse,
        handlers::MessageResponse,
        handlers::TotalsResponse,
        handlers::health::HealthResponse,
        handlers::auth::RegisterRequest,
        handlers::auth::LoginRequest,
        handlers::auth::RefreshRequest,
        handlers::auth::LogoutRequest,
        handlers::auth::UpdateProfileRequest,
        handlers::auth::UserCheckResponse,
        handlers::auth::ForgotPasswordRequest,
        handlers::auth::ResetPasswordRequest,
        handlers::auth::UserResponse,
        handlers::auth::TokenResponse,
        handlers::auth::AuthResponse,
        handlers::services::CreateServiceRequest,
        handlers::services::CreateReviewRequest,
        handlers::services::ServiceResponse,
        handlers::services::ListServicesResponse,
        handlers::services::ReviewResponse,
        handlers::services::ListReviewsResponse,
        handlers::cart::AddCartItemRequest,
        handlers::cart::UpdateCartItemRequest,
        handlers::cart::CheckoutRequest,
        handlers::cart::CartItemResponse,
        handlers::cart::CartResponse,
        handlers::cart::CheckoutResponse,
        handlers::orders::OrderItemResponse,
        handlers::orders::OrderResponse,
        handlers::orders::ListOrdersResponse,
        handlers::bookings::BookingLineRequest,
        handlers::bookings::CreateBookingRequest,
        handlers::bookings::GuestEmailBody,
        handlers::bookings::UpdateStatusRequest,
        handlers::bookings::RecordPaymentRequest,
        handlers::bookings::BookingLineResponse,
        handlers::bookings::PaymentResponse,
        handlers::bookings::BookingResponse,
        handlers::bookings::ListBookingsResponse,
        handlers::bookings::PaymentSummaryResponse,
        handlers::bookings::RecordPaymentResponse,
        handlers::bookings::CheckoutSessionResponse,
        handlers::payments::VerifyPaymentRequest,
        handlers::payments::VerifyPaymentResponse,
        handlers::payments::WebhookResponse,
        handlers::contacts::ContactRequest,
        handlers::contacts::ContactResponse,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi())
}
