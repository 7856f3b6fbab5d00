use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::booking::{BookingLineView, BookingStatus, BookingView, NewBooking, Settlement};
use super::cart::{AddCartItem, CartItemPatch, CartItemView, CartView};
use super::catalog::{NewReview, NewService, ReviewView, ServiceView};
use super::contact::{ContactMessage, NewContactMessage};
use super::errors::DomainError;
use super::order::{CustomerContact, OrderView, PlacedOrder};
use super::payment::{CheckoutSession, CheckoutSessionRequest, PaymentRecord, VendorSession, WebhookEvent};
use super::user::{NewUser, ProfileChanges, StoredCredentials, User};
use super::{Page, PageRequest};

// ── Persistence ──────────────────────────────────────────────────────────────

pub trait UserRepository: Send + Sync + 'static {
    /// Fails with `Conflict` when the username or email is taken.
    fn create(&self, user: NewUser) -> Result<User, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    /// Looks the login up by username first, then by email.
    fn find_credentials(&self, login: &str) -> Result<Option<StoredCredentials>, DomainError>;
    fn username_taken(&self, username: &str) -> Result<bool, DomainError>;
    fn email_taken(&self, email: &str) -> Result<bool, DomainError>;
    fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, DomainError>;
    /// Stores a reset token for the account with this email, if any.
    fn set_reset_token(&self, email: &str, token: &str) -> Result<Option<User>, DomainError>;
    /// Swaps the password for the account holding `token` and clears the token.
    fn reset_password(&self, token: &str, password_hash: &str) -> Result<bool, DomainError>;
    fn revoke_token(
        &self,
        jti: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;
    fn is_token_revoked(&self, jti: &str) -> Result<bool, DomainError>;
}

pub trait CatalogRepository: Send + Sync + 'static {
    fn list(&self, page: PageRequest, search: Option<&str>) -> Result<Page<ServiceView>, DomainError>;
    /// Active services ordered by rating, for the landing page.
    fn featured(&self, limit: i64) -> Result<Vec<ServiceView>, DomainError>;
    fn find_by_slug(&self, slug: &str) -> Result<Option<ServiceView>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<ServiceView>, DomainError>;
    fn create(&self, service: NewService) -> Result<ServiceView, DomainError>;
    fn list_reviews(&self, service_id: Uuid, page: PageRequest) -> Result<Page<ReviewView>, DomainError>;
    fn add_review(&self, review: NewReview) -> Result<ReviewView, DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    fn find_open(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError>;
    fn get_or_create_open(&self, user_id: Uuid) -> Result<CartView, DomainError>;
    /// Merges into an identical line or inserts a new one priced at `unit_price`.
    fn add_item(
        &self,
        user_id: Uuid,
        item: AddCartItem,
        unit_price: BigDecimal,
    ) -> Result<CartView, DomainError>;
    fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        patch: CartItemPatch,
    ) -> Result<CartItemView, DomainError>;
    fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError>;
    fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Snapshots the user's open cart into an order, upserts the booking and
    /// its pending payment. All in one transaction.
    fn place_from_cart(
        &self,
        user_id: Uuid,
        contact: CustomerContact,
    ) -> Result<PlacedOrder, DomainError>;
    /// Compensates a checkout whose vendor session could not be created.
    fn abandon_checkout(&self, order_id: Uuid, payment_id: Uuid) -> Result<(), DomainError>;
    fn find_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<Page<OrderView>, DomainError>;
}

pub trait BookingRepository: Send + Sync + 'static {
    fn create(
        &self,
        booking: NewBooking,
        lines: Vec<BookingLineView>,
    ) -> Result<BookingView, DomainError>;
    fn find_by_number(&self, booking_number: &str) -> Result<Option<BookingView>, DomainError>;
    fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<Page<BookingView>, DomainError>;
    fn update_status(
        &self,
        booking_number: &str,
        status: BookingStatus,
        admin_notes: Option<String>,
    ) -> Result<BookingView, DomainError>;
    /// Returns the booking's `initiated` online payment, creating it for `amount`.
    fn ensure_checkout_payment(&self, booking_id: Uuid, amount: BigDecimal) -> Result<Uuid, DomainError>;
    fn set_payment_session(&self, payment_id: Uuid, session_id: &str) -> Result<(), DomainError>;
    /// Appends (or promotes, when the session is already known) a payment and
    /// recomputes the booking, its order and its cart.
    fn record_payment(
        &self,
        booking_number: &str,
        payment: PaymentRecord,
    ) -> Result<Settlement, DomainError>;
    /// Flags still-open payments matching a vendor session or transaction id
    /// as failed. Returns how many were updated.
    fn mark_payment_failed(&self, reference: &str) -> Result<usize, DomainError>;
}

pub trait ContactRepository: Send + Sync + 'static {
    fn create(&self, message: NewContactMessage) -> Result<ContactMessage, DomainError>;
}

// ── Outbound services ────────────────────────────────────────────────────────

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, DomainError>;

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<VendorSession, DomainError>;

    /// Verifies the signature header and decodes the event body.
    fn parse_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, DomainError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, message: &EmailMessage) -> Result<(), DomainError>;
}
