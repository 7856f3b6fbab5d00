use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::booking::BookingLineView;
use crate::domain::contact::ContactMessage;
use crate::domain::errors::DomainError;
use crate::domain::payment::PaymentView;
use crate::domain::user::User;
use crate::schema::{
    booking_lines, bookings, cart_items, carts, contact_messages, order_items, orders, payments,
    reviews, revoked_tokens, services, users,
};

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub gender: Option<String>,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            phone: self.phone,
            gender: self.gender,
            is_staff: self.is_staff,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub password_hash: String,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChangeset {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = revoked_tokens)]
pub struct NewRevokedTokenRow {
    pub jti: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = services)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServiceRow {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub synopsis: Option<String>,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub unit: Option<String>,
    pub duration: Option<String>,
    pub min_people: Option<i32>,
    pub max_people: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = services)]
pub struct NewServiceRow {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub synopsis: Option<String>,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub unit: Option<String>,
    pub duration: Option<String>,
    pub min_people: Option<i32>,
    pub max_people: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReviewRow {
    pub id: Uuid,
    pub service_id: Uuid,
    pub author_id: Uuid,
    pub message: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reviews)]
pub struct NewReviewRow {
    pub id: Uuid,
    pub service_id: Uuid,
    pub author_id: Uuid,
    pub message: String,
    pub rating: i32,
}

// ── Carts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total_amount: BigDecimal,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = carts)]
pub struct NewCartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = cart_items)]
#[diesel(belongs_to(CartRow, foreign_key = cart_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub service_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub booking_date: Option<NaiveDate>,
    pub booking_time: Option<NaiveTime>,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub service_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub booking_date: Option<NaiveDate>,
    pub booking_time: Option<NaiveTime>,
    pub special_requests: Option<String>,
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub cart_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub status: String,
    pub payment_status: String,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total_amount: BigDecimal,
    pub checkout_date: DateTime<Utc>,
    pub fulfillment_date: Option<DateTime<Utc>>,
    pub special_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub cart_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub status: String,
    pub payment_status: String,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total_amount: BigDecimal,
    pub checkout_date: DateTime<Utc>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub booking_date: Option<NaiveDate>,
    pub booking_time: Option<NaiveTime>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub booking_date: Option<NaiveDate>,
    pub booking_time: Option<NaiveTime>,
    pub special_requests: Option<String>,
}

// ── Bookings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingRow {
    pub id: Uuid,
    pub booking_number: String,
    pub user_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub booking_date: NaiveDate,
    pub booking_time: Option<NaiveTime>,
    pub number_of_guests: i32,
    pub status: String,
    pub payment_status: String,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total_amount: BigDecimal,
    pub special_requests: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBookingRow {
    pub id: Uuid,
    pub booking_number: String,
    pub user_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub booking_date: NaiveDate,
    pub booking_time: Option<NaiveTime>,
    pub number_of_guests: i32,
    pub status: String,
    pub payment_status: String,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub total_amount: BigDecimal,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = booking_lines)]
#[diesel(belongs_to(BookingRow, foreign_key = booking_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingLineRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub notes: Option<String>,
}

impl From<BookingLineRow> for BookingLineView {
    fn from(row: BookingLineRow) -> Self {
        BookingLineView {
            service_id: row.service_id,
            service_name: row.service_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            notes: row.notes,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = booking_lines)]
pub struct NewBookingLineRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub notes: Option<String>,
}

impl NewBookingLineRow {
    pub fn from_view(booking_id: Uuid, line: &BookingLineView) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            service_id: line.service_id,
            service_name: line.service_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price.clone(),
            total_price: line.total_price.clone(),
            notes: line.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = payments)]
#[diesel(belongs_to(BookingRow, foreign_key = booking_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: BigDecimal,
    pub payment_method: String,
    pub payment_status: String,
    pub transaction_id: Option<String>,
    pub session_id: Option<String>,
    pub notes: Option<String>,
    pub payment_date: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentView {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PaymentView {
            id: row.id,
            booking_id: row.booking_id,
            amount: row.amount,
            method: row.payment_method.parse()?,
            status: row.payment_status.parse()?,
            transaction_id: row.transaction_id,
            session_id: row.session_id,
            notes: row.notes,
            payment_date: row.payment_date,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: BigDecimal,
    pub payment_method: String,
    pub payment_status: String,
    pub transaction_id: Option<String>,
    pub session_id: Option<String>,
    pub notes: Option<String>,
}

// ── Contact messages ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = contact_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContactMessageRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub preferred_dates: Option<String>,
    pub number_of_guests: Option<i32>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<ContactMessageRow> for ContactMessage {
    fn from(row: ContactMessageRow) -> Self {
        ContactMessage {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            subject: row.subject,
            preferred_dates: row.preferred_dates,
            number_of_guests: row.number_of_guests,
            message: row.message,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contact_messages)]
pub struct NewContactMessageRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub preferred_dates: Option<String>,
    pub number_of_guests: Option<i32>,
    pub message: String,
}
