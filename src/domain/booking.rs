use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::money::Totals;
use super::payment::{PaymentStatus, PaymentView, SettlementStatus};
use super::user::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Statuses a checkout may reuse instead of opening a new booking.
    pub const REUSABLE: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
    ];
}

impl FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "in_progress" => Ok(BookingStatus::InProgress),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(DomainError::invalid(format!("unknown booking status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookingLineView {
    pub service_id: Uuid,
    pub service_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BookingView {
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
    pub status: BookingStatus,
    pub payment_status: SettlementStatus,
    pub totals: Totals,
    pub special_requests: Option<String>,
    pub admin_notes: Option<String>,
    pub lines: Vec<BookingLineView>,
    pub payments: Vec<PaymentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingView {
    pub fn total_paid(&self) -> BigDecimal {
        total_completed(&self.payments)
    }

    /// Vendor checkout is only offered while something is still owed.
    pub fn accepts_payment(&self) -> bool {
        self.payment_status != SettlementStatus::Paid && self.status != BookingStatus::Cancelled
    }

    pub fn ensure_payable(&self) -> Result<(), DomainError> {
        if self.payment_status == SettlementStatus::Paid {
            return Err(DomainError::invalid("This booking has already been paid"));
        }
        if self.status == BookingStatus::Cancelled {
            return Err(DomainError::invalid("Cannot pay for a cancelled booking"));
        }
        Ok(())
    }

    pub fn ensure_cancellable(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid(format!(
                "Cannot cancel a booking that is already {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    /// Staff and the owning user always pass. Anyone else must present the
    /// guest email the booking was made with.
    pub fn authorize(&self, requester: &Requester) -> Result<(), DomainError> {
        if let Some(principal) = &requester.principal {
            if principal.is_staff || self.user_id == Some(principal.id) {
                return Ok(());
            }
            if self.user_id.is_some() {
                return Err(DomainError::forbidden(
                    "You don't have permission to access this booking",
                ));
            }
        }
        match &requester.email {
            Some(email) if email.trim().eq_ignore_ascii_case(self.guest_email.trim()) => Ok(()),
            _ => Err(DomainError::forbidden("Invalid email for this booking")),
        }
    }
}

/// Who is acting on a booking: an authenticated user, a guest email, or both.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    pub principal: Option<Principal>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BookingLineInput {
    pub service_id: Uuid,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: Option<Uuid>,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub booking_date: NaiveDate,
    pub booking_time: Option<NaiveTime>,
    pub number_of_guests: i32,
    pub special_requests: Option<String>,
    pub lines: Vec<BookingLineInput>,
}

impl NewBooking {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.lines.is_empty() {
            return Err(DomainError::invalid("At least one service must be selected"));
        }
        if self.lines.iter().any(|l| l.quantity <= 0) {
            return Err(DomainError::invalid("Quantity must be greater than 0"));
        }
        if self.number_of_guests <= 0 {
            return Err(DomainError::invalid("number_of_guests must be greater than 0"));
        }
        Ok(())
    }
}

/// Enforce a service's head-count limits against a requested quantity.
pub fn check_people_limits(
    service_name: &str,
    min_people: Option<i32>,
    max_people: Option<i32>,
    quantity: i32,
) -> Result<(), DomainError> {
    if let Some(min) = min_people {
        if quantity < min {
            return Err(DomainError::invalid(format!(
                "Service '{service_name}' requires minimum {min} people"
            )));
        }
    }
    if let Some(max) = max_people {
        if quantity > max {
            return Err(DomainError::invalid(format!(
                "Service '{service_name}' allows maximum {max} people"
            )));
        }
    }
    Ok(())
}

pub fn total_completed(payments: &[PaymentView]) -> BigDecimal {
    payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .fold(BigDecimal::zero(), |acc, p| acc + &p.amount)
}

/// Booking state derived from the sum of its completed payments.
pub fn settle(
    total_amount: &BigDecimal,
    total_paid: &BigDecimal,
    status: BookingStatus,
    payment_status: SettlementStatus,
) -> (BookingStatus, SettlementStatus) {
    if total_paid <= &BigDecimal::zero() {
        return (status, payment_status);
    }
    if total_paid >= total_amount {
        let status = match status {
            BookingStatus::Pending => BookingStatus::Confirmed,
            other => other,
        };
        (status, SettlementStatus::Paid)
    } else {
        (status, SettlementStatus::Partial)
    }
}

/// Result of recording a payment against a booking.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub booking: BookingView,
    pub payment_id: Uuid,
    /// False when the vendor session had already been recorded.
    pub newly_recorded: bool,
    pub cart_closed: bool,
}

#[derive(Debug, Clone)]
pub struct PaymentSummary {
    pub booking_number: String,
    pub status: BookingStatus,
    pub payment_status: SettlementStatus,
    pub total_amount: BigDecimal,
    pub total_paid: BigDecimal,
    pub remaining: BigDecimal,
    pub payments: Vec<PaymentView>,
}

impl From<BookingView> for PaymentSummary {
    fn from(booking: BookingView) -> Self {
        let total_paid = booking.total_paid();
        let remaining = &booking.totals.total_amount - &total_paid;
        Self {
            booking_number: booking.booking_number,
            status: booking.status,
            payment_status: booking.payment_status,
            total_amount: booking.totals.total_amount,
            total_paid,
            remaining,
            payments: booking.payments,
        }
    }
}

/// `<prefix>-YYYYMMDD-XXXXXXXX`, e.g. `BK-20250101-1A2B3C4D`.
pub fn generate_reference(prefix: &str, now: DateTime<Utc>) -> String {
    let unique = Uuid::new_v4().simple().to_string();
    format!(
        "{prefix}-{}-{}",
        now.format("%Y%m%d"),
        unique[..8].to_uppercase()
    )
}
