use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::booking::BookingView;
use super::errors::DomainError;
use super::money::to_minor_units;

/// Status of a single payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Initiated,
    WaitingForConfirmation,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initiated => "initiated",
            PaymentStatus::WaitingForConfirmation => "waiting_for_confirmation",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(PaymentStatus::Initiated),
            "waiting_for_confirmation" => Ok(PaymentStatus::WaitingForConfirmation),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::invalid(format!("unknown payment status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Online => "online",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "debit_card" => Ok(PaymentMethod::DebitCard),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "online" => Ok(PaymentMethod::Online),
            other => Err(DomainError::invalid(format!("unknown payment method '{other}'"))),
        }
    }
}

/// How much of a booking (or order) has been settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStatus {
    Unpaid,
    Partial,
    Paid,
    Refunded,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Unpaid => "unpaid",
            SettlementStatus::Partial => "partial",
            SettlementStatus::Paid => "paid",
            SettlementStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for SettlementStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(SettlementStatus::Unpaid),
            "partial" => Ok(SettlementStatus::Partial),
            "paid" => Ok(SettlementStatus::Paid),
            "refunded" => Ok(SettlementStatus::Refunded),
            other => Err(DomainError::invalid(format!("unknown payment status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentView {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: BigDecimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub session_id: Option<String>,
    pub notes: Option<String>,
    pub payment_date: DateTime<Utc>,
}

/// A payment to append to a booking.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub amount: BigDecimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub session_id: Option<String>,
    pub notes: Option<String>,
}

impl PaymentRecord {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.amount <= BigDecimal::from(0) {
            return Err(DomainError::invalid("amount must be greater than 0"));
        }
        Ok(())
    }
}

// ── Hosted checkout ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SessionLine {
    pub name: String,
    pub description: String,
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub booking_number: String,
    pub customer_email: String,
    pub customer_name: String,
    pub currency: String,
    pub lines: Vec<SessionLine>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
}

impl CheckoutSessionRequest {
    /// One vendor line per booked service plus a separate VAT line.
    pub fn for_booking(booking: &BookingView, urls: &CheckoutUrls) -> Result<Self, DomainError> {
        let mut lines = booking
            .lines
            .iter()
            .map(|line| {
                Ok(SessionLine {
                    name: line.service_name.clone(),
                    description: line
                        .notes
                        .clone()
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| "Resort service".to_string()),
                    unit_amount: to_minor_units(&line.unit_price)?,
                    quantity: line.quantity,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        if lines.is_empty() {
            return Err(DomainError::invalid("booking has no services to pay for"));
        }

        let tax = to_minor_units(&booking.totals.tax)?;
        if tax > 0 {
            lines.push(SessionLine {
                name: "VAT (5%)".to_string(),
                description: "Value Added Tax (VAT)".to_string(),
                unit_amount: tax,
                quantity: 1,
            });
        }

        Ok(Self {
            booking_number: booking.booking_number.clone(),
            customer_email: booking.guest_email.clone(),
            customer_name: booking.guest_name.clone(),
            currency: urls.currency.clone(),
            lines,
            success_url: format!(
                "{}?session_id={{CHECKOUT_SESSION_ID}}&booking_number={}",
                urls.success_url, booking.booking_number
            ),
            cancel_url: format!("{}?booking_number={}", urls.cancel_url, booking.booking_number),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// A checkout session as reported back by the vendor.
#[derive(Debug, Clone)]
pub struct VendorSession {
    pub id: String,
    pub paid: bool,
    pub payment_status: String,
    pub amount_total: Option<i64>,
    pub customer_email: Option<String>,
    pub booking_number: Option<String>,
    pub payment_intent: Option<String>,
}

#[derive(Debug, Clone)]
pub enum WebhookEvent {
    CheckoutCompleted(VendorSession),
    PaymentFailed { reference: String },
    Other { kind: String },
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::domain::booking::{BookingLineView, BookingStatus};
    use crate::domain::money::Totals;

    fn booking_with_lines(lines: Vec<BookingLineView>) -> BookingView {
        let totals = Totals::from_line_totals(lines.iter().map(|l| &l.total_price));
        BookingView {
            id: Uuid::new_v4(),
            booking_number: "BK-20250101-ABCDEF12".to_string(),
            user_id: None,
            order_id: None,
            guest_name: "Ada Guest".to_string(),
            guest_email: "ada@example.com".to_string(),
            guest_phone: "555-0100".to_string(),
            booking_date: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
            booking_time: None,
            number_of_guests: 2,
            status: BookingStatus::Pending,
            payment_status: SettlementStatus::Unpaid,
            totals,
            special_requests: None,
            admin_notes: None,
            lines,
            payments: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(name: &str, price: &str, quantity: i32) -> BookingLineView {
        let unit_price = BigDecimal::from_str(price).expect("valid decimal");
        BookingLineView {
            service_id: Uuid::new_v4(),
            service_name: name.to_string(),
            quantity,
            total_price: crate::domain::money::line_total(&unit_price, quantity),
            unit_price,
            notes: None,
        }
    }

    fn urls() -> CheckoutUrls {
        CheckoutUrls {
            success_url: "https://resort.test/payment/success".to_string(),
            cancel_url: "https://resort.test/payment/cancel".to_string(),
            currency: "aed".to_string(),
        }
    }

    #[test]
    fn session_request_adds_vat_line_in_minor_units() {
        let booking = booking_with_lines(vec![line("Spa", "50.00", 2)]);
        let req = CheckoutSessionRequest::for_booking(&booking, &urls()).expect("request");

        assert_eq!(req.lines.len(), 2);
        assert_eq!(req.lines[0].unit_amount, 5000);
        assert_eq!(req.lines[0].quantity, 2);
        assert_eq!(req.lines[1].name, "VAT (5%)");
        assert_eq!(req.lines[1].unit_amount, 500);
        assert!(req.success_url.ends_with("booking_number=BK-20250101-ABCDEF12"));
        assert!(req.success_url.contains("{CHECKOUT_SESSION_ID}"));
    }

    #[test]
    fn session_request_requires_lines() {
        let booking = booking_with_lines(vec![]);
        assert!(CheckoutSessionRequest::for_booking(&booking, &urls()).is_err());
    }

    #[test]
    fn manual_payment_amount_must_be_positive() {
        let record = PaymentRecord {
            amount: BigDecimal::from(0),
            method: PaymentMethod::Cash,
            status: PaymentStatus::Completed,
            transaction_id: None,
            session_id: None,
            notes: None,
        };
        assert!(record.validate().is_err());
    }
}
