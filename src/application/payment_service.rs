use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::application::run_blocking;
use crate::domain::booking::Settlement;
use crate::domain::errors::DomainError;
use crate::domain::money::from_minor_units;
use crate::domain::payment::{PaymentMethod, PaymentRecord, PaymentStatus, VendorSession, WebhookEvent};
use crate::domain::ports::{BookingRepository, PaymentGateway};
use crate::notifications::{templates, EmailQueue};

/// Result of confirming a vendor session against a booking.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub settlement: Settlement,
    pub customer_email: Option<String>,
    pub vendor_status: String,
    pub paid_amount: BigDecimal,
}

#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    Settled { booking_number: String, newly_recorded: bool },
    /// The session completed without funds captured yet (async methods).
    AwaitingFunds { session_id: String },
    PaymentFailed { updated: usize },
    Ignored { kind: String },
}

/// Vendor checkout ids look like `cs_<alphanumerics and underscores>`. They end
/// up in a vendor URL path, so nothing else is let through.
fn is_session_id(id: &str) -> bool {
    id.len() <= 255
        && id
            .strip_prefix("cs_")
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

/// Reconciles vendor checkouts with bookings, from client polling and from
/// signed webhooks alike.
#[derive(Clone)]
pub struct PaymentService {
    bookings: Arc<dyn BookingRepository>,
    gateway: Arc<dyn PaymentGateway>,
    emails: EmailQueue,
}

impl PaymentService {
    pub fn new(bookings: Arc<dyn BookingRepository>, gateway: Arc<dyn PaymentGateway>, emails: EmailQueue) -> Self {
        Self {
            bookings,
            gateway,
            emails,
        }
    }

    pub async fn verify(&self, session_id: &str, booking_number: Option<String>) -> Result<VerifiedPayment, DomainError> {
        if session_id.trim().is_empty() {
            return Err(DomainError::invalid("session_id is required"));
        }
        if !is_session_id(session_id) {
            return Err(DomainError::invalid("Invalid session_id"));
        }
        let session = self.gateway.retrieve_checkout_session(session_id).await?;
        if let (Some(requested), Some(reported)) = (&booking_number, &session.booking_number) {
            if requested != reported {
                log::warn!(
                    target: "payment",
                    "verify mismatch session_id={session_id} requested={requested} reported={reported}"
                );
                return Err(DomainError::invalid("Session does not belong to this booking"));
            }
        }
        if !session.paid {
            return Err(DomainError::invalid(format!(
                "Payment not completed (status: {})",
                session.payment_status
            )));
        }
        let booking_number = booking_number
            .or_else(|| session.booking_number.clone())
            .ok_or_else(|| DomainError::invalid("booking_number is required"))?;

        let (settlement, paid_amount) = self.confirm(&booking_number, &session).await?;
        log::info!(
            target: "payment",
            "payment verified booking={booking_number} session_id={session_id} newly_recorded={}",
            settlement.newly_recorded
        );
        Ok(VerifiedPayment {
            settlement,
            customer_email: session.customer_email,
            vendor_status: session.payment_status,
            paid_amount,
        })
    }

    /// `payload` must be the raw request body the signature was computed over.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome, DomainError> {
        let event = self
            .gateway
            .parse_webhook(payload, signature)
            .inspect_err(|e| log::warn!(target: "payment", "webhook rejected: {e}"))?;

        match event {
            WebhookEvent::CheckoutCompleted(session) => {
                if !session.paid {
                    log::info!(target: "payment", "webhook session not yet paid session_id={}", session.id);
                    return Ok(WebhookOutcome::AwaitingFunds { session_id: session.id });
                }
                let booking_number = session
                    .booking_number
                    .clone()
                    .ok_or_else(|| DomainError::invalid("Checkout session carries no booking number"))?;
                let (settlement, _) = self.confirm(&booking_number, &session).await?;
                log::info!(
                    target: "payment",
                    "webhook settled booking={booking_number} session_id={} newly_recorded={}",
                    session.id,
                    settlement.newly_recorded
                );
                Ok(WebhookOutcome::Settled {
                    booking_number,
                    newly_recorded: settlement.newly_recorded,
                })
            }
            WebhookEvent::PaymentFailed { reference } => {
                let bookings = self.bookings.clone();
                let lookup = reference.clone();
                let updated = run_blocking(move || bookings.mark_payment_failed(&lookup)).await?;
                log::warn!(target: "payment", "payment failed reference={reference} updated={updated}");
                Ok(WebhookOutcome::PaymentFailed { updated })
            }
            WebhookEvent::Other { kind } => {
                log::debug!(target: "payment", "webhook ignored type={kind}");
                Ok(WebhookOutcome::Ignored { kind })
            }
        }
    }

    /// Records the session as a completed online payment. Replays of the same
    /// session are absorbed by the repository.
    async fn confirm(&self, booking_number: &str, session: &VendorSession) -> Result<(Settlement, BigDecimal), DomainError> {
        let bookings = self.bookings.clone();
        let number = booking_number.to_string();
        let reported = session.amount_total.map(from_minor_units);
        let record = PaymentRecord {
            amount: BigDecimal::from(0),
            method: PaymentMethod::Online,
            status: PaymentStatus::Completed,
            transaction_id: session.payment_intent.clone(),
            session_id: Some(session.id.clone()),
            notes: Some("Paid through hosted checkout.".to_string()),
        };

        let (settlement, amount) = run_blocking(move || {
            let booking = bookings
                .find_by_number(&number)?
                .ok_or(DomainError::NotFound("Booking"))?;
            let amount = reported.unwrap_or_else(|| booking.totals.total_amount.clone());
            let settlement = bookings.record_payment(
                &number,
                PaymentRecord {
                    amount: amount.clone(),
                    ..record
                },
            )?;
            Ok((settlement, amount))
        })
        .await?;

        if settlement.newly_recorded {
            self.emails
                .enqueue(templates::payment_confirmation(&settlement.booking));
        }
        Ok((settlement, amount))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;
    use crate::application::testing::{FakeGateway, VALID_SIGNATURE};
    use crate::domain::booking::{BookingLineView, BookingStatus, BookingView, NewBooking};
    use crate::domain::cart::AddCartItem;
    use crate::domain::money::line_total;
    use crate::domain::order::{CustomerContact, OrderStatus};
    use crate::domain::payment::{CheckoutSessionRequest, CheckoutUrls, SettlementStatus};
    use crate::domain::ports::{CartRepository, EmailMessage, OrderRepository};
    use crate::infrastructure::memory::MemoryStore;
    use crate::notifications::testing::drain;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        gateway: Arc<FakeGateway>,
        service: PaymentService,
        outbox: mpsc::Receiver<EmailMessage>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(FakeGateway::default());
        let (emails, outbox) = EmailQueue::channel(32);
        let service = PaymentService::new(store.clone(), gateway.clone(), emails);
        Fixture {
            store,
            gateway,
            service,
            outbox,
        }
    }

    fn urls() -> CheckoutUrls {
        CheckoutUrls {
            success_url: "https://resort.test/ok".to_string(),
            cancel_url: "https://resort.test/cancel".to_string(),
            currency: "aed".to_string(),
        }
    }

    /// A 105.00 guest booking with an open vendor session.
    async fn booking_with_session(fx: &Fixture) -> (BookingView, String) {
        let spa = fx.store.seed_service("Spa", dec("50.00"), None, None);
        let booking = crate::domain::ports::BookingRepository::create(
            fx.store.as_ref(),
            NewBooking {
                user_id: None,
                guest_name: "Grace".to_string(),
                guest_email: "grace@example.com".to_string(),
                guest_phone: "555".to_string(),
                booking_date: NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date"),
                booking_time: None,
                number_of_guests: 2,
                special_requests: None,
                lines: vec![],
            },
            vec![BookingLineView {
                service_id: spa.id,
                service_name: spa.name.clone(),
                quantity: 2,
                total_price: line_total(&spa.price, 2),
                unit_price: spa.price,
                notes: None,
            }],
        )
        .expect("booking");
        let request = CheckoutSessionRequest::for_booking(&booking, &urls()).expect("request");
        let session = fx
            .gateway
            .create_checkout_session(&request)
            .await
            .expect("session");
        (booking, session.id)
    }

    fn completed_event(session_id: &str, booking_number: &str, amount: i64) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": session_id,
                "payment_status": "paid",
                "amount_total": amount,
                "customer_email": "grace@example.com",
                "payment_intent": "pi_1",
                "metadata": { "booking_number": booking_number }
            }}
        }))
        .expect("json")
    }

    #[tokio::test]
    async fn verify_requires_a_paid_session() {
        let fx = fixture();
        let (booking, session_id) = booking_with_session(&fx).await;

        let err = fx
            .service
            .verify(&session_id, Some(booking.booking_number.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn verify_settles_the_booking_once() {
        let mut fx = fixture();
        let (booking, session_id) = booking_with_session(&fx).await;
        fx.gateway.mark_paid(&session_id);

        let first = fx
            .service
            .verify(&session_id, Some(booking.booking_number.clone()))
            .await
            .expect("verify");
        assert!(first.settlement.newly_recorded);
        assert_eq!(first.paid_amount, dec("105.00"));
        assert_eq!(first.settlement.booking.payment_status, SettlementStatus::Paid);
        assert_eq!(first.settlement.booking.status, BookingStatus::Confirmed);

        let second = fx.service.verify(&session_id, None).await.expect("verify again");
        assert!(!second.settlement.newly_recorded);
        assert_eq!(second.settlement.booking.payments.len(), 1);
        assert_eq!(second.settlement.booking.total_paid(), dec("105.00"));

        assert_eq!(drain(&mut fx.outbox).len(), 1);
    }

    #[tokio::test]
    async fn verify_rejects_a_foreign_booking_number() {
        let fx = fixture();
        let (_, session_id) = booking_with_session(&fx).await;
        fx.gateway.mark_paid(&session_id);

        let err = fx
            .service
            .verify(&session_id, Some("BK-20250101-FFFFFFFF".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn malformed_session_id_never_reaches_the_vendor() {
        let fx = fixture();
        for id in ["../v1/customers", "cs_", "pi_123", "cs_test/1", "cs_test?expand=x", "cs_ü"] {
            assert!(
                matches!(fx.service.verify(id, None).await, Err(DomainError::InvalidInput(_))),
                "{id:?} should be rejected"
            );
        }
        assert!(is_session_id("cs_test_a1B2"));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let fx = fixture();
        assert!(matches!(
            fx.service.verify("cs_missing", None).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn partial_vendor_amount_yields_partial_status() {
        let fx = fixture();
        let (booking, session_id) = booking_with_session(&fx).await;
        fx.gateway.mark_paid(&session_id);
        fx.gateway.set_amount(&session_id, 6000);

        let verified = fx
            .service
            .verify(&session_id, Some(booking.booking_number))
            .await
            .expect("verify");
        assert_eq!(verified.settlement.booking.payment_status, SettlementStatus::Partial);
        assert_eq!(verified.settlement.booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn webhook_and_poll_record_one_payment() {
        let fx = fixture();
        let (booking, session_id) = booking_with_session(&fx).await;
        fx.gateway.mark_paid(&session_id);
        let payload = completed_event(&session_id, &booking.booking_number, 10500);

        let outcome = fx
            .service
            .handle_webhook(&payload, VALID_SIGNATURE)
            .await
            .expect("webhook");
        assert!(matches!(outcome, WebhookOutcome::Settled { newly_recorded: true, .. }));

        let verified = fx
            .service
            .verify(&session_id, Some(booking.booking_number.clone()))
            .await
            .expect("poll");
        assert!(!verified.settlement.newly_recorded);
        assert_eq!(verified.settlement.booking.payments.len(), 1);
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_is_rejected() {
        let fx = fixture();
        let (booking, session_id) = booking_with_session(&fx).await;
        let payload = completed_event(&session_id, &booking.booking_number, 10500);

        let err = fx
            .service
            .handle_webhook(&payload, "t=1,v1=forged")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unrelated_events_are_ignored() {
        let fx = fixture();
        let payload = serde_json::to_vec(&json!({
            "id": "evt_2",
            "type": "customer.created",
            "data": { "object": { "id": "cus_1" } }
        }))
        .expect("json");

        let outcome = fx
            .service
            .handle_webhook(&payload, VALID_SIGNATURE)
            .await
            .expect("webhook");
        assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
    }

    #[tokio::test]
    async fn paid_cart_checkout_closes_cart_and_completes_order() {
        let fx = fixture();
        let user = fx.store.seed_user("ada", false);
        let spa = fx.store.seed_service("Spa", dec("50.00"), None, None);
        fx.store
            .add_item(
                user.id,
                AddCartItem {
                    service_id: spa.id,
                    quantity: 2,
                    booking_date: None,
                    booking_time: None,
                    special_requests: None,
                },
                spa.price.clone(),
            )
            .expect("add");
        let placed = fx
            .store
            .place_from_cart(
                user.id,
                CustomerContact {
                    name: "Ada".into(),
                    email: "ada@example.com".into(),
                    phone: "555".into(),
                    special_instructions: None,
                },
            )
            .expect("place");
        let request = CheckoutSessionRequest::for_booking(&placed.booking, &urls()).expect("request");
        let session = fx.gateway.create_checkout_session(&request).await.expect("session");
        crate::domain::ports::BookingRepository::set_payment_session(
            fx.store.as_ref(),
            placed.payment_id,
            &session.id,
        )
        .expect("session stored");
        fx.gateway.mark_paid(&session.id);

        let verified = fx.service.verify(&session.id, None).await.expect("verify");

        assert!(verified.settlement.cart_closed);
        assert_eq!(verified.settlement.payment_id, placed.payment_id);
        assert!(fx.store.open_cart_of(user.id).is_none());
        let order = fx.store.order(placed.order.id).expect("order");
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.payment_status, SettlementStatus::Paid);
        assert!(order.fulfillment_date.is_some());
    }
}
