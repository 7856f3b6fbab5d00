use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::application::run_blocking;
use crate::domain::booking::{
    check_people_limits, BookingLineInput, BookingLineView, BookingStatus, BookingView, NewBooking,
    PaymentSummary, Requester, Settlement,
};
use crate::domain::errors::DomainError;
use crate::domain::money::{line_total, round_money};
use crate::domain::payment::{CheckoutSession, CheckoutSessionRequest, CheckoutUrls, PaymentRecord, SettlementStatus};
use crate::domain::ports::{BookingRepository, CatalogRepository, PaymentGateway, UserRepository};
use crate::domain::user::Principal;
use crate::domain::{Page, PageRequest};
use crate::notifications::{templates, EmailQueue};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A booking as submitted by the client. Guest contact fields may be left
/// out by signed-in users, whose profile fills the gaps.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub booking_date: NaiveDate,
    pub booking_time: Option<NaiveTime>,
    pub number_of_guests: i32,
    pub special_requests: Option<String>,
    pub services: Vec<BookingLineInput>,
}

#[derive(Debug, Clone)]
pub struct BookingCheckout {
    pub booking_number: String,
    pub session: CheckoutSession,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    catalog: Arc<dyn CatalogRepository>,
    users: Arc<dyn UserRepository>,
    gateway: Arc<dyn PaymentGateway>,
    emails: EmailQueue,
    urls: CheckoutUrls,
    admin_email: String,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        catalog: Arc<dyn CatalogRepository>,
        users: Arc<dyn UserRepository>,
        gateway: Arc<dyn PaymentGateway>,
        emails: EmailQueue,
        urls: CheckoutUrls,
        admin_email: impl Into<String>,
    ) -> Self {
        Self {
            bookings,
            catalog,
            users,
            gateway,
            emails,
            urls,
            admin_email: admin_email.into(),
        }
    }

    async fn find(&self, booking_number: String) -> Result<BookingView, DomainError> {
        let bookings = self.bookings.clone();
        run_blocking(move || {
            bookings
                .find_by_number(&booking_number)?
                .ok_or(DomainError::NotFound("Booking"))
        })
        .await
    }

    pub async fn create(&self, principal: Option<Principal>, draft: BookingDraft) -> Result<BookingView, DomainError> {
        let catalog = self.catalog.clone();
        let users = self.users.clone();
        let bookings = self.bookings.clone();
        let user_id = principal.as_ref().map(|p| p.id);

        let booking = run_blocking(move || {
            let profile = match user_id {
                Some(id) => Some(users.find_by_id(id)?.ok_or(DomainError::NotFound("User"))?),
                None => None,
            };
            let guest_name = present(draft.guest_name).or_else(|| profile.as_ref().map(|u| u.full_name.clone()));
            let guest_email = present(draft.guest_email).or_else(|| profile.as_ref().map(|u| u.email.clone()));
            let guest_phone = present(draft.guest_phone).or_else(|| profile.as_ref().map(|u| u.phone.clone()));
            let (Some(guest_name), Some(guest_email), Some(guest_phone)) = (guest_name, guest_email, guest_phone)
            else {
                return Err(DomainError::invalid(
                    "guest_name, guest_email and guest_phone are required for guest bookings",
                ));
            };

            let new_booking = NewBooking {
                user_id,
                guest_name,
                guest_email,
                guest_phone,
                booking_date: draft.booking_date,
                booking_time: draft.booking_time,
                number_of_guests: draft.number_of_guests,
                special_requests: draft.special_requests,
                lines: draft.services,
            };
            new_booking.validate()?;

            let mut lines = Vec::with_capacity(new_booking.lines.len());
            for input in &new_booking.lines {
                let service = catalog
                    .find_by_id(input.service_id)?
                    .filter(|s| s.is_active)
                    .ok_or(DomainError::NotFound("Service"))?;
                check_people_limits(&service.name, service.min_people, service.max_people, input.quantity)?;
                lines.push(BookingLineView {
                    service_id: service.id,
                    service_name: service.name,
                    quantity: input.quantity,
                    total_price: line_total(&service.price, input.quantity),
                    unit_price: service.price,
                    notes: input.notes.clone(),
                });
            }
            bookings.create(new_booking, lines)
        })
        .await?;

        log::info!(
            target: "booking",
            "booking created booking={} user_id={:?} total={}",
            booking.booking_number,
            booking.user_id,
            booking.totals.total_amount
        );
        self.emails.enqueue(templates::booking_confirmation(&booking));
        self.emails
            .enqueue(templates::booking_admin_notice(&booking, &self.admin_email));
        Ok(booking)
    }

    pub async fn my_bookings(&self, user_id: Uuid, page: i64, limit: Option<i64>) -> Result<Page<BookingView>, DomainError> {
        let bookings = self.bookings.clone();
        let page = PageRequest::new(page, limit.unwrap_or(DEFAULT_PAGE_SIZE), MAX_PAGE_SIZE);
        run_blocking(move || bookings.list_for_user(user_id, page)).await
    }

    pub async fn detail(&self, booking_number: String, requester: &Requester) -> Result<BookingView, DomainError> {
        let booking = self.find(booking_number).await?;
        booking.authorize(requester)?;
        Ok(booking)
    }

    /// Staff override. `status` must name a known booking status.
    pub async fn update_status(
        &self,
        principal: &Principal,
        booking_number: String,
        status: &str,
        admin_notes: Option<String>,
    ) -> Result<BookingView, DomainError> {
        if !principal.is_staff {
            return Err(DomainError::forbidden("Only staff can change booking status"));
        }
        let status: BookingStatus = status.parse()?;
        let bookings = self.bookings.clone();
        let booking = run_blocking(move || bookings.update_status(&booking_number, status, admin_notes)).await?;
        log::info!(
            target: "booking",
            "booking status changed booking={} status={} by={}",
            booking.booking_number,
            booking.status.as_str(),
            principal.username
        );
        Ok(booking)
    }

    pub async fn cancel(&self, booking_number: String, requester: &Requester) -> Result<BookingView, DomainError> {
        let booking = self.find(booking_number).await?;
        booking.authorize(requester)?;
        booking.ensure_cancellable()?;

        let bookings = self.bookings.clone();
        let number = booking.booking_number.clone();
        let cancelled = run_blocking(move || bookings.update_status(&number, BookingStatus::Cancelled, None)).await?;
        log::info!(target: "booking", "booking cancelled booking={}", cancelled.booking_number);
        Ok(cancelled)
    }

    /// Staff-recorded payment of any method and status.
    pub async fn record_payment(
        &self,
        principal: &Principal,
        booking_number: String,
        mut payment: PaymentRecord,
    ) -> Result<Settlement, DomainError> {
        if !principal.is_staff {
            return Err(DomainError::forbidden("Only staff can record payments"));
        }
        payment.amount = round_money(&payment.amount);
        payment.validate()?;
        let method = payment.method;
        let bookings = self.bookings.clone();
        let settlement = run_blocking(move || bookings.record_payment(&booking_number, payment)).await?;
        log::info!(
            target: "payment",
            "manual payment recorded booking={} method={} payment_status={}",
            settlement.booking.booking_number,
            method.as_str(),
            settlement.booking.payment_status.as_str()
        );
        if settlement.newly_recorded && settlement.booking.payment_status == SettlementStatus::Paid {
            self.emails
                .enqueue(templates::payment_confirmation(&settlement.booking));
        }
        Ok(settlement)
    }

    /// Opens a vendor checkout charging the booking's full total, one line per service.
    pub async fn checkout_session(
        &self,
        booking_number: String,
        requester: &Requester,
    ) -> Result<BookingCheckout, DomainError> {
        let booking = self.find(booking_number).await?;
        booking.authorize(requester)?;
        booking.ensure_payable()?;

        let request = CheckoutSessionRequest::for_booking(&booking, &self.urls)?;
        let session = self
            .gateway
            .create_checkout_session(&request)
            .await
            .inspect_err(|e| {
                log::error!(target: "payment", "checkout session failed booking={}: {e}", booking.booking_number)
            })?;

        let bookings = self.bookings.clone();
        let (booking_id, amount, session_id) = (booking.id, booking.totals.total_amount.clone(), session.id.clone());
        run_blocking(move || {
            let payment_id = bookings.ensure_checkout_payment(booking_id, amount)?;
            bookings.set_payment_session(payment_id, &session_id)
        })
        .await?;

        log::info!(
            target: "payment",
            "checkout session created booking={} session_id={}",
            booking.booking_number,
            session.id
        );
        Ok(BookingCheckout {
            booking_number: booking.booking_number,
            session,
        })
    }

    pub async fn payment_status(&self, booking_number: String) -> Result<PaymentSummary, DomainError> {
        Ok(self.find(booking_number).await?.into())
    }
}
