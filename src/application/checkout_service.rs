use std::sync::Arc;

use uuid::Uuid;

use crate::application::run_blocking;
use crate::domain::errors::DomainError;
use crate::domain::order::{CustomerContact, OrderView};
use crate::domain::payment::{CheckoutSession, CheckoutSessionRequest, CheckoutUrls};
use crate::domain::ports::{BookingRepository, OrderRepository, PaymentGateway};
use crate::domain::{Page, PageRequest};

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: OrderView,
    pub booking_number: String,
    pub payment_id: Uuid,
    pub checkout_url: String,
    pub session_id: String,
}

/// Turns a cart into an order and hands the customer to the vendor's hosted
/// checkout. Also serves the order history.
#[derive(Clone)]
pub struct CheckoutService {
    orders: Arc<dyn OrderRepository>,
    bookings: Arc<dyn BookingRepository>,
    gateway: Arc<dyn PaymentGateway>,
    urls: CheckoutUrls,
}

impl CheckoutService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        bookings: Arc<dyn BookingRepository>,
        gateway: Arc<dyn PaymentGateway>,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            orders,
            bookings,
            gateway,
            urls,
        }
    }

    pub async fn checkout(&self, user_id: Uuid, contact: CustomerContact) -> Result<CheckoutOutcome, DomainError> {
        let orders = self.orders.clone();
        let placed = run_blocking(move || orders.place_from_cart(user_id, contact)).await?;
        log::info!(
            target: "payment",
            "order placed order={} booking={} user_id={user_id}",
            placed.order.order_number,
            placed.booking.booking_number
        );

        let session = match self.open_session(&placed.booking).await {
            Ok(session) => session,
            Err(e) => {
                log::error!(
                    target: "payment",
                    "checkout session failed order={} booking={}: {e}",
                    placed.order.order_number,
                    placed.booking.booking_number
                );
                let orders = self.orders.clone();
                let (order_id, payment_id) = (placed.order.id, placed.payment_id);
                if let Err(undo) = run_blocking(move || orders.abandon_checkout(order_id, payment_id)).await {
                    log::error!(target: "payment", "could not abandon checkout order_id={order_id}: {undo}");
                }
                return Err(match e {
                    DomainError::Gateway(_) => e,
                    other => DomainError::Gateway(other.to_string()),
                });
            }
        };

        let bookings = self.bookings.clone();
        let (payment_id, session_id) = (placed.payment_id, session.id.clone());
        run_blocking(move || bookings.set_payment_session(payment_id, &session_id)).await?;
        log::info!(
            target: "payment",
            "checkout session created booking={} session_id={}",
            placed.booking.booking_number,
            session.id
        );

        Ok(CheckoutOutcome {
            order: placed.order,
            booking_number: placed.booking.booking_number,
            payment_id: placed.payment_id,
            checkout_url: session.url,
            session_id: session.id,
        })
    }

    async fn open_session(
        &self,
        booking: &crate::domain::booking::BookingView,
    ) -> Result<CheckoutSession, DomainError> {
        let request = CheckoutSessionRequest::for_booking(booking, &self.urls)?;
        self.gateway.create_checkout_session(&request).await
    }

    pub async fn order(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderView, DomainError> {
        let orders = self.orders.clone();
        run_blocking(move || {
            orders
                .find_for_user(user_id, order_id)?
                .ok_or(DomainError::NotFound("Order"))
        })
        .await
    }

    pub async fn orders(&self, user_id: Uuid, page: i64, limit: i64) -> Result<Page<OrderView>, DomainError> {
        let orders = self.orders.clone();
        let page = PageRequest::new(page, limit, MAX_PAGE_SIZE);
        run_blocking(move || orders.list_for_user(user_id, page)).await
    }
}
