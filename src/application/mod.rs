pub mod auth_service;
pub mod booking_service;
pub mod cart_service;
pub mod catalog_service;
pub mod checkout_service;
pub mod contact_service;
pub mod payment_service;

use crate::domain::errors::DomainError;

/// Runs repository work on the blocking pool so async callers never hold a
/// runtime thread on a database round trip.
pub async fn run_blocking<F, T>(f: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(format!("blocking task failed: {e}")))?
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::domain::errors::DomainError;
    use crate::domain::payment::{CheckoutSession, CheckoutSessionRequest, VendorSession, WebhookEvent};
    use crate::domain::ports::PaymentGateway;
    use crate::infrastructure::stripe::decode_event;

    pub const VALID_SIGNATURE: &str = "t=1,v1=valid";

    /// Payment vendor double. Sessions start unpaid; tests flip them with
    /// `mark_paid`.
    #[derive(Default)]
    pub struct FakeGateway {
        pub fail_create: AtomicBool,
        counter: AtomicUsize,
        sessions: Mutex<HashMap<String, VendorSession>>,
        pub requests: Mutex<Vec<CheckoutSessionRequest>>,
    }

    impl FakeGateway {
        pub fn failing() -> Self {
            let gateway = Self::default();
            gateway.fail_create.store(true, Ordering::SeqCst);
            gateway
        }

        pub fn mark_paid(&self, session_id: &str) {
            let mut sessions = self.sessions.lock().expect("lock");
            if let Some(session) = sessions.get_mut(session_id) {
                session.paid = true;
                session.payment_status = "paid".to_string();
                session.payment_intent = Some(format!("pi_{session_id}"));
            }
        }

        pub fn set_amount(&self, session_id: &str, amount_total: i64) {
            let mut sessions = self.sessions.lock().expect("lock");
            if let Some(session) = sessions.get_mut(session_id) {
                session.amount_total = Some(amount_total);
            }
        }

        pub fn session(&self, session_id: &str) -> Option<VendorSession> {
            self.sessions.lock().expect("lock").get(session_id).cloned()
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_checkout_session(
            &self,
            request: &CheckoutSessionRequest,
        ) -> Result<CheckoutSession, DomainError> {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(DomainError::Gateway("vendor unavailable".to_string()));
            }
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            let id = format!("cs_test_{n}");
            let amount_total = request
                .lines
                .iter()
                .map(|l| l.unit_amount * i64::from(l.quantity))
                .sum();
            self.sessions.lock().expect("lock").insert(
                id.clone(),
                VendorSession {
                    id: id.clone(),
                    paid: false,
                    payment_status: "unpaid".to_string(),
                    amount_total: Some(amount_total),
                    customer_email: Some(request.customer_email.clone()),
                    booking_number: Some(request.booking_number.clone()),
                    payment_intent: None,
                },
            );
            self.requests.lock().expect("lock").push(request.clone());
            Ok(CheckoutSession {
                url: format!("https://checkout.test/{id}"),
                id,
            })
        }

        async fn retrieve_checkout_session(&self, session_id: &str) -> Result<VendorSession, DomainError> {
            self.session(session_id)
                .ok_or(DomainError::NotFound("Checkout session"))
        }

        fn parse_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, DomainError> {
            if signature != VALID_SIGNATURE {
                return Err(DomainError::invalid("Webhook signature mismatch"));
            }
            decode_event(payload)
        }
    }
}
