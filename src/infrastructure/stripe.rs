//! Hosted checkout through Stripe's REST API (form-encoded, no SDK).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::domain::errors::DomainError;
use crate::domain::payment::{CheckoutSession, CheckoutSessionRequest, VendorSession, WebhookEvent};
use crate::domain::ports::PaymentGateway;

/// Signed webhook timestamps older than this are rejected.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
    webhook_secret: String,
}

impl StripeGateway {
    pub fn new(api_base: &str, secret_key: &str, webhook_secret: &str) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| DomainError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            webhook_secret: webhook_secret.to_string(),
        })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    url: Option<String>,
    payment_status: Option<String>,
    amount_total: Option<i64>,
    customer_email: Option<String>,
    customer_details: Option<CustomerDetails>,
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    /// Either an id or an expanded object.
    payment_intent: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

impl From<SessionObject> for VendorSession {
    fn from(s: SessionObject) -> Self {
        let payment_status = s.payment_status.unwrap_or_default();
        let payment_intent = s.payment_intent.and_then(|pi| match pi {
            serde_json::Value::String(id) => Some(id),
            other => other.get("id").and_then(|v| v.as_str()).map(str::to_string),
        });
        VendorSession {
            paid: payment_status == "paid",
            payment_status,
            amount_total: s.amount_total,
            customer_email: s
                .customer_details
                .and_then(|d| d.email)
                .or(s.customer_email),
            booking_number: s
                .metadata
                .get("booking_number")
                .cloned()
                .or(s.client_reference_id),
            payment_intent,
            id: s.id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Flatten a session request into Stripe's bracketed form keys.
pub fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("customer_email".to_string(), request.customer_email.clone()),
        ("client_reference_id".to_string(), request.booking_number.clone()),
        ("metadata[booking_number]".to_string(), request.booking_number.clone()),
        ("metadata[customer_name]".to_string(), request.customer_name.clone()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];
    for (i, line) in request.lines.iter().enumerate() {
        let key = |field: &str| format!("line_items[{i}]{field}");
        form.push((key("[price_data][currency]"), request.currency.clone()));
        form.push((key("[price_data][product_data][name]"), line.name.clone()));
        form.push((
            key("[price_data][product_data][description]"),
            line.description.clone(),
        ));
        form.push((key("[price_data][unit_amount]"), line.unit_amount.to_string()));
        form.push((key("[quantity]"), line.quantity.to_string()));
    }
    form
}

async fn vendor_error(resp: reqwest::Response) -> DomainError {
    let status = resp.status();
    let message = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| "no error message".to_string());
    DomainError::Gateway(format!("stripe returned {status}: {message}"))
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, DomainError> {
        let resp = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&session_form(request))
            .send()
            .await
            .map_err(|e| DomainError::Gateway(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(vendor_error(resp).await);
        }

        let session: SessionObject = resp
            .json()
            .await
            .map_err(|e| DomainError::Gateway(format!("malformed session: {e}")))?;
        let url = session
            .url
            .ok_or_else(|| DomainError::Gateway("session has no checkout url".into()))?;
        Ok(CheckoutSession { id: session.id, url })
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<VendorSession, DomainError> {
        let resp = self
            .client
            .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| DomainError::Gateway(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DomainError::NotFound("Checkout session"));
        }
        if !resp.status().is_success() {
            return Err(vendor_error(resp).await);
        }

        let session: SessionObject = resp
            .json()
            .await
            .map_err(|e| DomainError::Gateway(format!("malformed session: {e}")))?;
        Ok(session.into())
    }

    fn parse_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, DomainError> {
        verify_signature(
            payload,
            signature,
            &self.webhook_secret,
            chrono::Utc::now().timestamp(),
        )?;
        decode_event(payload)
    }
}

// ── Webhooks ─────────────────────────────────────────────────────────────────

/// Check a `Stripe-Signature: t=<unix>,v1=<hex>` header against the raw body.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), DomainError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        if let Some(t) = part.trim().strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.trim().strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let (Some(timestamp), false) = (timestamp, signatures.is_empty()) else {
        return Err(DomainError::invalid("Invalid Stripe-Signature header"));
    };
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| DomainError::invalid("Invalid signature timestamp"))?;
    if now.abs_diff(ts) > WEBHOOK_TOLERANCE_SECS.unsigned_abs() {
        return Err(DomainError::invalid("Webhook timestamp outside tolerance"));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| DomainError::Internal("webhook secret rejected by HMAC".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // verify_slice compares in constant time.
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(DomainError::invalid("Webhook signature mismatch"));
    }
    Ok(())
}

pub fn decode_event(payload: &[u8]) -> Result<WebhookEvent, DomainError> {
    let event: Event = serde_json::from_slice(payload)
        .map_err(|e| DomainError::invalid(format!("Invalid webhook payload: {e}")))?;

    let reference = || {
        event
            .data
            .object
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| DomainError::invalid("Webhook object has no id"))
    };

    match event.kind.as_str() {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            let session: SessionObject = serde_json::from_value(event.data.object.clone())
                .map_err(|e| DomainError::invalid(format!("Invalid checkout session: {e}")))?;
            Ok(WebhookEvent::CheckoutCompleted(session.into()))
        }
        "checkout.session.async_payment_failed"
        | "checkout.session.expired"
        | "payment_intent.payment_failed" => Ok(WebhookEvent::PaymentFailed {
            reference: reference()?,
        }),
        _ => Ok(WebhookEvent::Other { kind: event.kind.clone() }),
    }
}
