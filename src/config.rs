//! Process configuration, read once from the environment at startup.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::domain::payment::CheckoutUrls;
use crate::notifications::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_access_ttl_minutes: i64,
    pub jwt_refresh_ttl_minutes: i64,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub payment_currency: String,
    pub payment_success_url: String,
    pub payment_cancel_url: String,
    pub base_frontend_url: String,
    /// Without an SMTP host, emails are only logged.
    pub smtp: Option<SmtpSettings>,
    /// Sender address, and the mailbox staff notifications go to.
    pub default_from_email: String,
    pub email_max_retries: u32,
    pub email_backoff_secs: u64,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn or_default(name: &str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

fn parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: "must be at least 32 characters".to_string(),
            });
        }

        let base_frontend_url = or_default("BASE_FRONTEND_URL", "http://localhost:3000");
        let smtp = match optional("SMTP_HOST") {
            Some(host) => Some(SmtpSettings {
                host,
                port: parsed("SMTP_PORT", 587)?,
                username: optional("SMTP_USERNAME"),
                password: optional("SMTP_PASSWORD"),
            }),
            None => None,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: or_default("HOST", "0.0.0.0"),
            port: parsed("PORT", 8080)?,
            jwt_secret,
            jwt_access_ttl_minutes: parsed("JWT_ACCESS_TTL_MINUTES", 60)?,
            jwt_refresh_ttl_minutes: parsed("JWT_REFRESH_TTL_MINUTES", 1440)?,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            stripe_api_base: or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            payment_currency: or_default("PAYMENT_CURRENCY", "aed"),
            payment_success_url: optional("PAYMENT_SUCCESS_URL")
                .unwrap_or_else(|| format!("{base_frontend_url}/payment/success")),
            payment_cancel_url: optional("PAYMENT_CANCEL_URL")
                .unwrap_or_else(|| format!("{base_frontend_url}/payment/cancel")),
            base_frontend_url,
            smtp,
            default_from_email: or_default("DEFAULT_FROM_EMAIL", "noreply@azurehorizon.com"),
            email_max_retries: parsed("EMAIL_MAX_RETRIES", 3)?,
            email_backoff_secs: parsed("EMAIL_BACKOFF_SECS", 60)?,
        })
    }

    pub fn checkout_urls(&self) -> CheckoutUrls {
        CheckoutUrls {
            success_url: self.payment_success_url.clone(),
            cancel_url: self.payment_cancel_url.clone(),
            currency: self.payment_currency.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.email_max_retries,
            Duration::from_secs(self.email_backoff_secs),
        )
    }
}

#[cfg(test)]
impl Settings {
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/resort".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            jwt_secret: "a-test-secret-that-is-long-enough-123".to_string(),
            jwt_access_ttl_minutes: 60,
            jwt_refresh_ttl_minutes: 1440,
            stripe_secret_key: "sk_test".to_string(),
            stripe_webhook_secret: "whsec_test".to_string(),
            stripe_api_base: "https://api.stripe.com".to_string(),
            payment_currency: "aed".to_string(),
            payment_success_url: "https://resort.test/payment/success".to_string(),
            payment_cancel_url: "https://resort.test/payment/cancel".to_string(),
            base_frontend_url: "https://resort.test".to_string(),
            smtp: None,
            default_from_email: "bookings@resort.test".to_string(),
            email_max_retries: 3,
            email_backoff_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_uses_configured_backoff() {
        let settings = Settings::for_tests();
        let policy = settings.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay(1), Duration::from_secs(120));
        assert_eq!(settings.checkout_urls().currency, "aed");
    }
}
