use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::domain::errors::DomainError;
use crate::domain::ports::{EmailMessage, Mailer};

/// SMTP relay over STARTTLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        from: &str,
    ) -> Result<Self, DomainError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| DomainError::Internal(format!("SMTP relay error: {e}")))?
            .port(port);
        if let (Some(username), Some(password)) = (username, password) {
            builder = builder.credentials(Credentials::new(username, password));
        }
        Ok(Self {
            transport: builder.build(),
            from: from.to_string(),
        })
    }
}

pub fn build_message(from: &str, message: &EmailMessage) -> Result<Message, DomainError> {
    Message::builder()
        .from(
            from.parse()
                .map_err(|e| DomainError::invalid(format!("Invalid from address: {e}")))?,
        )
        .to(message
            .to
            .parse()
            .map_err(|e| DomainError::invalid(format!("Invalid to address: {e}")))?)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| DomainError::Internal(format!("Failed to build email: {e}")))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DomainError> {
        let email = build_message(&self.from, message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| DomainError::Internal(format!("Failed to send email: {e}")))?;
        Ok(())
    }
}

/// Writes emails to the log instead of sending them. Used when no SMTP host
/// is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DomainError> {
        log::info!(
            target: "email",
            "email not sent (no SMTP configured) to={} subject={:?}",
            message.to,
            message.subject
        );
        log::debug!(target: "email", "{}", message.body);
        Ok(())
    }
}
