use std::sync::Arc;

use crate::application::run_blocking;
use crate::domain::contact::{ContactMessage, NewContactMessage};
use crate::domain::errors::DomainError;
use crate::domain::ports::ContactRepository;
use crate::notifications::{templates, EmailQueue};

#[derive(Clone)]
pub struct ContactService {
    contacts: Arc<dyn ContactRepository>,
    emails: EmailQueue,
    admin_email: String,
}

impl ContactService {
    pub fn new(contacts: Arc<dyn ContactRepository>, emails: EmailQueue, admin_email: impl Into<String>) -> Self {
        Self {
            contacts,
            emails,
            admin_email: admin_email.into(),
        }
    }

    /// Stores the enquiry, then notifies staff and acknowledges the sender.
    pub async fn submit(&self, message: NewContactMessage) -> Result<ContactMessage, DomainError> {
        if matches!(message.number_of_guests, Some(n) if n <= 0) {
            return Err(DomainError::invalid("number_of_guests must be greater than 0"));
        }
        let contacts = self.contacts.clone();
        let stored = run_blocking(move || contacts.create(message)).await?;
        log::info!(
            target: "contact",
            "contact message created id={} subject={:?} email={}",
            stored.id,
            stored.subject,
            stored.email
        );
        self.emails
            .enqueue(templates::contact_admin_notice(&stored, &self.admin_email));
        self.emails.enqueue(templates::contact_acknowledgement(&stored));
        Ok(stored)
    }
}
