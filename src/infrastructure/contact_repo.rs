use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::contact::{ContactMessage, NewContactMessage};
use crate::domain::errors::DomainError;
use crate::domain::ports::ContactRepository;
use crate::schema::contact_messages;

use super::models::{ContactMessageRow, NewContactMessageRow};

pub struct DieselContactRepository {
    pool: DbPool,
}

impl DieselContactRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ContactRepository for DieselContactRepository {
    fn create(&self, message: NewContactMessage) -> Result<ContactMessage, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(contact_messages::table)
            .values(&NewContactMessageRow {
                id: Uuid::new_v4(),
                first_name: message.first_name,
                last_name: message.last_name,
                email: message.email,
                phone: message.phone,
                subject: message.subject,
                preferred_dates: message.preferred_dates,
                number_of_guests: message.number_of_guests,
                message: message.message,
            })
            .returning(ContactMessageRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }
}
