use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub gender: Option<String>,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub password_hash: String,
}

/// User plus the stored password hash, only ever loaded for login.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
}

impl ProfileChanges {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(gender) = &self.gender {
            if gender != "F" && gender != "M" {
                return Err(DomainError::invalid("gender must be 'F' or 'M'"));
            }
        }
        if matches!(&self.username, Some(u) if u.trim().is_empty()) {
            return Err(DomainError::invalid("username must not be blank"));
        }
        Ok(())
    }
}

/// The authenticated caller, as carried by a verified access token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}
