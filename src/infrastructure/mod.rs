pub mod booking_repo;
pub mod cart_repo;
pub mod catalog_repo;
pub mod contact_repo;
pub mod mailer;
#[cfg(test)]
pub mod memory;
pub mod models;
pub mod order_repo;
pub mod stripe;
pub mod user_repo;

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::domain::errors::DomainError;

pub use booking_repo::DieselBookingRepository;
pub use cart_repo::DieselCartRepository;
pub use catalog_repo::DieselCatalogRepository;
pub use contact_repo::DieselContactRepository;
pub use order_repo::DieselOrderRepository;
pub use user_repo::DieselUserRepository;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::NotFound => DomainError::NotFound("record"),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DomainError::Conflict(info.message().to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}
