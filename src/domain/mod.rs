pub mod booking;
pub mod cart;
pub mod catalog;
pub mod contact;
pub mod errors;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod user;

/// One page of a paginated listing plus the total row count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// 1-based page number and a page size clamped to `1..=max`. The page is
/// capped so that `offset()` always fits in an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64, max: i64) -> Self {
        let max = max.max(1);
        Self {
            page: page.clamp(1, i64::MAX / max),
            limit: limit.clamp(1, max),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}
