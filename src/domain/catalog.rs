use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone)]
pub struct ServiceView {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub synopsis: Option<String>,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub unit: Option<String>,
    pub duration: Option<String>,
    pub min_people: Option<i32>,
    pub max_people: Option<i32>,
    pub is_active: bool,
    pub rating: RatingSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub slug: Option<String>,
    pub synopsis: Option<String>,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub unit: Option<String>,
    pub duration: Option<String>,
    pub min_people: Option<i32>,
    pub max_people: Option<i32>,
}

impl NewService {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::invalid("name must not be blank"));
        }
        if self.price < BigDecimal::from(0) {
            return Err(DomainError::invalid("price must not be negative"));
        }
        if let (Some(min), Some(max)) = (self.min_people, self.max_people) {
            if min > max {
                return Err(DomainError::invalid("min_people exceeds max_people"));
            }
        }
        Ok(())
    }

    pub fn resolved_slug(&self) -> String {
        match &self.slug {
            Some(slug) if !slug.trim().is_empty() => slugify(slug),
            _ => slugify(&self.name),
        }
    }
}

/// Lowercase ASCII alphanumerics separated by single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Average review rating; zero when a service has no reviews.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub rating: f64,
    pub review_count: i64,
}

impl RatingSummary {
    pub fn from_ratings<I: IntoIterator<Item = i32>>(ratings: I) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0i64, 0i64), |(s, c), r| (s + i64::from(r), c + 1));
        let rating = if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        };
        Self {
            rating,
            review_count: count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewView {
    pub id: Uuid,
    pub service_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_full_name: String,
    pub message: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub service_id: Uuid,
    pub author_id: Uuid,
    pub message: String,
    pub rating: i32,
}

impl NewReview {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(1..=5).contains(&self.rating) {
            return Err(DomainError::invalid("rating must be between 1 and 5"));
        }
        if self.message.trim().is_empty() {
            return Err(DomainError::invalid("message must not be blank"));
        }
        Ok(())
    }
}
