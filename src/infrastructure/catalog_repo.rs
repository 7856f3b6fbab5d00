use std::collections::HashMap;

use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{NewReview, NewService, RatingSummary, ReviewView, ServiceView};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::domain::{Page, PageRequest};
use crate::schema::{reviews, services, users};

use super::models::{NewReviewRow, NewServiceRow, ReviewRow, ServiceRow};

pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Attach the review aggregate to each service row.
fn with_ratings(conn: &mut PgConnection, rows: Vec<ServiceRow>) -> QueryResult<Vec<ServiceView>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let ratings: Vec<(Uuid, i32)> = reviews::table
        .filter(reviews::service_id.eq_any(&ids))
        .select((reviews::service_id, reviews::rating))
        .load(conn)?;

    let mut by_service: HashMap<Uuid, Vec<i32>> = HashMap::new();
    for (service_id, rating) in ratings {
        by_service.entry(service_id).or_default().push(rating);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let rating =
                RatingSummary::from_ratings(by_service.remove(&row.id).unwrap_or_default());
            ServiceView {
                id: row.id,
                slug: row.slug,
                name: row.name,
                synopsis: row.synopsis,
                description: row.description,
                price: row.price,
                unit: row.unit,
                duration: row.duration,
                min_people: row.min_people,
                max_people: row.max_people,
                is_active: row.is_active,
                rating,
                created_at: row.created_at,
            }
        })
        .collect())
}

fn one(conn: &mut PgConnection, row: Option<ServiceRow>) -> QueryResult<Option<ServiceView>> {
    match row {
        Some(row) => Ok(with_ratings(conn, vec![row])?.into_iter().next()),
        None => Ok(None),
    }
}

impl CatalogRepository for DieselCatalogRepository {
    fn list(&self, page: PageRequest, search: Option<&str>) -> Result<Page<ServiceView>, DomainError> {
        let mut conn = self.pool.get()?;
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut count = services::table
                .filter(services::is_active.eq(true))
                .into_boxed();
            let mut query = services::table
                .filter(services::is_active.eq(true))
                .into_boxed();
            if let Some(pattern) = &pattern {
                count = count.filter(services::name.ilike(pattern.clone()));
                query = query.filter(services::name.ilike(pattern.clone()));
            }

            let total: i64 = count.count().get_result(conn)?;
            let rows = query
                .select(ServiceRow::as_select())
                .order(services::name.asc())
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            Ok(Page {
                items: with_ratings(conn, rows)?,
                total,
            })
        })
    }

    fn featured(&self, limit: i64) -> Result<Vec<ServiceView>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = services::table
            .filter(services::is_active.eq(true))
            .select(ServiceRow::as_select())
            .load(&mut conn)?;

        let mut views = with_ratings(&mut conn, rows)?;
        views.sort_by(|a, b| {
            b.rating
                .rating
                .total_cmp(&a.rating.rating)
                .then_with(|| b.rating.review_count.cmp(&a.rating.review_count))
                .then_with(|| a.name.cmp(&b.name))
        });
        views.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(views)
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<ServiceView>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = services::table
            .filter(services::slug.eq(slug))
            .filter(services::is_active.eq(true))
            .select(ServiceRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(one(&mut conn, row)?)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<ServiceView>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = services::table
            .find(id)
            .select(ServiceRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(one(&mut conn, row)?)
    }

    fn create(&self, service: NewService) -> Result<ServiceView, DomainError> {
        let mut conn = self.pool.get()?;
        let slug = service.resolved_slug();

        let row = diesel::insert_into(services::table)
            .values(&NewServiceRow {
                id: Uuid::new_v4(),
                slug,
                name: service.name,
                synopsis: service.synopsis,
                description: service.description,
                price: service.price,
                unit: service.unit,
                duration: service.duration,
                min_people: service.min_people,
                max_people: service.max_people,
            })
            .returning(ServiceRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| match DomainError::from(e) {
                DomainError::Conflict(_) => {
                    DomainError::Conflict("A service with this slug already exists".into())
                }
                other => other,
            })?;

        one(&mut conn, Some(row))?.ok_or(DomainError::NotFound("Service"))
    }

    fn list_reviews(&self, service_id: Uuid, page: PageRequest) -> Result<Page<ReviewView>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = reviews::table
                .filter(reviews::service_id.eq(service_id))
                .count()
                .get_result(conn)?;

            let rows: Vec<(ReviewRow, String, String)> = reviews::table
                .inner_join(users::table)
                .filter(reviews::service_id.eq(service_id))
                .select((ReviewRow::as_select(), users::username, users::full_name))
                .order(reviews::created_at.desc())
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            Ok(Page {
                items: rows
                    .into_iter()
                    .map(|(r, username, full_name)| review_view(r, username, full_name))
                    .collect(),
                total,
            })
        })
    }

    fn add_review(&self, review: NewReview) -> Result<ReviewView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = diesel::insert_into(reviews::table)
                .values(&NewReviewRow {
                    id: Uuid::new_v4(),
                    service_id: review.service_id,
                    author_id: review.author_id,
                    message: review.message,
                    rating: review.rating,
                })
                .returning(ReviewRow::as_returning())
                .get_result(conn)?;

            let (username, full_name): (String, String) = users::table
                .find(row.author_id)
                .select((users::username, users::full_name))
                .first(conn)?;

            Ok(review_view(row, username, full_name))
        })
    }
}

fn review_view(row: ReviewRow, username: String, full_name: String) -> ReviewView {
    ReviewView {
        id: row.id,
        service_id: row.service_id,
        author_id: row.author_id,
        author_username: username,
        author_full_name: full_name,
        message: row.message,
        rating: row.rating,
        created_at: row.created_at,
    }
}
