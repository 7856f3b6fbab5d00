use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::domain::catalog::{NewService, ReviewView, ServiceView};
use crate::domain::money::format_money;
use crate::errors::AppError;
use crate::handlers::PageParams;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListServicesParams {
    #[serde(default = "default_page")]
    pub page: i64,
    pub limit: Option<i64>,
    /// Case-insensitive match on the service name.
    pub search: Option<String>,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 220))]
    pub slug: Option<String>,
    #[validate(length(max = 500))]
    pub synopsis: Option<String>,
    pub description: Option<String>,
    /// Decimal price as a string to avoid floating-point issues, e.g. "99.50"
    pub price: String,
    #[validate(length(max = 50))]
    pub unit: Option<String>,
    #[validate(length(max = 50))]
    pub duration: Option<String>,
    #[validate(range(min = 1))]
    pub min_people: Option<i32>,
    #[validate(range(min = 1))]
    pub max_people: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceResponse {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub synopsis: Option<String>,
    pub description: Option<String>,
    pub price: String,
    pub unit: Option<String>,
    pub duration: Option<String>,
    pub min_people: Option<i32>,
    pub max_people: Option<i32>,
    /// Mean review rating, 0 when unrated.
    pub rating: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ServiceView> for ServiceResponse {
    fn from(s: ServiceView) -> Self {
        Self {
            id: s.id,
            slug: s.slug,
            name: s.name,
            synopsis: s.synopsis,
            description: s.description,
            price: format_money(&s.price),
            unit: s.unit,
            duration: s.duration,
            min_people: s.min_people,
            max_people: s.max_people,
            rating: (s.rating.rating * 10.0).round() / 10.0,
            review_count: s.rating.review_count,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListServicesResponse {
    pub items: Vec<ServiceResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub author_username: String,
    pub author_full_name: String,
    pub message: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewView> for ReviewResponse {
    fn from(r: ReviewView) -> Self {
        Self {
            id: r.id,
            author_username: r.author_username,
            author_full_name: r.author_full_name,
            message: r.message,
            rating: r.rating,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListReviewsResponse {
    pub items: Vec<ReviewResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/services",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("search" = Option<String>, Query, description = "Filter by name"),
    ),
    responses((status = 200, description = "Active services", body = ListServicesResponse)),
    tag = "services"
)]
pub async fn list_services(
    state: web::Data<AppState>,
    query: web::Query<ListServicesParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let page = state.catalog.list(params.page, limit, params.search).await?;
    Ok(HttpResponse::Ok().json(ListServicesResponse {
        items: page.items.into_iter().map(Into::into).collect(),
        total: page.total,
        page: params.page.max(1),
        limit: limit.clamp(1, 100),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/services/home",
    responses((status = 200, description = "Top-rated services", body = [ServiceResponse])),
    tag = "services"
)]
pub async fn featured_services(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let services = state.catalog.featured().await?;
    let body: Vec<ServiceResponse> = services.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    get,
    path = "/api/v1/services/{slug}",
    params(("slug" = String, Path, description = "Service slug")),
    responses(
        (status = 200, description = "Service found", body = ServiceResponse),
        (status = 404, description = "Service not found", body = crate::handlers::ErrorResponse),
    ),
    tag = "services"
)]
pub async fn get_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let service = state.catalog.detail(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ServiceResponse::from(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service created", body = ServiceResponse),
        (status = 403, description = "Staff only", body = crate::handlers::ErrorResponse),
        (status = 409, description = "Slug taken", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "services"
)]
pub async fn create_service(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    body: web::Json<CreateServiceRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let price = BigDecimal::from_str(&body.price)
        .map_err(|e| AppError::BadRequest(format!("Invalid price '{}': {}", body.price, e)))?;
    let service = state
        .catalog
        .create(
            &principal,
            NewService {
                name: body.name,
                slug: body.slug,
                synopsis: body.synopsis,
                description: body.description,
                price,
                unit: body.unit,
                duration: body.duration,
                min_people: body.min_people,
                max_people: body.max_people,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(ServiceResponse::from(service)))
}

#[utoipa::path(
    get,
    path = "/api/v1/services/{slug}/reviews",
    params(
        ("slug" = String, Path, description = "Service slug"),
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Newest reviews first", body = ListReviewsResponse),
        (status = 404, description = "Service not found", body = crate::handlers::ErrorResponse),
    ),
    tag = "services"
)]
pub async fn list_reviews(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let page = state
        .catalog
        .reviews(path.into_inner(), params.page, limit)
        .await?;
    Ok(HttpResponse::Ok().json(ListReviewsResponse {
        items: page.items.into_iter().map(Into::into).collect(),
        total: page.total,
        page: params.page.max(1),
        limit: limit.clamp(1, 100),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/{slug}/reviews",
    params(("slug" = String, Path, description = "Service slug")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review posted", body = ReviewResponse),
        (status = 400, description = "Validation failed", body = crate::handlers::ErrorResponse),
        (status = 401, description = "Not signed in", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "services"
)]
pub async fn create_review(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    path: web::Path<String>,
    body: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let review = state
        .catalog
        .add_review(&principal, path.into_inner(), body.message, body.rating)
        .await?;
    Ok(HttpResponse::Created().json(ReviewResponse::from(review)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/services")
            .route("", web::get().to(list_services))
            .route("", web::post().to(create_service))
            .route("/home", web::get().to(featured_services))
            .route("/{slug}", web::get().to(get_service))
            .route("/{slug}/reviews", web::get().to(list_reviews))
            .route("/{slug}/reviews", web::post().to(create_review)),
    );
}
