use std::sync::Arc;

use crate::application::run_blocking;
use crate::domain::catalog::{NewReview, NewService, ReviewView, ServiceView};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::domain::user::Principal;
use crate::domain::{Page, PageRequest};

pub const MAX_PAGE_SIZE: i64 = 100;
pub const FEATURED_LIMIT: i64 = 6;

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    pub async fn list(&self, page: i64, limit: i64, search: Option<String>) -> Result<Page<ServiceView>, DomainError> {
        let catalog = self.catalog.clone();
        let page = PageRequest::new(page, limit, MAX_PAGE_SIZE);
        run_blocking(move || catalog.list(page, search.as_deref())).await
    }

    pub async fn featured(&self) -> Result<Vec<ServiceView>, DomainError> {
        let catalog = self.catalog.clone();
        run_blocking(move || catalog.featured(FEATURED_LIMIT)).await
    }

    pub async fn detail(&self, slug: String) -> Result<ServiceView, DomainError> {
        let catalog = self.catalog.clone();
        run_blocking(move || catalog.find_by_slug(&slug)?.ok_or(DomainError::NotFound("Service"))).await
    }

    pub async fn create(&self, principal: &Principal, service: NewService) -> Result<ServiceView, DomainError> {
        if !principal.is_staff {
            return Err(DomainError::forbidden("Only staff can create services"));
        }
        service.validate()?;
        let catalog = self.catalog.clone();
        let created = run_blocking(move || catalog.create(service)).await?;
        log::info!(target: "server", "service created id={} slug={}", created.id, created.slug);
        Ok(created)
    }

    pub async fn reviews(&self, slug: String, page: i64, limit: i64) -> Result<Page<ReviewView>, DomainError> {
        let catalog = self.catalog.clone();
        let page = PageRequest::new(page, limit, MAX_PAGE_SIZE);
        run_blocking(move || {
            let service = catalog.find_by_slug(&slug)?.ok_or(DomainError::NotFound("Service"))?;
            catalog.list_reviews(service.id, page)
        })
        .await
    }

    pub async fn add_review(
        &self,
        principal: &Principal,
        slug: String,
        message: String,
        rating: i32,
    ) -> Result<ReviewView, DomainError> {
        let catalog = self.catalog.clone();
        let author_id = principal.id;
        run_blocking(move || {
            let service = catalog.find_by_slug(&slug)?.ok_or(DomainError::NotFound("Service"))?;
            let review = NewReview {
                service_id: service.id,
                author_id,
                message,
                rating,
            };
            review.validate()?;
            catalog.add_review(review)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::infrastructure::memory::MemoryStore;

    fn principal(id: Uuid, is_staff: bool) -> Principal {
        Principal {
            id,
            username: "tester".to_string(),
            is_staff,
            token_id: "jti".to_string(),
            expires_at: Utc::now(),
        }
    }

    fn new_service(name: &str) -> NewService {
        NewService {
            name: name.to_string(),
            slug: None,
            synopsis: None,
            description: None,
            price: BigDecimal::from(120),
            unit: Some("person".to_string()),
            duration: Some("2 hours".to_string()),
            min_people: None,
            max_people: None,
        }
    }

    #[tokio::test]
    async fn only_staff_create_services() {
        let store = Arc::new(MemoryStore::new());
        let service = CatalogService::new(store);

        let err = service
            .create(&principal(Uuid::new_v4(), false), new_service("Spa Day"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let created = service
            .create(&principal(Uuid::new_v4(), true), new_service("Spa Day"))
            .await
            .expect("staff create");
        assert_eq!(created.slug, "spa-day");
    }

    #[tokio::test]
    async fn reviews_feed_the_rating() {
        let store = Arc::new(MemoryStore::new());
        let author = store.seed_user("reviewer", false);
        store.seed_service("Yacht Cruise", BigDecimal::from(300), None, None);
        let service = CatalogService::new(store);
        let caller = principal(author.id, false);

        service
            .add_review(&caller, "yacht-cruise".into(), "Great".into(), 5)
            .await
            .expect("review");
        service
            .add_review(&caller, "yacht-cruise".into(), "Good".into(), 4)
            .await
            .expect("review");

        let detail = service.detail("yacht-cruise".into()).await.expect("detail");
        assert_eq!(detail.rating.review_count, 2);
        assert_eq!(detail.rating.rating, 4.5);

        let page = service.reviews("yacht-cruise".into(), 1, 10).await.expect("reviews");
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let author = store.seed_user("reviewer", false);
        store.seed_service("Yacht Cruise", BigDecimal::from(300), None, None);
        let service = CatalogService::new(store);

        let err = service
            .add_review(&principal(author.id, false), "yacht-cruise".into(), "Meh".into(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let service = CatalogService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            service.detail("nope".into()).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_searches_by_name() {
        let store = Arc::new(MemoryStore::new());
        store.seed_service("Desert Safari", BigDecimal::from(200), None, None);
        store.seed_service("Spa Day", BigDecimal::from(100), None, None);
        let service = CatalogService::new(store);

        let page = service.list(1, 20, Some("safari".into())).await.expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Desert Safari");
    }
}
