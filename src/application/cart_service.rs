use std::sync::Arc;

use uuid::Uuid;

use crate::application::run_blocking;
use crate::domain::cart::{AddCartItem, CartItemPatch, CartItemView, CartView};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, CatalogRepository};

#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { carts, catalog }
    }

    pub async fn active_cart(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let carts = self.carts.clone();
        run_blocking(move || carts.get_or_create_open(user_id)).await
    }

    /// Prices the line at the service's current price.
    pub async fn add_item(&self, user_id: Uuid, item: AddCartItem) -> Result<CartView, DomainError> {
        item.validate()?;
        let carts = self.carts.clone();
        let catalog = self.catalog.clone();
        run_blocking(move || {
            let service = catalog
                .find_by_id(item.service_id)?
                .filter(|s| s.is_active)
                .ok_or(DomainError::NotFound("Service"))?;
            carts.add_item(user_id, item, service.price)
        })
        .await
    }

    pub async fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        patch: CartItemPatch,
    ) -> Result<CartItemView, DomainError> {
        patch.validate()?;
        let carts = self.carts.clone();
        run_blocking(move || carts.update_item(user_id, item_id, patch)).await
    }

    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        let carts = self.carts.clone();
        run_blocking(move || carts.remove_item(user_id, item_id)).await
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let carts = self.carts.clone();
        run_blocking(move || carts.clear(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    use super::*;
    use crate::infrastructure::memory::MemoryStore;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn add(service_id: Uuid, quantity: i32, date: Option<NaiveDate>) -> AddCartItem {
        AddCartItem {
            service_id,
            quantity,
            booking_date: date,
            booking_time: None,
            special_requests: None,
        }
    }

    fn setup() -> (Arc<MemoryStore>, CartService) {
        let store = Arc::new(MemoryStore::new());
        let service = CartService::new(store.clone(), store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn identical_lines_merge_and_totals_follow() {
        let (store, carts) = setup();
        let user = store.seed_user("guest", false);
        let spa = store.seed_service("Spa", dec("40.00"), None, None);
        let date = NaiveDate::from_ymd_opt(2025, 6, 1);

        carts.add_item(user.id, add(spa.id, 1, date)).await.expect("add");
        let cart = carts.add_item(user.id, add(spa.id, 2, date)).await.expect("add");

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.totals.subtotal, dec("120.00"));
        assert_eq!(cart.totals.tax, dec("6.00"));
        assert_eq!(cart.totals.total_amount, dec("126.00"));
    }

    #[tokio::test]
    async fn different_schedule_is_a_new_line() {
        let (store, carts) = setup();
        let user = store.seed_user("guest", false);
        let spa = store.seed_service("Spa", dec("40.00"), None, None);

        carts
            .add_item(user.id, add(spa.id, 1, NaiveDate::from_ymd_opt(2025, 6, 1)))
            .await
            .expect("add");
        let cart = carts
            .add_item(user.id, add(spa.id, 1, NaiveDate::from_ymd_opt(2025, 6, 2)))
            .await
            .expect("add");
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items_count(), 2);
    }

    #[tokio::test]
    async fn inactive_service_cannot_be_added() {
        let (store, carts) = setup();
        let user = store.seed_user("guest", false);
        let spa = store.seed_service("Spa", dec("40.00"), None, None);
        store.deactivate_service(spa.id);

        let err = carts.add_item(user.id, add(spa.id, 1, None)).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_rejects_non_positive_quantity() {
        let (store, carts) = setup();
        let user = store.seed_user("guest", false);
        let spa = store.seed_service("Spa", dec("40.00"), None, None);
        let cart = carts.add_item(user.id, add(spa.id, 1, None)).await.expect("add");

        let patch = CartItemPatch {
            quantity: Some(0),
            ..Default::default()
        };
        assert!(carts.update_item(user.id, cart.items[0].id, patch).await.is_err());

        let patch = CartItemPatch {
            quantity: Some(4),
            ..Default::default()
        };
        let item = carts
            .update_item(user.id, cart.items[0].id, patch)
            .await
            .expect("update");
        assert_eq!(item.total_price, dec("160.00"));
    }

    #[tokio::test]
    async fn items_of_other_users_are_not_found() {
        let (store, carts) = setup();
        let owner = store.seed_user("owner", false);
        let other = store.seed_user("other", false);
        let spa = store.seed_service("Spa", dec("40.00"), None, None);
        let cart = carts.add_item(owner.id, add(spa.id, 1, None)).await.expect("add");
        carts.active_cart(other.id).await.expect("other cart");

        let err = carts.remove_item(other.id, cart.items[0].id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_and_clear_recompute_totals() {
        let (store, carts) = setup();
        let user = store.seed_user("guest", false);
        let spa = store.seed_service("Spa", dec("40.00"), None, None);
        let safari = store.seed_service("Safari", dec("10.10"), None, None);
        carts.add_item(user.id, add(spa.id, 1, None)).await.expect("add");
        let cart = carts.add_item(user.id, add(safari.id, 1, None)).await.expect("add");

        let spa_line = cart.items.iter().find(|i| i.service_id == spa.id).expect("line");
        let cart = carts.remove_item(user.id, spa_line.id).await.expect("remove");
        assert_eq!(cart.totals.tax, dec("0.51"));

        let cart = carts.clear(user.id).await.expect("clear");
        assert!(cart.is_empty());
        assert_eq!(cart.totals.total_amount, dec("0.00"));
    }

    #[tokio::test]
    async fn clearing_without_a_cart_is_not_found() {
        let (store, carts) = setup();
        let user = store.seed_user("guest", false);
        assert!(matches!(
            carts.clear(user.id).await,
            Err(DomainError::NotFound(_))
        ));
    }
}
