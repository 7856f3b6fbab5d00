use std::sync::Arc;

use crate::application::auth_service::AuthService;
use crate::application::booking_service::BookingService;
use crate::application::cart_service::CartService;
use crate::application::catalog_service::CatalogService;
use crate::application::checkout_service::CheckoutService;
use crate::application::contact_service::ContactService;
use crate::application::payment_service::PaymentService;
use crate::auth::jwt::JwtService;
use crate::config::Settings;
use crate::db::DbPool;
use crate::domain::ports::{
    BookingRepository, CartRepository, CatalogRepository, ContactRepository, OrderRepository,
    PaymentGateway, UserRepository,
};
use crate::infrastructure::{
    DieselBookingRepository, DieselCartRepository, DieselCatalogRepository,
    DieselContactRepository, DieselOrderRepository, DieselUserRepository,
};
use crate::notifications::EmailQueue;

/// One handle per persistence port.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub contacts: Arc<dyn ContactRepository>,
}

impl Repositories {
    pub fn diesel(pool: DbPool) -> Self {
        Self {
            users: Arc::new(DieselUserRepository::new(pool.clone())),
            catalog: Arc::new(DieselCatalogRepository::new(pool.clone())),
            carts: Arc::new(DieselCartRepository::new(pool.clone())),
            orders: Arc::new(DieselOrderRepository::new(pool.clone())),
            bookings: Arc::new(DieselBookingRepository::new(pool.clone())),
            contacts: Arc::new(DieselContactRepository::new(pool)),
        }
    }

    #[cfg(test)]
    pub fn memory(store: Arc<crate::infrastructure::memory::MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            catalog: store.clone(),
            carts: store.clone(),
            orders: store.clone(),
            bookings: store.clone(),
            contacts: store,
        }
    }
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub catalog: CatalogService,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub bookings: BookingService,
    pub payments: PaymentService,
    pub contacts: ContactService,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        gateway: Arc<dyn PaymentGateway>,
        emails: EmailQueue,
        settings: &Settings,
    ) -> Self {
        let jwt = JwtService::new(
            &settings.jwt_secret,
            settings.jwt_access_ttl_minutes,
            settings.jwt_refresh_ttl_minutes,
        );
        let urls = settings.checkout_urls();
        let admin_email = settings.default_from_email.clone();

        Self {
            auth: AuthService::new(
                repos.users.clone(),
                jwt,
                emails.clone(),
                settings.base_frontend_url.clone(),
            ),
            catalog: CatalogService::new(repos.catalog.clone()),
            carts: CartService::new(repos.carts.clone(), repos.catalog.clone()),
            checkout: CheckoutService::new(
                repos.orders.clone(),
                repos.bookings.clone(),
                gateway.clone(),
                urls.clone(),
            ),
            bookings: BookingService::new(
                repos.bookings.clone(),
                repos.catalog.clone(),
                repos.users.clone(),
                gateway.clone(),
                emails.clone(),
                urls,
                admin_email.clone(),
            ),
            payments: PaymentService::new(repos.bookings.clone(), gateway, emails.clone()),
            contacts: ContactService::new(repos.contacts, emails, admin_email),
        }
    }
}
