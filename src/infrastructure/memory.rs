//! In-process implementation of every repository port, for service and
//! handler tests that should not need a database.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::booking::{
    generate_reference, settle, total_completed, BookingLineView, BookingStatus, BookingView,
    NewBooking, Settlement,
};
use crate::domain::cart::{AddCartItem, CartItemPatch, CartItemView, CartStatus, CartView};
use crate::domain::catalog::{NewReview, NewService, RatingSummary, ReviewView, ServiceView};
use crate::domain::contact::{ContactMessage, NewContactMessage};
use crate::domain::errors::DomainError;
use crate::domain::money::{line_total, Totals};
use crate::domain::order::{CustomerContact, OrderItemView, OrderStatus, OrderView, PlacedOrder};
use crate::domain::payment::{
    PaymentMethod, PaymentRecord, PaymentStatus, PaymentView, SettlementStatus,
};
use crate::domain::ports::{
    BookingRepository, CartRepository, CatalogRepository, ContactRepository, OrderRepository,
    UserRepository,
};
use crate::domain::user::{NewUser, ProfileChanges, StoredCredentials, User};
use crate::domain::{Page, PageRequest};

struct UserEntry {
    user: User,
    password_hash: String,
    reset_token: Option<String>,
}

#[derive(Default)]
struct State {
    users: Vec<UserEntry>,
    revoked: HashSet<String>,
    services: Vec<ServiceView>,
    reviews: Vec<ReviewView>,
    carts: Vec<CartView>,
    orders: Vec<OrderView>,
    bookings: Vec<BookingView>,
    contacts: Vec<ContactMessage>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(0);
    let limit = usize::try_from(page.limit).unwrap_or(0);
    Page {
        items: items.iter().skip(offset).take(limit).cloned().collect(),
        total: items.len() as i64,
    }
}

fn recompute_cart(cart: &mut CartView) {
    cart.totals = Totals::from_line_totals(cart.items.iter().map(|i| &i.total_price));
    cart.last_activity = Utc::now();
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store poisoned")
    }

    pub fn seed_service(
        &self,
        name: &str,
        price: BigDecimal,
        min_people: Option<i32>,
        max_people: Option<i32>,
    ) -> ServiceView {
        CatalogRepository::create(
            self,
            NewService {
                name: name.to_string(),
                slug: None,
                synopsis: None,
                description: None,
                price,
                unit: None,
                duration: None,
                min_people,
                max_people,
            },
        )
        .expect("seed service")
    }

    pub fn seed_user(&self, username: &str, is_staff: bool) -> User {
        let user = UserRepository::create(
            self,
            NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                full_name: format!("{username} tester"),
                phone: "555-0100".to_string(),
                password_hash: "unusable".to_string(),
            },
        )
        .expect("seed user");
        if is_staff {
            let mut state = self.lock();
            if let Some(entry) = state.users.iter_mut().find(|e| e.user.id == user.id) {
                entry.user.is_staff = true;
                return entry.user.clone();
            }
        }
        user
    }

    pub fn deactivate_service(&self, id: Uuid) {
        let mut state = self.lock();
        if let Some(service) = state.services.iter_mut().find(|s| s.id == id) {
            service.is_active = false;
        }
    }

    pub fn open_cart_of(&self, user_id: Uuid) -> Option<CartView> {
        self.lock()
            .carts
            .iter()
            .find(|c| c.user_id == user_id && c.status == CartStatus::Open)
            .cloned()
    }

    pub fn order(&self, id: Uuid) -> Option<OrderView> {
        self.lock().orders.iter().find(|o| o.id == id).cloned()
    }

    pub fn reset_token_of(&self, email: &str) -> Option<String> {
        self.lock()
            .users
            .iter()
            .find(|e| e.user.email == email)
            .and_then(|e| e.reset_token.clone())
    }

    pub fn password_hash_of(&self, username: &str) -> Option<String> {
        self.lock()
            .users
            .iter()
            .find(|e| e.user.username == username)
            .map(|e| e.password_hash.clone())
    }

    pub fn contact_count(&self) -> usize {
        self.lock().contacts.len()
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

impl UserRepository for MemoryStore {
    fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut state = self.lock();
        let email = user.email.to_lowercase();
        if state.users.iter().any(|e| e.user.username == user.username) {
            return Err(DomainError::Conflict("Username already exists".into()));
        }
        if state.users.iter().any(|e| e.user.email == email) {
            return Err(DomainError::Conflict("Email already exists".into()));
        }
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email,
            full_name: user.full_name,
            phone: user.phone,
            gender: None,
            is_staff: false,
            is_active: true,
            created_at: Utc::now(),
        };
        state.users.push(UserEntry {
            user: created.clone(),
            password_hash: user.password_hash,
            reset_token: None,
        });
        Ok(created)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|e| e.user.id == id)
            .map(|e| e.user.clone()))
    }

    fn find_credentials(&self, login: &str) -> Result<Option<StoredCredentials>, DomainError> {
        let state = self.lock();
        let found = state
            .users
            .iter()
            .find(|e| e.user.username == login)
            .or_else(|| {
                state
                    .users
                    .iter()
                    .find(|e| e.user.email == login.to_lowercase())
            });
        Ok(found.map(|e| StoredCredentials {
            user: e.user.clone(),
            password_hash: e.password_hash.clone(),
        }))
    }

    fn username_taken(&self, username: &str) -> Result<bool, DomainError> {
        Ok(self.lock().users.iter().any(|e| e.user.username == username))
    }

    fn email_taken(&self, email: &str) -> Result<bool, DomainError> {
        let email = email.to_lowercase();
        Ok(self.lock().users.iter().any(|e| e.user.email == email))
    }

    fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, DomainError> {
        let mut state = self.lock();
        let email = changes.email.map(|e| e.to_lowercase());
        if let Some(username) = &changes.username {
            if state
                .users
                .iter()
                .any(|e| e.user.id != id && &e.user.username == username)
            {
                return Err(DomainError::Conflict("Username already exists".into()));
            }
        }
        if let Some(email) = &email {
            if state.users.iter().any(|e| e.user.id != id && &e.user.email == email) {
                return Err(DomainError::Conflict("Email already exists".into()));
            }
        }
        let entry = state
            .users
            .iter_mut()
            .find(|e| e.user.id == id)
            .ok_or(DomainError::NotFound("User"))?;
        let user = &mut entry.user;
        if let Some(v) = changes.username {
            user.username = v;
        }
        if let Some(v) = changes.full_name {
            user.full_name = v;
        }
        if let Some(v) = email {
            user.email = v;
        }
        if let Some(v) = changes.phone {
            user.phone = v;
        }
        if changes.gender.is_some() {
            user.gender = changes.gender;
        }
        Ok(user.clone())
    }

    fn set_reset_token(&self, email: &str, token: &str) -> Result<Option<User>, DomainError> {
        let mut state = self.lock();
        let email = email.to_lowercase();
        Ok(state
            .users
            .iter_mut()
            .find(|e| e.user.email == email)
            .map(|e| {
                e.reset_token = Some(token.to_string());
                e.user.clone()
            }))
    }

    fn reset_password(&self, token: &str, password_hash: &str) -> Result<bool, DomainError> {
        let mut state = self.lock();
        match state
            .users
            .iter_mut()
            .find(|e| e.reset_token.as_deref() == Some(token))
        {
            Some(entry) => {
                entry.password_hash = password_hash.to_string();
                entry.reset_token = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn revoke_token(
        &self,
        jti: &str,
        _user_id: Uuid,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.lock().revoked.insert(jti.to_string());
        Ok(())
    }

    fn is_token_revoked(&self, jti: &str) -> Result<bool, DomainError> {
        Ok(self.lock().revoked.contains(jti))
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────────

fn rated(state: &State, service: &ServiceView) -> ServiceView {
    let ratings = state
        .reviews
        .iter()
        .filter(|r| r.service_id == service.id)
        .map(|r| r.rating);
    ServiceView {
        rating: RatingSummary::from_ratings(ratings),
        ..service.clone()
    }
}

impl CatalogRepository for MemoryStore {
    fn list(&self, page: PageRequest, search: Option<&str>) -> Result<Page<ServiceView>, DomainError> {
        let state = self.lock();
        let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        let mut matching: Vec<ServiceView> = state
            .services
            .iter()
            .filter(|s| s.is_active)
            .filter(|s| match &needle {
                Some(n) => s.name.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .map(|s| rated(&state, s))
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(&matching, page))
    }

    fn featured(&self, limit: i64) -> Result<Vec<ServiceView>, DomainError> {
        let state = self.lock();
        let mut all: Vec<ServiceView> = state
            .services
            .iter()
            .filter(|s| s.is_active)
            .map(|s| rated(&state, s))
            .collect();
        all.sort_by(|a, b| b.rating.rating.total_cmp(&a.rating.rating));
        all.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(all)
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<ServiceView>, DomainError> {
        let state = self.lock();
        Ok(state
            .services
            .iter()
            .find(|s| s.slug == slug && s.is_active)
            .map(|s| rated(&state, s)))
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<ServiceView>, DomainError> {
        let state = self.lock();
        Ok(state
            .services
            .iter()
            .find(|s| s.id == id)
            .map(|s| rated(&state, s)))
    }

    fn create(&self, service: NewService) -> Result<ServiceView, DomainError> {
        let mut state = self.lock();
        let slug = service.resolved_slug();
        if state.services.iter().any(|s| s.slug == slug) {
            return Err(DomainError::Conflict(
                "A service with this slug already exists".into(),
            ));
        }
        let view = ServiceView {
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
            is_active: true,
            rating: RatingSummary::from_ratings(Vec::new()),
            created_at: Utc::now(),
        };
        state.services.push(view.clone());
        Ok(view)
    }

    fn list_reviews(&self, service_id: Uuid, page: PageRequest) -> Result<Page<ReviewView>, DomainError> {
        let state = self.lock();
        let mut reviews: Vec<ReviewView> = state
            .reviews
            .iter()
            .filter(|r| r.service_id == service_id)
            .cloned()
            .collect();
        reviews.reverse();
        Ok(paginate(&reviews, page))
    }

    fn add_review(&self, review: NewReview) -> Result<ReviewView, DomainError> {
        let mut state = self.lock();
        let author = state
            .users
            .iter()
            .find(|e| e.user.id == review.author_id)
            .map(|e| e.user.clone())
            .ok_or(DomainError::NotFound("User"))?;
        let view = ReviewView {
            id: Uuid::new_v4(),
            service_id: review.service_id,
            author_id: author.id,
            author_username: author.username,
            author_full_name: author.full_name,
            message: review.message,
            rating: review.rating,
            created_at: Utc::now(),
        };
        state.reviews.push(view.clone());
        Ok(view)
    }
}

// ── Carts ────────────────────────────────────────────────────────────────────

fn open_cart_mut(state: &mut State, user_id: Uuid) -> Option<&mut CartView> {
    state
        .carts
        .iter_mut()
        .find(|c| c.user_id == user_id && c.status == CartStatus::Open)
}

fn get_or_create_cart(state: &mut State, user_id: Uuid) -> &mut CartView {
    let exists = state
        .carts
        .iter()
        .any(|c| c.user_id == user_id && c.status == CartStatus::Open);
    if !exists {
        let now = Utc::now();
        state.carts.push(CartView {
            id: Uuid::new_v4(),
            user_id,
            status: CartStatus::Open,
            totals: Totals::zero(),
            items: Vec::new(),
            last_activity: now,
            created_at: now,
        });
    }
    let idx = state
        .carts
        .iter()
        .rposition(|c| c.user_id == user_id && c.status == CartStatus::Open)
        .unwrap_or(0);
    &mut state.carts[idx]
}

impl CartRepository for MemoryStore {
    fn find_open(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError> {
        Ok(self.open_cart_of(user_id))
    }

    fn get_or_create_open(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut state = self.lock();
        Ok(get_or_create_cart(&mut state, user_id).clone())
    }

    fn add_item(
        &self,
        user_id: Uuid,
        item: AddCartItem,
        unit_price: BigDecimal,
    ) -> Result<CartView, DomainError> {
        let mut state = self.lock();
        let (name, slug) = state
            .services
            .iter()
            .find(|s| s.id == item.service_id)
            .map(|s| (s.name.clone(), s.slug.clone()))
            .ok_or(DomainError::NotFound("Service"))?;
        let cart = get_or_create_cart(&mut state, user_id);

        match cart
            .items
            .iter_mut()
            .find(|i| item.same_line(i.service_id, i.booking_date, i.booking_time))
        {
            Some(line) => {
                line.quantity += item.quantity;
                line.total_price = line_total(&line.unit_price, line.quantity);
            }
            None => cart.items.push(CartItemView {
                id: Uuid::new_v4(),
                service_id: item.service_id,
                service_name: name,
                service_slug: slug,
                total_price: line_total(&unit_price, item.quantity),
                unit_price,
                quantity: item.quantity,
                booking_date: item.booking_date,
                booking_time: item.booking_time,
                special_requests: item.special_requests,
                created_at: Utc::now(),
            }),
        }
        recompute_cart(cart);
        Ok(cart.clone())
    }

    fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        patch: CartItemPatch,
    ) -> Result<CartItemView, DomainError> {
        let mut state = self.lock();
        let cart = open_cart_mut(&mut state, user_id).ok_or(DomainError::NotFound("Cart item"))?;
        let line = cart
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(DomainError::NotFound("Cart item"))?;
        if let Some(q) = patch.quantity {
            line.quantity = q;
            line.total_price = line_total(&line.unit_price, q);
        }
        if patch.booking_date.is_some() {
            line.booking_date = patch.booking_date;
        }
        if patch.booking_time.is_some() {
            line.booking_time = patch.booking_time;
        }
        if patch.special_requests.is_some() {
            line.special_requests = patch.special_requests;
        }
        let updated = line.clone();
        recompute_cart(cart);
        Ok(updated)
    }

    fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        let mut state = self.lock();
        let cart = open_cart_mut(&mut state, user_id).ok_or(DomainError::NotFound("Cart item"))?;
        let before = cart.items.len();
        cart.items.retain(|i| i.id != item_id);
        if cart.items.len() == before {
            return Err(DomainError::NotFound("Cart item"));
        }
        recompute_cart(cart);
        Ok(cart.clone())
    }

    fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut state = self.lock();
        let cart = open_cart_mut(&mut state, user_id).ok_or(DomainError::NotFound("Cart"))?;
        cart.items.clear();
        recompute_cart(cart);
        Ok(cart.clone())
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

fn initiated_payment(booking: &mut BookingView, amount: BigDecimal, notes: &str) -> Uuid {
    let existing = booking.payments.iter_mut().rev().find(|p| {
        p.status == PaymentStatus::Initiated && p.method == PaymentMethod::Online
    });
    match existing {
        Some(payment) => {
            payment.amount = amount;
            payment.notes = Some(notes.to_string());
            payment.id
        }
        None => {
            let id = Uuid::new_v4();
            booking.payments.push(PaymentView {
                id,
                booking_id: booking.id,
                amount,
                method: PaymentMethod::Online,
                status: PaymentStatus::Initiated,
                transaction_id: None,
                session_id: None,
                notes: Some(notes.to_string()),
                payment_date: Utc::now(),
            });
            id
        }
    }
}

impl OrderRepository for MemoryStore {
    fn place_from_cart(
        &self,
        user_id: Uuid,
        contact: CustomerContact,
    ) -> Result<PlacedOrder, DomainError> {
        let mut state = self.lock();
        let cart = open_cart_mut(&mut state, user_id)
            .ok_or(DomainError::NotFound("Cart"))?
            .clone();
        if cart.is_empty() {
            return Err(DomainError::invalid("Cart is empty"));
        }
        let now = Utc::now();
        let totals = Totals::from_line_totals(cart.items.iter().map(|i| &i.total_price));

        let order = OrderView {
            id: Uuid::new_v4(),
            order_number: generate_reference("ORD", now),
            user_id,
            cart_id: Some(cart.id),
            customer_name: contact.name.clone(),
            customer_email: contact.email.clone(),
            customer_phone: contact.phone.clone(),
            status: OrderStatus::Pending,
            payment_status: SettlementStatus::Unpaid,
            totals: totals.clone(),
            checkout_date: now,
            fulfillment_date: None,
            special_instructions: contact.special_instructions.clone(),
            items: cart
                .items
                .iter()
                .map(|i| OrderItemView {
                    id: Uuid::new_v4(),
                    service_id: i.service_id,
                    service_name: i.service_name.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price.clone(),
                    total_price: i.total_price.clone(),
                    booking_date: i.booking_date,
                    booking_time: i.booking_time,
                    special_requests: i.special_requests.clone(),
                })
                .collect(),
            created_at: now,
        };
        state.orders.push(order.clone());

        let lines: Vec<BookingLineView> = cart
            .items
            .iter()
            .map(|i| BookingLineView {
                service_id: i.service_id,
                service_name: i.service_name.clone(),
                quantity: i.quantity,
                unit_price: i.unit_price.clone(),
                total_price: i.total_price.clone(),
                notes: i.special_requests.clone(),
            })
            .collect();
        let first = &cart.items[0];
        let guests = i32::try_from(cart.items_count()).unwrap_or(i32::MAX);

        let reusable = state.bookings.iter().rposition(|b| {
            b.user_id == Some(user_id)
                && b.guest_email == contact.email
                && BookingStatus::REUSABLE.contains(&b.status)
                && matches!(
                    b.payment_status,
                    SettlementStatus::Unpaid | SettlementStatus::Partial
                )
        });
        let idx = match reusable {
            Some(idx) => idx,
            None => {
                state.bookings.push(BookingView {
                    id: Uuid::new_v4(),
                    booking_number: generate_reference("BK", now),
                    user_id: Some(user_id),
                    order_id: None,
                    guest_name: String::new(),
                    guest_email: contact.email.clone(),
                    guest_phone: String::new(),
                    booking_date: now.date_naive(),
                    booking_time: None,
                    number_of_guests: 1,
                    status: BookingStatus::Pending,
                    payment_status: SettlementStatus::Unpaid,
                    totals: Totals::zero(),
                    special_requests: None,
                    admin_notes: None,
                    lines: Vec::new(),
                    payments: Vec::new(),
                    created_at: now,
                    updated_at: now,
                });
                state.bookings.len() - 1
            }
        };

        let booking = &mut state.bookings[idx];
        booking.order_id = Some(order.id);
        booking.guest_name = contact.name;
        booking.guest_phone = contact.phone;
        booking.booking_date = first.booking_date.unwrap_or_else(|| now.date_naive());
        booking.booking_time = first.booking_time;
        booking.number_of_guests = guests;
        booking.special_requests = contact.special_instructions;
        booking.totals = Totals::from_line_totals(lines.iter().map(|l| &l.total_price));
        booking.lines = lines;
        booking.updated_at = now;
        let amount = booking.totals.total_amount.clone();
        let payment_id =
            initiated_payment(booking, amount, "Online payment initiated from cart checkout.");

        Ok(PlacedOrder {
            order,
            booking: booking.clone(),
            payment_id,
        })
    }

    fn abandon_checkout(&self, order_id: Uuid, payment_id: Uuid) -> Result<(), DomainError> {
        let mut state = self.lock();
        for booking in state.bookings.iter_mut() {
            for payment in booking.payments.iter_mut().filter(|p| p.id == payment_id) {
                payment.status = PaymentStatus::Failed;
            }
        }
        if let Some(order) = state.orders.iter_mut().find(|o| o.id == order_id) {
            order.status = OrderStatus::Cancelled;
        }
        Ok(())
    }

    fn find_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<OrderView>, DomainError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .cloned())
    }

    fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<Page<OrderView>, DomainError> {
        let state = self.lock();
        let mine: Vec<OrderView> = state
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        Ok(paginate(&mine, page))
    }
}

// ── Bookings ─────────────────────────────────────────────────────────────────

impl BookingRepository for MemoryStore {
    fn create(
        &self,
        booking: NewBooking,
        lines: Vec<BookingLineView>,
    ) -> Result<BookingView, DomainError> {
        let now = Utc::now();
        let view = BookingView {
            id: Uuid::new_v4(),
            booking_number: generate_reference("BK", now),
            user_id: booking.user_id,
            order_id: None,
            guest_name: booking.guest_name,
            guest_email: booking.guest_email,
            guest_phone: booking.guest_phone,
            booking_date: booking.booking_date,
            booking_time: booking.booking_time,
            number_of_guests: booking.number_of_guests,
            status: BookingStatus::Pending,
            payment_status: SettlementStatus::Unpaid,
            totals: Totals::from_line_totals(lines.iter().map(|l| &l.total_price)),
            special_requests: booking.special_requests,
            admin_notes: None,
            lines,
            payments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.lock().bookings.push(view.clone());
        Ok(view)
    }

    fn find_by_number(&self, booking_number: &str) -> Result<Option<BookingView>, DomainError> {
        Ok(self
            .lock()
            .bookings
            .iter()
            .find(|b| b.booking_number == booking_number)
            .cloned())
    }

    fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<Page<BookingView>, DomainError> {
        let state = self.lock();
        let mine: Vec<BookingView> = state
            .bookings
            .iter()
            .rev()
            .filter(|b| b.user_id == Some(user_id))
            .cloned()
            .collect();
        Ok(paginate(&mine, page))
    }

    fn update_status(
        &self,
        booking_number: &str,
        status: BookingStatus,
        admin_notes: Option<String>,
    ) -> Result<BookingView, DomainError> {
        let mut state = self.lock();
        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.booking_number == booking_number)
            .ok_or(DomainError::NotFound("Booking"))?;
        booking.status = status;
        if admin_notes.is_some() {
            booking.admin_notes = admin_notes;
        }
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    fn ensure_checkout_payment(&self, booking_id: Uuid, amount: BigDecimal) -> Result<Uuid, DomainError> {
        let mut state = self.lock();
        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or(DomainError::NotFound("Booking"))?;
        Ok(initiated_payment(
            booking,
            amount,
            "Online payment initiated from booking checkout.",
        ))
    }

    fn set_payment_session(&self, payment_id: Uuid, session_id: &str) -> Result<(), DomainError> {
        let mut state = self.lock();
        let payment = state
            .bookings
            .iter_mut()
            .flat_map(|b| b.payments.iter_mut())
            .find(|p| p.id == payment_id)
            .ok_or(DomainError::NotFound("Payment"))?;
        payment.session_id = Some(session_id.to_string());
        Ok(())
    }

    fn record_payment(
        &self,
        booking_number: &str,
        payment: PaymentRecord,
    ) -> Result<Settlement, DomainError> {
        let mut state = self.lock();
        let idx = state
            .bookings
            .iter()
            .position(|b| b.booking_number == booking_number)
            .ok_or(DomainError::NotFound("Booking"))?;
        let booking = &mut state.bookings[idx];

        let known = payment.session_id.as_ref().and_then(|sid| {
            booking
                .payments
                .iter()
                .rposition(|p| p.session_id.as_ref() == Some(sid))
        });
        let (payment_id, newly_recorded) = match known {
            Some(i) if booking.payments[i].status == PaymentStatus::Completed => {
                (booking.payments[i].id, false)
            }
            Some(i) => {
                let row = &mut booking.payments[i];
                row.amount = payment.amount;
                row.method = payment.method;
                row.status = payment.status;
                if payment.transaction_id.is_some() {
                    row.transaction_id = payment.transaction_id;
                }
                if payment.notes.is_some() {
                    row.notes = payment.notes;
                }
                row.payment_date = Utc::now();
                (row.id, true)
            }
            None => {
                let id = Uuid::new_v4();
                booking.payments.push(PaymentView {
                    id,
                    booking_id: booking.id,
                    amount: payment.amount,
                    method: payment.method,
                    status: payment.status,
                    transaction_id: payment.transaction_id,
                    session_id: payment.session_id,
                    notes: payment.notes,
                    payment_date: Utc::now(),
                });
                (id, true)
            }
        };

        let paid = total_completed(&booking.payments);
        let (status, payment_status) = settle(
            &booking.totals.total_amount,
            &paid,
            booking.status,
            booking.payment_status,
        );
        booking.status = status;
        booking.payment_status = payment_status;
        booking.updated_at = Utc::now();
        let booking = booking.clone();

        let mut cart_closed = false;
        if let Some(order_id) = booking.order_id {
            let cart_id = state.orders.iter_mut().find(|o| o.id == order_id).and_then(|order| {
                match payment_status {
                    SettlementStatus::Paid => {
                        order.status = OrderStatus::Completed;
                        order.payment_status = SettlementStatus::Paid;
                        order.fulfillment_date = Some(Utc::now());
                        order.cart_id
                    }
                    SettlementStatus::Partial => {
                        order.payment_status = SettlementStatus::Partial;
                        None
                    }
                    _ => None,
                }
            });
            if let Some(cart_id) = cart_id {
                if let Some(cart) = state
                    .carts
                    .iter_mut()
                    .find(|c| c.id == cart_id && c.status == CartStatus::Open)
                {
                    cart.status = CartStatus::Closed;
                    cart_closed = true;
                }
            }
        }

        Ok(Settlement {
            booking,
            payment_id,
            newly_recorded,
            cart_closed,
        })
    }

    fn mark_payment_failed(&self, reference: &str) -> Result<usize, DomainError> {
        let mut state = self.lock();
        let mut updated = 0;
        for payment in state.bookings.iter_mut().flat_map(|b| b.payments.iter_mut()) {
            let matches = payment.session_id.as_deref() == Some(reference)
                || payment.transaction_id.as_deref() == Some(reference);
            let open = matches!(
                payment.status,
                PaymentStatus::Initiated | PaymentStatus::WaitingForConfirmation
            );
            if matches && open {
                payment.status = PaymentStatus::Failed;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

// ── Contacts ─────────────────────────────────────────────────────────────────

impl ContactRepository for MemoryStore {
    fn create(&self, message: NewContactMessage) -> Result<ContactMessage, DomainError> {
        let stored = ContactMessage {
            id: Uuid::new_v4(),
            first_name: message.first_name,
            last_name: message.last_name,
            email: message.email,
            phone: message.phone,
            subject: message.subject,
            preferred_dates: message.preferred_dates,
            number_of_guests: message.number_of_guests,
            message: message.message,
            created_at: Utc::now(),
        };
        self.lock().contacts.push(stored.clone());
        Ok(stored)
    }
}
