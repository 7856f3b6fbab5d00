use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{AddCartItem, CartItemPatch, CartItemView, CartStatus, CartView};
use crate::domain::errors::DomainError;
use crate::domain::money::{line_total, Totals};
use crate::domain::ports::CartRepository;
use crate::schema::{cart_items, carts, services};

use super::models::{CartItemRow, CartRow, NewCartItemRow, NewCartRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// ── Shared cart queries ──────────────────────────────────────────────────────
//
// Also used by the checkout transaction in `order_repo`.

pub(crate) fn find_open_row(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Option<CartRow>> {
    carts::table
        .filter(carts::user_id.eq(user_id))
        .filter(carts::status.eq(CartStatus::Open.as_str()))
        .order(carts::created_at.desc())
        .select(CartRow::as_select())
        .first(conn)
        .optional()
}

fn get_or_create_row(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<CartRow> {
    if let Some(cart) = find_open_row(conn, user_id)? {
        return Ok(cart);
    }
    diesel::insert_into(carts::table)
        .values(&NewCartRow {
            id: Uuid::new_v4(),
            user_id,
            status: CartStatus::Open.as_str().to_string(),
        })
        .returning(CartRow::as_returning())
        .get_result(conn)
}

pub(crate) fn load_items(conn: &mut PgConnection, cart_id: Uuid) -> QueryResult<Vec<CartItemView>> {
    let rows: Vec<(CartItemRow, String, String)> = cart_items::table
        .inner_join(services::table)
        .filter(cart_items::cart_id.eq(cart_id))
        .select((CartItemRow::as_select(), services::name, services::slug))
        .order(cart_items::created_at.asc())
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(row, service_name, service_slug)| CartItemView {
            id: row.id,
            service_id: row.service_id,
            service_name,
            service_slug,
            unit_price: row.unit_price,
            quantity: row.quantity,
            total_price: row.total_price,
            booking_date: row.booking_date,
            booking_time: row.booking_time,
            special_requests: row.special_requests,
            created_at: row.created_at,
        })
        .collect())
}

fn load_view(conn: &mut PgConnection, cart: CartRow) -> Result<CartView, DomainError> {
    let items = load_items(conn, cart.id)?;
    Ok(CartView {
        id: cart.id,
        user_id: cart.user_id,
        status: cart.status.parse()?,
        totals: Totals {
            subtotal: cart.subtotal,
            tax: cart.tax,
            total_amount: cart.total_amount,
        },
        items,
        last_activity: cart.last_activity,
        created_at: cart.created_at,
    })
}

/// Re-derive the cart totals from its lines and bump last activity.
fn recompute(conn: &mut PgConnection, cart_id: Uuid) -> QueryResult<CartRow> {
    let line_totals: Vec<BigDecimal> = cart_items::table
        .filter(cart_items::cart_id.eq(cart_id))
        .select(cart_items::total_price)
        .load(conn)?;
    let totals = Totals::from_line_totals(line_totals.iter());
    let now = Utc::now();

    diesel::update(carts::table.find(cart_id))
        .set((
            carts::subtotal.eq(totals.subtotal),
            carts::tax.eq(totals.tax),
            carts::total_amount.eq(totals.total_amount),
            carts::last_activity.eq(now),
            carts::updated_at.eq(now),
        ))
        .returning(CartRow::as_returning())
        .get_result(conn)
}

fn open_item(
    conn: &mut PgConnection,
    user_id: Uuid,
    item_id: Uuid,
) -> Result<(CartRow, CartItemRow), DomainError> {
    let cart = find_open_row(conn, user_id)?.ok_or(DomainError::NotFound("Cart item"))?;
    let item = cart_items::table
        .filter(cart_items::id.eq(item_id))
        .filter(cart_items::cart_id.eq(cart.id))
        .select(CartItemRow::as_select())
        .first(conn)
        .optional()?
        .ok_or(DomainError::NotFound("Cart item"))?;
    Ok((cart, item))
}

// ── Repository ───────────────────────────────────────────────────────────────

impl CartRepository for DieselCartRepository {
    fn find_open(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError> {
        let mut conn = self.pool.get()?;
        match find_open_row(&mut conn, user_id)? {
            Some(cart) => Ok(Some(load_view(&mut conn, cart)?)),
            None => Ok(None),
        }
    }

    fn get_or_create_open(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = get_or_create_row(conn, user_id)?;
            load_view(conn, cart)
        })
    }

    fn add_item(
        &self,
        user_id: Uuid,
        item: AddCartItem,
        unit_price: BigDecimal,
    ) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = get_or_create_row(conn, user_id)?;

            let existing: Vec<CartItemRow> = cart_items::table
                .filter(cart_items::cart_id.eq(cart.id))
                .filter(cart_items::service_id.eq(item.service_id))
                .select(CartItemRow::as_select())
                .load(conn)?;
            let same = existing
                .into_iter()
                .find(|row| item.same_line(row.service_id, row.booking_date, row.booking_time));

            match same {
                Some(row) => {
                    let quantity = row.quantity + item.quantity;
                    diesel::update(cart_items::table.find(row.id))
                        .set((
                            cart_items::quantity.eq(quantity),
                            cart_items::total_price.eq(line_total(&row.unit_price, quantity)),
                        ))
                        .execute(conn)?;
                }
                None => {
                    diesel::insert_into(cart_items::table)
                        .values(&NewCartItemRow {
                            id: Uuid::new_v4(),
                            cart_id: cart.id,
                            service_id: item.service_id,
                            quantity: item.quantity,
                            total_price: line_total(&unit_price, item.quantity),
                            unit_price,
                            booking_date: item.booking_date,
                            booking_time: item.booking_time,
                            special_requests: item.special_requests,
                        })
                        .execute(conn)?;
                }
            }

            let cart = recompute(conn, cart.id)?;
            load_view(conn, cart)
        })
    }

    fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        patch: CartItemPatch,
    ) -> Result<CartItemView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let (cart, row) = open_item(conn, user_id, item_id)?;
            let quantity = patch.quantity.unwrap_or(row.quantity);

            diesel::update(cart_items::table.find(row.id))
                .set((
                    cart_items::quantity.eq(quantity),
                    cart_items::total_price.eq(line_total(&row.unit_price, quantity)),
                    cart_items::booking_date.eq(patch.booking_date.or(row.booking_date)),
                    cart_items::booking_time.eq(patch.booking_time.or(row.booking_time)),
                    cart_items::special_requests
                        .eq(patch.special_requests.or(row.special_requests)),
                ))
                .execute(conn)?;

            recompute(conn, cart.id)?;
            load_items(conn, cart.id)?
                .into_iter()
                .find(|i| i.id == item_id)
                .ok_or(DomainError::NotFound("Cart item"))
        })
    }

    fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let (cart, row) = open_item(conn, user_id, item_id)?;
            diesel::delete(cart_items::table.find(row.id)).execute(conn)?;
            let cart = recompute(conn, cart.id)?;
            load_view(conn, cart)
        })
    }

    fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = find_open_row(conn, user_id)?.ok_or(DomainError::NotFound("Cart"))?;
            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;
            let cart = recompute(conn, cart.id)?;
            load_view(conn, cart)
        })
    }
}
