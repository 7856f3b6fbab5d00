use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::booking::{generate_reference, BookingLineView, BookingStatus};
use crate::domain::errors::DomainError;
use crate::domain::money::Totals;
use crate::domain::order::{CustomerContact, OrderItemView, OrderStatus, OrderView, PlacedOrder};
use crate::domain::payment::{PaymentStatus, SettlementStatus};
use crate::domain::ports::OrderRepository;
use crate::domain::{Page, PageRequest};
use crate::schema::{bookings, order_items, orders, payments};

use super::booking_repo::{ensure_initiated_payment, load_view, replace_lines};
use super::cart_repo::{find_open_row, load_items};
use super::models::{BookingRow, NewBookingRow, NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn order_view(row: OrderRow, items: Vec<OrderItemRow>) -> Result<OrderView, DomainError> {
    Ok(OrderView {
        id: row.id,
        order_number: row.order_number,
        user_id: row.user_id,
        cart_id: row.cart_id,
        customer_name: row.customer_name,
        customer_email: row.customer_email,
        customer_phone: row.customer_phone,
        status: row.status.parse()?,
        payment_status: row.payment_status.parse()?,
        totals: Totals {
            subtotal: row.subtotal,
            tax: row.tax,
            total_amount: row.total_amount,
        },
        checkout_date: row.checkout_date,
        fulfillment_date: row.fulfillment_date,
        special_instructions: row.special_instructions,
        items: items
            .into_iter()
            .map(|i| OrderItemView {
                id: i.id,
                service_id: i.service_id,
                service_name: i.service_name,
                quantity: i.quantity,
                unit_price: i.unit_price,
                total_price: i.total_price,
                booking_date: i.booking_date,
                booking_time: i.booking_time,
                special_requests: i.special_requests,
            })
            .collect(),
        created_at: row.created_at,
    })
}

impl OrderRepository for DieselOrderRepository {
    fn place_from_cart(
        &self,
        user_id: Uuid,
        contact: CustomerContact,
    ) -> Result<PlacedOrder, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. The open cart is the source of truth for lines and totals.
            let cart = find_open_row(conn, user_id)?.ok_or(DomainError::NotFound("Cart"))?;
            let items = load_items(conn, cart.id)?;
            if items.is_empty() {
                return Err(DomainError::invalid("Cart is empty"));
            }
            let totals = Totals::from_line_totals(items.iter().map(|i| &i.total_price));
            let now = Utc::now();

            // 2. Immutable order snapshot.
            let order_id = Uuid::new_v4();
            let order = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    order_number: generate_reference("ORD", now),
                    user_id,
                    cart_id: Some(cart.id),
                    customer_name: contact.name.clone(),
                    customer_email: contact.email.clone(),
                    customer_phone: contact.phone.clone(),
                    status: OrderStatus::Pending.as_str().to_string(),
                    payment_status: SettlementStatus::Unpaid.as_str().to_string(),
                    subtotal: totals.subtotal.clone(),
                    tax: totals.tax.clone(),
                    total_amount: totals.total_amount.clone(),
                    checkout_date: now,
                    special_instructions: contact.special_instructions.clone(),
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            let item_rows: Vec<NewOrderItemRow> = items
                .iter()
                .map(|i| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    service_id: i.service_id,
                    service_name: i.service_name.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price.clone(),
                    total_price: i.total_price.clone(),
                    booking_date: i.booking_date,
                    booking_time: i.booking_time,
                    special_requests: i.special_requests.clone(),
                })
                .collect();
            let order_items = diesel::insert_into(order_items::table)
                .values(&item_rows)
                .returning(OrderItemRow::as_returning())
                .get_results(conn)?;

            // 3. Reuse the user's open booking for this contact, or start one.
            let first = &items[0];
            let booking_date = first.booking_date.unwrap_or_else(|| now.date_naive());
            let guests = i32::try_from(items.iter().map(|i| i64::from(i.quantity)).sum::<i64>())
                .map_err(|_| DomainError::invalid("Too many guests"))?;
            let reusable: Vec<&str> = BookingStatus::REUSABLE.iter().map(|s| s.as_str()).collect();
            let unsettled = [SettlementStatus::Unpaid.as_str(), SettlementStatus::Partial.as_str()];

            let existing = bookings::table
                .filter(bookings::user_id.eq(user_id))
                .filter(bookings::guest_email.eq(&contact.email))
                .filter(bookings::status.eq_any(reusable))
                .filter(bookings::payment_status.eq_any(unsettled))
                .order(bookings::created_at.desc())
                .select(BookingRow::as_select())
                .for_update()
                .first(conn)
                .optional()?;

            let booking_id = match existing {
                Some(row) => {
                    diesel::update(bookings::table.find(row.id))
                        .set((
                            bookings::order_id.eq(Some(order_id)),
                            bookings::guest_name.eq(&contact.name),
                            bookings::guest_phone.eq(&contact.phone),
                            bookings::booking_date.eq(booking_date),
                            bookings::booking_time.eq(first.booking_time),
                            bookings::number_of_guests.eq(guests),
                            bookings::special_requests.eq(&contact.special_instructions),
                            bookings::updated_at.eq(now),
                        ))
                        .execute(conn)?;
                    row.id
                }
                None => {
                    let id = Uuid::new_v4();
                    diesel::insert_into(bookings::table)
                        .values(&NewBookingRow {
                            id,
                            booking_number: generate_reference("BK", now),
                            user_id: Some(user_id),
                            order_id: Some(order_id),
                            guest_name: contact.name.clone(),
                            guest_email: contact.email.clone(),
                            guest_phone: contact.phone.clone(),
                            booking_date,
                            booking_time: first.booking_time,
                            number_of_guests: guests,
                            status: BookingStatus::Pending.as_str().to_string(),
                            payment_status: SettlementStatus::Unpaid.as_str().to_string(),
                            subtotal: totals.subtotal.clone(),
                            tax: totals.tax.clone(),
                            total_amount: totals.total_amount.clone(),
                            special_requests: contact.special_instructions.clone(),
                        })
                        .execute(conn)?;
                    id
                }
            };

            let lines: Vec<BookingLineView> = items
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
            let booking_totals = replace_lines(conn, booking_id, &lines)?;

            // 4. The pending online payment the vendor session will settle.
            let payment_id = ensure_initiated_payment(
                conn,
                booking_id,
                booking_totals.total_amount,
                "Online payment initiated from cart checkout.",
            )?;

            let booking_row = bookings::table
                .find(booking_id)
                .select(BookingRow::as_select())
                .first(conn)?;

            Ok(PlacedOrder {
                order: order_view(order, order_items)?,
                booking: load_view(conn, booking_row)?,
                payment_id,
            })
        })
    }

    fn abandon_checkout(&self, order_id: Uuid, payment_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let now = Utc::now();
            diesel::update(payments::table.find(payment_id))
                .set((
                    payments::payment_status.eq(PaymentStatus::Failed.as_str()),
                    payments::notes.eq(Some("Payment gateway session could not be created.")),
                ))
                .execute(conn)?;
            diesel::update(orders::table.find(order_id))
                .set((
                    orders::status.eq(OrderStatus::Cancelled.as_str()),
                    orders::updated_at.eq(now),
                ))
                .execute(conn)?;
            Ok(())
        })
    }

    fn find_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(order_id))
            .filter(orders::user_id.eq(user_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = OrderItemRow::belonging_to(&order)
            .select(OrderItemRow::as_select())
            .order(order_items::created_at.asc())
            .load(&mut conn)?;

        Ok(Some(order_view(order, items)?))
    }

    fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<Page<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table
                .filter(orders::user_id.eq(user_id))
                .count()
                .get_result(conn)?;

            let rows = orders::table
                .filter(orders::user_id.eq(user_id))
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            let mut items_by_order: HashMap<Uuid, Vec<OrderItemRow>> = HashMap::new();
            for item in OrderItemRow::belonging_to(&rows)
                .select(OrderItemRow::as_select())
                .order(order_items::created_at.asc())
                .load(conn)?
            {
                items_by_order.entry(item.order_id).or_default().push(item);
            }

            let items = rows
                .into_iter()
                .map(|row| {
                    let lines = items_by_order.remove(&row.id).unwrap_or_default();
                    order_view(row, lines)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Page { items, total })
        })
    }
}
