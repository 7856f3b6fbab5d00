use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::booking::{
    generate_reference, settle, total_completed, BookingLineView, BookingStatus, BookingView,
    NewBooking, Settlement,
};
use crate::domain::cart::CartStatus;
use crate::domain::errors::DomainError;
use crate::domain::money::Totals;
use crate::domain::order::OrderStatus;
use crate::domain::payment::{
    PaymentMethod, PaymentRecord, PaymentStatus, PaymentView, SettlementStatus,
};
use crate::domain::ports::BookingRepository;
use crate::domain::{Page, PageRequest};
use crate::schema::{booking_lines, bookings, carts, orders, payments};

use super::models::{
    BookingLineRow, BookingRow, NewBookingLineRow, NewBookingRow, NewPaymentRow, PaymentRow,
};

pub struct DieselBookingRepository {
    pool: DbPool,
}

impl DieselBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// ── Shared booking queries ───────────────────────────────────────────────────
//
// The checkout transaction in `order_repo` reuses these.

pub(crate) fn load_view(conn: &mut PgConnection, row: BookingRow) -> Result<BookingView, DomainError> {
    let lines = booking_lines::table
        .filter(booking_lines::booking_id.eq(row.id))
        .select(BookingLineRow::as_select())
        .order(booking_lines::created_at.asc())
        .load(conn)?
        .into_iter()
        .map(BookingLineView::from)
        .collect();
    let payments = payments::table
        .filter(payments::booking_id.eq(row.id))
        .select(PaymentRow::as_select())
        .order(payments::payment_date.asc())
        .load(conn)?
        .into_iter()
        .map(PaymentView::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BookingView {
        id: row.id,
        booking_number: row.booking_number,
        user_id: row.user_id,
        order_id: row.order_id,
        guest_name: row.guest_name,
        guest_email: row.guest_email,
        guest_phone: row.guest_phone,
        booking_date: row.booking_date,
        booking_time: row.booking_time,
        number_of_guests: row.number_of_guests,
        status: row.status.parse()?,
        payment_status: row.payment_status.parse()?,
        totals: Totals {
            subtotal: row.subtotal,
            tax: row.tax,
            total_amount: row.total_amount,
        },
        special_requests: row.special_requests,
        admin_notes: row.admin_notes,
        lines,
        payments,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn locked_by_number(conn: &mut PgConnection, booking_number: &str) -> Result<BookingRow, DomainError> {
    bookings::table
        .filter(bookings::booking_number.eq(booking_number))
        .select(BookingRow::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or(DomainError::NotFound("Booking"))
}

/// Swap the booking's service lines and re-derive its totals from them.
pub(crate) fn replace_lines(
    conn: &mut PgConnection,
    booking_id: Uuid,
    lines: &[BookingLineView],
) -> QueryResult<Totals> {
    diesel::delete(booking_lines::table.filter(booking_lines::booking_id.eq(booking_id)))
        .execute(conn)?;
    let rows: Vec<NewBookingLineRow> = lines
        .iter()
        .map(|l| NewBookingLineRow::from_view(booking_id, l))
        .collect();
    diesel::insert_into(booking_lines::table)
        .values(&rows)
        .execute(conn)?;

    let totals = Totals::from_line_totals(lines.iter().map(|l| &l.total_price));
    diesel::update(bookings::table.find(booking_id))
        .set((
            bookings::subtotal.eq(&totals.subtotal),
            bookings::tax.eq(&totals.tax),
            bookings::total_amount.eq(&totals.total_amount),
            bookings::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;
    Ok(totals)
}

/// Find the booking's open online payment or create one for `amount`.
pub(crate) fn ensure_initiated_payment(
    conn: &mut PgConnection,
    booking_id: Uuid,
    amount: BigDecimal,
    notes: &str,
) -> QueryResult<Uuid> {
    let existing: Option<Uuid> = payments::table
        .filter(payments::booking_id.eq(booking_id))
        .filter(payments::payment_status.eq(PaymentStatus::Initiated.as_str()))
        .filter(payments::payment_method.eq(PaymentMethod::Online.as_str()))
        .order(payments::payment_date.desc())
        .select(payments::id)
        .first(conn)
        .optional()?;

    match existing {
        Some(id) => {
            diesel::update(payments::table.find(id))
                .set((payments::amount.eq(amount), payments::notes.eq(Some(notes))))
                .execute(conn)?;
            Ok(id)
        }
        None => {
            let id = Uuid::new_v4();
            diesel::insert_into(payments::table)
                .values(&NewPaymentRow {
                    id,
                    booking_id,
                    amount,
                    payment_method: PaymentMethod::Online.as_str().to_string(),
                    payment_status: PaymentStatus::Initiated.as_str().to_string(),
                    transaction_id: None,
                    session_id: None,
                    notes: Some(notes.to_string()),
                })
                .execute(conn)?;
            Ok(id)
        }
    }
}

/// Insert the payment, or promote the row already carrying its vendor
/// session. Returns the payment id and whether anything new was recorded.
fn upsert_payment(
    conn: &mut PgConnection,
    booking_id: Uuid,
    payment: PaymentRecord,
) -> QueryResult<(Uuid, bool)> {
    if let Some(session_id) = &payment.session_id {
        let existing: Option<PaymentRow> = payments::table
            .filter(payments::booking_id.eq(booking_id))
            .filter(payments::session_id.eq(session_id))
            .order(payments::payment_date.desc())
            .select(PaymentRow::as_select())
            .first(conn)
            .optional()?;

        if let Some(row) = existing {
            if row.payment_status == PaymentStatus::Completed.as_str() {
                return Ok((row.id, false));
            }
            diesel::update(payments::table.find(row.id))
                .set((
                    payments::amount.eq(&payment.amount),
                    payments::payment_method.eq(payment.method.as_str()),
                    payments::payment_status.eq(payment.status.as_str()),
                    payments::transaction_id.eq(payment.transaction_id.or(row.transaction_id)),
                    payments::notes.eq(payment.notes.or(row.notes)),
                    payments::payment_date.eq(Utc::now()),
                ))
                .execute(conn)?;
            return Ok((row.id, true));
        }
    }

    let id = Uuid::new_v4();
    diesel::insert_into(payments::table)
        .values(&NewPaymentRow {
            id,
            booking_id,
            amount: payment.amount,
            payment_method: payment.method.as_str().to_string(),
            payment_status: payment.status.as_str().to_string(),
            transaction_id: payment.transaction_id,
            session_id: payment.session_id,
            notes: payment.notes,
        })
        .execute(conn)?;
    Ok((id, true))
}

/// Mirror a booking's settlement onto its order and close the cart once paid.
/// Returns true when this call closed the cart.
fn follow_order(
    conn: &mut PgConnection,
    order_id: Uuid,
    payment_status: SettlementStatus,
) -> QueryResult<bool> {
    let now = Utc::now();
    match payment_status {
        SettlementStatus::Paid => {
            let cart_id: Option<Uuid> = diesel::update(orders::table.find(order_id))
                .set((
                    orders::status.eq(OrderStatus::Completed.as_str()),
                    orders::payment_status.eq(SettlementStatus::Paid.as_str()),
                    orders::fulfillment_date.eq(Some(now)),
                    orders::updated_at.eq(now),
                ))
                .returning(orders::cart_id)
                .get_result(conn)?;
            let Some(cart_id) = cart_id else {
                return Ok(false);
            };
            let closed = diesel::update(
                carts::table
                    .find(cart_id)
                    .filter(carts::status.eq(CartStatus::Open.as_str())),
            )
            .set((
                carts::status.eq(CartStatus::Closed.as_str()),
                carts::updated_at.eq(now),
            ))
            .execute(conn)?;
            Ok(closed > 0)
        }
        other => {
            diesel::update(orders::table.find(order_id))
                .set((
                    orders::payment_status.eq(other.as_str()),
                    orders::updated_at.eq(now),
                ))
                .execute(conn)?;
            Ok(false)
        }
    }
}

// ── Repository ───────────────────────────────────────────────────────────────

impl BookingRepository for DieselBookingRepository {
    fn create(
        &self,
        booking: NewBooking,
        lines: Vec<BookingLineView>,
    ) -> Result<BookingView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let id = Uuid::new_v4();
            let zero = Totals::zero();
            diesel::insert_into(bookings::table)
                .values(&NewBookingRow {
                    id,
                    booking_number: generate_reference("BK", Utc::now()),
                    user_id: booking.user_id,
                    order_id: None,
                    guest_name: booking.guest_name,
                    guest_email: booking.guest_email,
                    guest_phone: booking.guest_phone,
                    booking_date: booking.booking_date,
                    booking_time: booking.booking_time,
                    number_of_guests: booking.number_of_guests,
                    status: BookingStatus::Pending.as_str().to_string(),
                    payment_status: SettlementStatus::Unpaid.as_str().to_string(),
                    subtotal: zero.subtotal,
                    tax: zero.tax,
                    total_amount: zero.total_amount,
                    special_requests: booking.special_requests,
                })
                .execute(conn)?;
            replace_lines(conn, id, &lines)?;

            let row = bookings::table
                .find(id)
                .select(BookingRow::as_select())
                .first(conn)?;
            load_view(conn, row)
        })
    }

    fn find_by_number(&self, booking_number: &str) -> Result<Option<BookingView>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = bookings::table
            .filter(bookings::booking_number.eq(booking_number))
            .select(BookingRow::as_select())
            .first(&mut conn)
            .optional()?;
        match row {
            Some(row) => Ok(Some(load_view(&mut conn, row)?)),
            None => Ok(None),
        }
    }

    fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<Page<BookingView>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = bookings::table
                .filter(bookings::user_id.eq(user_id))
                .count()
                .get_result(conn)?;

            let rows = bookings::table
                .filter(bookings::user_id.eq(user_id))
                .select(BookingRow::as_select())
                .order(bookings::created_at.desc())
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            let items = rows
                .into_iter()
                .map(|row| load_view(conn, row))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Page { items, total })
        })
    }

    fn update_status(
        &self,
        booking_number: &str,
        status: BookingStatus,
        admin_notes: Option<String>,
    ) -> Result<BookingView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = locked_by_number(conn, booking_number)?;
            let row = diesel::update(bookings::table.find(row.id))
                .set((
                    bookings::status.eq(status.as_str()),
                    bookings::admin_notes.eq(admin_notes.or(row.admin_notes)),
                    bookings::updated_at.eq(Utc::now()),
                ))
                .returning(BookingRow::as_returning())
                .get_result(conn)?;
            load_view(conn, row)
        })
    }

    fn ensure_checkout_payment(&self, booking_id: Uuid, amount: BigDecimal) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(ensure_initiated_payment(
            &mut conn,
            booking_id,
            amount,
            "Online payment initiated from booking checkout.",
        )?)
    }

    fn set_payment_session(&self, payment_id: Uuid, session_id: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(payments::table.find(payment_id))
            .set(payments::session_id.eq(Some(session_id)))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("Payment"));
        }
        Ok(())
    }

    fn record_payment(
        &self,
        booking_number: &str,
        payment: PaymentRecord,
    ) -> Result<Settlement, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = locked_by_number(conn, booking_number)?;
            let (payment_id, newly_recorded) = upsert_payment(conn, row.id, payment)?;

            let current = load_view(conn, row)?;
            let total_paid = total_completed(&current.payments);
            let (status, payment_status) = settle(
                &current.totals.total_amount,
                &total_paid,
                current.status,
                current.payment_status,
            );

            let row = diesel::update(bookings::table.find(current.id))
                .set((
                    bookings::status.eq(status.as_str()),
                    bookings::payment_status.eq(payment_status.as_str()),
                    bookings::updated_at.eq(Utc::now()),
                ))
                .returning(BookingRow::as_returning())
                .get_result(conn)?;

            let cart_closed = match (current.order_id, payment_status) {
                (Some(order_id), SettlementStatus::Paid | SettlementStatus::Partial) => {
                    follow_order(conn, order_id, payment_status)?
                }
                _ => false,
            };

            Ok(Settlement {
                booking: load_view(conn, row)?,
                payment_id,
                newly_recorded,
                cart_closed,
            })
        })
    }

    fn mark_payment_failed(&self, reference: &str) -> Result<usize, DomainError> {
        let mut conn = self.pool.get()?;
        let open = [
            PaymentStatus::Initiated.as_str(),
            PaymentStatus::WaitingForConfirmation.as_str(),
        ];
        Ok(diesel::update(
            payments::table
                .filter(
                    payments::session_id
                        .eq(reference)
                        .or(payments::transaction_id.eq(reference)),
                )
                .filter(payments::payment_status.eq_any(open)),
        )
        .set(payments::payment_status.eq(PaymentStatus::Failed.as_str()))
        .execute(&mut conn)?)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    use super::DieselBookingRepository;
    use crate::domain::booking::{BookingLineView, BookingStatus, NewBooking};
    use crate::domain::catalog::NewService;
    use crate::domain::money::line_total;
    use crate::domain::payment::{PaymentMethod, PaymentRecord, PaymentStatus, SettlementStatus};
    use crate::domain::ports::{BookingRepository, CatalogRepository};
    use crate::infrastructure::test_db::setup_db;
    use crate::infrastructure::DieselCatalogRepository;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn online(amount: &str, session: Option<&str>) -> PaymentRecord {
        PaymentRecord {
            amount: dec(amount),
            method: PaymentMethod::Online,
            status: PaymentStatus::Completed,
            transaction_id: None,
            session_id: session.map(str::to_string),
            notes: None,
        }
    }

    async fn booking_for_100(
        repo: &DieselBookingRepository,
        catalog: &DieselCatalogRepository,
    ) -> String {
        let service = catalog
            .create(NewService {
                name: "Island Hopping".to_string(),
                slug: None,
                synopsis: None,
                description: None,
                price: dec("50.00"),
                unit: None,
                duration: None,
                min_people: None,
                max_people: None,
            })
            .expect("service create failed");

        let booking = repo
            .create(
                NewBooking {
                    user_id: None,
                    guest_name: "Gina Guest".to_string(),
                    guest_email: "gina@example.com".to_string(),
                    guest_phone: "555".to_string(),
                    booking_date: NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date"),
                    booking_time: None,
                    number_of_guests: 2,
                    special_requests: None,
                    lines: vec![],
                },
                vec![BookingLineView {
                    service_id: service.id,
                    service_name: service.name,
                    quantity: 2,
                    total_price: line_total(&service.price, 2),
                    unit_price: service.price,
                    notes: None,
                }],
            )
            .expect("booking create failed");
        assert_eq!(booking.totals.total_amount, dec("105.00"));
        booking.booking_number
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn partial_then_full_payment_settles_booking() {
        let (_container, pool) = setup_db().await;
        let repo = DieselBookingRepository::new(pool.clone());
        let catalog = DieselCatalogRepository::new(pool);
        let number = booking_for_100(&repo, &catalog).await;

        let first = repo
            .record_payment(&number, online("60.00", None))
            .expect("first payment failed");
        assert_eq!(first.booking.payment_status, SettlementStatus::Partial);
        assert_eq!(first.booking.status, BookingStatus::Pending);

        let second = repo
            .record_payment(&number, online("45.00", None))
            .expect("second payment failed");
        assert_eq!(second.booking.payment_status, SettlementStatus::Paid);
        assert_eq!(second.booking.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn same_session_is_recorded_once() {
        let (_container, pool) = setup_db().await;
        let repo = DieselBookingRepository::new(pool.clone());
        let catalog = DieselCatalogRepository::new(pool);
        let number = booking_for_100(&repo, &catalog).await;

        let booking = repo
            .find_by_number(&number)
            .expect("find failed")
            .expect("booking should exist");
        let payment_id = repo
            .ensure_checkout_payment(booking.id, dec("105.00"))
            .expect("payment failed");
        repo.set_payment_session(payment_id, "cs_test_1")
            .expect("session failed");

        let first = repo
            .record_payment(&number, online("105.00", Some("cs_test_1")))
            .expect("confirm failed");
        let again = repo
            .record_payment(&number, online("105.00", Some("cs_test_1")))
            .expect("confirm failed");

        assert!(first.newly_recorded);
        assert_eq!(first.payment_id, payment_id);
        assert!(!again.newly_recorded);
        assert_eq!(again.booking.payments.len(), 1);
        assert_eq!(again.booking.payment_status, SettlementStatus::Paid);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn failed_vendor_payments_are_flagged() {
        let (_container, pool) = setup_db().await;
        let repo = DieselBookingRepository::new(pool.clone());
        let catalog = DieselCatalogRepository::new(pool);
        let number = booking_for_100(&repo, &catalog).await;
        let booking = repo
            .find_by_number(&number)
            .expect("find failed")
            .expect("booking should exist");
        let payment_id = repo
            .ensure_checkout_payment(booking.id, dec("105.00"))
            .expect("payment failed");
        repo.set_payment_session(payment_id, "cs_test_2")
            .expect("session failed");

        assert_eq!(repo.mark_payment_failed("cs_test_2").expect("update failed"), 1);
        let booking = repo
            .find_by_number(&number)
            .expect("find failed")
            .expect("booking should exist");
        assert_eq!(booking.payments[0].status, PaymentStatus::Failed);
    }
}
