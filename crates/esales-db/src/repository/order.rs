//! # Order Repository
//!
//! Database operations for orders and their customer info.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  ── inside the placement transaction ─────────────────────────────────  │
//! │  1. insert_order()          → Order { status: Pending }                │
//! │  2. insert_customer_info()  → customer_info row (1:1)                  │
//! │     (stock reserved by CatalogRepository)                              │
//! │  3. set_status()            → Completed | Failed (exactly once)        │
//! │     (outbox row queued by NotificationOutboxRepository)                │
//! │  ── commit ───────────────────────────────────────────────────────────  │
//! │                                                                         │
//! │  4. get_view(order_number)  → joined OrderView for the thank-you page  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

use crate::error::DbResult;
use esales_core::order_number::{format_order_number, SUFFIX_ALPHABET, SUFFIX_LEN};
use esales_core::{CustomerInfo, Money, Order, OrderStatus, OrderView};

// =============================================================================
// Order Number Generation
// =============================================================================

/// Generates an order number: `ORD-` + last 6 digits of the epoch
/// millisecond clock + 4 random `[0-9A-Z]` characters.
///
/// Within one process the clock part never repeats: when two numbers are
/// requested in the same millisecond the second borrows the next one. A
/// burst of N numbers therefore runs the clock digits up to N ms ahead of
/// wall time, and they are not a creation timestamp.
///
/// Across processes only the random suffix separates numbers minted in the
/// same millisecond. A collision surfaces as a UNIQUE violation on insert
/// and is never retried here.
pub fn generate_order_number() -> String {
    let millis = next_order_millis(Utc::now().timestamp_millis());
    format_order_number(millis, &random_suffix(&mut rand::thread_rng()))
}

fn random_suffix<R: Rng>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Last clock value handed out by `generate_order_number`.
static LAST_ORDER_MILLIS: AtomicI64 = AtomicI64::new(0);

fn next_order_millis(now: i64) -> i64 {
    advance_clock(&LAST_ORDER_MILLIS, now)
}

/// Returns `max(now, last + 1)` and records it in `clock`.
fn advance_clock(clock: &AtomicI64, now: i64) -> i64 {
    let mut last = clock.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match clock.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// Input for inserting an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    pub total_amount: Money,
}

#[derive(Debug, FromRow)]
struct OrderRecord {
    id: i64,
    order_number: String,
    product_id: i64,
    variant_id: Option<i64>,
    quantity: i64,
    total_amount_cents: i64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRecord> for Order {
    fn from(r: OrderRecord) -> Self {
        Order {
            id: r.id,
            order_number: r.order_number,
            product_id: r.product_id,
            variant_id: r.variant_id,
            quantity: r.quantity,
            total_amount: Money::from_cents(r.total_amount_cents),
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderViewRecord {
    id: i64,
    order_number: String,
    product_id: i64,
    variant_id: Option<i64>,
    quantity: i64,
    total_amount_cents: i64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    product_name: String,
    product_price_cents: i64,
    variant_name: Option<String>,
    variant_value: Option<String>,
    full_name: String,
    email: String,
    phone: String,
    address: String,
    city: String,
    state: String,
    zip_code: String,
}

impl From<OrderViewRecord> for OrderView {
    fn from(r: OrderViewRecord) -> Self {
        OrderView {
            id: r.id,
            order_number: r.order_number,
            product_id: r.product_id,
            variant_id: r.variant_id,
            quantity: r.quantity,
            total_amount: Money::from_cents(r.total_amount_cents),
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
            product_name: r.product_name,
            product_price: Money::from_cents(r.product_price_cents),
            variant_name: r.variant_name,
            variant_value: r.variant_value,
            full_name: r.full_name,
            email: r.email,
            phone: r.phone,
            address: r.address,
            city: r.city,
            state: r.state,
            zip_code: r.zip_code,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
///
/// Writes that belong to the placement transaction are associated functions
/// taking the transaction's connection; reads go through the pool.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts an order with status `pending`.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` if the order number already exists.
    pub async fn insert_order(conn: &mut SqliteConnection, new: &NewOrder) -> DbResult<Order> {
        let now = Utc::now();

        debug!(order_number = %new.order_number, "Inserting order");

        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                order_number, product_id, variant_id, quantity,
                total_amount_cents, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&new.order_number)
        .bind(new.product_id)
        .bind(new.variant_id)
        .bind(new.quantity)
        .bind(new.total_amount.cents())
        .bind(OrderStatus::Pending)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(Order {
            id: result.last_insert_rowid(),
            order_number: new.order_number.clone(),
            product_id: new.product_id,
            variant_id: new.variant_id,
            quantity: new.quantity,
            total_amount: new.total_amount,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Inserts the customer info row for an order.
    pub async fn insert_customer_info(
        conn: &mut SqliteConnection,
        order_id: i64,
        info: &CustomerInfo,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customer_info (
                order_id, full_name, email, phone, address, city, state, zip_code
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(order_id)
        .bind(info.full_name.trim())
        .bind(info.email.trim())
        .bind(info.phone.trim())
        .bind(info.address.trim())
        .bind(info.city.trim())
        .bind(info.state.trim())
        .bind(info.zip_code.trim())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Moves a pending order to its final status.
    ///
    /// ## Returns
    /// * `Ok(true)` - The order was pending and now has `status`
    /// * `Ok(false)` - The order was already final (or `status` is `Pending`);
    ///   nothing changed
    pub async fn set_status(
        conn: &mut SqliteConnection,
        order_id: i64,
        status: OrderStatus,
    ) -> DbResult<bool> {
        if !OrderStatus::Pending.can_transition_to(status) {
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?2,
                updated_at = ?3
            WHERE id = ?1 AND status = ?4
            "#,
        )
        .bind(order_id)
        .bind(status)
        .bind(Utc::now())
        .bind(OrderStatus::Pending)
        .execute(&mut *conn)
        .await?;

        let changed = result.rows_affected() == 1;
        debug!(order_id, status = %status, changed, "Set order status");
        Ok(changed)
    }

    /// Gets an order by its order number.
    pub async fn get_by_number(&self, order_number: &str) -> DbResult<Option<Order>> {
        let record = sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT
                id, order_number, product_id, variant_id, quantity,
                total_amount_cents, status, created_at, updated_at
            FROM orders
            WHERE order_number = ?1
            "#,
        )
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Order::from))
    }

    /// Gets the joined order + product + variant + customer view.
    ///
    /// ## Returns
    /// * `Ok(Some(OrderView))` - Exact match on order number
    /// * `Ok(None)` - No such order
    pub async fn get_view(&self, order_number: &str) -> DbResult<Option<OrderView>> {
        let record = sqlx::query_as::<_, OrderViewRecord>(
            r#"
            SELECT
                o.id, o.order_number, o.product_id, o.variant_id, o.quantity,
                o.total_amount_cents, o.status, o.created_at, o.updated_at,
                p.name        AS product_name,
                p.price_cents AS product_price_cents,
                v.name        AS variant_name,
                v.value       AS variant_value,
                ci.full_name, ci.email, ci.phone, ci.address,
                ci.city, ci.state, ci.zip_code
            FROM orders o
            JOIN products p ON o.product_id = p.id
            LEFT JOIN variants v ON o.variant_id = v.id
            JOIN customer_info ci ON o.id = ci.order_id
            WHERE o.order_number = ?1
            "#,
        )
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(OrderView::from))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::catalog::{NewProduct, NewVariant};
    use crate::{Database, DbConfig, DbError};
    use esales_core::order_number::is_valid_order_number;
    use std::collections::HashSet;

    fn customer() -> CustomerInfo {
        CustomerInfo {
            full_name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            phone: "5551234567".into(),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip_code: "627011".into(),
        }
    }

    async fn seeded() -> (Database, i64, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product_id = db
            .catalog()
            .insert_product(&NewProduct {
                name: "Classic Sneaker".into(),
                description: None,
                price: Money::from_cents(2000),
                image_url: None,
            })
            .await
            .unwrap();
        let variant_id = db
            .catalog()
            .insert_variant(&NewVariant {
                product_id,
                name: "Color".into(),
                value: "Black".into(),
                price_adjustment: Money::from_cents(500),
                stock: 10,
            })
            .await
            .unwrap();
        (db, product_id, variant_id)
    }

    fn new_order(product_id: i64, variant_id: Option<i64>) -> NewOrder {
        NewOrder {
            order_number: generate_order_number(),
            product_id,
            variant_id,
            quantity: 2,
            total_amount: Money::from_cents(5000),
        }
    }

    #[test]
    fn test_generated_order_number_format() {
        for _ in 0..100 {
            let n = generate_order_number();
            assert!(is_valid_order_number(&n), "bad order number {}", n);
        }
    }

    #[test]
    fn test_order_clock_is_strictly_increasing() {
        let a = next_order_millis(1_000);
        let b = next_order_millis(1_000);
        let c = next_order_millis(0);
        assert!(b > a);
        assert!(c > b);
    }

    #[test]
    fn test_generated_order_numbers_do_not_collide() {
        let numbers: HashSet<String> = (0..10_000).map(|_| generate_order_number()).collect();
        assert_eq!(numbers.len(), 10_000);
    }

    #[test]
    fn test_order_clock_drift_is_bounded_by_burst_size() {
        let clock = AtomicI64::new(0);
        let now = 1_700_000_000_000;

        let first = advance_clock(&clock, now);
        let last = (1..100).map(|_| advance_clock(&clock, now)).last().unwrap();
        assert_eq!(first, now);
        assert_eq!(last, now + 99);

        // Once wall time passes the borrowed values the clock follows it again
        assert_eq!(advance_clock(&clock, now + 500), now + 500);
    }

    #[test]
    fn test_suffix_alone_spreads_within_one_millisecond() {
        let mut rng = rand::thread_rng();
        let suffixes: HashSet<String> = (0..10_000).map(|_| random_suffix(&mut rng)).collect();

        // 36^4 values: a handful of birthday collisions, never a fixed pattern
        assert!(suffixes.len() > 9_900, "only {} distinct suffixes", suffixes.len());
        assert!(suffixes
            .iter()
            .all(|s| s.len() == SUFFIX_LEN && s.bytes().all(|b| SUFFIX_ALPHABET.contains(&b))));
    }

    #[tokio::test]
    async fn test_insert_and_view() {
        let (db, product_id, variant_id) = seeded().await;
        let mut tx = db.begin().await.unwrap();

        let order = OrderRepository::insert_order(&mut tx, &new_order(product_id, Some(variant_id)))
            .await
            .unwrap();
        OrderRepository::insert_customer_info(&mut tx, order.id, &customer())
            .await
            .unwrap();
        assert!(OrderRepository::set_status(&mut tx, order.id, OrderStatus::Completed)
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let view = db.orders().get_view(&order.order_number).await.unwrap().unwrap();
        assert_eq!(view.status, OrderStatus::Completed);
        assert_eq!(view.quantity, 2);
        assert_eq!(view.total_amount, Money::from_cents(5000));
        assert_eq!(view.product_name, "Classic Sneaker");
        assert_eq!(view.product_price, Money::from_cents(2000));
        assert_eq!(view.variant_value.as_deref(), Some("Black"));
        assert_eq!(view.zip_code, "627011");
    }

    #[tokio::test]
    async fn test_view_without_variant() {
        let (db, product_id, _) = seeded().await;
        let mut tx = db.begin().await.unwrap();

        let order = OrderRepository::insert_order(&mut tx, &new_order(product_id, None))
            .await
            .unwrap();
        OrderRepository::insert_customer_info(&mut tx, order.id, &customer())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let view = db.orders().get_view(&order.order_number).await.unwrap().unwrap();
        assert_eq!(view.status, OrderStatus::Pending);
        assert!(view.variant_name.is_none());
        assert!(view.variant_value.is_none());
    }

    #[tokio::test]
    async fn test_unknown_order_number() {
        let (db, _, _) = seeded().await;
        assert!(db.orders().get_view("ORD-000000XXXX").await.unwrap().is_none());
        assert!(db.orders().get_by_number("ORD-000000XXXX").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_transitions_once() {
        let (db, product_id, _) = seeded().await;
        let mut tx = db.begin().await.unwrap();

        let order = OrderRepository::insert_order(&mut tx, &new_order(product_id, None))
            .await
            .unwrap();

        assert!(OrderRepository::set_status(&mut tx, order.id, OrderStatus::Failed)
            .await
            .unwrap());
        assert!(!OrderRepository::set_status(&mut tx, order.id, OrderStatus::Completed)
            .await
            .unwrap());
        assert!(!OrderRepository::set_status(&mut tx, order.id, OrderStatus::Pending)
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let stored = db.orders().get_by_number(&order.order_number).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_duplicate_order_number_is_unique_violation() {
        let (db, product_id, _) = seeded().await;
        let mut tx = db.begin().await.unwrap();

        let first = new_order(product_id, None);
        OrderRepository::insert_order(&mut tx, &first).await.unwrap();

        let err = OrderRepository::insert_order(&mut tx, &first).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_product_is_foreign_key_violation() {
        let (db, _, _) = seeded().await;
        let mut tx = db.begin().await.unwrap();

        let err = OrderRepository::insert_order(&mut tx, &new_order(999, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_customer_info_round_trip() {
        let (db, product_id, _) = seeded().await;
        let mut tx = db.begin().await.unwrap();

        let order = OrderRepository::insert_order(&mut tx, &new_order(product_id, None))
            .await
            .unwrap();
        OrderRepository::insert_customer_info(&mut tx, order.id, &customer())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let view = db.orders().get_view(&order.order_number).await.unwrap().unwrap();
        let expected = customer();
        assert_eq!(view.full_name, expected.full_name);
        assert_eq!(view.email, expected.email);
        assert_eq!(view.zip_code, expected.zip_code);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer_info WHERE order_id = ?1")
            .bind(order.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }
}
