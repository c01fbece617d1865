//! # Order Service
//!
//! Places orders and reads them back.
//!
//! ## Placement Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      place_order(request)                               │
//! │                                                                         │
//! │  validate_checkout ──► 400 on bad input, nothing written                │
//! │        │                                                                │
//! │  load product + variant (read-only catalog) ──► 404 when unknown        │
//! │        │                                                                │
//! │  total = (price + adjustment) × quantity, client total ignored         │
//! │        │                                                                │
//! │  BEGIN ─────────────────────────────────────────────────────────┐      │
//! │  │  INSERT orders (pending)                                      │      │
//! │  │  INSERT customer_info                                         │      │
//! │  │  UPDATE variants SET stock = stock - q WHERE stock >= q       │ any  │
//! │  │        └── no row? ──► OutOfStock (409)                       │ error│
//! │  │  PaymentProcessor::attempt_payment                            │  ──► │
//! │  │  UPDATE orders SET status = completed | failed                │ ROLL │
//! │  │        └── failed? ──► return reserved stock                  │ BACK │
//! │  │  INSERT notification_outbox                                   │      │
//! │  COMMIT ◄───────────────────────────────────────────────────────┘      │
//! │        │                                                                │
//! │  NotificationSender::send ──► mark outbox row delivered / failed        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The catalog is read before `BEGIN`. Products and variants other than
//! stock are never written by the storefront, and keeping the first
//! statement of the transaction a write means SQLite takes the write lock
//! up front instead of upgrading a read snapshot.

use std::sync::Arc;

use esales_core::pricing::{client_total_mismatch, order_total};
use esales_core::validation::{validate_checkout, validate_order_number};
use esales_core::{
    CheckoutRequest, CoreError, Money, NotificationKind, OrderStatus, OrderView, Product,
};
use esales_db::{
    generate_order_number, CatalogRepository, Database, DbError, NewOrder,
    NotificationOutboxRepository, OrderRepository, StockReservation,
};
use tracing::{debug, info, warn};

use super::outbox_relay::deliver;
use super::OrderResult;
use crate::notification::{Notification, NotificationSender};
use crate::payment::{PaymentAttempt, PaymentOutcome, PaymentProcessor};

pub const ORDER_PLACED_MESSAGE: &str = "Order placed successfully";
pub const PAYMENT_FAILED_MESSAGE: &str = "Transaction failed. Please try again.";

/// Result of a placement that reached a final status.
///
/// A declined payment is an outcome, not an error: the order exists with
/// status `failed` and the customer is told so.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementOutcome {
    pub success: bool,
    pub order_number: String,
    pub message: String,
    pub status: OrderStatus,
    pub total: Money,
}

/// Order placement and retrieval.
pub struct OrderService {
    db: Database,
    payments: Arc<dyn PaymentProcessor>,
    notifier: Arc<dyn NotificationSender>,
}

impl OrderService {
    pub fn new(
        db: Database,
        payments: Arc<dyn PaymentProcessor>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        OrderService {
            db,
            payments,
            notifier,
        }
    }

    /// Places an order.
    ///
    /// ## Errors
    /// * `CoreError::Validation` - bad input, nothing written
    /// * `CoreError::ProductNotFound` / `VariantNotFound` - unknown catalog ids
    /// * `CoreError::OutOfStock` - rolled back, stock untouched
    /// * `DbError` - rolled back; no order, customer info or outbox row remain
    pub async fn place_order(&self, request: CheckoutRequest) -> OrderResult<PlacementOutcome> {
        validate_checkout(&request)?;

        let product = self
            .db
            .catalog()
            .get_product(request.product_id)
            .await?
            .ok_or(CoreError::ProductNotFound(request.product_id))?;

        let variant = match request.variant_id {
            Some(variant_id) => Some(product.variant(variant_id).cloned().ok_or(
                CoreError::VariantNotFound {
                    variant_id,
                    product_id: product.id,
                },
            )?),
            None => None,
        };

        let total = order_total(
            product.price,
            variant.as_ref().map(|v| v.price_adjustment),
            request.quantity,
        );

        if client_total_mismatch(request.total_amount, total) {
            warn!(
                product_id = product.id,
                client_total = ?request.total_amount,
                server_total = %total,
                "Client total differs from server total, using server total"
            );
        }

        let order_number = generate_order_number();
        debug!(order_number = %order_number, %total, "Placing order");

        let mut tx = self.db.begin().await?;

        let order = OrderRepository::insert_order(
            &mut *tx,
            &NewOrder {
                order_number: order_number.clone(),
                product_id: product.id,
                variant_id: variant.as_ref().map(|v| v.id),
                quantity: request.quantity,
                total_amount: total,
            },
        )
        .await?;

        OrderRepository::insert_customer_info(&mut *tx, order.id, &request.customer_info).await?;

        if let Some(variant) = &variant {
            match CatalogRepository::reserve_stock(&mut *tx, product.id, variant.id, request.quantity)
                .await?
            {
                StockReservation::Reserved { remaining } => {
                    debug!(variant_id = variant.id, remaining, "Stock reserved");
                }
                StockReservation::Insufficient { available } => {
                    info!(
                        order_number = %order_number,
                        variant_id = variant.id,
                        available,
                        requested = request.quantity,
                        "Out of stock, rolling back"
                    );
                    return Err(CoreError::OutOfStock {
                        variant_id: variant.id,
                        available,
                        requested: request.quantity,
                    }
                    .into());
                }
                StockReservation::VariantMissing => {
                    return Err(CoreError::VariantNotFound {
                        variant_id: variant.id,
                        product_id: product.id,
                    }
                    .into());
                }
            }
        }

        let outcome = self
            .payments
            .attempt_payment(&PaymentAttempt {
                order_number: order_number.clone(),
                amount: total,
            })
            .await;
        let status = outcome.order_status();

        let updated = OrderRepository::set_status(&mut *tx, order.id, status).await?;
        let kind = match NotificationKind::for_status(status) {
            Some(kind) if updated => kind,
            _ => {
                return Err(CoreError::InvalidStatusTransition {
                    order_number,
                    from: order.status,
                    to: status,
                }
                .into());
            }
        };

        if outcome == PaymentOutcome::Failed {
            if let Some(variant) = &variant {
                CatalogRepository::release_stock(&mut *tx, variant.id, request.quantity).await?;
            }
        }

        let notification = Notification {
            kind,
            order_number: order_number.clone(),
            customer: request.customer_info.clone(),
            product_name: display_name(&product, variant.as_ref()),
            quantity: request.quantity,
            total,
        };
        let payload = serde_json::to_string(&notification).map_err(DbError::from)?;
        let entry = NotificationOutboxRepository::enqueue(&mut *tx, order.id, kind, &payload).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            order_number = %order_number,
            status = %status,
            total = %total,
            "Order placed"
        );

        deliver(&self.db, self.notifier.as_ref(), &entry.id, &notification).await;

        Ok(PlacementOutcome {
            success: outcome.is_completed(),
            message: if outcome.is_completed() {
                ORDER_PLACED_MESSAGE.to_string()
            } else {
                PAYMENT_FAILED_MESSAGE.to_string()
            },
            order_number,
            status,
            total,
        })
    }

    /// Looks up the joined order view by order number.
    pub async fn get_order_view(&self, order_number: &str) -> OrderResult<OrderView> {
        let order_number = order_number.trim();

        // Malformed numbers can't match a row
        if validate_order_number(order_number).is_err() {
            return Err(CoreError::OrderNotFound(order_number.to_string()).into());
        }

        self.db
            .orders()
            .get_view(order_number)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_number.to_string()).into())
    }

    /// All products with their variants.
    pub async fn list_products(&self) -> OrderResult<Vec<Product>> {
        Ok(self.db.catalog().list_products().await?)
    }

    /// One product with its variants.
    pub async fn get_product(&self, id: i64) -> OrderResult<Product> {
        self.db
            .catalog()
            .get_product(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id).into())
    }
}

/// "Classic Sneaker (Color: Black)" for a variant, the plain name otherwise.
fn display_name(product: &Product, variant: Option<&esales_core::Variant>) -> String {
    match variant {
        Some(v) => format!("{} ({}: {})", product.name, v.name, v.value),
        None => product.name.clone(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::RecordingNotificationSender;
    use crate::services::OrderError;
    use crate::payment::FixedOutcomeProcessor;
    use esales_core::CustomerInfo;
    use esales_db::{DbConfig, NewProduct, NewVariant};

    struct Fixture {
        db: Database,
        product_id: i64,
        variant_id: i64,
        sender: Arc<RecordingNotificationSender>,
    }

    impl Fixture {
        fn service(&self, outcome: PaymentOutcome) -> OrderService {
            OrderService::new(
                self.db.clone(),
                Arc::new(FixedOutcomeProcessor::new(outcome)),
                self.sender.clone(),
            )
        }

        async fn stock(&self) -> i64 {
            self.db
                .catalog()
                .get_variant(self.variant_id)
                .await
                .unwrap()
                .unwrap()
                .stock
        }
    }

    async fn seed(db: Database, stock: i64) -> Fixture {
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
                value: "Red".into(),
                price_adjustment: Money::from_cents(500),
                stock,
            })
            .await
            .unwrap();

        Fixture {
            db,
            product_id,
            variant_id,
            sender: Arc::new(RecordingNotificationSender::new()),
        }
    }

    async fn fixture(stock: i64) -> Fixture {
        seed(Database::new(DbConfig::in_memory()).await.unwrap(), stock).await
    }

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

    fn request(f: &Fixture, quantity: i64) -> CheckoutRequest {
        CheckoutRequest {
            product_id: f.product_id,
            variant_id: Some(f.variant_id),
            quantity,
            customer_info: customer(),
            product_name: Some("Classic Sneaker".into()),
            total_amount: None,
        }
    }

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_completed_order_end_to_end() {
        let f = fixture(10).await;
        let service = f.service(PaymentOutcome::Completed);

        let outcome = service.place_order(request(&f, 2)).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.message, ORDER_PLACED_MESSAGE);
        assert_eq!(outcome.status, OrderStatus::Completed);
        assert_eq!(outcome.total, Money::from_cents(5000));
        assert_eq!(f.stock().await, 8);

        let view = service.get_order_view(&outcome.order_number).await.unwrap();
        assert_eq!(view.total_amount, Money::from_cents(5000));
        assert_eq!(view.status, OrderStatus::Completed);
        assert_eq!(view.quantity, 2);
        assert_eq!(view.variant_value.as_deref(), Some("Red"));
        assert_eq!(view.full_name, "Jane Doe");

        let sent = f.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Confirmation);
        assert_eq!(sent[0].order_number, outcome.order_number);
        assert_eq!(sent[0].total, Money::from_cents(5000));
        assert_eq!(sent[0].product_name, "Classic Sneaker (Color: Red)");

        let order = f.db.orders().get_by_number(&outcome.order_number).await.unwrap().unwrap();
        let entries = f.db.outbox().get_for_order(order.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_notification_uses_catalog_name_over_requested_name() {
        let f = fixture(10).await;
        let service = f.service(PaymentOutcome::Completed);

        let mut req = request(&f, 1);
        req.product_name = Some("Requested Name".into());
        service.place_order(req).await.unwrap();

        let sent = f.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].product_name, "Classic Sneaker (Color: Red)");
    }

    #[tokio::test]
    async fn test_failed_payment_keeps_order_and_releases_stock() {
        let f = fixture(10).await;
        let service = f.service(PaymentOutcome::Failed);

        let outcome = service.place_order(request(&f, 3)).await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.message, PAYMENT_FAILED_MESSAGE);
        assert_eq!(outcome.status, OrderStatus::Failed);
        assert_eq!(f.stock().await, 10);

        let order = f.db.orders().get_by_number(&outcome.order_number).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);

        let sent = f.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::TransactionFailed);
    }

    #[tokio::test]
    async fn test_each_placement_has_one_outcome_and_one_notification() {
        let f = fixture(100).await;
        let approve = f.service(PaymentOutcome::Completed);
        let decline = f.service(PaymentOutcome::Failed);

        for i in 0..10 {
            let service = if i % 2 == 0 { &approve } else { &decline };
            service.place_order(request(&f, 1)).await.unwrap();
        }

        assert_eq!(f.sender.sent().len(), 10);
        assert_eq!(count(&f.db, "orders").await, 10);
        assert_eq!(count(&f.db, "customer_info").await, 10);
        assert_eq!(count(&f.db, "notification_outbox").await, 10);

        let pending: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = 'pending'")
            .fetch_one(f.db.pool())
            .await
            .unwrap();
        assert_eq!(pending, 0);

        // one notification per order, of the matching kind
        let mismatched: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders o
            JOIN notification_outbox n ON n.order_id = o.id
            WHERE (o.status = 'completed' AND n.kind != 'confirmation')
               OR (o.status = 'failed' AND n.kind != 'transaction_failed')
            "#,
        )
        .fetch_one(f.db.pool())
        .await
        .unwrap();
        assert_eq!(mismatched, 0);
        assert_eq!(f.stock().await, 95);
    }

    #[tokio::test]
    async fn test_out_of_stock_rolls_back() {
        let f = fixture(1).await;
        let service = f.service(PaymentOutcome::Completed);

        let err = service.place_order(request(&f, 2)).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::Core(CoreError::OutOfStock { available: 1, requested: 2, .. })
        ));

        assert_eq!(f.stock().await, 1);
        assert_eq!(count(&f.db, "orders").await, 0);
        assert_eq!(count(&f.db, "customer_info").await, 0);
        assert!(f.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_after_inserts_rolls_back() {
        let f = fixture(10).await;
        sqlx::query(
            r#"
            CREATE TRIGGER outbox_unavailable BEFORE INSERT ON notification_outbox
            BEGIN
                SELECT RAISE(ABORT, 'outbox unavailable');
            END
            "#,
        )
        .execute(f.db.pool())
        .await
        .unwrap();

        let service = f.service(PaymentOutcome::Completed);
        let err = service.place_order(request(&f, 2)).await.unwrap_err();
        assert!(matches!(err, OrderError::Db(_)));

        assert_eq!(count(&f.db, "orders").await, 0);
        assert_eq!(count(&f.db, "customer_info").await, 0);
        assert_eq!(count(&f.db, "notification_outbox").await, 0);
        assert_eq!(f.stock().await, 10);
        assert!(f.sender.sent().is_empty());

        // the connection went back to the pool
        assert!(f.db.health_check().await);
    }

    #[tokio::test]
    async fn test_concurrent_orders_never_oversell() {
        let path = std::env::temp_dir().join(format!(
            "esales-concurrency-{}-{}.db",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let f = seed(db, 3).await;

        let a = f.service(PaymentOutcome::Completed);
        let b = f.service(PaymentOutcome::Completed);
        let (ra, rb) = tokio::join!(a.place_order(request(&f, 2)), b.place_order(request(&f, 2)));

        let results = [ra, rb];
        let successes = results.iter().filter(|r| matches!(r, Ok(o) if o.success)).count();
        let out_of_stock = results
            .iter()
            .filter(|r| matches!(r, Err(OrderError::Core(CoreError::OutOfStock { .. }))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(out_of_stock, 1);
        assert_eq!(f.stock().await, 1);
        assert_eq!(count(&f.db, "orders").await, 1);

        f.db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test]
    async fn test_client_total_is_ignored() {
        let f = fixture(10).await;
        let service = f.service(PaymentOutcome::Completed);

        let mut req = request(&f, 2);
        req.total_amount = Some(Money::from_cents(1));

        let outcome = service.place_order(req).await.unwrap();
        assert_eq!(outcome.total, Money::from_cents(5000));
    }

    #[tokio::test]
    async fn test_order_without_variant() {
        let f = fixture(10).await;
        let service = f.service(PaymentOutcome::Completed);

        let mut req = request(&f, 3);
        req.variant_id = None;

        let outcome = service.place_order(req).await.unwrap();
        assert_eq!(outcome.total, Money::from_cents(6000));
        assert_eq!(f.stock().await, 10);

        let view = service.get_order_view(&outcome.order_number).await.unwrap();
        assert!(view.variant_name.is_none());
    }

    #[tokio::test]
    async fn test_unknown_product_and_variant() {
        let f = fixture(10).await;
        let service = f.service(PaymentOutcome::Completed);

        let mut req = request(&f, 1);
        req.product_id = 999;
        assert!(matches!(
            service.place_order(req).await.unwrap_err(),
            OrderError::Core(CoreError::ProductNotFound(999))
        ));

        let mut req = request(&f, 1);
        req.variant_id = Some(999);
        assert!(matches!(
            service.place_order(req).await.unwrap_err(),
            OrderError::Core(CoreError::VariantNotFound { variant_id: 999, .. })
        ));

        assert_eq!(count(&f.db, "orders").await, 0);
    }

    #[tokio::test]
    async fn test_validation_writes_nothing() {
        let f = fixture(10).await;
        let service = f.service(PaymentOutcome::Completed);

        let mut req = request(&f, 0);
        assert!(matches!(
            service.place_order(req.clone()).await.unwrap_err(),
            OrderError::Core(CoreError::Validation(_))
        ));

        req.quantity = 1;
        req.customer_info.email = "not-an-email".into();
        assert!(matches!(
            service.place_order(req).await.unwrap_err(),
            OrderError::Core(CoreError::Validation(_))
        ));

        assert_eq!(count(&f.db, "orders").await, 0);
        assert_eq!(f.stock().await, 10);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_order() {
        let f = fixture(10).await;
        f.sender.set_failing(true);
        let service = f.service(PaymentOutcome::Completed);

        let outcome = service.place_order(request(&f, 1)).await.unwrap();
        assert!(outcome.success);

        let order = f.db.orders().get_by_number(&outcome.order_number).await.unwrap().unwrap();
        let entries = f.db.outbox().get_for_order(order.id).await.unwrap();
        assert_eq!(entries[0].attempts, 1);
        assert!(entries[0].delivered_at.is_none());
        assert!(entries[0].last_error.is_some());
    }

    #[tokio::test]
    async fn test_unknown_order_number() {
        let f = fixture(10).await;
        let service = f.service(PaymentOutcome::Completed);

        for number in ["ORD-000000ZZZZ", "garbage", ""] {
            assert!(matches!(
                service.get_order_view(number).await.unwrap_err(),
                OrderError::Core(CoreError::OrderNotFound(_))
            ));
        }
    }
}
