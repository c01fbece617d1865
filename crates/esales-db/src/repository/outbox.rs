//! # Notification Outbox Repository
//!
//! Customer notifications queued in the same transaction as their order.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  ORDER PLACEMENT                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. UPDATE orders SET status = 'completed' | 'failed'          │   │
//! │  │                                                                 │   │
//! │  │  2. INSERT INTO notification_outbox (order_id, kind, payload)  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail                                    │
//! │       │                                                                 │
//! │       ├──► immediate send ──► mark_delivered / mark_failed             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            NOTIFICATION RELAY (background)                      │   │
//! │  │                                                                 │   │
//! │  │  get_retryable(): delivered_at IS NULL AND attempts < max      │   │
//! │  │                   AND (attempts > 0 OR created_at <= cutoff)   │   │
//! │  │                                                                 │   │
//! │  │  send ──► mark_delivered  |  mark_failed (attempts += 1)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  A committed order always has exactly one outbox row, so a crash      │
//! │  between commit and send loses nothing.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use esales_core::{NotificationKind, NotificationOutboxEntry};

#[derive(Debug, FromRow)]
struct OutboxRecord {
    id: String,
    order_id: i64,
    kind: NotificationKind,
    payload: String,
    attempts: i64,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    attempted_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
}

impl From<OutboxRecord> for NotificationOutboxEntry {
    fn from(r: OutboxRecord) -> Self {
        NotificationOutboxEntry {
            id: r.id,
            order_id: r.order_id,
            kind: r.kind,
            payload: r.payload,
            attempts: r.attempts,
            last_error: r.last_error,
            created_at: r.created_at,
            attempted_at: r.attempted_at,
            delivered_at: r.delivered_at,
        }
    }
}

const OUTBOX_COLUMNS: &str = "id, order_id, kind, payload, attempts, last_error, \
                              created_at, attempted_at, delivered_at";

/// Repository for notification outbox operations.
#[derive(Debug, Clone)]
pub struct NotificationOutboxRepository {
    pool: SqlitePool,
}

impl NotificationOutboxRepository {
    /// Creates a new NotificationOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationOutboxRepository { pool }
    }

    /// Queues a notification on the caller's transaction.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let payload = serde_json::to_string(&notification)?;
    /// NotificationOutboxRepository::enqueue(&mut *tx, order.id, kind, &payload).await?;
    /// ```
    pub async fn enqueue(
        conn: &mut SqliteConnection,
        order_id: i64,
        kind: NotificationKind,
        payload: &str,
    ) -> DbResult<NotificationOutboxEntry> {
        let entry = NotificationOutboxEntry {
            id: Uuid::new_v4().to_string(),
            order_id,
            kind,
            payload: payload.to_string(),
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            delivered_at: None,
        };

        debug!(order_id, kind = %kind, id = %entry.id, "Queuing notification");

        sqlx::query(
            r#"
            INSERT INTO notification_outbox (
                id, order_id, kind, payload,
                attempts, last_error, created_at, attempted_at, delivered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.order_id)
        .bind(entry.kind)
        .bind(&entry.payload)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.delivered_at)
        .execute(&mut *conn)
        .await?;

        Ok(entry)
    }

    /// Gets an entry by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<NotificationOutboxEntry>> {
        let record = sqlx::query_as::<_, OutboxRecord>(&format!(
            "SELECT {} FROM notification_outbox WHERE id = ?1",
            OUTBOX_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(NotificationOutboxEntry::from))
    }

    /// Gets all entries for an order, oldest first.
    pub async fn get_for_order(&self, order_id: i64) -> DbResult<Vec<NotificationOutboxEntry>> {
        let records = sqlx::query_as::<_, OutboxRecord>(&format!(
            "SELECT {} FROM notification_outbox WHERE order_id = ?1 ORDER BY created_at",
            OUTBOX_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Gets undelivered entries the relay should retry.
    ///
    /// An entry qualifies when it is not delivered, has fewer than
    /// `max_attempts` attempts, and either failed before or was never
    /// attempted and is older than `grace` (the post-commit send never ran).
    pub async fn get_retryable(
        &self,
        max_attempts: i64,
        grace: Duration,
        limit: u32,
    ) -> DbResult<Vec<NotificationOutboxEntry>> {
        let cutoff = Utc::now() - grace;

        let records = sqlx::query_as::<_, OutboxRecord>(&format!(
            r#"
            SELECT {}
            FROM notification_outbox
            WHERE delivered_at IS NULL
              AND attempts < ?1
              AND (attempts > 0 OR created_at <= ?2)
            ORDER BY created_at ASC
            LIMIT ?3
            "#,
            OUTBOX_COLUMNS
        ))
        .bind(max_attempts)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Marks an entry as delivered.
    pub async fn mark_delivered(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE notification_outbox SET
                attempts = attempts + 1,
                delivered_at = ?2,
                attempted_at = ?2,
                last_error = NULL
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a failed delivery attempt.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE notification_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts undelivered entries that used up every attempt.
    pub async fn count_exhausted(&self, max_attempts: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification_outbox WHERE delivered_at IS NULL AND attempts >= ?1",
        )
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::catalog::NewProduct;
    use crate::repository::order::{generate_order_number, NewOrder, OrderRepository};
    use crate::{Database, DbConfig};
    use esales_core::Money;

    async fn db_with_order() -> (Database, i64) {
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

        let mut tx = db.begin().await.unwrap();
        let order = OrderRepository::insert_order(
            &mut tx,
            &NewOrder {
                order_number: generate_order_number(),
                product_id,
                variant_id: None,
                quantity: 1,
                total_amount: Money::from_cents(2000),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        (db, order.id)
    }

    async fn enqueue(db: &Database, order_id: i64) -> NotificationOutboxEntry {
        let mut tx = db.begin().await.unwrap();
        let entry = NotificationOutboxRepository::enqueue(
            &mut tx,
            order_id,
            NotificationKind::Confirmation,
            "{}",
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        entry
    }

    #[tokio::test]
    async fn test_enqueue_and_get() {
        let (db, order_id) = db_with_order().await;
        let entry = enqueue(&db, order_id).await;

        let stored = db.outbox().get(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.kind, NotificationKind::Confirmation);
        assert_eq!(stored.attempts, 0);
        assert!(stored.delivered_at.is_none());
        assert_eq!(db.outbox().get_for_order(order_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fresh_entries_wait_for_grace_period() {
        let (db, order_id) = db_with_order().await;
        enqueue(&db, order_id).await;

        let outbox = db.outbox();
        let within_grace = outbox
            .get_retryable(5, Duration::minutes(5), 10)
            .await
            .unwrap();
        assert!(within_grace.is_empty());

        let past_grace = outbox.get_retryable(5, Duration::zero(), 10).await.unwrap();
        assert_eq!(past_grace.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_entries_retry_until_exhausted() {
        let (db, order_id) = db_with_order().await;
        let entry = enqueue(&db, order_id).await;
        let outbox = db.outbox();

        outbox.mark_failed(&entry.id, "smtp down").await.unwrap();
        let retry = outbox
            .get_retryable(2, Duration::minutes(5), 10)
            .await
            .unwrap();
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].last_error.as_deref(), Some("smtp down"));

        outbox.mark_failed(&entry.id, "smtp down").await.unwrap();
        let retry = outbox
            .get_retryable(2, Duration::minutes(5), 10)
            .await
            .unwrap();
        assert!(retry.is_empty());
        assert_eq!(outbox.count_exhausted(2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_delivered() {
        let (db, order_id) = db_with_order().await;
        let entry = enqueue(&db, order_id).await;
        let outbox = db.outbox();

        outbox.mark_delivered(&entry.id).await.unwrap();

        let stored = outbox.get(&entry.id).await.unwrap().unwrap();
        assert!(stored.delivered_at.is_some());
        assert_eq!(stored.attempts, 1);
        assert!(outbox
            .get_retryable(5, Duration::zero(), 10)
            .await
            .unwrap()
            .is_empty());
    }
}
