//! # Notification Relay
//!
//! Redelivers customer notifications whose post-commit send failed or never
//! ran.
//!
//! ## Relay Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Notification Relay Flow                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 notification_outbox Table                       │   │
//! │  │                                                                 │   │
//! │  │  id  | order_id | kind               | attempts | delivered_at  │   │
//! │  │  ────┼──────────┼────────────────────┼──────────┼───────────────│   │
//! │  │  a1  │ 7        │ confirmation       │ 1        │ 2025-..       │   │
//! │  │  b2  │ 8        │ transaction_failed │ 2        │ NULL   ◄─ retry│   │
//! │  │  c3  │ 9        │ confirmation       │ 0        │ NULL   ◄─ stale│   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    NotificationRelay                            │   │
//! │  │                                                                 │   │
//! │  │  1. Poll: undelivered, attempts < MAX_DELIVERY_ATTEMPTS,        │   │
//! │  │           and (failed before OR older than the grace period)    │   │
//! │  │                                                                 │   │
//! │  │  2. Decode payload into a Notification                          │   │
//! │  │                                                                 │   │
//! │  │  3. Send through the NotificationSender                         │   │
//! │  │                                                                 │   │
//! │  │  4. Mark delivered, or record the error (attempts += 1)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  TIMING:                                                               │
//! │  • Poll interval: 30 seconds (OUTBOX_POLL_INTERVAL_SECS)               │
//! │  • Batch size: 50 entries                                              │
//! │  • Max attempts: 5 (then left in place and counted as exhausted)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use esales_core::{NotificationOutboxEntry, MAX_DELIVERY_ATTEMPTS};
use esales_db::{Database, DbResult};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::notification::{Notification, NotificationSender};

/// Entries fetched per poll.
const BATCH_SIZE: u32 = 50;

/// How old a never-attempted entry must be before the relay takes it over
/// from the placement request that created it.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);

/// Sends one outbox entry's notification and records the result.
///
/// Returns whether the notification was delivered. Failures are logged and
/// written to the entry; they never propagate.
pub async fn deliver(
    db: &Database,
    sender: &dyn NotificationSender,
    entry_id: &str,
    notification: &Notification,
) -> bool {
    match sender.send(notification).await {
        Ok(()) => {
            if let Err(e) = db.outbox().mark_delivered(entry_id).await {
                error!(?e, id = %entry_id, "Failed to mark notification delivered");
            }
            true
        }
        Err(e) => {
            warn!(
                id = %entry_id,
                order_number = %notification.order_number,
                kind = %notification.kind,
                error = %e,
                "Notification delivery failed"
            );
            if let Err(db_err) = db.outbox().mark_failed(entry_id, &e.to_string()).await {
                error!(?db_err, id = %entry_id, "Failed to record notification failure");
            }
            false
        }
    }
}

// =============================================================================
// Relay
// =============================================================================

/// Background task that retries undelivered notifications.
pub struct NotificationRelay {
    db: Database,
    sender: Arc<dyn NotificationSender>,
    poll_interval: Duration,
    grace_period: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running relay.
#[derive(Clone)]
pub struct NotificationRelayHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl NotificationRelayHandle {
    /// Triggers graceful shutdown. A relay that already stopped is ignored.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Notification relay already stopped");
        }
    }
}

/// Counts from one relay pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub delivered: usize,
    pub failed: usize,
}

impl NotificationRelay {
    /// Creates a new relay and returns a handle.
    pub fn new(
        db: Database,
        sender: Arc<dyn NotificationSender>,
        poll_interval: Duration,
        grace_period: Duration,
    ) -> (Self, NotificationRelayHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let relay = NotificationRelay {
            db,
            sender,
            poll_interval,
            grace_period,
            shutdown_rx,
        };

        (relay, NotificationRelayHandle { shutdown_tx })
    }

    /// Runs the relay loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(interval = ?self.poll_interval, "Notification relay starting");

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.process_batch().await {
                        error!(?e, "Failed to process notification outbox");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Notification relay shutting down");
                    break;
                }
            }
        }

        info!("Notification relay stopped");
    }

    /// Processes one batch of retryable entries.
    pub async fn process_batch(&self) -> DbResult<RelayStats> {
        let grace = chrono::Duration::from_std(self.grace_period)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));

        let entries = self
            .db
            .outbox()
            .get_retryable(MAX_DELIVERY_ATTEMPTS, grace, BATCH_SIZE)
            .await?;

        if entries.is_empty() {
            debug!("No notifications to retry");
            return Ok(RelayStats::default());
        }

        info!(count = entries.len(), "Retrying notifications");

        let mut stats = RelayStats::default();
        for entry in entries {
            if self.retry_entry(&entry).await {
                stats.delivered += 1;
            } else {
                stats.failed += 1;
            }
        }

        let exhausted = self.db.outbox().count_exhausted(MAX_DELIVERY_ATTEMPTS).await?;
        if exhausted > 0 {
            warn!(exhausted, "Notifications gave up after max delivery attempts");
        }

        Ok(stats)
    }

    async fn retry_entry(&self, entry: &NotificationOutboxEntry) -> bool {
        let notification: Notification = match serde_json::from_str(&entry.payload) {
            Ok(n) => n,
            Err(e) => {
                // Counts as an attempt so a corrupt row ages out
                error!(?e, id = %entry.id, "Undecodable notification payload");
                if let Err(db_err) = self
                    .db
                    .outbox()
                    .mark_failed(&entry.id, &format!("invalid payload: {}", e))
                    .await
                {
                    error!(?db_err, id = %entry.id, "Failed to record notification failure");
                }
                return false;
            }
        };

        debug!(
            id = %entry.id,
            attempts = entry.attempts,
            order_number = %notification.order_number,
            "Retrying notification"
        );

        deliver(&self.db, self.sender.as_ref(), &entry.id, &notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::RecordingNotificationSender;
    use esales_core::{CustomerInfo, Money, NotificationKind};
    use esales_db::{DbConfig, NewProduct, NotificationOutboxRepository};

    async fn setup() -> (Database, i64) {
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

        sqlx::query(
            "INSERT INTO orders (order_number, product_id, quantity, total_amount_cents, status, created_at, updated_at)
             VALUES ('ORD-000001AAAA', ?1, 1, 2000, 'completed', ?2, ?2)",
        )
        .bind(product_id)
        .bind(chrono::Utc::now())
        .execute(db.pool())
        .await
        .unwrap();

        let order_id: i64 = sqlx::query_scalar("SELECT id FROM orders")
            .fetch_one(db.pool())
            .await
            .unwrap();

        (db, order_id)
    }

    fn notification() -> Notification {
        Notification {
            kind: NotificationKind::Confirmation,
            order_number: "ORD-000001AAAA".into(),
            customer: CustomerInfo {
                full_name: "Jane Doe".into(),
                email: "jane@example.com".into(),
                phone: "5551234567".into(),
                address: "1 Main St".into(),
                city: "Springfield".into(),
                state: "IL".into(),
                zip_code: "627011".into(),
            },
            product_name: "Classic Sneaker".into(),
            quantity: 1,
            total: Money::from_cents(2000),
        }
    }

    async fn enqueue(db: &Database, order_id: i64) -> String {
        let payload = serde_json::to_string(&notification()).unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        NotificationOutboxRepository::enqueue(
            &mut conn,
            order_id,
            NotificationKind::Confirmation,
            &payload,
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_retries_failed_entry() {
        let (db, order_id) = setup().await;
        let id = enqueue(&db, order_id).await;
        db.outbox().mark_failed(&id, "timeout").await.unwrap();

        let sender = Arc::new(RecordingNotificationSender::new());
        let (relay, _handle) =
            NotificationRelay::new(db.clone(), sender.clone(), Duration::from_secs(1), DEFAULT_GRACE_PERIOD);

        let stats = relay.process_batch().await.unwrap();
        assert_eq!(stats, RelayStats { delivered: 1, failed: 0 });
        assert_eq!(sender.sent().len(), 1);

        let entry = db.outbox().get(&id).await.unwrap().unwrap();
        assert!(entry.delivered_at.is_some());
        assert_eq!(entry.attempts, 2);

        // delivered entries are not picked up again
        assert_eq!(relay.process_batch().await.unwrap(), RelayStats::default());
    }

    #[tokio::test]
    async fn test_fresh_entry_waits_for_grace_period() {
        let (db, order_id) = setup().await;
        enqueue(&db, order_id).await;

        let sender = Arc::new(RecordingNotificationSender::new());
        let (relay, _handle) =
            NotificationRelay::new(db.clone(), sender.clone(), Duration::from_secs(1), DEFAULT_GRACE_PERIOD);
        assert_eq!(relay.process_batch().await.unwrap(), RelayStats::default());

        let (relay, _handle) =
            NotificationRelay::new(db.clone(), sender.clone(), Duration::from_secs(1), Duration::ZERO);
        assert_eq!(relay.process_batch().await.unwrap().delivered, 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (db, order_id) = setup().await;
        let id = enqueue(&db, order_id).await;
        db.outbox().mark_failed(&id, "timeout").await.unwrap();

        let sender = Arc::new(RecordingNotificationSender::new());
        sender.set_failing(true);
        let (relay, _handle) =
            NotificationRelay::new(db.clone(), sender.clone(), Duration::from_secs(1), DEFAULT_GRACE_PERIOD);

        for _ in 0..10 {
            relay.process_batch().await.unwrap();
        }

        let entry = db.outbox().get(&id).await.unwrap().unwrap();
        assert_eq!(entry.attempts, MAX_DELIVERY_ATTEMPTS);
        assert!(entry.delivered_at.is_none());
        assert_eq!(db.outbox().count_exhausted(MAX_DELIVERY_ATTEMPTS).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_payload_counts_as_attempt() {
        let (db, order_id) = setup().await;
        let id = enqueue(&db, order_id).await;
        sqlx::query("UPDATE notification_outbox SET payload = 'not json', attempts = 1 WHERE id = ?1")
            .bind(&id)
            .execute(db.pool())
            .await
            .unwrap();

        let sender = Arc::new(RecordingNotificationSender::new());
        let (relay, _handle) =
            NotificationRelay::new(db.clone(), sender.clone(), Duration::from_secs(1), DEFAULT_GRACE_PERIOD);

        let stats = relay.process_batch().await.unwrap();
        assert_eq!(stats.failed, 1);
        assert!(sender.sent().is_empty());
        assert_eq!(db.outbox().get(&id).await.unwrap().unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (db, _) = setup().await;
        let sender = Arc::new(RecordingNotificationSender::new());
        let (relay, handle) =
            NotificationRelay::new(db, sender, Duration::from_millis(10), DEFAULT_GRACE_PERIOD);

        let task = tokio::spawn(relay.run());
        handle.shutdown().await;

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("relay did not stop")
            .unwrap();
    }
}
