//! # Customer Notifications
//!
//! Renders and delivers the two customer emails: order confirmation and
//! transaction failed.
//!
//! ## Delivery Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Notification Delivery                              │
//! │                                                                         │
//! │  order transaction ──► notification_outbox row (payload = Notification) │
//! │        │                                                                │
//! │        ▼ commit                                                         │
//! │  OrderService ──► NotificationSender::send ──► mark delivered / failed  │
//! │                                                                         │
//! │  NotificationRelay (background) ──► retries undelivered rows            │
//! │                                                                         │
//! │  Senders:                                                               │
//! │  • HttpMailSender      - JSON mail-send API over HTTPS (reqwest)        │
//! │  • LogNotificationSender - writes the message to the log                │
//! │  • RecordingNotificationSender - keeps messages in memory (tests)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use esales_core::{CustomerInfo, Money, NotificationKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Display name on outgoing emails.
pub const SENDER_NAME: &str = "eSalesOne";

/// Everything needed to render one customer email.
///
/// Stored as the outbox payload, so the relay can resend it without
/// touching the order tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub order_number: String,
    pub customer: CustomerInfo,
    pub product_name: String,
    pub quantity: i64,
    pub total: Money,
}

impl Notification {
    pub fn subject(&self) -> String {
        match self.kind {
            NotificationKind::Confirmation => {
                format!("Order Confirmation - Order #{}", self.order_number)
            }
            NotificationKind::TransactionFailed => {
                format!("Transaction Failed - Order #{}", self.order_number)
            }
        }
    }

    /// Renders the HTML body.
    pub fn render_html(&self, support_email: &str) -> String {
        match self.kind {
            NotificationKind::Confirmation => self.confirmation_html(support_email),
            NotificationKind::TransactionFailed => self.failure_html(support_email),
        }
    }

    fn confirmation_html(&self, support_email: &str) -> String {
        let c = &self.customer;
        format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #1976d2;">Thank you for your order!</h1>
  <div style="background-color: #f5f5f5; padding: 20px; border-radius: 5px;">
    <h2 style="color: #333;">Order Details</h2>
    <p><strong>Order Number:</strong> {order_number}</p>
    <p><strong>Product:</strong> {product}</p>
    <p><strong>Quantity:</strong> {quantity}</p>
    <p><strong>Total:</strong> {total}</p>
  </div>
  <div style="margin-top: 20px;">
    <h2 style="color: #333;">Shipping Information</h2>
    <p><strong>Name:</strong> {name}</p>
    <p><strong>Address:</strong> {address}</p>
    <p><strong>City:</strong> {city}</p>
    <p><strong>State:</strong> {state}</p>
    <p><strong>Zip Code:</strong> {zip}</p>
  </div>
  <div style="margin-top: 20px; text-align: center; color: #666;">
    <p>If you have any questions, please contact our support team.</p>
    <p>Support Email: {support}</p>
  </div>
</div>"#,
            order_number = escape_html(&self.order_number),
            product = escape_html(&self.product_name),
            quantity = self.quantity,
            total = self.total,
            name = escape_html(&c.full_name),
            address = escape_html(&c.address),
            city = escape_html(&c.city),
            state = escape_html(&c.state),
            zip = escape_html(&c.zip_code),
            support = escape_html(support_email),
        )
    }

    fn failure_html(&self, support_email: &str) -> String {
        format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #dc004e;">Transaction Failed</h1>
  <div style="background-color: #f5f5f5; padding: 20px; border-radius: 5px;">
    <p>We're sorry, but your transaction for Order #{order_number} could not be processed.</p>
    <p>Please try again or contact our support team for assistance.</p>
  </div>
  <div style="margin-top: 20px; text-align: center; color: #666;">
    <p>Support Email: {support}</p>
  </div>
</div>"#,
            order_number = escape_html(&self.order_number),
            support = escape_html(support_email),
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Mail API request failed: {0}")]
    Transport(String),

    #[error("Mail API rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::Transport(err.to_string())
    }
}

/// Delivers customer notifications.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

// =============================================================================
// HTTP Mail API
// =============================================================================

#[derive(Debug, Serialize)]
struct MailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: MailAddress<'a>,
    to: Vec<MailAddress<'a>>,
    subject: String,
    html: String,
    category: &'a str,
}

/// Sends email through a JSON mail-send API authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpMailSender {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    from_email: String,
    support_email: String,
}

impl HttpMailSender {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        from_email: impl Into<String>,
        support_email: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(HttpMailSender {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
            from_email: from_email.into(),
            support_email: support_email.into(),
        })
    }

    fn request_body<'a>(&'a self, notification: &'a Notification) -> MailRequest<'a> {
        MailRequest {
            from: MailAddress {
                email: &self.from_email,
                name: Some(SENDER_NAME),
            },
            to: vec![MailAddress {
                email: notification.customer.email.trim(),
                name: None,
            }],
            subject: notification.subject(),
            html: notification.render_html(&self.support_email),
            category: notification.kind.as_str(),
        }
    }
}

#[async_trait]
impl NotificationSender for HttpMailSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&self.request_body(notification))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            order_number = %notification.order_number,
            kind = %notification.kind,
            "Email sent"
        );
        Ok(())
    }
}

// =============================================================================
// Log Only
// =============================================================================

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            order_number = %notification.order_number,
            kind = %notification.kind,
            to = %notification.customer.email,
            subject = %notification.subject(),
            "Notification (mail API not configured)"
        );
        Ok(())
    }
}

// =============================================================================
// Recording
// =============================================================================

/// Keeps every notification in memory. Can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingNotificationSender {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<bool>,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    /// Notifications delivered so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let failing = self.failing.lock().map(|f| *f).unwrap_or(false);
        if failing {
            return Err(NotificationError::Transport("recording sender set to fail".into()));
        }

        debug!(order_number = %notification.order_number, "Recorded notification");
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }
        Ok(())
    }
}
