//! # Domain Types
//!
//! Core domain types used throughout the eSalesOne storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │  CustomerInfo   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  full_name      │       │
//! │  │  name           │   │  order_number   │   │  email, phone   │       │
//! │  │  price          │   │  status         │   │  address ...    │       │
//! │  │  variants[]     │   │  total_amount   │   │  (1:1 w/ order) │       │
//! │  └────────┬────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │                                                             │
//! │  ┌────────▼────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Variant      │   │   OrderStatus   │   │NotificationKind │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  name / value   │   │  Pending        │   │  Confirmation   │       │
//! │  │  price_adjust.  │   │  Completed      │   │  Transaction-   │       │
//! │  │  stock (>= 0)   │   │  Failed         │   │   Failed        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Orders carry two identifiers:
//! - `id`: integer primary key, used for database relations
//! - `order_number`: human-readable `ORD-...` string shown to the customer
//!
//! ## JSON Shapes
//! Read models (`Product`, `Variant`, `OrderView`) serialize with the
//! database's snake_case column names. The checkout submission
//! (`CheckoutRequest`, `CustomerInfo`) uses the client's camelCase names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product & Variant
// =============================================================================

/// A product available for sale, with its purchasable variants.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name shown on the landing page and in emails.
    pub name: String,

    pub description: Option<String>,

    /// Base price before any variant adjustment.
    #[ts(type = "number")]
    pub price: Money,

    pub image_url: Option<String>,

    /// Variants ordered by id.
    pub variants: Vec<Variant>,
}

impl Product {
    /// Finds a variant of this product by id.
    pub fn variant(&self, variant_id: i64) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }
}

/// A purchasable option of a product (e.g. Color: Black).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,

    /// Option name, e.g. "Color".
    pub name: String,

    /// Option value, e.g. "Black".
    pub value: String,

    /// Signed amount added to the product's base price.
    #[ts(type = "number")]
    pub price_adjustment: Money,

    /// Units on hand. Never negative.
    pub stock: i64,
}

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
///
/// ## State Machine
/// ```text
///              ┌──────────────┐
///              │   Pending    │  (inserted inside the placement transaction)
///              └──────┬───────┘
///                     │ payment outcome
///          ┌──────────┴──────────┐
///          ▼                     ▼
///   ┌──────────────┐      ┌──────────────┐
///   │  Completed   │      │    Failed    │
///   └──────────────┘      └──────────────┘
///        final                 final
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order row written, payment not yet decided.
    Pending,
    /// Payment succeeded.
    Completed,
    /// Payment declined. The order is kept for the record.
    Failed,
}

impl OrderStatus {
    /// Returns the lowercase name stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        }
    }

    /// Only `pending → completed` and `pending → failed` are allowed.
    pub const fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Failed)
        )
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// A placed order. One product, optionally one variant, one quantity.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    /// Server-computed `(price + adjustment) × quantity`.
    #[ts(type = "number")]
    pub total_amount: Money,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Customer Info
// =============================================================================

/// Shipping and contact details captured at checkout.
/// Written once alongside the order and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

// =============================================================================
// Checkout Request
// =============================================================================

/// The body of a checkout submission.
///
/// `product_name` and `total_amount` are what the client displayed. The server
/// always uses the catalog name and its own total; a differing client total
/// is logged and otherwise ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub product_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub quantity: i64,
    pub customer_info: CustomerInfo,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub total_amount: Option<Money>,
}

// =============================================================================
// Order View
// =============================================================================

/// Flattened order + product + variant + customer view returned by
/// `GET /api/orders/:orderNumber` and rendered on the thank-you page.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderView {
    pub id: i64,
    pub order_number: String,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    #[ts(type = "number")]
    pub total_amount: Money,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    pub product_name: String,
    #[ts(type = "number")]
    pub product_price: Money,

    pub variant_name: Option<String>,
    pub variant_value: Option<String>,

    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

// =============================================================================
// Notification Outbox
// =============================================================================

/// Which customer message an outbox entry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Payment succeeded; send the order confirmation.
    Confirmation,
    /// Payment declined; tell the customer the transaction failed.
    TransactionFailed,
}

impl NotificationKind {
    /// The notification that matches a final order status.
    /// `None` for `Pending`, which never notifies.
    pub const fn for_status(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Completed => Some(NotificationKind::Confirmation),
            OrderStatus::Failed => Some(NotificationKind::TransactionFailed),
            OrderStatus::Pending => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Confirmation => "confirmation",
            NotificationKind::TransactionFailed => "transaction_failed",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer notification queued in the same transaction as its order.
/// Uses the outbox pattern so a crash between commit and send is recoverable.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NotificationOutboxEntry {
    pub id: String,
    pub order_id: i64,
    pub kind: NotificationKind,
    /// The rendered notification data as JSON.
    pub payload: String,
    /// Number of delivery attempts.
    pub attempts: i64,
    /// Last error message if delivery failed.
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================
