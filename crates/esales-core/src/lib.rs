//! # esales-core: Pure Business Logic for the eSalesOne Storefront
//!
//! This crate holds the storefront's domain model and rules as pure code
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      eSalesOne Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront Client (React)                    │   │
//! │  │    Landing ──► Checkout ──► Thank You                           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/storefront (axum)                       │   │
//! │  │    list_products, place_order, get_order                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ esales-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌──────────┐   │   │
//! │  │   │   types   │  │   money   │  │ order_num  │  │validation│   │   │
//! │  │   │  Product  │  │   Money   │  │  ORD-…     │  │  rules   │   │   │
//! │  │   │  Order    │  │  pricing  │  │  format    │  │  checks  │   │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └──────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    esales-db (Database Layer)                   │   │
//! │  │           SQLite queries, migrations, repositories              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Variant, Order, CustomerInfo, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Server-side order total calculation
//! - [`order_number`] - Order number format and parsing
//! - [`error`] - Domain error types
//! - [`validation`] - Checkout validation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use esales_core::money::Money;
//! use esales_core::pricing::order_total;
//!
//! let base = Money::from_cents(2000);      // $20.00
//! let adjustment = Money::from_cents(500); // +$5.00 for the variant
//!
//! let total = order_total(base, Some(adjustment), 2);
//! assert_eq!(total.cents(), 5000);         // $50.00
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod order_number;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single checkout.
///
/// Guards against accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ORDER_QUANTITY: i64 = 999;

/// Maximum delivery attempts for a queued customer notification.
pub const MAX_DELIVERY_ATTEMPTS: i64 = 5;
