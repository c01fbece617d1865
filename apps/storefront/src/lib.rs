//! # eSalesOne Storefront
//!
//! JSON API for a single-product storefront: catalog listing, checkout, and
//! order confirmation lookup.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Storefront Server                               │
//! │                                                                         │
//! │  ┌────────────────┐  ┌──────────────────┐  ┌────────────────────────┐  │
//! │  │  routes        │  │  OrderService    │  │  NotificationRelay     │  │
//! │  │                │  │                  │  │                        │  │
//! │  │ • health       │─►│ • place_order    │  │ • polls outbox         │  │
//! │  │ • products     │  │ • get_order_view │  │ • retries sends        │  │
//! │  │ • orders       │  │ • list_products  │  │                        │  │
//! │  └────────────────┘  └────────┬─────────┘  └───────────┬────────────┘  │
//! │                               │                        │               │
//! │         ┌─────────────────────┼────────────────────────┤               │
//! │         ▼                     ▼                        ▼               │
//! │  ┌──────────────┐  ┌────────────────────┐  ┌───────────────────────┐  │
//! │  │ Payment      │  │ esales-db          │  │ NotificationSender    │  │
//! │  │ Processor    │  │ (SQLite)           │  │ (mail API / log)      │  │
//! │  └──────────────┘  └────────────────────┘  └───────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::StorefrontConfig`]):
//! - `PORT` - HTTP port (default: 5000)
//! - `DATABASE_PATH` - SQLite file (default: ./data/esales.db)
//! - `PAYMENT_MODE` - simulated | approve_all | decline_all
//! - `PAYMENT_SUCCESS_RATE` - simulated approval probability (default: 0.8)
//! - `MAIL_API_URL` / `MAIL_API_TOKEN` - mail-send API; log only when unset

pub mod config;
pub mod error;
pub mod notification;
pub mod payment;
pub mod routes;
pub mod services;

use std::sync::Arc;

use esales_db::Database;

// Re-exports
pub use config::StorefrontConfig;
pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use services::OrderService;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub orders: Arc<OrderService>,
}

impl AppState {
    pub fn new(db: Database, orders: OrderService) -> Self {
        AppState {
            db,
            orders: Arc::new(orders),
        }
    }
}
