//! # esales-db: Database Layer for the eSalesOne Storefront
//!
//! This crate provides database access for the storefront.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Data Flow                             │
//! │                                                                         │
//! │  OrderService::place_order / HTTP handlers                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     esales-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CatalogRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │ 001_initial_ │  │   │
//! │  │   │ Transactions  │    │ OutboxRepo    │    │   schema.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │                     ./data/esales.db                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration and transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (catalog, order, outbox)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use esales_db::{CatalogRepository, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/esales.db")).await?;
//!
//! let products = db.catalog().list_products().await?;
//!
//! let mut tx = db.begin().await?;
//! let reservation = CatalogRepository::reserve_stock(&mut *tx, 1, 1, 2).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::{CatalogRepository, NewProduct, NewVariant, StockReservation};
pub use repository::order::{generate_order_number, NewOrder, OrderRepository};
pub use repository::outbox::NotificationOutboxRepository;
