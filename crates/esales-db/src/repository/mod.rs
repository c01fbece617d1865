//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  OrderService                                                          │
//! │       │                                                                 │
//! │       │  reads:  db.catalog().get_product(id)                          │
//! │       │  writes: OrderRepository::insert_order(&mut *tx, ..)           │
//! │       ▼                                                                 │
//! │  CatalogRepository / OrderRepository / NotificationOutboxRepository    │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Reads take `&self` and use the pool. Writes that must commit          │
//! │  together take the transaction's `&mut SqliteConnection`.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Products, variants, stock reservation
//! - [`order::OrderRepository`] - Orders, customer info, order views
//! - [`outbox::NotificationOutboxRepository`] - Notification queue

pub mod catalog;
pub mod order;
pub mod outbox;
