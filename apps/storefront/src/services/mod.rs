//! # Service Layer
//!
//! Business operations the HTTP routes call into.
//!
//! - [`order_service`] - order placement, order lookup, catalog reads
//! - [`outbox_relay`] - background redelivery of customer notifications

pub mod order_service;
pub mod outbox_relay;

use esales_core::CoreError;
use esales_db::DbError;
use thiserror::Error;

pub use order_service::{OrderService, PlacementOutcome};
pub use outbox_relay::{NotificationRelay, NotificationRelayHandle};

/// Failures surfaced by [`OrderService`].
#[derive(Debug, Error)]
pub enum OrderError {
    /// Business rule or validation failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Persistence failure. The order transaction has been rolled back.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<esales_core::ValidationError> for OrderError {
    fn from(err: esales_core::ValidationError) -> Self {
        OrderError::Core(CoreError::Validation(err))
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
