//! # Database Error Types
//!
//! Failures raised by the storefront's SQLite layer.
//!
//! ```text
//! sqlx::Error ──► DbError ──► OrderError (rollback) ──► ApiError (500, generic text)
//! ```
//!
//! Constraint failures are classified from SQLite's message text so the
//! placement path can log which guard tripped. The HTTP layer never shows
//! any of this to the client.

use thiserror::Error;

/// Storefront database failures.
#[derive(Debug, Error)]
pub enum DbError {
    /// `orders.order_number` collided, or an order got a second
    /// `customer_info` row.
    #[error("Duplicate value for {field}")]
    UniqueViolation { field: String },

    /// Order, customer info or outbox row points at a missing parent.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A write tried to push `variants.stock` below zero or store a
    /// non-positive quantity.
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// SQLite file could not be opened, or the pool is already closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// BEGIN or COMMIT did not go through.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Any other statement error, including triggers raising ABORT.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: orders.order_number"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            sqlx::Error::RowNotFound => DbError::QueryFailed("expected row was missing".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Internal(format!("payload serialization: {}", err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
