//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Storefront                         │
//! │                                                                         │
//! │  Client                      Rust Backend                               │
//! │  ──────                      ────────────                               │
//! │                                                                         │
//! │  POST /api/orders                                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Validation? ──── CoreError::Validation ──────► 400 ───────────►│  │
//! │  │  Unknown id? ──── CoreError::*NotFound ───────► 404 ───────────►│  │
//! │  │  No stock?  ──── CoreError::OutOfStock ───────► 409 ───────────►│  │
//! │  │  Database?  ──── DbError (logged, hidden) ────► 500 ───────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "NOT_FOUND", "message": "Order not found" }                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use esales_core::CoreError;
use esales_db::DbError;
use serde::Serialize;

use crate::services::OrderError;

/// Error returned from HTTP handlers.
///
/// ## Serialization
/// This is what the client receives when a request fails:
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Only 1 left in stock"
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Insufficient stock (409)
    InsufficientStock,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: ErrorCode,
    message: &'a str,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, message)
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal, message)
    }

    /// Replaces the message of a 500 with a route-specific one.
    pub fn with_server_message(mut self, message: &str) -> Self {
        if self.status.is_server_error() {
            self.message = message.to_string();
        }
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        // Log the actual error but return a generic message
        match &err {
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => {
                tracing::error!(error = %err, "Database unavailable");
            }
            _ => {
                tracing::error!(error = %err, "Database operation failed");
            }
        }
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::DatabaseError,
            "Database operation failed",
        )
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(_) => ApiError::not_found("Product not found"),
            CoreError::VariantNotFound { .. } => ApiError::not_found("Variant not found"),
            CoreError::OrderNotFound(_) => ApiError::not_found("Order not found"),
            CoreError::OutOfStock { available, .. } => ApiError::new(
                StatusCode::CONFLICT,
                ErrorCode::InsufficientStock,
                if available == 0 {
                    "This item is out of stock".to_string()
                } else {
                    format!("Only {} left in stock", available)
                },
            ),
            CoreError::InvalidStatusTransition { .. } => {
                tracing::error!(error = %err, "Order status update did not apply");
                ApiError::internal("Internal server error")
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Core(e) => e.into(),
            OrderError::Db(e) => e.into(),
        }
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
