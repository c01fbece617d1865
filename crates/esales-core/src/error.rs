//! # Error Types
//!
//! Domain-specific error types for esales-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  esales-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Checkout input failures                        │
//! │                                                                         │
//! │  esales-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  storefront errors (in app)                                            │
//! │  ├── OrderError       - Placement / retrieval failures                 │
//! │  └── ApiError         - What the HTTP client sees                      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → OrderError → ApiError → Client    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised while placing or reading orders.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The checkout referenced a product that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// The checkout referenced a variant that does not exist or that belongs
    /// to a different product.
    #[error("Variant {variant_id} not found for product {product_id}")]
    VariantNotFound { variant_id: i64, product_id: i64 },

    /// No order carries the requested order number.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// The variant does not have enough stock for the requested quantity.
    ///
    /// ## When This Occurs
    /// ```text
    /// Variant stock = 3
    ///      │
    ///      ├── Order A (qty 2) ── reserve ──► stock 1   ✓
    ///      │
    ///      └── Order B (qty 2) ── reserve ──► rejected
    ///                                          │
    ///                                          ▼
    ///              OutOfStock { variant_id, available: 1, requested: 2 }
    /// ```
    #[error("Insufficient stock for variant {variant_id}: available {available}, requested {requested}")]
    OutOfStock {
        variant_id: i64,
        available: i64,
        requested: i64,
    },

    /// An order status change that would revert or repeat a final status.
    #[error("Order {order_number} is {from}, cannot move to {to}")]
    InvalidStatusTransition {
        order_number: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors for checkout submissions.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (email, phone, zip code, order number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
