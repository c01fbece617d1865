//! # Validation Module
//!
//! Checkout input validation for the storefront.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Checkout form (browser)                                      │
//! │  ├── Required fields, phone / zip / card formats                       │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Order placement (Rust)                                       │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: the same rules, enforced again server-side           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  ├── CHECK (stock >= 0), CHECK (quantity > 0)                          │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names in errors match the JSON field names the client submits.
//!
//! ## Usage
//! ```rust
//! use esales_core::validation::{validate_phone, validate_quantity};
//!
//! assert!(validate_quantity(2).is_ok());
//! assert!(validate_phone("5551234567").is_ok());
//! assert!(validate_phone("555-1234").is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{CheckoutRequest, CustomerInfo};
use crate::MAX_ORDER_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest free-text value accepted for any customer field.
const MAX_FIELD_LEN: usize = 255;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the order quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ORDER_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ORDER_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ORDER_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field (name, address, city, state).
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_FIELD_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_FIELD_LEN,
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - Exactly one `@`, with a non-empty local part
/// - Domain contains a dot that is neither first nor last
/// - No whitespace
///
/// ## Example
/// ```rust
/// use esales_core::validation::validate_email;
///
/// assert!(validate_email("jane@example.com").is_ok());
/// assert!(validate_email("jane@localhost").is_err());
/// assert!(validate_email("").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    validate_required("email", email)?;

    let invalid = || ValidationError::invalid_format("email", "must be a valid email address");

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    match domain.find('.') {
        Some(dot) if dot > 0 && !domain.ends_with('.') => Ok(()),
        _ => Err(invalid()),
    }
}

/// Checks that `value` is exactly `len` ASCII digits.
fn validate_digits(field: &str, value: &str, len: usize) -> ValidationResult<()> {
    let value = value.trim();
    validate_required(field, value)?;

    if value.len() != len || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            field,
            format!("must be {} digits", len),
        ));
    }

    Ok(())
}

/// Validates a phone number: exactly 10 digits.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    validate_digits("phone", phone, 10)
}

/// Validates a zip code: exactly 6 digits.
pub fn validate_zip_code(zip: &str) -> ValidationResult<()> {
    validate_digits("zipCode", zip, 6)
}

/// Validates an order number as accepted by the lookup endpoint.
pub fn validate_order_number(order_number: &str) -> ValidationResult<()> {
    if crate::order_number::is_valid_order_number(order_number) {
        Ok(())
    } else {
        Err(ValidationError::invalid_format(
            "orderNumber",
            "must look like ORD-123456ABCD",
        ))
    }
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates every customer field. Stops at the first failure.
pub fn validate_customer_info(info: &CustomerInfo) -> ValidationResult<()> {
    validate_required("fullName", &info.full_name)?;
    validate_email(&info.email)?;
    validate_phone(&info.phone)?;
    validate_required("address", &info.address)?;
    validate_required("city", &info.city)?;
    validate_required("state", &info.state)?;
    validate_zip_code(&info.zip_code)?;
    Ok(())
}

/// Validates a whole checkout submission.
///
/// ## User Workflow
/// ```text
/// POST /api/orders
///      │
///      ▼
/// validate_checkout(&request) ← THIS FUNCTION
///      │
///      ├── bad quantity / field? → 400, nothing written
///      │
///      └── OK → order placement transaction
/// ```
pub fn validate_checkout(request: &CheckoutRequest) -> ValidationResult<()> {
    if request.product_id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "productId".to_string(),
        });
    }

    if matches!(request.variant_id, Some(id) if id <= 0) {
        return Err(ValidationError::MustBePositive {
            field: "variantId".to_string(),
        });
    }

    validate_quantity(request.quantity)?;
    validate_customer_info(&request.customer_info)
}

// =============================================================================
// Unit Tests
// =============================================================================
