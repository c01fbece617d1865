//! # Order Numbers
//!
//! Human-facing order identifiers: `ORD-` + the last 6 digits of the epoch
//! millisecond clock + 4 random characters from `[0-9A-Z]`.
//!
//! ```text
//!   ORD-  482913  7QZC
//!   ────  ──────  ────
//!    │      │       └── random suffix (36^4 = 1,679,616 values)
//!    │      └── epoch millis mod 1,000,000
//!    └── fixed prefix
//! ```
//!
//! Uniqueness is probabilistic; the `orders.order_number` UNIQUE constraint is
//! the final guard. The clock and randomness are supplied by the caller so
//! this module stays pure.

/// Fixed prefix of every order number.
pub const ORDER_NUMBER_PREFIX: &str = "ORD-";

/// Number of clock digits after the prefix.
pub const TIMESTAMP_DIGITS: usize = 6;

/// Number of random characters at the end.
pub const SUFFIX_LEN: usize = 4;

/// Characters the random suffix is drawn from.
pub const SUFFIX_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Builds an order number from a millisecond timestamp and a suffix.
///
/// ## Example
/// ```rust
/// use esales_core::order_number::format_order_number;
///
/// let n = format_order_number(1_718_000_482_913, "7QZC");
/// assert_eq!(n, "ORD-4829137QZC");
/// ```
pub fn format_order_number(epoch_millis: i64, suffix: &str) -> String {
    format!(
        "{}{:06}{}",
        ORDER_NUMBER_PREFIX,
        epoch_millis.rem_euclid(1_000_000),
        suffix
    )
}

/// Checks the `ORD-` + 6 digits + 4 `[0-9A-Z]` shape.
pub fn is_valid_order_number(value: &str) -> bool {
    let Some(rest) = value.strip_prefix(ORDER_NUMBER_PREFIX) else {
        return false;
    };

    if !rest.is_ascii() || rest.len() != TIMESTAMP_DIGITS + SUFFIX_LEN {
        return false;
    }

    let (digits, suffix) = rest.split_at(TIMESTAMP_DIGITS);
    digits.bytes().all(|b| b.is_ascii_digit())
        && suffix.bytes().all(|b| SUFFIX_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_timestamp() {
        assert_eq!(format_order_number(1_000_000_000_042, "AB12"), "ORD-000042AB12");
    }

    #[test]
    fn test_formatted_numbers_are_valid() {
        let n = format_order_number(1_718_000_482_913, "Z9Z9");
        assert!(is_valid_order_number(&n));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(!is_valid_order_number(""));
        assert!(!is_valid_order_number("ORD-"));
        assert!(!is_valid_order_number("ORD-12345AB12"));
        assert!(!is_valid_order_number("ORD-123456ab12"));
        assert!(!is_valid_order_number("ORD-12345XAB12"));
        assert!(!is_valid_order_number("XYZ-123456AB12"));
        assert!(!is_valid_order_number("ORD-123456AB12X"));
    }
}
