//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Integer Cents Inside, Decimal Numbers Outside
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Database columns, totals and comparisons are all i64 cents.         │
//! │                                                                         │
//! │  JSON BOUNDARY                                                          │
//! │    The storefront client reads prices as plain numbers (29.99), so     │
//! │    Money serializes as a major-unit number and parses one back,        │
//! │    rounding to the nearest cent.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use esales_core::money::Money;
//!
//! let price = Money::from_cents(2000); // $20.00
//! let total = (price + Money::from_cents(500)) * 2i64;
//! assert_eq!(total.cents(), 5000);
//!
//! let json = serde_json::to_string(&total).unwrap();
//! assert_eq!(json, "50.0");
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Price adjustments on variants may be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Custom serde**: A JSON number in major units (`50.0`, `29.99`)
///
/// ## Where Money is Used
/// ```text
/// Product.price ──┐
///                 ├──► order_total(base, adjustment, qty) ──► Order.total_amount
/// Variant.price_adjustment ──┘                                     │
///                                                                  ▼
///                                              Confirmation email, order view
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use esales_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// For negative amounts only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -$5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Converts a major-unit decimal (as received over JSON) to Money,
    /// rounding half away from zero to the nearest cent.
    ///
    /// Returns `None` for NaN, infinities and values outside the i64 cent range.
    ///
    /// ## Example
    /// ```rust
    /// use esales_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_f64(29.99), Some(Money::from_cents(2999)));
    /// assert_eq!(Money::from_major_f64(0.1 + 0.2), Some(Money::from_cents(30)));
    /// assert_eq!(Money::from_major_f64(f64::NAN), None);
    /// ```
    pub fn from_major_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents < i64::MIN as f64 || cents > i64::MAX as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the value in major units as a float.
    ///
    /// Only for the JSON boundary and display. Never compute with it.
    #[inline]
    pub fn as_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use esales_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(2500); // $25.00
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 5000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display renders `$50.00` style amounts. Used in emails and log lines.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Serde (major-unit JSON numbers)
// =============================================================================

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a monetary amount in major units")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(100)
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(100))
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::from_major_f64(v).ok_or_else(|| E::custom("amount is not a finite number"))
    }

    // Form posts sometimes carry amounts as strings ("50.00").
    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        let parsed: f64 = v
            .trim()
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))?;
        self.visit_f64(parsed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
